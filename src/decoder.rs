//! Low-level decoder for single Neuralynx CSC (`.ncs`) files.
//!
//! A CSC file is a fixed-size ASCII header block followed by fixed-size
//! binary records, each holding one timestamp and 512 samples for one
//! channel. This module only decodes one file at a time; grouping
//! part-files into channels and assembling them onto a common time axis is
//! the importer's job.

use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::types::CscError;

/// Size of the ASCII header block at the start of every CSC file (bytes)
pub const HEADER_SIZE: usize = 16384;

/// Number of samples in every record (fixed by the acquisition hardware)
pub const SAMPLES_PER_RECORD: usize = 512;

/// Timestamp clock resolution in ticks per second (CSC timestamps are in
/// microseconds)
pub const TIMESTAMP_RESOLUTION: f64 = 1_000_000.0;

/// Size of one record on disk: u64 timestamp, u32 channel number, u32
/// sample frequency, u32 valid-sample count, then 512 i16 samples
pub const RECORD_SIZE: usize = RECORD_PRELUDE_SIZE + RECORD_PAYLOAD_SIZE;

const RECORD_PRELUDE_SIZE: usize = 20;
const RECORD_PAYLOAD_SIZE: usize = 2 * SAMPLES_PER_RECORD;

/// Line positions of the header fields the importer consumes (0-based).
///
/// Cheetah writes these at fixed offsets for a given file-format revision,
/// so a future revision only has to swap this table, not chase positions
/// through the extraction code.
pub(crate) struct HeaderLayout {
    /// Line carrying the `-TimeCreated` stamp
    pub time_created: usize,
    /// Line carrying the `-TimeClosed` stamp
    pub time_closed: usize,
    /// Line carrying `-SamplingFrequency` in Hz
    pub frequency: usize,
    /// Line carrying `-ADBitVolts`, the volts-per-unit scale
    pub ad_bit_volts: usize,
    /// Line carrying `-AcqEntName`, the channel label
    pub label: usize,
}

pub(crate) const CHEETAH_HEADER_LAYOUT: HeaderLayout = HeaderLayout {
    time_created: 7,
    time_closed: 8,
    frequency: 14,
    ad_bit_volts: 16,
    label: 17,
};

/// Which record fields a decode call materializes.
///
/// Scanning passes that only need the time span of a file use
/// [`FieldSelection::MetadataOnly`] to skip the sample payload entirely;
/// the cost of such a decode is proportional to the record count, not the
/// sample volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSelection {
    /// Timestamps, valid-sample counts, sample payload and header lines
    Full,
    /// Timestamps, valid-sample counts and header lines; payload bytes are
    /// seeked over without being read
    MetadataOnly,
}

/// Which records of a file a decode call covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRange {
    /// Every record in the file
    All,
    /// Records with in-file indices `first..=last` (0-based, inclusive),
    /// clamped to the records actually present. These are positions within
    /// each file, not timestamps.
    Bounded {
        /// Index of the first record to decode
        first: usize,
        /// Index of the last record to decode
        last: usize,
    },
}

/// Decoded contents of one CSC file.
///
/// Record fields are stored column-wise: element `i` of `timestamps` and
/// `valid_samples` and row `i` of `samples` describe the same record.
#[derive(Debug, Clone)]
pub struct CscFileData {
    /// Absolute record timestamps (µs), one per record
    pub timestamps: Vec<u64>,
    /// Valid-sample count per record; a complete record carries 512
    pub valid_samples: Vec<u32>,
    /// Raw AD samples, one row of 512 per record; `None` in metadata-only
    /// decodes
    pub samples: Option<Array2<i16>>,
    /// Header block text split into lines, NUL padding removed
    pub header: Vec<String>,
}

impl CscFileData {
    /// Returns the number of records this decode produced.
    pub fn num_records(&self) -> usize {
        self.timestamps.len()
    }
}

/// Reads one CSC file and returns its decoded contents.
///
/// The file is validated before any record is read: it must be at least one
/// header block long, and the bytes after the header block must divide into
/// whole records. A remainder means the file was torn mid-record, and
/// decoding it would misalign every following record.
///
/// # Arguments
///
/// * `path` - Path to the `.ncs` file
/// * `fields` - Whether to materialize the sample payload
/// * `range` - Which records to decode, counted from the start of the file
///
/// # Returns
///
/// A `Result` containing the decoded [`CscFileData`] or a [`CscError`].
pub fn read_csc_file<P: AsRef<Path>>(
    path: P,
    fields: FieldSelection,
    range: RecordRange,
) -> Result<CscFileData, CscError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::with_capacity(65536, file); // 64KB buffer

    if file_size < HEADER_SIZE as u64 {
        return Err(CscError::FileSize(format!(
            "{}: {} bytes is smaller than the {} byte header block",
            path.display(),
            file_size,
            HEADER_SIZE
        )));
    }

    let record_bytes = file_size - HEADER_SIZE as u64;
    if record_bytes % RECORD_SIZE as u64 != 0 {
        return Err(CscError::FileSize(format!(
            "{}: {} bytes after the header block is not a whole number of {} byte records",
            path.display(),
            record_bytes,
            RECORD_SIZE
        )));
    }
    let records_in_file = (record_bytes / RECORD_SIZE as u64) as usize;

    let header = read_header_block(&mut reader)?;

    let (first, count) = clamp_range(range, records_in_file);
    if first > 0 {
        reader.seek_relative((first * RECORD_SIZE) as i64)?;
    }

    let data = match fields {
        FieldSelection::Full => {
            let (timestamps, valid_samples, samples) = read_records_full(&mut reader, count)?;
            CscFileData {
                timestamps,
                valid_samples,
                samples: Some(samples),
                header,
            }
        }
        FieldSelection::MetadataOnly => {
            let (timestamps, valid_samples) = read_records_metadata(&mut reader, count)?;
            CscFileData {
                timestamps,
                valid_samples,
                samples: None,
                header,
            }
        }
    };

    log::debug!(
        "{}: decoded {} of {} records ({:?})",
        path.display(),
        data.num_records(),
        records_in_file,
        fields
    );

    Ok(data)
}

/// Helper function to clamp a record range to the records a file holds.
///
/// Returns the index of the first record to decode and how many records to
/// decode from there. An empty range (start past end-of-file, or
/// `first > last`) decodes nothing rather than failing: part-files shorter
/// than a requested range are legitimate.
fn clamp_range(range: RecordRange, records_in_file: usize) -> (usize, usize) {
    match range {
        RecordRange::All => (0, records_in_file),
        RecordRange::Bounded { first, last } => {
            if first >= records_in_file || first > last {
                (0, 0)
            } else {
                // Cap `last` before the width arithmetic; an open-ended
                // range like `last: usize::MAX` must not overflow the count
                let last = last.min(records_in_file - 1);
                (first, last - first + 1)
            }
        }
    }
}

/// Helper function to read the fixed-size ASCII header block.
///
/// The block is NUL-padded to `HEADER_SIZE`; the padding is stripped and
/// the remaining text split into lines with line endings removed.
fn read_header_block<R: Read>(reader: &mut R) -> Result<Vec<String>, CscError> {
    let mut block = vec![0u8; HEADER_SIZE];
    reader.read_exact(&mut block)?;

    let text = String::from_utf8_lossy(&block);
    let lines = text
        .trim_end_matches('\0')
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect();

    Ok(lines)
}

/// Helper function to read records with their sample payload.
fn read_records_full<R: Read>(
    reader: &mut R,
    count: usize,
) -> Result<(Vec<u64>, Vec<u32>, Array2<i16>), CscError> {
    let mut timestamps = Vec::with_capacity(count);
    let mut valid_samples = Vec::with_capacity(count);
    let mut samples = Array2::<i16>::zeros((count, SAMPLES_PER_RECORD));
    let mut payload = [0u8; RECORD_PAYLOAD_SIZE];

    for index in 0..count {
        let timestamp = reader.read_u64::<LittleEndian>()?;
        let _channel = reader.read_u32::<LittleEndian>()?;
        let _frequency = reader.read_u32::<LittleEndian>()?;
        let valid = reader.read_u32::<LittleEndian>()?;

        // Read all sample bytes in one operation for better performance
        reader.read_exact(&mut payload)?;

        timestamps.push(timestamp);
        valid_samples.push(valid);

        let mut row = samples.row_mut(index);
        for (slot, chunk) in row.iter_mut().zip(payload.chunks_exact(2)) {
            *slot = i16::from_le_bytes([chunk[0], chunk[1]]);
        }
    }

    Ok((timestamps, valid_samples, samples))
}

/// Helper function to read record timestamps and valid counts only.
///
/// The per-record channel number and sample frequency framing fields sit in
/// the prelude that has to be read anyway; the payload behind them is
/// seeked over, which keeps this path cheap for metadata scans.
fn read_records_metadata<R: Read + Seek>(
    reader: &mut R,
    count: usize,
) -> Result<(Vec<u64>, Vec<u32>), CscError> {
    let mut timestamps = Vec::with_capacity(count);
    let mut valid_samples = Vec::with_capacity(count);

    for _ in 0..count {
        let timestamp = reader.read_u64::<LittleEndian>()?;
        let _channel = reader.read_u32::<LittleEndian>()?;
        let _frequency = reader.read_u32::<LittleEndian>()?;
        let valid = reader.read_u32::<LittleEndian>()?;

        reader.seek_relative(RECORD_PAYLOAD_SIZE as i64)?;

        timestamps.push(timestamp);
        valid_samples.push(valid);
    }

    Ok((timestamps, valid_samples))
}
