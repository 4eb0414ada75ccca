use ndarray::Array2;
use std::error::Error;
use std::fmt;
use std::io;

use crate::decoder::{SAMPLES_PER_RECORD, TIMESTAMP_RESOLUTION};

/// Metadata extracted from one CSC file's text header.
///
/// Cheetah writes a fixed-layout ASCII header block at the start of every
/// `.ncs` file. The fields gathered here are the ones assembly depends on:
/// the AD conversion scale and sampling frequency feed sample placement, the
/// remaining fields are carried through to [`CscHeader`].
#[derive(Debug, Clone)]
pub struct CscFileHeader {
    /// Acquisition start stamp, as written by the recording software
    pub time_created: String,
    /// Acquisition stop stamp, as written by the recording software
    pub time_closed: String,
    /// Sampling frequency of this file (Hz)
    pub frequency: f64,
    /// Volts per raw AD unit for this file
    pub ad_bit_volts: f64,
    /// Acquisition entity name (e.g. "CSC1")
    pub label: String,
}

/// Aggregate metadata for one assembled recording.
///
/// Per-channel vectors are indexed by output row: element `i` describes the
/// channel stored in row `i` of the assembled matrix. Scalar time stamps
/// reflect the last file processed; `records` and `duration` are running
/// maxima that grow as channels are assembled and are final once assembly
/// returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CscHeader {
    /// Acquisition start stamp from the file headers
    pub time_created: String,
    /// Acquisition stop stamp from the file headers
    pub time_closed: String,
    /// Channel id stored in each output row, in row order
    pub channels: Vec<u32>,
    /// Sampling frequency per channel (Hz)
    pub frequency: Vec<f64>,
    /// Physical unit per channel (always "V")
    pub units: Vec<String>,
    /// Acquisition entity name per channel
    pub labels: Vec<String>,
    /// Volts per raw AD unit per channel
    pub ad_bit_volts: Vec<f64>,
    /// Largest per-channel record count seen during assembly
    pub records: usize,
    /// Longest per-channel duration seen during assembly (seconds, using
    /// that channel's own sampling frequency)
    pub duration: f64,
}

/// Global time span of a channel selection.
///
/// Computed once from a metadata-only pass over every selected part-file and
/// then treated as read-only: the span fixes the output buffer size, and
/// `start_timestamp` anchors every record's sample offset. Both bounds are
/// timestamps of actual records, not rounded values.
#[derive(Debug, Clone, Copy)]
pub struct SignalExtent {
    /// Earliest record timestamp across the selection (µs)
    pub start_timestamp: u64,
    /// Latest record timestamp across the selection (µs)
    pub end_timestamp: u64,
    /// Highest sampling frequency across the selection (Hz)
    pub max_frequency: f64,
}

impl SignalExtent {
    /// Width of one output sample slot in timestamp ticks (µs per sample).
    pub fn sampling_ratio(&self) -> f64 {
        TIMESTAMP_RESOLUTION / self.max_frequency
    }

    /// Number of sample slots the output buffer needs.
    ///
    /// One slot per sampling interval between the first and last record
    /// timestamps, plus the tail of the last record: its timestamp marks the
    /// first of its 512 samples, so a full record length minus one slot
    /// extends past `end_timestamp`.
    pub fn sample_count(&self) -> usize {
        let span = (self.end_timestamp - self.start_timestamp) as f64;
        let spanned_slots = 1 + (span / self.sampling_ratio()).ceil() as usize;
        spanned_slots + (SAMPLES_PER_RECORD - 1)
    }
}

/// Selection options for an assembly call.
///
/// The default selects every discovered channel and decodes every record.
///
/// # Examples
///
/// ```
/// use ncs_importer::AssembleOptions;
///
/// let options = AssembleOptions {
///     channels: Some(vec![1, 2]),
///     ..Default::default()
/// };
/// assert!(options.record_range.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Channel ids to assemble; `None` selects all discovered channels.
    /// Ids that match no file are ignored; channels are always processed in
    /// ascending id order regardless of the order given here.
    pub channels: Option<Vec<u32>>,
    /// Record index range `[first, last]` (0-based, inclusive) applied to
    /// each part-file. Note that these are per-file record indices counted
    /// from the start of each file, not a timestamp window into the
    /// recording.
    pub record_range: Option<[usize; 2]>,
}

/// Complete result of assembling a recording directory.
///
/// # Examples
///
/// ```no_run
/// use ncs_importer::assemble;
///
/// let assembly = assemble("path/to/recording").unwrap();
/// println!(
///     "{} channels x {} samples, {:.1} s",
///     assembly.num_channels(),
///     assembly.num_samples(),
///     assembly.duration()
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CscAssembly {
    /// Assembled signal in volts, one row per selected channel.
    /// Empty in streaming mode, where rows are delivered via the callback.
    pub data: Array2<f64>,
    /// Aggregate metadata for the assembled channels
    pub header: CscHeader,
}

impl CscAssembly {
    /// Returns the number of channel rows in the assembled matrix.
    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }

    /// Returns the number of sample slots per channel row.
    ///
    /// Zero in streaming mode; the callback rows carry the sample dimension
    /// there.
    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Returns the duration of the longest assembled channel in seconds.
    pub fn duration(&self) -> f64 {
        self.header.duration
    }
}

/// Custom error types for the CSC importer.
///
/// Represents the failure conditions of scanning, decoding and assembling a
/// recording. Filename resolution failures are recoverable (the offending
/// file is skipped); everything else aborts the invocation, since assembled
/// output built on a misread header or a torn file would be silently wrong.
#[derive(Debug)]
pub enum CscError {
    /// A filename contains no `-<digits>` channel id segment
    NoChannelId(String),
    /// An expected header line was missing or did not match its field pattern
    HeaderParse(String),
    /// The file size does not line up with the header block plus whole records
    FileSize(String),
    /// An I/O error occurred during file reading
    Io(io::Error),
}

impl fmt::Display for CscError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CscError::NoChannelId(name) => {
                write!(f, "no channel id in filename: {}", name)
            }
            CscError::HeaderParse(detail) => write!(f, "header parse error: {}", detail),
            CscError::FileSize(detail) => write!(f, "file size error: {}", detail),
            CscError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl Error for CscError {}

impl From<io::Error> for CscError {
    fn from(error: io::Error) -> Self {
        CscError::Io(error)
    }
}
