//! Shared helpers for building synthetic CSC recordings on disk.
#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use ncs_importer::{HEADER_SIZE, SAMPLES_PER_RECORD};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// One record to write, with every sample set to `fill`.
pub struct Record {
    pub timestamp: u64,
    pub valid: u32,
    pub fill: i16,
}

impl Record {
    /// A complete record carrying 512 valid samples.
    pub fn full(timestamp: u64, fill: i16) -> Self {
        Record {
            timestamp,
            valid: SAMPLES_PER_RECORD as u32,
            fill,
        }
    }

    /// A record closed early with fewer than 512 valid samples.
    pub fn partial(timestamp: u64, valid: u32, fill: i16) -> Self {
        Record {
            timestamp,
            valid,
            fill,
        }
    }
}

/// Writes a CSC file with the standard Cheetah header template.
pub fn write_ncs(
    path: &Path,
    frequency: u32,
    ad_bit_volts: &str,
    label: &str,
    records: &[Record],
) -> io::Result<()> {
    write_ncs_with_times(
        path,
        frequency,
        ad_bit_volts,
        label,
        "2011/06/02 11:30:00",
        "2011/06/02 12:30:00",
        records,
    )
}

/// Writes a CSC file with explicit creation and close stamps.
///
/// The header template mirrors the fixed line layout the importer consumes:
/// creation and close stamps on lines 8 and 9, sampling frequency on line
/// 15, AD scale on line 17 and the channel label on line 18 (1-based).
pub fn write_ncs_with_times(
    path: &Path,
    frequency: u32,
    ad_bit_volts: &str,
    label: &str,
    time_created: &str,
    time_closed: &str,
    records: &[Record],
) -> io::Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text = format!(
        "######## Neuralynx Data File Header\r\n\
         ## File Name: {name}\r\n\
         ## Time Opened: (m/d/y)\r\n\
         -FileType CSC\r\n\
         -FileVersion 3.2.0\r\n\
         -RecordSize 1044\r\n\
         -CheetahRev 5.6.3\r\n\
         -TimeCreated {time_created}\r\n\
         -TimeClosed {time_closed}\r\n\
         -HardwareSubSystemName AcqSystem1\r\n\
         -HardwareSubSystemType DigitalLynxSX\r\n\
         -ApplicationName Cheetah\r\n\
         -AcquisitionSystem AcqSystem1 DigitalLynxSX\r\n\
         -ReferenceChannel Source 01 Reference 0\r\n\
         -SamplingFrequency {frequency}\r\n\
         -ADMaxValue 32767\r\n\
         -ADBitVolts {ad_bit_volts}\r\n\
         -AcqEntName {label}\r\n"
    );

    let mut block = text.into_bytes();
    assert!(block.len() <= HEADER_SIZE);
    block.resize(HEADER_SIZE, 0);

    let mut file = File::create(path)?;
    file.write_all(&block)?;

    for record in records {
        file.write_u64::<LittleEndian>(record.timestamp)?;
        file.write_u32::<LittleEndian>(1)?;
        file.write_u32::<LittleEndian>(frequency)?;
        file.write_u32::<LittleEndian>(record.valid)?;
        for _ in 0..SAMPLES_PER_RECORD {
            file.write_i16::<LittleEndian>(record.fill)?;
        }
    }

    Ok(())
}
