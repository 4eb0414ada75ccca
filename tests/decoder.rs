//! File-level decoder tests against synthetic CSC files.

mod common;

use common::{write_ncs, Record};
use ncs_importer::decoder::{read_csc_file, FieldSelection, RecordRange};
use ncs_importer::{CscError, HEADER_SIZE, RECORD_SIZE, SAMPLES_PER_RECORD};
use std::fs::OpenOptions;
use tempfile::tempdir;

#[test]
fn full_and_metadata_decodes_agree_on_record_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-1.ncs");
    write_ncs(
        &path,
        32000,
        "0.000000030518",
        "CSC1",
        &[
            Record::full(1_000_000, 5),
            Record::partial(1_016_000, 100, 6),
            Record::full(1_032_000, 7),
        ],
    )
    .unwrap();

    let full = read_csc_file(&path, FieldSelection::Full, RecordRange::All).unwrap();
    let meta = read_csc_file(&path, FieldSelection::MetadataOnly, RecordRange::All).unwrap();

    assert_eq!(full.timestamps, vec![1_000_000, 1_016_000, 1_032_000]);
    assert_eq!(full.valid_samples, vec![512, 100, 512]);
    assert_eq!(meta.timestamps, full.timestamps);
    assert_eq!(meta.valid_samples, full.valid_samples);
    assert_eq!(meta.header, full.header);
    assert!(meta.samples.is_none());

    let samples = full.samples.unwrap();
    assert_eq!(samples.shape(), &[3, SAMPLES_PER_RECORD]);
    assert_eq!(samples[[0, 0]], 5);
    assert_eq!(samples[[1, 255]], 6);
    assert_eq!(samples[[2, 511]], 7);
}

#[test]
fn header_fields_sit_on_their_template_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-3.ncs");
    write_ncs(&path, 4000, "0.25", "LFP3", &[Record::full(500, 1)]).unwrap();

    let decoded = read_csc_file(&path, FieldSelection::MetadataOnly, RecordRange::All).unwrap();
    let header = &decoded.header;
    assert!(header[0].starts_with("######## Neuralynx"));
    assert_eq!(header[7], "-TimeCreated 2011/06/02 11:30:00");
    assert_eq!(header[8], "-TimeClosed 2011/06/02 12:30:00");
    assert_eq!(header[14], "-SamplingFrequency 4000");
    assert_eq!(header[16], "-ADBitVolts 0.25");
    assert_eq!(header[17], "-AcqEntName LFP3");
}

#[test]
fn record_range_selects_by_file_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-1.ncs");
    let records: Vec<Record> = (0..5)
        .map(|k| Record::full(1_000_000 + k as u64 * 16_000, k))
        .collect();
    write_ncs(&path, 32000, "1.0", "CSC1", &records).unwrap();

    let range = RecordRange::Bounded { first: 1, last: 3 };
    let full = read_csc_file(&path, FieldSelection::Full, range).unwrap();
    let meta = read_csc_file(&path, FieldSelection::MetadataOnly, range).unwrap();

    assert_eq!(full.timestamps, vec![1_016_000, 1_032_000, 1_048_000]);
    assert_eq!(meta.timestamps, full.timestamps);

    let samples = full.samples.unwrap();
    assert_eq!(samples.shape(), &[3, SAMPLES_PER_RECORD]);
    assert_eq!(samples[[0, 0]], 1);
    assert_eq!(samples[[2, 0]], 3);
}

#[test]
fn record_range_clamps_to_available_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-1.ncs");
    let records: Vec<Record> = (0..5)
        .map(|k| Record::full(k as u64 * 16_000, k))
        .collect();
    write_ncs(&path, 32000, "1.0", "CSC1", &records).unwrap();

    let clamped = read_csc_file(
        &path,
        FieldSelection::Full,
        RecordRange::Bounded { first: 3, last: 99 },
    )
    .unwrap();
    assert_eq!(clamped.timestamps, vec![48_000, 64_000]);

    let empty = read_csc_file(
        &path,
        FieldSelection::Full,
        RecordRange::Bounded { first: 7, last: 9 },
    )
    .unwrap();
    assert_eq!(empty.num_records(), 0);
    assert_eq!(empty.samples.unwrap().shape(), &[0, SAMPLES_PER_RECORD]);
}

#[test]
fn record_range_open_ended_last_reads_to_end_of_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-1.ncs");
    write_ncs(
        &path,
        32000,
        "1.0",
        "CSC1",
        &[Record::full(0, 1), Record::full(16_000, 2)],
    )
    .unwrap();

    let data = read_csc_file(
        &path,
        FieldSelection::Full,
        RecordRange::Bounded {
            first: 0,
            last: usize::MAX,
        },
    )
    .unwrap();
    assert_eq!(data.timestamps, vec![0, 16_000]);
    assert_eq!(data.samples.unwrap().shape(), &[2, SAMPLES_PER_RECORD]);
}

#[test]
fn torn_record_tail_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-1.ncs");
    write_ncs(
        &path,
        32000,
        "1.0",
        "CSC1",
        &[Record::full(0, 1), Record::full(16_000, 2)],
    )
    .unwrap();

    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len((HEADER_SIZE + RECORD_SIZE + 12) as u64)
        .unwrap();

    let result = read_csc_file(&path, FieldSelection::Full, RecordRange::All);
    assert!(matches!(result, Err(CscError::FileSize(_))));
}

#[test]
fn short_header_block_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-1.ncs");
    write_ncs(&path, 32000, "1.0", "CSC1", &[]).unwrap();

    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(100)
        .unwrap();

    let result = read_csc_file(&path, FieldSelection::MetadataOnly, RecordRange::All);
    assert!(matches!(result, Err(CscError::FileSize(_))));
}

#[test]
fn header_only_file_decodes_zero_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-9.ncs");
    write_ncs(&path, 32000, "1.0", "CSC9", &[]).unwrap();

    let decoded = read_csc_file(&path, FieldSelection::Full, RecordRange::All).unwrap();
    assert_eq!(decoded.num_records(), 0);
    assert!(!decoded.header.is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CSC-404.ncs");

    let result = read_csc_file(&path, FieldSelection::Full, RecordRange::All);
    assert!(matches!(result, Err(CscError::Io(_))));
}
