//! CSC assembly module.
//!
//! This module turns a directory of fragmented CSC part-files into
//! continuous per-channel signals on a common time axis. Part-files are
//! grouped by the channel id in their filename, a metadata-only pass
//! establishes the shared extent, and a second pass places every complete
//! record at the buffer position its timestamp dictates.

use glob::{glob, Pattern};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayViewMut1};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::decoder::{
    self, CscFileData, FieldSelection, RecordRange, CHEETAH_HEADER_LAYOUT, SAMPLES_PER_RECORD,
};
use crate::types::{AssembleOptions, CscAssembly, CscError, CscFileHeader, CscHeader, SignalExtent};

/// Unit of the assembled samples after AD scaling
const SIGNAL_UNITS: &str = "V";

/// Sink invoked once per assembled channel in streaming mode
pub(crate) type ChannelSink<'a> = &'a mut dyn FnMut(ArrayView1<'_, f64>, &CscHeader, usize);

/// Assembles the recording at `path` into per-channel signals.
///
/// With `on_channel` set, each channel's signal is handed to the sink right
/// after assembly and its buffer is reused for the next channel; the
/// returned assembly then carries an empty matrix. Without a sink, all
/// channels are collected into one channels-by-samples matrix.
pub(crate) fn assemble_impl(
    path: &Path,
    options: &AssembleOptions,
    mut on_channel: Option<ChannelSink<'_>>,
) -> Result<CscAssembly, CscError> {
    let (dir, files) = discover_files(path)?;
    log::info!("Scanning {} for CSC part-files", dir.display());

    if files.is_empty() {
        log::warn!("No CSC files found in {}", dir.display());
        return Ok(empty_assembly());
    }

    let groups = resolve_channels(&files);
    let selected = select_channels(&groups, options.channels.as_deref());
    if selected.is_empty() {
        log::warn!("No matching channels to assemble in {}", dir.display());
        return Ok(empty_assembly());
    }
    log::info!(
        "Found {} channels across {} part-files",
        selected.len(),
        files.len()
    );

    let range = to_record_range(options);
    let (extent, mut header) = resolve_extent(&selected, range)?;
    let Some(extent) = extent else {
        // Headers without any records resolve no extent; there is nothing
        // to place, but the channel metadata is still worth returning.
        return Ok(CscAssembly {
            data: Array2::zeros((0, 0)),
            header,
        });
    };

    let sampling_ratio = extent.sampling_ratio();
    let num_samples = extent.sample_count();
    log::info!(
        "Signal extent {} to {} µs at up to {} Hz: {} sample slots per channel",
        extent.start_timestamp,
        extent.end_timestamp,
        extent.max_frequency,
        num_samples
    );

    let streaming = on_channel.is_some();
    let mut matrix = if streaming {
        Array2::<f64>::zeros((0, 0))
    } else {
        Array2::<f64>::zeros((selected.len(), num_samples))
    };
    let mut scratch = if streaming {
        Array1::<f64>::zeros(num_samples)
    } else {
        Array1::<f64>::zeros(0)
    };

    if let Some(sink) = on_channel.as_mut() {
        // Position 0 announces the run before any channel is assembled
        let empty = Array1::<f64>::zeros(0);
        sink(empty.view(), &header, 0);
    }

    for (position, (channel, paths)) in selected.iter().enumerate() {
        log::info!(
            "Assembling channel {} ({}/{})",
            channel,
            position + 1,
            selected.len()
        );
        let ad_bit_volts = header.ad_bit_volts[position];
        let own_frequency = header.frequency[position];
        let mut channel_records = 0;
        let mut dropped = 0;

        {
            let mut row = if streaming {
                scratch.view_mut()
            } else {
                matrix.row_mut(position)
            };
            for path in paths {
                let decoded = decoder::read_csc_file(path, FieldSelection::Full, range)?;
                channel_records += decoded.num_records();
                dropped += place_records(
                    &mut row,
                    &decoded,
                    extent.start_timestamp,
                    sampling_ratio,
                    ad_bit_volts,
                );
            }
        }
        if dropped > 0 {
            log::debug!("Channel {}: dropped {} incomplete records", channel, dropped);
        }

        header.records = header.records.max(channel_records);
        if own_frequency > 0.0 {
            let channel_duration = (channel_records * SAMPLES_PER_RECORD) as f64 / own_frequency;
            header.duration = header.duration.max(channel_duration);
        }

        if let Some(sink) = on_channel.as_mut() {
            sink(scratch.view(), &header, position + 1);
            scratch.fill(0.0);
        }
    }

    Ok(CscAssembly {
        data: matrix,
        header,
    })
}

/// Helper function to build an assembly carrying no channels.
fn empty_assembly() -> CscAssembly {
    CscAssembly {
        data: Array2::zeros((0, 0)),
        header: CscHeader::default(),
    }
}

/// Helper function to map option fields onto a decoder record range.
fn to_record_range(options: &AssembleOptions) -> RecordRange {
    match options.record_range {
        Some([first, last]) => RecordRange::Bounded { first, last },
        None => RecordRange::All,
    }
}

/// Helper function to locate the CSC part-files for a recording.
///
/// A directory is scanned directly; a file path stands for the recording
/// its directory holds, so sibling part-files are picked up as well. The
/// glob result is sorted, which keeps part-file order stable across runs.
fn discover_files(path: &Path) -> Result<(PathBuf, Vec<PathBuf>), CscError> {
    let dir = if path.is_dir() {
        path.to_path_buf()
    } else if path.is_file() {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    } else {
        return Err(CscError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    };

    // The directory name is literal text, not pattern syntax
    let escaped = Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&escaped).join("*.ncs");
    let entries = glob(&pattern.to_string_lossy()).map_err(|e| {
        CscError::Io(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(candidate) if candidate.is_file() => files.push(candidate),
            Ok(_) => {}
            Err(e) => log::warn!("Skipping unreadable entry: {}", e),
        }
    }

    Ok((dir, files))
}

/// Helper function to group part-files by the channel id in their filename.
///
/// Files whose names carry no channel id are skipped with a warning rather
/// than failing the run; recording directories routinely hold unrelated
/// files next to the CSC data.
fn resolve_channels(files: &[PathBuf]) -> BTreeMap<u32, Vec<PathBuf>> {
    let pattern = Regex::new(r"-(\d+)").expect("channel id pattern");
    let mut groups: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();

    for path in files {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        match channel_id_for(&name, &pattern) {
            Ok(channel) => groups.entry(channel).or_default().push(path.clone()),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    groups
}

/// Helper function to resolve the channel id encoded in a filename.
///
/// The id is the last run of digits preceded by a `-`, so suffixes like a
/// part number take precedence over the base channel number, matching how
/// the acquisition software names continuation files.
fn channel_id_for(name: &str, pattern: &Regex) -> Result<u32, CscError> {
    let captures = pattern
        .captures_iter(name)
        .last()
        .ok_or_else(|| CscError::NoChannelId(name.to_string()))?;
    captures[1]
        .parse::<u32>()
        .map_err(|_| CscError::NoChannelId(name.to_string()))
}

/// Helper function to intersect the grouped channels with a selection.
///
/// Channels come back in ascending id order; requested ids with no files
/// are silently absent from the result.
fn select_channels(
    groups: &BTreeMap<u32, Vec<PathBuf>>,
    requested: Option<&[u32]>,
) -> Vec<(u32, Vec<PathBuf>)> {
    match requested {
        None => groups
            .iter()
            .map(|(&channel, files)| (channel, files.clone()))
            .collect(),
        Some(ids) => {
            let wanted: BTreeSet<u32> = ids.iter().copied().collect();
            groups
                .iter()
                .filter(|(channel, _)| wanted.contains(*channel))
                .map(|(&channel, files)| (channel, files.clone()))
                .collect()
        }
    }
}

/// Helper function to scan every selected part-file's metadata.
///
/// Decodes each file without its sample payload, folds record timestamps
/// into the shared extent and collects per-channel header metadata. The
/// last part-file of a channel provides that channel's header fields, and
/// the last file overall provides the recording's creation and close
/// stamps. `records` and `duration` are left at zero; they are aggregated
/// while samples are placed.
fn resolve_extent(
    selected: &[(u32, Vec<PathBuf>)],
    range: RecordRange,
) -> Result<(Option<SignalExtent>, CscHeader), CscError> {
    let mut start_timestamp = u64::MAX;
    let mut end_timestamp = 0u64;
    let mut max_frequency = 0.0f64;
    let mut saw_records = false;
    let mut header = CscHeader::default();
    let patterns = HeaderPatterns::new();

    for (channel, paths) in selected {
        let mut channel_header: Option<CscFileHeader> = None;

        for path in paths {
            let decoded = decoder::read_csc_file(path, FieldSelection::MetadataOnly, range)?;
            let file_header = extract_file_header(&decoded.header, &patterns, path)?;

            if let (Some(&first), Some(&last)) =
                (decoded.timestamps.first(), decoded.timestamps.last())
            {
                start_timestamp = start_timestamp.min(first);
                end_timestamp = end_timestamp.max(last);
                saw_records = true;
            }
            max_frequency = max_frequency.max(file_header.frequency);

            header.time_created = file_header.time_created.clone();
            header.time_closed = file_header.time_closed.clone();
            channel_header = Some(file_header);
        }

        // Grouping guarantees at least one file per selected channel
        if let Some(file_header) = channel_header {
            header.channels.push(*channel);
            header.frequency.push(file_header.frequency);
            header.units.push(SIGNAL_UNITS.to_string());
            header.labels.push(file_header.label);
            header.ad_bit_volts.push(file_header.ad_bit_volts);
        }
    }

    let extent = if saw_records {
        Some(SignalExtent {
            start_timestamp,
            end_timestamp,
            max_frequency,
        })
    } else {
        None
    };

    Ok((extent, header))
}

/// Compiled matchers for the header fields, one per extracted line.
///
/// Built once per run and shared across every part-file's header, like the
/// channel id pattern.
struct HeaderPatterns {
    time_created: Regex,
    time_closed: Regex,
    frequency: Regex,
    ad_bit_volts: Regex,
    label: Regex,
}

impl HeaderPatterns {
    fn new() -> Self {
        HeaderPatterns {
            time_created: Regex::new(r"^-TimeCreated\s+(.+?)\s*$").expect("header field pattern"),
            time_closed: Regex::new(r"^-TimeClosed\s+(.+?)\s*$").expect("header field pattern"),
            frequency: Regex::new(r"^-SamplingFrequency\s+([0-9.]+)\s*$")
                .expect("header field pattern"),
            ad_bit_volts: Regex::new(r"^-ADBitVolts\s+([0-9.eE+-]+)\s*$")
                .expect("header field pattern"),
            label: Regex::new(r"^-AcqEntName\s+(\S+)\s*$").expect("header field pattern"),
        }
    }
}

/// Helper function to extract the metadata fields from a header block.
///
/// Field positions are fixed by the acquisition software's header template;
/// a line that is missing or does not carry the expected field is a fatal
/// parse error, since placement cannot proceed on guessed metadata.
fn extract_file_header(
    lines: &[String],
    patterns: &HeaderPatterns,
    source: &Path,
) -> Result<CscFileHeader, CscError> {
    let layout = &CHEETAH_HEADER_LAYOUT;

    let time_created = header_field(lines, layout.time_created, &patterns.time_created, source)?;
    let time_closed = header_field(lines, layout.time_closed, &patterns.time_closed, source)?;
    let frequency = header_field(lines, layout.frequency, &patterns.frequency, source)?;
    let ad_bit_volts = header_field(lines, layout.ad_bit_volts, &patterns.ad_bit_volts, source)?;
    let label = header_field(lines, layout.label, &patterns.label, source)?;

    Ok(CscFileHeader {
        time_created,
        time_closed,
        frequency: parse_header_number(&frequency, "sampling frequency", source)?,
        ad_bit_volts: parse_header_number(&ad_bit_volts, "AD scale", source)?,
        label,
    })
}

/// Helper function to extract one header field by fixed line position.
fn header_field(
    lines: &[String],
    index: usize,
    matcher: &Regex,
    source: &Path,
) -> Result<String, CscError> {
    let line = lines.get(index).ok_or_else(|| {
        CscError::HeaderParse(format!(
            "{}: header line {} is missing",
            source.display(),
            index + 1
        ))
    })?;
    let captures = matcher.captures(line).ok_or_else(|| {
        CscError::HeaderParse(format!(
            "{}: header line {} ({:?}) does not match {}",
            source.display(),
            index + 1,
            line,
            matcher
        ))
    })?;
    Ok(captures[1].to_string())
}

/// Helper function to parse a numeric header value.
fn parse_header_number(value: &str, what: &str, source: &Path) -> Result<f64, CscError> {
    value.parse::<f64>().map_err(|_| {
        CscError::HeaderParse(format!(
            "{}: {} {:?} is not a number",
            source.display(),
            what,
            value
        ))
    })
}

/// Helper function to write one file's records into a channel signal.
///
/// Each complete record lands at the position its timestamp dictates on the
/// shared axis, scaled to volts; records carrying fewer than 512 valid
/// samples are dropped entirely. Overlapping records overwrite whatever an
/// earlier record put at the same positions. Returns how many records were
/// dropped.
fn place_records(
    row: &mut ArrayViewMut1<'_, f64>,
    decoded: &CscFileData,
    start_timestamp: u64,
    sampling_ratio: f64,
    ad_bit_volts: f64,
) -> usize {
    let Some(samples) = decoded.samples.as_ref() else {
        return 0;
    };

    let mut dropped = 0;
    for (index, (&timestamp, &valid)) in decoded
        .timestamps
        .iter()
        .zip(&decoded.valid_samples)
        .enumerate()
    {
        if valid as usize != SAMPLES_PER_RECORD {
            dropped += 1;
            continue;
        }

        let offset = ((timestamp - start_timestamp) as f64 / sampling_ratio).round() as usize;
        let mut slot = row.slice_mut(s![offset..offset + SAMPLES_PER_RECORD]);
        for (target, &raw) in slot.iter_mut().zip(samples.row(index)) {
            *target = raw as f64 * ad_bit_volts;
        }
    }

    dropped
}
