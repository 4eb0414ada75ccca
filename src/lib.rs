mod assembler;
pub mod decoder;
pub mod types;

use std::error::Error;
use std::path::Path;

use ndarray::ArrayView1;

pub use decoder::{
    FieldSelection, RecordRange, HEADER_SIZE, RECORD_SIZE, SAMPLES_PER_RECORD,
    TIMESTAMP_RESOLUTION,
};

// Re-export types
pub use types::*;

/// Assembles a CSC recording and returns every channel in one matrix
///
/// All `.ncs` part-files in the directory (or next to the given file) are
/// grouped by channel and reassembled onto a common time axis; gaps stay
/// zero-filled. Row order matches `header.channels`.
///
/// # Examples
///
/// ```no_run
/// use ncs_importer::assemble;
///
/// let result = assemble("path/to/recording");
/// match result {
///     Ok(assembly) => println!(
///         "{} channels x {} samples",
///         assembly.num_channels(),
///         assembly.num_samples()
///     ),
///     Err(e) => println!("Error assembling recording: {}", e),
/// }
/// ```
pub fn assemble<P: AsRef<Path>>(path: P) -> Result<CscAssembly, Box<dyn Error>> {
    Ok(assembler::assemble_impl(
        path.as_ref(),
        &AssembleOptions::default(),
        None,
    )?)
}

/// Assembles a CSC recording restricted by the given options
///
/// # Examples
///
/// ```no_run
/// use ncs_importer::{assemble_with, AssembleOptions};
///
/// let options = AssembleOptions {
///     channels: Some(vec![1, 2, 3]),
///     ..Default::default()
/// };
/// let assembly = assemble_with("path/to/recording", &options)?;
/// println!("Assembled {} channels", assembly.num_channels());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn assemble_with<P: AsRef<Path>>(
    path: P,
    options: &AssembleOptions,
) -> Result<CscAssembly, Box<dyn Error>> {
    Ok(assembler::assemble_impl(path.as_ref(), options, None)?)
}

/// Assembles a CSC recording one channel at a time
///
/// Instead of collecting all channels into one matrix, each channel's
/// signal is handed to `on_channel` as soon as it is assembled, so peak
/// memory stays at one channel regardless of how many the recording holds.
/// The callback runs once with an empty buffer and position `0` before any
/// channel is assembled, then once per channel with positions counted from
/// `1`. The buffer is reused between calls; copy out whatever must outlive
/// the callback. The returned assembly carries the header but an empty
/// matrix.
///
/// # Examples
///
/// ```no_run
/// use ncs_importer::{assemble_streaming, AssembleOptions};
///
/// assemble_streaming("path/to/recording", &AssembleOptions::default(), |signal, header, position| {
///     if position == 0 {
///         println!("Assembling {} channels", header.channels.len());
///     } else {
///         let peak = signal.iter().cloned().fold(0.0f64, f64::max);
///         println!("Channel {}: peak {} V", header.channels[position - 1], peak);
///     }
/// })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn assemble_streaming<P, F>(
    path: P,
    options: &AssembleOptions,
    mut on_channel: F,
) -> Result<CscAssembly, Box<dyn Error>>
where
    P: AsRef<Path>,
    F: FnMut(ArrayView1<'_, f64>, &CscHeader, usize),
{
    Ok(assembler::assemble_impl(
        path.as_ref(),
        options,
        Some(&mut on_channel),
    )?)
}
