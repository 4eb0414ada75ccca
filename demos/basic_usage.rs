use ncs_importer::assemble;
use ndarray::s;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Assemble every channel of the recording
    let assembly = assemble("data/recording")?;

    // Print basic recording information
    println!("Recording created: {}", assembly.header.time_created);
    println!("Recording closed: {}", assembly.header.time_closed);
    println!("Records per channel: {}", assembly.header.records);
    println!("Duration: {:.3} seconds", assembly.duration());

    // Print channel information
    println!("\nNumber of channels: {}", assembly.num_channels());
    for (i, channel) in assembly.header.channels.iter().enumerate().take(5) {
        println!(
            "  {}: {} at {} Hz, {} {} per unit",
            channel,
            assembly.header.labels[i],
            assembly.header.frequency[i],
            assembly.header.ad_bit_volts[i],
            assembly.header.units[i]
        );
    }

    if assembly.header.channels.len() > 5 {
        println!("  ... and {} more", assembly.header.channels.len() - 5);
    }

    // Show first few samples of the first channel
    if assembly.num_channels() > 0 && assembly.num_samples() > 0 {
        let channel_data = assembly.data.slice(s![0, ..]);
        let num_samples = std::cmp::min(5, channel_data.len());

        println!("\nFirst channel data (first {} samples):", num_samples);
        for i in 0..num_samples {
            println!("  {}: {:.9} V", i, channel_data[i]);
        }
    }

    Ok(())
}
