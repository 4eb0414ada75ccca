// demos/inspect.rs
use ncs_importer::assemble;
use std::env;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <path_to_recording_directory>", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    println!("Assembling from: {}", path);

    match assemble(path) {
        Ok(assembly) => {
            println!("\n✓ Successfully assembled!");
            println!("  Channels: {}", assembly.num_channels());
            println!("  Samples per channel: {}", assembly.num_samples());
            println!("  Records: {}", assembly.header.records);
            println!("  Duration: {:.2} seconds", assembly.duration());

            println!("\n  Channel map:");
            for (i, channel) in assembly.header.channels.iter().enumerate() {
                println!(
                    "    {}: channel {} ({}) at {} Hz",
                    i + 1,
                    channel,
                    assembly.header.labels[i],
                    assembly.header.frequency[i]
                );
            }
        }
        Err(e) => {
            eprintln!("\n✗ Error assembling recording: {}", e);
            std::process::exit(1);
        }
    }
}
