// demos/streaming.rs
use ncs_importer::{assemble_streaming, AssembleOptions};
use std::env;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <path_to_recording_directory>", args[0]);
        std::process::exit(1);
    }

    let result = assemble_streaming(
        &args[1],
        &AssembleOptions::default(),
        |signal, header, position| {
            if position == 0 {
                println!("Assembling {} channels...", header.channels.len());
                return;
            }
            // The buffer is reused after this returns, so reduce it here
            let mean_square =
                signal.iter().map(|v| v * v).sum::<f64>() / signal.len().max(1) as f64;
            println!(
                "  Channel {:3}: rms {:.6} V",
                header.channels[position - 1],
                mean_square.sqrt()
            );
        },
    );

    match result {
        Ok(assembly) => {
            println!(
                "\n✓ Assembled {} records over {:.2} seconds",
                assembly.header.records,
                assembly.duration()
            );
        }
        Err(e) => {
            eprintln!("\n✗ Error assembling recording: {}", e);
            std::process::exit(1);
        }
    }
}
