// Waveform acquisition example
//
// Takes a single-shot acquisition on both channels of a Tektronix scope and
// prints a short summary of each record.

use benchscope_rs::waveform::{TIME_COLUMN_NAME, VALUE_COLUMN_NAME};
use benchscope_rs::{AcquisitionMode, ScopeConnector, TektronixScope, VisaResourceManager};
use clap::Parser;
use polars::prelude::DataFrame;

#[derive(Parser)]
#[command(name = "data_acquisition")]
#[command(about = "Single-shot acquisition from a Tektronix TBS1000 oscilloscope")]
struct Args {
    /// Resource identifier or serial number of the instrument
    resource: Option<String>,

    /// Horizontal scale in seconds per division
    #[arg(short = 's', long, default_value_t = 1e-3)]
    horizontal_scale: f64,

    /// Use peak detect instead of sample mode
    #[arg(short, long)]
    peak_detect: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let connector = ScopeConnector::new(Box::new(VisaResourceManager::new()?));
    let mut scope = TektronixScope::open(&connector, args.resource.as_deref())?;
    println!("Connected to {}\n", scope.device_model()?);

    let mode = if args.peak_detect {
        AcquisitionMode::PeakDetect
    } else {
        AcquisitionMode::Sample
    };
    scope.set_acquisition_mode(mode)?;
    scope.set_horizontal_scale(args.horizontal_scale)?;
    println!(
        "Acquiring in {:?} mode at {:.0} S/s",
        mode,
        scope.sample_rate()?
    );

    scope.single()?;
    scope.run()?;

    for index in TektronixScope::CHANNELS {
        let mut channel = scope.channel(index)?;
        let frame = channel.fetch_frame()?;
        if frame.height() == 0 {
            println!("CH{index}: disabled");
            continue;
        }
        println!("CH{index}: {} samples", frame.height());
        print_data_summary(&frame)?;
    }

    scope.continuous()?;
    Ok(())
}

// Helper function to print basic statistics about acquired data
fn print_data_summary(data: &DataFrame) -> Result<(), Box<dyn std::error::Error>> {
    let time: Vec<f64> = data
        .column(TIME_COLUMN_NAME)?
        .f64()?
        .into_no_null_iter()
        .collect();
    let values: Vec<f64> = data
        .column(VALUE_COLUMN_NAME)?
        .f64()?
        .into_no_null_iter()
        .collect();

    if let (Some(start), Some(end)) = (time.first(), time.last()) {
        println!("   Time span: {start:.6}s to {end:.6}s");
    }
    if !values.is_empty() {
        let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        println!("   Data range: {min:.3}V to {max:.3}V (mean: {mean:.3}V)");
    }
    Ok(())
}
