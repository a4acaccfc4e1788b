// Keysight FFT example
//
// Reads the instrument's FFT of one channel together with its frequency axis
// and saves a screenshot.

use std::fs;
use std::path::PathBuf;

use benchscope_rs::{FftUnit, FftWindow, KeysightScope, ScopeConnector, VisaResourceManager};
use clap::Parser;

#[derive(Parser)]
#[command(name = "keysight_fft")]
#[command(about = "FFT and screenshot from a Keysight DSOX1102A")]
struct Args {
    /// Resource identifier or serial number of the instrument
    resource: Option<String>,

    /// Channel to analyse
    #[arg(short, long, default_value_t = 1)]
    channel: u8,

    /// Center frequency in Hz
    #[arg(long, default_value_t = 5e3)]
    center: f64,

    /// Frequency span in Hz
    #[arg(long, default_value_t = 10e3)]
    span: f64,

    /// Where to write the screenshot
    #[arg(short, long, default_value = "screenshot.png")]
    output: PathBuf,

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
    let mut scope = KeysightScope::open(&connector, args.resource.as_deref())?;
    println!("Connected to {}", scope.device_model()?);

    scope.set_fft_window(FftWindow::Hanning)?;
    scope.set_fft_ordinate_unit(FftUnit::Decibel)?;
    scope.set_fft_center_freq(args.center)?;
    scope.set_fft_span_freq(args.span)?;

    let mut channel = scope.channel(args.channel)?;
    let spectrum = channel.fft()?;
    let freqs = channel.frequency_vector()?;

    let peak = spectrum
        .y
        .iter()
        .zip(&freqs)
        .max_by(|a, b| a.0.total_cmp(b.0));
    match peak {
        Some((level, freq)) => println!("Peak of {level:.1} dBV at {freq:.0} Hz"),
        None => println!("Empty spectrum"),
    }

    scope.set_white_image_bg(true)?;
    let png = scope.screenshot()?;
    let mut output = args.output;
    if output.extension().is_none() {
        output.set_extension("png");
    }
    fs::write(&output, png)?;
    println!("Screenshot written to {}", output.display());

    Ok(())
}
