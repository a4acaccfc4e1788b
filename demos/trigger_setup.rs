// Trigger configuration example
//
// Configures an edge trigger, then a runt trigger with a threshold window,
// and reads both back.

use benchscope_rs::{
    PulseClass, ScopeConnector, ScopeError, TektronixScope, TriggerSlope, TriggerSource,
    TriggerType, VisaResourceManager,
};
use clap::Parser;

#[derive(Parser)]
#[command(name = "trigger_setup")]
#[command(about = "Edge and runt trigger setup on a Tektronix TBS1000 oscilloscope")]
struct Args {
    /// Resource identifier or serial number of the instrument
    resource: Option<String>,

    /// Edge trigger level in volts
    #[arg(short, long, default_value_t = 0.5)]
    level: f64,

    /// Runt window as two levels in volts, in any order
    #[arg(short, long, num_args = 2, default_values_t = [0.3, 1.5])]
    window: Vec<f64>,

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

    println!("1. Edge trigger on CH1, rising, {} V", args.level);
    scope.set_trig_type(TriggerType::Edge)?;
    scope.set_trig_source(TriggerSource::Ch1)?;
    scope.set_trig_slope(TriggerSlope::Rising)?;
    scope.channel(1)?.set_trig_lvl(&[args.level])?;
    println!("   level reads back as {}", scope.channel(1)?.trig_lvl()?);

    println!("\n2. Runt trigger on CH1");
    match set_runt(&mut scope, &args.window) {
        Ok(()) => println!("   window reads back as {}", scope.channel(1)?.trig_lvl()?),
        Err(ScopeError::Capability(e)) => println!("   not available: {e}"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn set_runt(scope: &mut TektronixScope, window: &[f64]) -> Result<(), ScopeError> {
    scope.set_trig_type(TriggerType::Pulse)?;
    scope.set_trig_pulse_class(PulseClass::Runt)?;
    scope.set_trigger_time_width(1e-6)?;
    scope.channel(1)?.set_trig_lvl(window)
}
