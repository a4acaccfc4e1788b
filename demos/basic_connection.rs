// Device discovery and connection example
//
// Lists every Tektronix and Keysight oscilloscope on the bus, then opens the
// first Tektronix instrument found (or the one named on the command line).

use benchscope_rs::{
    Keysight, ScopeConnector, Tektronix, TektronixScope, VisaResourceManager,
};
use clap::Parser;

#[derive(Parser)]
#[command(name = "basic_connection")]
#[command(about = "Discover oscilloscopes and open a session")]
struct Args {
    /// Resource identifier or serial number of the instrument to open
    resource: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and every SCPI exchange")]
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

    println!("Oscilloscope Discovery Example");
    println!("==============================\n");

    let connector = ScopeConnector::new(Box::new(VisaResourceManager::new()?));

    println!("1. Discovering instruments...");
    let tektronix = connector.list_connected::<Tektronix>()?;
    let keysight = connector.list_connected::<Keysight>()?;
    for scope in tektronix.iter().chain(&keysight) {
        println!("   {} at {}", scope.identity, scope.resource);
    }
    if tektronix.is_empty() {
        println!("No Tektronix oscilloscope found. Please connect a device and try again.");
        return Ok(());
    }

    println!("\n2. Connecting...");
    let mut scope = TektronixScope::open(&connector, args.resource.as_deref())?;
    println!("   Connected to {} ({:?})", scope.resource(), scope.revision());

    println!("\n3. Device information:");
    println!("   Model:          {}", scope.device_model()?);
    println!("   Record length:  {}", scope.record_length()?);
    println!("   Sample rate:    {:.0} S/s", scope.sample_rate()?);
    println!("   Acquisition:    {:?}", scope.acquisition_mode()?);
    println!("   Query delay:    {:?}", scope.visa_query_delay());
    println!("   Timeout:        {:?}", scope.visa_timeout());

    scope.close();
    println!("\n4. Connection test completed successfully!");
    Ok(())
}
