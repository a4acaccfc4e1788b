//! # BenchScope RS
//!
//! Host-side drivers for bench oscilloscopes controlled over SCPI: the
//! Tektronix TBS1000B/TBS1000C series and the Keysight DSOX1102A.
//!
//! A driver discovers a connected instrument, opens a session and exposes typed
//! accessors that translate settings (trigger level, timebase, attenuation,
//! acquisition mode) into the command dialect of the detected hardware revision.
//! Waveforms come back calibrated, as `x`/`y` vectors or a `polars` `DataFrame`.
//!
//! ## Features
//!
//! - **Device resolution**: vendor/product matching with decimal or hex ids,
//!   serial-number hints, skipping resources that fail to open
//! - **Revision dialects**: one command vocabulary per hardware revision,
//!   unsupported settings are rejected before anything is sent
//! - **Status checking**: every command is followed by `*ESR?` or
//!   `:SYSTem:ERRor?`, errors name the command that caused them
//! - **Waveform decoding**: IEEE 488.2 definite-length blocks, Tektronix and
//!   Keysight preambles, affine scaling to physical units
//! - **Pluggable bus**: VISA behind the `visa` feature, a scripted mock for tests
//!
//! [`mock_bus`] is public on purpose. It is a supported testing aid, so code
//! built on these drivers can be tested without an instrument. It is not a
//! transport for production use.
//!
//! ## Examples
//!
//! ### Connecting and reading a channel
//!
//! ```rust,no_run
//! # #[cfg(feature = "visa")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use benchscope_rs::{ScopeConnector, TektronixScope, VisaResourceManager};
//!
//! let connector = ScopeConnector::new(Box::new(VisaResourceManager::new()?));
//! let mut scope = TektronixScope::open(&connector, None)?;
//!
//! let waveform = scope.channel(1)?.fetch_waveform()?;
//! println!("Captured {} samples", waveform.len());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "visa"))]
//! # fn main() {}
//! ```
//!
//! ### Runt trigger thresholds
//!
//! ```rust,no_run
//! use benchscope_rs::{PulseClass, ScopeError, TektronixScope, TriggerType};
//!
//! fn arm_runt(scope: &mut TektronixScope) -> Result<(), ScopeError> {
//!     scope.set_trig_type(TriggerType::Pulse)?;
//!     scope.set_trig_pulse_class(PulseClass::Runt)?;
//!     // Order does not matter, the lower value becomes the lower threshold.
//!     scope.channel(1)?.set_trig_lvl(&[1.5, 0.3])?;
//!     scope.single()
//! }
//! ```
//!
//! ### Without hardware
//!
//! ```rust
//! use benchscope_rs::mock_bus::{MockBus, MockResourceManager};
//! use benchscope_rs::{KeysightScope, ScopeConnector};
//!
//! let bus = MockBus::new();
//! bus.set("*IDN", "KEYSIGHT TECHNOLOGIES,DSO-X 1102A,CN0001,1.0");
//! let rm = MockResourceManager::new().with_resource("USB0::10893::6023::CN0001::INSTR", bus.clone());
//!
//! let connector = ScopeConnector::new(Box::new(rm));
//! let mut scope = KeysightScope::open(&connector, None).unwrap();
//! scope.set_timebase_scale(1e-3).unwrap();
//! assert_eq!(bus.commands().last().unwrap(), ":TIMebase:SCALe 0.001");
//! ```

pub mod bus;
pub mod busy_registry;
pub mod capability;
pub mod dialect;
pub mod error;
pub mod keysight;
/// Testing aid: scripted bus and resource manager, see the module docs.
pub mod mock_bus;
pub mod resource;
pub mod scope_connector;
pub mod scpi_terminal;
pub mod tektronix;
pub mod trigger_config;
#[cfg(feature = "visa")]
pub mod visa_bus;
pub mod waveform;

// Re-export the main types for convenience
pub use bus::{BusError, InstrumentBus, ResourceManager};

pub use busy_registry::BusyRegistry;

pub use capability::{
    AcquisitionMode, CapabilityError, Coupling, DataSource, FftUnit, FftWindow, HorizontalView,
    MathFunction, PointsMode, ProbeUnit, PulseClass, TriggerSlope, TriggerSource, TriggerSweep,
    TriggerType,
};

pub use error::ScopeError;

pub use keysight::{Keysight, KeysightChannel, KeysightRevision, KeysightScope};

pub use resource::{Identity, ResourceId};

pub use scope_connector::{ConnectedScope, ConnectorError, ScopeConnector, ScopeFamily};

pub use scpi_terminal::{ErrorClass, InstrumentError, TerminalError};

pub use tektronix::{Tektronix, TektronixChannel, TektronixRevision, TektronixScope};

pub use trigger_config::{LevelEncoding, TriggerLevel};

#[cfg(feature = "visa")]
pub use visa_bus::{VisaBus, VisaResourceManager};

pub use waveform::{Waveform, WaveformError};
