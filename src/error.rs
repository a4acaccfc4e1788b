use polars::prelude::PolarsError;

use crate::capability::CapabilityError;
use crate::scope_connector::ConnectorError;
use crate::scpi_terminal::{InstrumentError, TerminalError};
use crate::trigger_config::TriggerLevelError;
use crate::waveform::WaveformError;

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Terminal error: {0}")]
    Terminal(#[from] TerminalError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Waveform error: {0}")]
    Waveform(#[from] WaveformError),

    #[error("Invalid trigger level: {0}")]
    TriggerLevel(#[from] TriggerLevelError),

    #[error("Channel {0} does not exist, valid channels are 1 and 2")]
    InvalidChannel(u8),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("DataFrame error: {0}")]
    Frame(#[from] PolarsError),
}

impl ScopeError {
    /// The error the instrument itself reported, if that is what this is.
    pub fn instrument_error(&self) -> Option<&InstrumentError> {
        match self {
            Self::Terminal(TerminalError::Instrument(e))
            | Self::Connector(ConnectorError::Terminal(TerminalError::Instrument(e))) => Some(e),
            _ => None,
        }
    }
}

/// Channel numbers are 1-based and every supported instrument has two.
pub(crate) fn check_channel(index: u8) -> Result<u8, ScopeError> {
    if (1..=2).contains(&index) {
        Ok(index)
    } else {
        Err(ScopeError::InvalidChannel(index))
    }
}
