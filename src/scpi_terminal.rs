use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::bus::{BusError, InstrumentBus};
use crate::resource::Identity;

/// Category of an error reported by the instrument itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Command,
    Execution,
    Device,
    Query,
    Other,
}

impl ErrorClass {
    // IEEE 488.2 standard event status register bits.
    const ESR_QUERY: u32 = 1 << 2;
    const ESR_DEVICE: u32 = 1 << 3;
    const ESR_EXECUTION: u32 = 1 << 4;
    const ESR_COMMAND: u32 = 1 << 5;

    /// Classify a nonzero standard event status register value.
    pub fn from_event_status(esr: u32) -> Self {
        if esr & Self::ESR_COMMAND != 0 {
            Self::Command
        } else if esr & Self::ESR_EXECUTION != 0 {
            Self::Execution
        } else if esr & Self::ESR_DEVICE != 0 {
            Self::Device
        } else if esr & Self::ESR_QUERY != 0 {
            Self::Query
        } else {
            Self::Other
        }
    }

    /// Classify a SCPI error queue code (-100.. command, -200.. execution, ...).
    pub fn from_error_code(code: i32) -> Self {
        match code {
            -199..=-100 => Self::Command,
            -299..=-200 => Self::Execution,
            -399..=-300 => Self::Device,
            -499..=-400 => Self::Query,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Command => "command",
            Self::Execution => "execution",
            Self::Device => "device",
            Self::Query => "query",
            Self::Other => "unclassified",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Instrument reported a {class} error ({code}) after '{command}': {message}")]
pub struct InstrumentError {
    pub class: ErrorClass,
    pub code: i32,
    pub message: String,
    pub command: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error("Unexpected response to '{command}': '{response}'")]
    InvalidResponse { command: String, response: String },
}

/// How an instrument family reports errors after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCheck {
    /// `*ESR?`, any nonzero value is an error.
    EventStatusRegister,
    /// `:SYSTem:ERRor?`, anything but `+0,...` is an error.
    ErrorQueue,
}

impl StatusCheck {
    fn query(self) -> &'static str {
        match self {
            Self::EventStatusRegister => "*ESR?",
            Self::ErrorQueue => ":SYSTem:ERRor?",
        }
    }

    fn evaluate(self, command: &str, answer: &str) -> Result<(), TerminalError> {
        let invalid = || TerminalError::InvalidResponse {
            command: self.query().to_string(),
            response: answer.to_string(),
        };
        match self {
            Self::EventStatusRegister => {
                let esr: u32 = answer.trim().parse().map_err(|_| invalid())?;
                if esr == 0 {
                    return Ok(());
                }
                Err(InstrumentError {
                    class: ErrorClass::from_event_status(esr),
                    code: esr as i32,
                    message: format!("Standard Event Status Register = {esr:#010b}"),
                    command: command.to_string(),
                }
                .into())
            }
            Self::ErrorQueue => {
                let (code, message) = answer.split_once(',').ok_or_else(invalid)?;
                let code: i32 = code.trim().parse().map_err(|_| invalid())?;
                if code == 0 {
                    return Ok(());
                }
                Err(InstrumentError {
                    class: ErrorClass::from_error_code(code),
                    code,
                    message: message.trim().trim_matches('"').to_string(),
                    command: command.to_string(),
                }
                .into())
            }
        }
    }
}

fn strip_terminator(response: &str) -> &str {
    response.trim_end_matches(['\n', '\r'])
}

/// The single path from the drivers to the bus.
///
/// Every write and query is followed by a status check, so an error is
/// reported against the command that caused it.
pub struct ScpiTerminal {
    bus: Box<dyn InstrumentBus>,
    status: StatusCheck,
}

impl ScpiTerminal {
    pub fn new(bus: Box<dyn InstrumentBus>, status: StatusCheck) -> Self {
        Self { bus, status }
    }

    /// `*CLS`: clear the event queue and status registers. Not status-checked,
    /// whatever was pending is being discarded anyway.
    pub fn clear(&mut self) -> Result<(), TerminalError> {
        log::debug!("Clearing instrument status");
        self.bus.write("*CLS")?;
        Ok(())
    }

    fn check_status(&mut self, command: &str) -> Result<(), TerminalError> {
        let answer = self.bus.query(self.status.query())?;
        let result = self.status.evaluate(command, strip_terminator(&answer));
        if let Err(TerminalError::Instrument(e)) = &result {
            log::warn!("{}", e);
        }
        result
    }

    pub fn write(&mut self, command: &str) -> Result<(), TerminalError> {
        log::debug!("> {}", command);
        self.bus.write(command)?;
        self.check_status(command)
    }

    /// Query and return the response without its line terminator.
    pub fn query(&mut self, command: &str) -> Result<String, TerminalError> {
        let answer = self.bus.query(command)?;
        let answer = strip_terminator(&answer).to_string();
        log::debug!("< {} -> {}", command, answer);
        self.check_status(command)?;
        Ok(answer)
    }

    /// Query and return the raw response bytes, terminator included.
    pub fn query_binary(&mut self, command: &str) -> Result<Vec<u8>, TerminalError> {
        let answer = self.bus.query_binary(command)?;
        log::debug!("< {} -> {} bytes", command, answer.len());
        self.check_status(command)?;
        Ok(answer)
    }

    pub fn query_parsed<T: FromStr>(&mut self, command: &str) -> Result<T, TerminalError> {
        let answer = self.query(command)?;
        answer
            .trim()
            .parse()
            .map_err(|_| TerminalError::InvalidResponse {
                command: command.to_string(),
                response: answer,
            })
    }

    pub fn query_f64(&mut self, command: &str) -> Result<f64, TerminalError> {
        self.query_parsed(command)
    }

    /// Integer responses sometimes come back in `<NR3>` form (`2.5E+3`).
    /// Negative, non-finite and out-of-range answers (including the `9.9E+37`
    /// "invalid" marker) are rejected.
    pub fn query_u32(&mut self, command: &str) -> Result<u32, TerminalError> {
        let value = self.query_f64(command)?.round();
        if value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value) {
            Ok(value as u32)
        } else {
            Err(TerminalError::InvalidResponse {
                command: command.to_string(),
                response: value.to_string(),
            })
        }
    }

    /// `1`/`ON` is true, `0`/`OFF` is false.
    pub fn query_bool(&mut self, command: &str) -> Result<bool, TerminalError> {
        let answer = self.query(command)?;
        match answer.trim().to_ascii_uppercase().as_str() {
            "1" | "ON" => Ok(true),
            "0" | "OFF" => Ok(false),
            _ => Err(TerminalError::InvalidResponse {
                command: command.to_string(),
                response: answer,
            }),
        }
    }

    pub fn identify(&mut self) -> Result<Identity, TerminalError> {
        let idn = self.query("*IDN?")?;
        Identity::parse(&idn).ok_or(TerminalError::InvalidResponse {
            command: "*IDN?".to_string(),
            response: idn,
        })
    }

    pub fn query_delay(&self) -> Duration {
        self.bus.query_delay()
    }

    pub fn set_query_delay(&mut self, delay: Duration) {
        self.bus.set_query_delay(delay);
    }

    pub fn timeout(&self) -> Duration {
        self.bus.timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), TerminalError> {
        self.bus.set_timeout(timeout)?;
        Ok(())
    }
}

impl fmt::Debug for ScpiTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScpiTerminal")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
