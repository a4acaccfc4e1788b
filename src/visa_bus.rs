//! VISA backend for the instrument bus, enabled with the `visa` feature.
//!
//! Needs a VISA library (NI-VISA, Keysight IO Libraries, ...) installed at
//! runtime.

use std::ffi::CString;
use std::io::Write;
use std::time::Duration;

use visa_rs::attribute::AttrTmoValue;
use visa_rs::prelude::*;

use crate::bus::{read_message, BusError, InstrumentBus, ResourceManager};

const READ_CHUNK: usize = 4096;

/// Lists resources matching this expression.
const RESOURCE_QUERY: &str = "?*INSTR";

fn backend(e: impl std::fmt::Display) -> BusError {
    BusError::Backend(e.to_string())
}

fn visa_string(s: &str) -> Result<VisaString, BusError> {
    Ok(CString::new(s).map_err(backend)?.into())
}

pub struct VisaResourceManager {
    rm: DefaultRM,
}

impl VisaResourceManager {
    pub fn new() -> Result<Self, BusError> {
        let rm = DefaultRM::new().map_err(backend)?;
        log::debug!("VISA resource manager opened");
        Ok(Self { rm })
    }
}

impl ResourceManager for VisaResourceManager {
    fn list_resources(&self) -> Result<Vec<String>, BusError> {
        let mut list = self
            .rm
            .find_res_list(&visa_string(RESOURCE_QUERY)?)
            .map_err(backend)?;
        let mut resources = Vec::new();
        while let Some(resource) = list.find_next().map_err(backend)? {
            resources.push(resource.to_string());
        }
        Ok(resources)
    }

    fn open(&self, resource: &str) -> Result<Box<dyn InstrumentBus>, BusError> {
        let instrument = self
            .rm
            .open(
                &visa_string(resource)?,
                AccessMode::NO_LOCK,
                TIMEOUT_IMMEDIATE,
            )
            .map_err(|e| BusError::Open {
                resource: resource.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(VisaBus {
            resource: resource.to_string(),
            instrument,
            query_delay: Duration::ZERO,
            timeout: Duration::from_secs(2),
        }))
    }
}

pub struct VisaBus {
    resource: String,
    instrument: Instrument,
    query_delay: Duration,
    timeout: Duration,
}

impl InstrumentBus for VisaBus {
    fn write(&mut self, command: &str) -> Result<(), BusError> {
        self.instrument.write_all(format!("{command}\n").as_bytes())?;
        Ok(())
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, BusError> {
        read_message(&mut self.instrument, READ_CHUNK).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                BusError::Timeout {
                    command: self.resource.clone(),
                }
            } else {
                BusError::Io(e)
            }
        })
    }

    fn query_delay(&self) -> Duration {
        self.query_delay
    }

    fn set_query_delay(&mut self, delay: Duration) {
        self.query_delay = delay;
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), BusError> {
        let millis = u32::try_from(timeout.as_millis()).map_err(backend)?;
        let attr = AttrTmoValue::new_checked(millis)
            .ok_or_else(|| BusError::Backend(format!("invalid timeout of {millis} ms")))?;
        self.instrument.set_attr(attr).map_err(backend)?;
        self.timeout = timeout;
        Ok(())
    }
}
