//! Scripted in-memory instrument bus.
//!
//! `MockBus` behaves like a very forgiving SCPI instrument: a write of
//! `HEADER value` stores `value`, and a later `HEADER?` answers it back.
//! Responses can also be scripted per query, in which case they take
//! precedence and are consumed in order. Every command is logged so tests can
//! assert the exact protocol sequence a driver produced.
//!
//! Handles are cheap clones sharing the same state, so a test can keep one
//! while the session under test owns another.
//!
//! This module is public so downstream crates can test code written against
//! the drivers. The bus accepts any command and only fails a read, with a
//! timeout, when a query has no answer. It is not a stand-in for an
//! instrument outside tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::bus::{BusError, InstrumentBus, ResourceManager};

#[derive(Debug, Default)]
struct MockState {
    scripted: HashMap<String, VecDeque<Vec<u8>>>,
    settings: HashMap<String, String>,
    pending: VecDeque<Vec<u8>>,
    log: Vec<String>,
    query_delay: Duration,
    timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

fn normalize(command: &str) -> String {
    command.trim().to_ascii_uppercase()
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked; the state is still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue a one-shot text response for `query`. A newline is appended.
    pub fn respond(&self, query: &str, response: &str) -> &Self {
        self.respond_raw(query, format!("{response}\n").into_bytes())
    }

    /// Queue a one-shot raw response for `query`.
    pub fn respond_raw(&self, query: &str, response: Vec<u8>) -> &Self {
        self.lock()
            .scripted
            .entry(normalize(query))
            .or_default()
            .push_back(response);
        self
    }

    /// Preset the value a `header?` query answers until overwritten.
    pub fn set(&self, header: &str, value: &str) -> &Self {
        self.lock()
            .settings
            .insert(normalize(header), value.to_string());
        self
    }

    /// Every command written so far, in order.
    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Commands written so far that are not status checks.
    pub fn commands(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|c| {
                let c = normalize(c);
                c != "*ESR?" && c != ":SYSTEM:ERROR?"
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    fn answer(state: &mut MockState, key: &str) -> Option<Vec<u8>> {
        if let Some(queue) = state.scripted.get_mut(key) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }
        let header = key.trim_end_matches('?');
        if let Some(value) = state.settings.get(header) {
            return Some(format!("{value}\n").into_bytes());
        }
        match key {
            "*ESR?" => Some(b"0\n".to_vec()),
            ":SYSTEM:ERROR?" => Some(b"+0,\"No error\"\n".to_vec()),
            _ => None,
        }
    }
}

impl InstrumentBus for MockBus {
    fn write(&mut self, command: &str) -> Result<(), BusError> {
        let mut state = self.lock();
        state.log.push(command.to_string());

        let key = normalize(command);
        if key.contains('?') {
            if let Some(response) = Self::answer(&mut state, &key) {
                state.pending.push_back(response);
            }
        } else if let Some((header, value)) = key.split_once(char::is_whitespace) {
            let value = command.trim()[header.len()..].trim().to_string();
            state.settings.insert(header.to_string(), value);
        }
        Ok(())
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, BusError> {
        let mut state = self.lock();
        state.pending.pop_front().ok_or_else(|| BusError::Timeout {
            command: state.log.last().cloned().unwrap_or_default(),
        })
    }

    fn query_delay(&self) -> Duration {
        self.lock().query_delay
    }

    fn set_query_delay(&mut self, delay: Duration) {
        self.lock().query_delay = delay;
    }

    fn timeout(&self) -> Duration {
        self.lock().timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), BusError> {
        self.lock().timeout = timeout;
        Ok(())
    }

    fn query_binary(&mut self, command: &str) -> Result<Vec<u8>, BusError> {
        // No delay: the configured value is recorded but not slept on.
        self.write(command)?;
        self.read_raw()
    }
}

/// Resource manager over a fixed list of mock resources.
#[derive(Debug, Clone, Default)]
pub struct MockResourceManager {
    resources: Vec<String>,
    buses: HashMap<String, MockBus>,
    unavailable: HashSet<String>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live resource backed by `bus`.
    pub fn with_resource(mut self, resource: &str, bus: MockBus) -> Self {
        self.resources.push(resource.to_string());
        self.buses.insert(resource.to_string(), bus);
        self
    }

    /// Register a live resource that fails to open.
    pub fn with_unavailable(mut self, resource: &str) -> Self {
        self.resources.push(resource.to_string());
        self.unavailable.insert(resource.to_string());
        self
    }

    pub fn remove_resource(&mut self, resource: &str) {
        self.resources.retain(|r| r != resource);
        self.buses.remove(resource);
    }

    /// Resources successfully opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ResourceManager for MockResourceManager {
    fn list_resources(&self) -> Result<Vec<String>, BusError> {
        Ok(self.resources.clone())
    }

    fn open(&self, resource: &str) -> Result<Box<dyn InstrumentBus>, BusError> {
        if self.unavailable.contains(resource) {
            return Err(BusError::Open {
                resource: resource.to_string(),
                reason: "resource busy".to_string(),
            });
        }
        let bus = self
            .buses
            .get(resource)
            .cloned()
            .ok_or_else(|| BusError::Open {
                resource: resource.to_string(),
                reason: "no such resource".to_string(),
            })?;
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(resource.to_string());
        Ok(Box::new(bus))
    }
}
