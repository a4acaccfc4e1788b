use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::bus::{BusError, ResourceManager};
use crate::busy_registry::BusyRegistry;
use crate::resource::{Identity, ResourceId};
use crate::scpi_terminal::{ScpiTerminal, StatusCheck, TerminalError};

/// Delay between a query's write and its read. Zero delay returns corrupted
/// data from these instruments on some hosts.
pub const DEFAULT_QUERY_DELAY: Duration = Duration::from_millis(200);
/// Long enough for a full-length curve transfer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Terminal error: {0}")]
    Terminal(#[from] TerminalError),

    #[error("No {family} oscilloscope found. Please connect one or specify its resource")]
    DeviceNotFound { family: &'static str },

    #[error("Resource {resource} is not a known {family} hardware revision")]
    UnknownProduct {
        resource: String,
        family: &'static str,
    },
}

/// A family of instruments sharing a vendor id and a command structure.
pub trait ScopeFamily {
    const NAME: &'static str;
    const VENDOR_ID: u32;
    const PRODUCT_IDS: &'static [u32];

    type Revision: Copy + fmt::Debug;

    fn revision_for_product(product_id: u32) -> Option<Self::Revision>;

    /// Fallback for resources that carry no product id.
    fn revision_for_model(model: &str) -> Option<Self::Revision>;

    fn status_check() -> StatusCheck;

    fn matches_resource(resource: &str) -> bool {
        ResourceId::parse(resource).is_some_and(|id| id.matches(Self::VENDOR_ID, Self::PRODUCT_IDS))
    }
}

/// An open, identified, registered instrument connection.
///
/// Dropping it releases the resource's registry entry.
pub struct Connection<R> {
    pub terminal: ScpiTerminal,
    pub resource: String,
    pub identity: Identity,
    pub revision: R,
    registry: Arc<BusyRegistry>,
}

impl<R> Connection<R> {
    pub fn registry(&self) -> &Arc<BusyRegistry> {
        &self.registry
    }
}

impl<R: fmt::Debug> fmt::Debug for Connection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("resource", &self.resource)
            .field("identity", &self.identity)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl<R> Drop for Connection<R> {
    fn drop(&mut self) {
        log::debug!("Releasing {}", self.resource);
        self.registry.release(&self.resource);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedScope {
    pub resource: String,
    pub identity: Identity,
}

/// Finds instruments on the bus and opens sessions to them.
pub struct ScopeConnector {
    manager: Box<dyn ResourceManager>,
    registry: Arc<BusyRegistry>,
}

impl fmt::Debug for ScopeConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeConnector")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ScopeConnector {
    pub fn new(manager: Box<dyn ResourceManager>) -> Self {
        Self::with_registry(manager, Arc::new(BusyRegistry::new()))
    }

    /// Share one registry between several connectors.
    pub fn with_registry(manager: Box<dyn ResourceManager>, registry: Arc<BusyRegistry>) -> Self {
        Self { manager, registry }
    }

    pub fn registry(&self) -> &Arc<BusyRegistry> {
        &self.registry
    }

    /// Live resources belonging to family `F`, in enumeration order.
    pub fn candidates<F: ScopeFamily>(&self) -> Result<Vec<String>, ConnectorError> {
        Ok(self
            .manager
            .list_resources()?
            .into_iter()
            .filter(|r| F::matches_resource(r))
            .collect())
    }

    /// A hint names either a full resource or the serial field of one of
    /// this vendor's USB resources.
    fn find_hinted<'a, F: ScopeFamily>(resources: &'a [String], hint: &str) -> Option<&'a String> {
        resources.iter().find(|resource| {
            resource.as_str() == hint
                || ResourceId::parse(resource)
                    .is_some_and(|id| id.vendor_id == F::VENDOR_ID && id.serial == hint)
        })
    }

    /// Open a session to an instrument of family `F`.
    ///
    /// A `hint` matching a live resource (or its serial key) is opened
    /// directly. Otherwise every family resource is tried in enumeration
    /// order, skipping the ones that fail to open.
    #[tracing::instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn resolve<F: ScopeFamily>(
        &self,
        hint: Option<&str>,
    ) -> Result<Connection<F::Revision>, ConnectorError> {
        let resources = self.manager.list_resources()?;

        if let Some(hint) = hint {
            if let Some(resource) = Self::find_hinted::<F>(&resources, hint) {
                log::debug!("Opening hinted resource {}", resource);
                return self.open::<F>(resource);
            }
            log::debug!("Hint '{}' matches no live resource, scanning", hint);
        }

        for resource in resources.iter().filter(|r| F::matches_resource(r)) {
            match self.open::<F>(resource) {
                Ok(connection) => return Ok(connection),
                Err(ConnectorError::Bus(e)) => {
                    log::debug!("Skipping {}: {}", resource, e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ConnectorError::DeviceNotFound { family: F::NAME })
    }

    fn open<F: ScopeFamily>(&self, resource: &str) -> Result<Connection<F::Revision>, ConnectorError> {
        let bus = self.manager.open(resource)?;
        let mut terminal = ScpiTerminal::new(bus, F::status_check());

        // Discard error state left behind by an unclean disconnect.
        terminal.clear()?;
        terminal.set_query_delay(DEFAULT_QUERY_DELAY);
        terminal.set_timeout(DEFAULT_TIMEOUT)?;

        let identity = terminal.identify()?;
        let revision = ResourceId::parse(resource)
            .filter(|id| id.vendor_id == F::VENDOR_ID)
            .and_then(|id| F::revision_for_product(id.product_id))
            .or_else(|| F::revision_for_model(&identity.model))
            .ok_or_else(|| ConnectorError::UnknownProduct {
                resource: resource.to_string(),
                family: F::NAME,
            })?;

        log::info!("Connected to {} at {} ({:?})", identity, resource, revision);
        self.registry.insert(resource, identity.clone());

        Ok(Connection {
            terminal,
            resource: resource.to_string(),
            identity,
            revision,
            registry: Arc::clone(&self.registry),
        })
    }

    /// Identify every live instrument of family `F`.
    ///
    /// Registry entries for resources that left the bus are pruned first.
    /// Busy resources answer from the registry; the others are opened and
    /// asked for `*IDN?`, and skipped if that fails.
    #[tracing::instrument(level = "debug", skip(self), fields(family = F::NAME))]
    pub fn list_connected<F: ScopeFamily>(&self) -> Result<Vec<ConnectedScope>, ConnectorError> {
        let live = self.manager.list_resources()?;
        self.registry.prune(&live);

        let mut scopes = Vec::new();
        for resource in live.iter().filter(|r| F::matches_resource(r)) {
            let identity = match self.registry.get(resource) {
                Some(identity) => identity,
                None => match self.query_identity::<F>(resource) {
                    Ok(identity) => {
                        self.registry.insert(resource, identity.clone());
                        identity
                    }
                    Err(e) => {
                        log::debug!("Could not identify {}: {}", resource, e);
                        continue;
                    }
                },
            };
            scopes.push(ConnectedScope {
                resource: resource.clone(),
                identity,
            });
        }
        Ok(scopes)
    }

    fn query_identity<F: ScopeFamily>(&self, resource: &str) -> Result<Identity, ConnectorError> {
        let bus = self.manager.open(resource)?;
        let mut terminal = ScpiTerminal::new(bus, F::status_check());
        Ok(terminal.identify()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_bus::{MockBus, MockResourceManager};

    struct Acme;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum AcmeRevision {
        Classic,
        ByModel,
    }

    impl ScopeFamily for Acme {
        const NAME: &'static str = "Acme";
        const VENDOR_ID: u32 = 1689;
        const PRODUCT_IDS: &'static [u32] = &[964];
        type Revision = AcmeRevision;

        fn revision_for_product(product_id: u32) -> Option<AcmeRevision> {
            (product_id == 964).then_some(AcmeRevision::Classic)
        }

        fn revision_for_model(model: &str) -> Option<AcmeRevision> {
            model.starts_with("ACME").then_some(AcmeRevision::ByModel)
        }

        fn status_check() -> StatusCheck {
            StatusCheck::EventStatusRegister
        }
    }

    fn scope_bus(serial: &str) -> MockBus {
        let bus = MockBus::new();
        bus.set("*IDN", &format!("TEKTRONIX,TBS1072C,{serial},CF:91.1CT FV:v1.24.5"));
        bus
    }

    const SN1: &str = "USB0::1689::964::SN1::INSTR";
    const SN2: &str = "USB0::0x699::0x3C4::SN2::INSTR";

    #[test]
    fn test_decimal_and_hex_resources_both_match() {
        let rm = MockResourceManager::new()
            .with_resource(SN1, scope_bus("SN1"))
            .with_resource(SN2, scope_bus("SN2"))
            .with_resource("USB0::1689::872::SN3::INSTR", scope_bus("SN3"));
        let connector = ScopeConnector::new(Box::new(rm));
        assert_eq!(connector.candidates::<Acme>().unwrap(), vec![SN1, SN2]);
    }

    #[test]
    fn test_resolve_skips_resources_that_fail_to_open() {
        let rm = MockResourceManager::new()
            .with_unavailable(SN1)
            .with_resource(SN2, scope_bus("SN2"));
        let connector = ScopeConnector::new(Box::new(rm.clone()));

        let connection = connector.resolve::<Acme>(None).unwrap();
        assert_eq!(connection.resource, SN2);
        assert_eq!(connection.identity.serial_number, "SN2");
        assert_eq!(connection.revision, AcmeRevision::Classic);
        assert_eq!(rm.opened(), vec![SN2]);
    }

    #[test]
    fn test_open_sequence() {
        let bus = scope_bus("SN1");
        let rm = MockResourceManager::new().with_resource(SN1, bus.clone());
        let connector = ScopeConnector::new(Box::new(rm));

        let connection = connector.resolve::<Acme>(None).unwrap();
        assert_eq!(bus.log(), vec!["*CLS", "*IDN?", "*ESR?"]);
        assert_eq!(connection.terminal.query_delay(), DEFAULT_QUERY_DELAY);
        assert_eq!(connection.terminal.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(
            connector.registry().get(SN1).unwrap().serial_number,
            "SN1"
        );

        drop(connection);
        assert!(connector.registry().get(SN1).is_none());
    }

    #[test]
    fn test_no_device_found() {
        let rm = MockResourceManager::new()
            .with_unavailable(SN1)
            .with_resource("USB0::10893::6023::X::INSTR", MockBus::new());
        let connector = ScopeConnector::new(Box::new(rm));
        assert!(matches!(
            connector.resolve::<Acme>(None),
            Err(ConnectorError::DeviceNotFound { family: "Acme" })
        ));
    }

    #[test]
    fn test_hint_by_serial_key() {
        let rm = MockResourceManager::new()
            .with_resource(SN1, scope_bus("SN1"))
            .with_resource(SN2, scope_bus("SN2"));
        let connector = ScopeConnector::new(Box::new(rm.clone()));

        let connection = connector.resolve::<Acme>(Some("SN2")).unwrap();
        assert_eq!(connection.resource, SN2);
        assert_eq!(rm.opened(), vec![SN2]);
    }

    #[test]
    fn test_hint_by_resource_falls_back_to_model() {
        let resource = "USB0::1689::999::SN9::INSTR";
        let bus = MockBus::new();
        bus.set("*IDN", "ACME,ACME-100,SN9,1.0");
        let rm = MockResourceManager::new().with_resource(resource, bus);
        let connector = ScopeConnector::new(Box::new(rm));

        let connection = connector.resolve::<Acme>(Some(resource)).unwrap();
        assert_eq!(connection.revision, AcmeRevision::ByModel);
    }

    #[test]
    fn test_hinted_unknown_product() {
        let resource = "USB0::1689::999::SN9::INSTR";
        let rm = MockResourceManager::new().with_resource(resource, scope_bus("SN9"));
        let connector = ScopeConnector::new(Box::new(rm));
        assert!(matches!(
            connector.resolve::<Acme>(Some(resource)),
            Err(ConnectorError::UnknownProduct { .. })
        ));
    }

    #[test]
    fn test_unmatched_hint_scans() {
        let rm = MockResourceManager::new().with_resource(SN1, scope_bus("SN1"));
        let connector = ScopeConnector::new(Box::new(rm));
        let connection = connector.resolve::<Acme>(Some("nope")).unwrap();
        assert_eq!(connection.resource, SN1);
    }

    #[test]
    fn test_list_connected_uses_registry_for_busy_resources() {
        let busy = scope_bus("SN1");
        let rm = MockResourceManager::new()
            .with_resource(SN1, busy.clone())
            .with_resource(SN2, scope_bus("SN2"))
            .with_unavailable("USB0::1689::964::SN3::INSTR");
        let connector = ScopeConnector::new(Box::new(rm.clone()));

        let _session = connector.resolve::<Acme>(Some(SN1)).unwrap();
        busy.clear_log();

        let scopes = connector.list_connected::<Acme>().unwrap();
        let serials: Vec<&str> = scopes
            .iter()
            .map(|s| s.identity.serial_number.as_str())
            .collect();
        assert_eq!(serials, vec!["SN1", "SN2"]);
        assert!(busy.log().is_empty());
    }

    #[test]
    fn test_list_connected_prunes_stale_entries() {
        let rm = MockResourceManager::new().with_resource(SN2, scope_bus("SN2"));
        let connector = ScopeConnector::new(Box::new(rm));
        connector.registry().insert(
            SN1,
            Identity::parse("TEKTRONIX,TBS1072C,SN1").unwrap(),
        );

        let scopes = connector.list_connected::<Acme>().unwrap();
        assert_eq!(scopes.len(), 1);
        assert!(connector.registry().get(SN1).is_none());
        assert!(connector.registry().get(SN2).is_some());
    }
}
