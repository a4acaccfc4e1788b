//! Resolver scenarios across both scope families on one shared bus.

use std::sync::Arc;

use benchscope_rs::mock_bus::{MockBus, MockResourceManager};
use benchscope_rs::{
    BusyRegistry, ConnectorError, Keysight, KeysightScope, ScopeConnector, ScopeError, Tektronix,
    TektronixRevision, TektronixScope,
};

const TEK_C_HEX: &str = "USB0::0x0699::0x03C4::C000001::INSTR";
const TEK_C_DEC: &str = "USB0::1689::964::C000002::INSTR";
const TEK_B: &str = "USB0::1689::872::C000003::INSTR";
const DSOX: &str = "USB0::0x2A8D::0x1787::CN0000004::0::INSTR";

fn tektronix(model: &str, serial: &str) -> MockBus {
    let bus = MockBus::new();
    bus.set("*IDN", &format!("TEKTRONIX,{model},{serial},CF:91.1CT FV:v1.0"))
        .set("HORizontal:RESOlution", "2000")
        .set("HORizontal:RECOrdlength", "2500");
    bus
}

fn keysight(serial: &str) -> MockBus {
    let bus = MockBus::new();
    bus.set("*IDN", &format!("KEYSIGHT TECHNOLOGIES,DSO-X 1102A,{serial},01.20"));
    bus
}

#[test]
fn test_hex_and_decimal_resources_resolve_to_the_same_revision() {
    for resource in [TEK_C_HEX, TEK_C_DEC] {
        let rm = MockResourceManager::new().with_resource(resource, tektronix("TBS1072C", "X"));
        let connector = ScopeConnector::new(Box::new(rm));
        let scope = TektronixScope::open(&connector, None).unwrap();
        assert_eq!(scope.revision(), TektronixRevision::Tbs1000C);
        assert_eq!(scope.resource(), resource);
    }
}

#[test]
fn test_families_pick_their_own_vendor() {
    let rm = MockResourceManager::new()
        .with_resource(DSOX, keysight("CN0000004"))
        .with_resource(TEK_B, tektronix("TBS1052B", "C000003"));
    let connector = ScopeConnector::new(Box::new(rm));

    let tek = TektronixScope::open(&connector, None).unwrap();
    assert_eq!(tek.resource(), TEK_B);
    assert_eq!(tek.revision(), TektronixRevision::Tbs1000B);

    let dsox = KeysightScope::open(&connector, None).unwrap();
    assert_eq!(dsox.resource(), DSOX);
    assert_eq!(connector.registry().len(), 2);
}

#[test]
fn test_unavailable_candidates_are_skipped() {
    let rm = MockResourceManager::new()
        .with_unavailable(TEK_C_HEX)
        .with_resource(TEK_C_DEC, tektronix("TBS1072C", "C000002"));
    let opened = rm.clone();
    let connector = ScopeConnector::new(Box::new(rm));

    let scope = TektronixScope::open(&connector, None).unwrap();
    assert_eq!(scope.resource(), TEK_C_DEC);
    assert_eq!(opened.opened(), vec![TEK_C_DEC.to_string()]);
}

#[test]
fn test_serial_hint_selects_among_several() {
    let rm = MockResourceManager::new()
        .with_resource(TEK_C_HEX, tektronix("TBS1072C", "C000001"))
        .with_resource(TEK_B, tektronix("TBS1052B", "C000003"));
    let connector = ScopeConnector::new(Box::new(rm));

    let scope = TektronixScope::open(&connector, Some("C000003")).unwrap();
    assert_eq!(scope.resource(), TEK_B);
}

#[test]
fn test_missing_family_is_reported() {
    let rm = MockResourceManager::new().with_resource(TEK_B, tektronix("TBS1052B", "C000003"));
    let connector = ScopeConnector::new(Box::new(rm));

    assert!(matches!(
        KeysightScope::open(&connector, None),
        Err(ScopeError::Connector(ConnectorError::DeviceNotFound { .. }))
    ));
}

#[test]
fn test_shared_registry_tracks_open_sessions() {
    let registry = Arc::new(BusyRegistry::new());
    let rm = MockResourceManager::new()
        .with_resource(TEK_C_HEX, tektronix("TBS1072C", "C000001"))
        .with_resource(DSOX, keysight("CN0000004"));
    let observer_rm = rm.clone();

    let owner = ScopeConnector::with_registry(Box::new(rm), Arc::clone(&registry));
    let observer = ScopeConnector::with_registry(Box::new(observer_rm.clone()), Arc::clone(&registry));

    let scope = TektronixScope::open(&owner, None).unwrap();
    let opened_before = observer_rm.opened().len();

    // The busy Tektronix scope answers from the registry without being reopened.
    let listed = observer.list_connected::<Tektronix>().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].identity.serial_number, "C000001");
    assert_eq!(observer_rm.opened().len(), opened_before);

    let keysights = observer.list_connected::<Keysight>().unwrap();
    assert_eq!(keysights.len(), 1);
    assert_eq!(keysights[0].resource, DSOX);

    scope.close();
    assert!(registry.get(TEK_C_HEX).is_none());
}
