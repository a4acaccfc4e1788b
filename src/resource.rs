//! Bus resource identifiers and instrument identity strings.

use std::fmt;

/// Parse a vendor or product id field, accepting decimal (`1689`) and
/// `0x`-prefixed hexadecimal (`0x699`) notation.
pub fn parse_id(field: &str) -> Option<u32> {
    let field = field.trim();
    match field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => field.parse().ok(),
    }
}

/// A USB resource identifier, `interface::vendor::product::serial::...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub raw: String,
    pub interface: String,
    pub vendor_id: u32,
    pub product_id: u32,
    pub serial: String,
}

impl ResourceId {
    /// Returns `None` for anything that is not a USB resource with at least
    /// interface, vendor, product and serial fields.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split("::").collect();
        if parts.len() < 4 || !parts[0].to_ascii_uppercase().contains("USB") {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            interface: parts[0].to_string(),
            vendor_id: parse_id(parts[1])?,
            product_id: parse_id(parts[2])?,
            serial: parts[3].to_string(),
        })
    }

    pub fn matches(&self, vendor_id: u32, product_ids: &[u32]) -> bool {
        self.vendor_id == vendor_id && product_ids.contains(&self.product_id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Answer to `*IDN?`: `Manufacturer,Model,SerialNumber,FirmwareRevision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware: String,
}

impl Identity {
    /// The firmware field is optional; fewer than three fields is an error.
    pub fn parse(idn: &str) -> Option<Self> {
        let mut parts = idn.trim().splitn(4, ',').map(str::trim);
        Some(Self {
            manufacturer: parts.next().filter(|s| !s.is_empty())?.to_string(),
            model: parts.next()?.to_string(),
            serial_number: parts.next()?.to_string(),
            firmware: parts.next().unwrap_or_default().to_string(),
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (S/N {})",
            self.manufacturer, self.model, self.serial_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_decimal_ids_agree() {
        assert_eq!(parse_id("0x699"), Some(1689));
        assert_eq!(parse_id("1689"), Some(1689));
        assert_eq!(parse_id("0X3C4"), Some(964));
        assert_eq!(parse_id("0x3c4"), Some(964));
        assert_eq!(parse_id("zz"), None);
    }

    #[test]
    fn test_parse_usb_resource() {
        let id = ResourceId::parse("USB0::0x699::0x3C4::C010203::INSTR").unwrap();
        assert_eq!(id.vendor_id, 1689);
        assert_eq!(id.product_id, 964);
        assert_eq!(id.serial, "C010203");
        assert!(id.matches(1689, &[964]));
        assert!(!id.matches(1689, &[872]));
    }

    #[test]
    fn test_non_usb_resource_is_rejected() {
        assert!(ResourceId::parse("TCPIP0::192.168.1.5::INSTR").is_none());
        assert!(ResourceId::parse("USB0::1689::964").is_none());
    }

    #[test]
    fn test_identity_parse() {
        let idn = Identity::parse("TEKTRONIX,TBS1072C,C012345,CF:91.1CT FV:v1.24.5\n").unwrap();
        assert_eq!(idn.manufacturer, "TEKTRONIX");
        assert_eq!(idn.model, "TBS1072C");
        assert_eq!(idn.serial_number, "C012345");
        assert_eq!(idn.firmware, "CF:91.1CT FV:v1.24.5");

        let short = Identity::parse("KEYSIGHT,DSO-X 1102A,CN5").unwrap();
        assert!(short.firmware.is_empty());
        assert!(Identity::parse("garbage").is_none());
    }
}
