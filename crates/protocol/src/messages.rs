//! JSON message definitions for fileshare.
//!
//! Field names follow the routes served by the daemon, so existing browser
//! pages keep working: device records serialize as `{ip, browser, os}`.

use serde::{Deserialize, Serialize};

// ============================================================================
// Device Messages
// ============================================================================

/// One client that visited the share.
///
/// Records are compared by all three fields. A device whose browser version
/// string changes is a different record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Network address the request came from.
    #[serde(rename = "ip")]
    pub address: String,
    /// Browser family and version, e.g. `Chrome 120.0.0.0`.
    #[serde(rename = "browser")]
    pub browser_label: String,
    /// Operating system family and version, e.g. `Mac OSX 10.15.7`.
    #[serde(rename = "os")]
    pub os_label: String,
}

impl DeviceRecord {
    /// Create a record from its three labels.
    pub fn new(
        address: impl Into<String>,
        browser_label: impl Into<String>,
        os_label: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            browser_label: browser_label.into(),
            os_label: os_label.into(),
        }
    }
}

impl std::fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IP: {}, Browser: {}, OS: {}",
            self.address, self.browser_label, self.os_label
        )
    }
}

/// Body of `POST /connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub success: bool,
}

impl ConnectResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Body of `GET /connected_devices`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectedDevicesResponse {
    pub connected_devices: Vec<DeviceRecord>,
}

impl ConnectedDevicesResponse {
    pub fn new(connected_devices: Vec<DeviceRecord>) -> Self {
        Self { connected_devices }
    }
}

// ============================================================================
// Listing Messages
// ============================================================================

/// Kind of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Whether this entry is a directory.
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_record_uses_short_field_names() {
        let record = DeviceRecord::new("10.0.0.5", "Safari 17.1", "iOS 17.1");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["ip"], "10.0.0.5");
        assert_eq!(json["browser"], "Safari 17.1");
        assert_eq!(json["os"], "iOS 17.1");
    }

    #[test]
    fn test_device_record_equality_covers_all_fields() {
        let a = DeviceRecord::new("10.0.0.5", "Firefox 120.0", "Linux");
        let b = DeviceRecord::new("10.0.0.5", "Firefox 121.0", "Linux");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_device_record_display() {
        let record = DeviceRecord::new("10.0.0.5", "Firefox 121.0", "Linux");
        assert_eq!(
            record.to_string(),
            "IP: 10.0.0.5, Browser: Firefox 121.0, OS: Linux"
        );
    }

    #[test]
    fn test_connect_response_json() {
        let json = serde_json::to_string(&ConnectResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }

    #[test]
    fn test_connected_devices_response_parses() {
        let json = r#"{"connected_devices":[{"ip":"1.2.3.4","browser":"Chrome 1","os":"Windows 10"}]}"#;
        let parsed: ConnectedDevicesResponse = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.connected_devices.len(), 1);
        assert_eq!(parsed.connected_devices[0].address, "1.2.3.4");
        assert_eq!(parsed.connected_devices[0].os_label, "Windows 10");
    }

    #[test]
    fn test_empty_devices_response() {
        let json = serde_json::to_string(&ConnectedDevicesResponse::default()).unwrap();
        assert_eq!(json, r#"{"connected_devices":[]}"#);
    }

    #[test]
    fn test_entry_kind() {
        assert!(EntryKind::Directory.is_dir());
        assert!(!EntryKind::File.is_dir());
        assert_eq!(
            serde_json::to_string(&EntryKind::Directory).unwrap(),
            "\"directory\""
        );
    }
}
