//! In-memory record of the devices that visited the share.
//!
//! Records are kept in first-seen order and never removed while the server
//! runs. A device is identified by address, browser label and OS label
//! together, so the same phone with an updated browser appears twice.

use std::sync::{PoisonError, RwLock};

use protocol::DeviceRecord;
use tracing::info;

use super::user_agent::ClientInfo;

/// Ordered, duplicate-free set of device records.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<DeviceRecord>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit from `address` with the given `User-Agent` header.
    ///
    /// Returns the record if it was not known yet.
    pub fn register(&self, address: &str, user_agent: Option<&str>) -> Option<DeviceRecord> {
        let client = ClientInfo::parse(user_agent);
        let record = DeviceRecord::new(address, client.browser_label(), client.os_label());

        if self.insert(record.clone()) {
            info!("New device connected: {}", record);
            Some(record)
        } else {
            None
        }
    }

    /// Insert a record unless an equal one exists. Returns whether it was added.
    pub fn insert(&self, record: DeviceRecord) -> bool {
        // Records are plain data; a panic elsewhere cannot leave them inconsistent.
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        if devices.contains(&record) {
            false
        } else {
            devices.push(record);
            true
        }
    }

    /// Copy of all records in first-seen order.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an equal record exists.
    pub fn contains(&self, record: &DeviceRecord) -> bool {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(record)
    }

    /// Number of distinct devices seen.
    pub fn len(&self) -> usize {
        self.devices.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no device has been seen.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[test]
    fn test_register_new_device() {
        let registry = DeviceRegistry::new();
        assert!(registry.is_empty());

        let record = registry.register("10.0.0.5", Some(FIREFOX)).unwrap();
        assert_eq!(record.address, "10.0.0.5");
        assert_eq!(record.browser_label, "Firefox 121.0");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&record));
    }

    #[test]
    fn test_repeat_visit_is_not_duplicated() {
        let registry = DeviceRegistry::new();

        assert!(registry.register("10.0.0.5", Some(FIREFOX)).is_some());
        assert!(registry.register("10.0.0.5", Some(FIREFOX)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_address_different_browser_is_distinct() {
        let registry = DeviceRegistry::new();

        registry.register("10.0.0.5", Some(FIREFOX));
        registry.register("10.0.0.5", Some(CHROME));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_snapshot_keeps_first_seen_order() {
        let registry = DeviceRegistry::new();
        registry.register("10.0.0.9", Some(CHROME));
        registry.register("10.0.0.2", Some(FIREFOX));
        registry.register("10.0.0.9", Some(CHROME));

        let addresses: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|d| d.address)
            .collect();
        assert_eq!(addresses, vec!["10.0.0.9", "10.0.0.2"]);
    }

    #[test]
    fn test_concurrent_registration_has_no_duplicates() {
        let registry = Arc::new(DeviceRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..50 {
                        registry.register(&format!("10.0.0.{}", i % 4), Some(FIREFOX));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_insert_reports_novelty() {
        let registry = DeviceRegistry::new();
        let record = DeviceRecord::new("1.2.3.4", "Other", "Other");

        assert!(registry.insert(record.clone()));
        assert!(!registry.insert(record));
    }
}
