//! Last-Known-Value Cache
//!
//! ## Overview
//!
//! Per device, the most recently accepted value of every output, used to
//! satisfy cross-sensor dependencies: NO2 needs the device's temperature, O3
//! needs temperature and NO2.
//!
//! ```text
//! LastValueCache
//!   ├─ "11820001" ─► Mutex { temperature: 20 @t1, humidity: 55 @t1, no2: 96 @t1 }
//!   └─ "49311234" ─► Mutex { pm10: 12 @t2 }
//! ```
//!
//! ## Semantics
//!
//! - Last write wins. A write replaces the entry, no merge and no
//!   timestamp comparison.
//! - Entries never expire. Staleness is a resolver policy
//!   ([`Freshness`](crate::time::Freshness)), not a cache property.
//! - Writes never fail. A poisoned lock is recovered and logged; an old
//!   entry is better than a lost record.
//!
//! ## Concurrency
//!
//! The outer map is behind an `RwLock` and only write-locked to add a new
//! device. Each device has its own `Mutex`, so two devices never contend
//! and two writers for one device are serialised. The resolver holds the
//! device mutex for a whole record through [`LastValueCache::with_device`].

use std::collections::HashMap;
use std::sync::{Arc, LockResult, Mutex, RwLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::record::DeviceId;
use crate::time::Timestamp;

/// Last accepted value of one output
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CachedValue {
    /// Accepted value
    pub value: f64,
    /// Time of the record that produced it
    pub timestamp: Option<Timestamp>,
}

/// Cached outputs of one device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceValues {
    values: HashMap<String, CachedValue>,
}

impl DeviceValues {
    /// Last value of `name`
    pub fn get(&self, name: &str) -> Option<CachedValue> {
        self.values.get(name).copied()
    }

    /// Overwrite `name`
    pub fn set(&mut self, name: impl Into<String>, value: f64, timestamp: Option<Timestamp>) {
        self.values.insert(name.into(), CachedValue { value, timestamp });
    }

    /// Names with a cached value
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of cached outputs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Process-wide store of last accepted values, keyed by device
#[derive(Debug, Default)]
pub struct LastValueCache {
    devices: RwLock<HashMap<DeviceId, Arc<Mutex<DeviceValues>>>>,
}

fn recover<T>(result: LockResult<T>, what: &str) -> T {
    result.unwrap_or_else(|poisoned| {
        log_warn!("cache lock for {} was poisoned, recovering", what);
        poisoned.into_inner()
    })
}

impl LastValueCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutex guarding one device, created on first use
    pub fn device(&self, device_id: &DeviceId) -> Arc<Mutex<DeviceValues>> {
        if let Some(values) = recover(self.devices.read(), "devices").get(device_id) {
            return Arc::clone(values);
        }

        let mut devices = recover(self.devices.write(), "devices");
        Arc::clone(devices.entry(device_id.clone()).or_default())
    }

    /// Run `f` while holding the device lock
    pub fn with_device<R>(&self, device_id: &DeviceId, f: impl FnOnce(&mut DeviceValues) -> R) -> R {
        let device = self.device(device_id);
        let mut values = recover(device.lock(), device_id.as_str());
        f(&mut values)
    }

    /// Last accepted value of `name`, `None` if never set
    pub fn get_last_value(&self, device_id: &DeviceId, name: &str) -> Option<CachedValue> {
        let device = recover(self.devices.read(), "devices").get(device_id).cloned()?;
        let values = recover(device.lock(), device_id.as_str());
        values.get(name)
    }

    /// Overwrite the last value of `name`
    pub fn set_last_value(&self, device_id: &DeviceId, name: &str, value: f64, timestamp: Option<Timestamp>) {
        self.with_device(device_id, |values| values.set(name, value, timestamp));
    }

    /// Devices with a cache entry
    pub fn devices(&self) -> Vec<DeviceId> {
        recover(self.devices.read(), "devices").keys().cloned().collect()
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        recover(self.devices.read(), "devices").len()
    }

    /// True when no device has been seen
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn per_device_isolation() {
        let cache = LastValueCache::new();
        let d1 = DeviceId::from("1");
        let d2 = DeviceId::from("2");

        cache.set_last_value(&d1, "humidity", 55.0, Some(1_000));
        cache.set_last_value(&d2, "humidity", 80.0, Some(1_000));

        assert_eq!(cache.get_last_value(&d1, "humidity").unwrap().value, 55.0);
        assert_eq!(cache.get_last_value(&d2, "humidity").unwrap().value, 80.0);
        assert!(cache.get_last_value(&d1, "temperature").is_none());
        assert!(cache.get_last_value(&DeviceId::from("3"), "humidity").is_none());
    }

    #[test]
    fn last_write_wins() {
        let cache = LastValueCache::new();
        let device = DeviceId::from(7u64);

        cache.set_last_value(&device, "humidity", 55.0, Some(1_000));
        cache.set_last_value(&device, "humidity", 60.0, Some(2_000));
        assert_eq!(
            cache.get_last_value(&device, "humidity"),
            Some(CachedValue {
                value: 60.0,
                timestamp: Some(2_000)
            })
        );

        // No timestamp comparison: an older write still replaces
        cache.set_last_value(&device, "humidity", 50.0, Some(500));
        assert_eq!(cache.get_last_value(&device, "humidity").unwrap().value, 50.0);
    }

    #[test]
    fn poisoned_device_lock_is_recovered() {
        let cache = Arc::new(LastValueCache::new());
        let device = DeviceId::from("9");
        cache.set_last_value(&device, "temperature", 20.0, None);

        let poisoner = Arc::clone(&cache);
        let id = device.clone();
        let _ = thread::spawn(move || {
            poisoner.with_device(&id, |_| panic!("poison"));
        })
        .join();

        cache.set_last_value(&device, "temperature", 21.0, None);
        assert_eq!(cache.get_last_value(&device, "temperature").unwrap().value, 21.0);
    }

    #[test]
    fn concurrent_writers_on_distinct_devices() {
        let cache = Arc::new(LastValueCache::new());

        let handles: Vec<_> = (0..8u64)
            .map(|id| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let device = DeviceId::from(id);
                    for i in 0..100 {
                        cache.set_last_value(&device, "pm10", i as f64, Some(i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        for id in 0..8u64 {
            assert_eq!(cache.get_last_value(&DeviceId::from(id), "pm10").unwrap().value, 99.0);
        }
    }
}
