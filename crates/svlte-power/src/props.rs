//! Device property store seam.
//!
//! The platform exposes a flat string key/value space written by the boot
//! chain, the modem control channel, and this subsystem. Reads are
//! synchronous and possibly stale; the engine re-reads on every decision
//! rather than caching.

use std::collections::HashMap;
use std::sync::Mutex;

/// Accessor over the device property space.
///
/// Implemented by the platform binding in production and by
/// [`MemPropertyStore`] in simulation and tests.
pub trait PropertyStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// A key read as a boolean flag: set and equal to "1".
pub fn flag_set(props: &dyn PropertyStore, key: &str) -> bool {
    props.get(key).as_deref() == Some("1")
}

/// A key read as a meaningful value: set and non-empty.
pub fn nonempty(props: &dyn PropertyStore, key: &str) -> Option<String> {
    props.get(key).filter(|v| !v.is_empty())
}

/// In-memory property store used by the simulation harness and tests.
#[derive(Debug, Default)]
pub struct MemPropertyStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyStore for MemPropertyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}
