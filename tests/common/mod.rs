//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use agrolink::cloud::{MemoryRemoteStore, RemoteRecord, RemoteStore};
use agrolink::config::AppConfig;
use agrolink::error::Result;
use agrolink::link::LinkEvent;
use agrolink::types::Reading;
use crossbeam_channel::Receiver;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long event-driven assertions wait before giving up
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Build a config whose pending store lives under `dir`
pub fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.pending.path = Some(dir.join("pending_readings.log"));
    config.cloud.owner_id = Some("owner-1".to_string());
    config
}

/// A reading with sensible defaults for tests
pub fn test_reading(gas: i32, moisture: i32, timestamp_ms: i64) -> Reading {
    Reading {
        timestamp_ms,
        gas,
        moisture,
        device_id: "agrobot_main".to_string(),
        owner_id: "owner-1".to_string(),
    }
}

/// Collect events until `predicate` matches one, or the timeout elapses
///
/// Returns every event received, whether or not the predicate matched.
pub fn collect_until(
    events: &Receiver<LinkEvent>,
    predicate: impl Fn(&LinkEvent) -> bool,
) -> Vec<LinkEvent> {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    let mut collected = Vec::new();
    while Instant::now() < deadline {
        match events.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                let done = predicate(&event);
                collected.push(event);
                if done {
                    break;
                }
            }
            Err(_) => {}
        }
    }
    collected
}

/// A remote store that stays inspectable after the backend takes ownership
///
/// Wraps a [`MemoryRemoteStore`] behind a shared lock; clone one side into
/// the backend and keep the other for assertions.
#[derive(Clone)]
pub struct SharedRemote {
    inner: Arc<Mutex<MemoryRemoteStore>>,
}

impl SharedRemote {
    pub fn new(store: MemoryRemoteStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn len_for(&self, owner: &str) -> usize {
        self.inner.lock().unwrap().len_for(owner)
    }

    pub fn records_for(&self, owner: &str) -> Vec<(String, RemoteRecord)> {
        self.inner.lock().unwrap().records_for(owner)
    }

    pub fn set_reachable(&self) {
        self.inner.lock().unwrap().set_reachable();
    }
}

impl RemoteStore for SharedRemote {
    fn push(&mut self, record: &RemoteRecord) -> Result<String> {
        self.inner.lock().unwrap().push(record)
    }
}
