//! Shared snapshot of UI-observable link state
//!
//! The worker publishes the latest sample, verdict, and connection status
//! into a [`LinkStateCell`]; the UI layer reads consistent snapshots at its
//! own pace. This replaces ad hoc mutation of shared fields with an
//! explicit publish/snapshot contract — the worker is the only publisher.
//! Transient notices travel over the event channel instead; the cell holds
//! only "latest value" state.

use crate::types::{ConnectionStatus, LinkSnapshot, Verdict};
use std::sync::RwLock;

/// Thread-safe holder of the latest UI-observable link state
#[derive(Debug, Default)]
pub struct LinkStateCell {
    inner: RwLock<LinkSnapshot>,
}

impl LinkStateCell {
    /// Create a cell in the disconnected, no-data state
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a consistent copy of the current state
    pub fn snapshot(&self) -> LinkSnapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Publish a connection-state transition
    pub fn publish_status(&self, status: ConnectionStatus) {
        self.write(|snapshot| snapshot.status = status);
    }

    /// Publish the latest sensor sample
    pub fn publish_sample(&self, gas: i32, moisture: i32, timestamp_ms: i64) {
        self.write(|snapshot| {
            snapshot.last_gas = Some(gas);
            snapshot.last_moisture = Some(moisture);
            snapshot.last_reading_ms = Some(timestamp_ms);
        });
    }

    /// Publish the verdict for the latest sample
    pub fn publish_verdict(&self, verdict: Verdict) {
        self.write(|snapshot| snapshot.last_verdict = Some(verdict));
    }

    fn write(&self, update: impl FnOnce(&mut LinkSnapshot)) {
        match self.inner.write() {
            Ok(mut guard) => update(&mut guard),
            Err(poisoned) => update(&mut poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot() {
        let cell = LinkStateCell::new();
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
        assert!(snapshot.last_gas.is_none());
        assert!(snapshot.last_verdict.is_none());
    }

    #[test]
    fn test_publish_and_snapshot() {
        let cell = LinkStateCell::new();
        cell.publish_status(ConnectionStatus::Connected);
        cell.publish_sample(450, 0, 1_700_000_000_000);
        cell.publish_verdict(Verdict {
            fit: true,
            reasons: vec![],
        });

        let snapshot = cell.snapshot();
        assert_eq!(snapshot.status, ConnectionStatus::Connected);
        assert_eq!(snapshot.last_gas, Some(450));
        assert_eq!(snapshot.last_moisture, Some(0));
        assert_eq!(snapshot.last_reading_ms, Some(1_700_000_000_000));
        assert!(snapshot.last_verdict.unwrap().fit);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let cell = LinkStateCell::new();
        let before = cell.snapshot();
        cell.publish_sample(1, 1, 1);
        assert!(before.last_gas.is_none());
        assert_eq!(cell.snapshot().last_gas, Some(1));
    }

    #[test]
    fn test_concurrent_readers() {
        use std::sync::Arc;
        let cell = Arc::new(LinkStateCell::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let cell = Arc::clone(&cell);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    cell.publish_sample(i, 0, i as i64);
                    let _ = cell.snapshot();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cell.snapshot().last_gas.is_some());
    }
}
