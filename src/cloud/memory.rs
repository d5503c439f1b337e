//! In-process remote store
//!
//! A [`RemoteStore`] backed by an in-memory JSON tree mirroring the remote
//! store's layout (`users/<owner>/readings/<key>`). Used by the demo binary
//! and by tests; real deployments plug their cloud adapter in behind the
//! same trait.
//!
//! # Failure injection
//!
//! Individual pushes can be made to fail for exercising the fallback and
//! drain paths:
//!
//! ```
//! use agrolink::cloud::{MemoryRemoteStore, RemoteStore};
//!
//! // The second push (1-based) fails, everything else succeeds
//! let mut store = MemoryRemoteStore::new().with_failure_on(2);
//! ```

use super::{generate_key, require_owner, RecordKey, RemoteRecord, RemoteStore};
use crate::error::{AgroLinkError, Result};
use serde_json::{json, Value};
use std::collections::HashSet;

/// In-memory JSON-tree remote store with failure injection
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    /// The mirrored tree, rooted at `users`
    tree: serde_json::Map<String, Value>,
    /// Total pushes attempted so far (authenticated or not)
    attempts: usize,
    /// 1-based attempt indices that fail
    failing_attempts: HashSet<usize>,
    /// When set, every push fails with this cause
    fail_all: Option<String>,
}

impl MemoryRemoteStore {
    /// Create an empty store where every push succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `attempt`-th push (1-based) fail
    pub fn with_failure_on(mut self, attempt: usize) -> Self {
        self.failing_attempts.insert(attempt);
        self
    }

    /// Make every push fail with the given cause
    pub fn with_unreachable(mut self, cause: impl Into<String>) -> Self {
        self.fail_all = Some(cause.into());
        self
    }

    /// Stop failing pushes
    pub fn set_reachable(&mut self) {
        self.fail_all = None;
        self.failing_attempts.clear();
    }

    /// Records stored for one owner, keyed by record key, in key order
    pub fn records_for(&self, owner: &str) -> Vec<(RecordKey, RemoteRecord)> {
        let mut records: Vec<(RecordKey, RemoteRecord)> = self
            .tree
            .get("users")
            .and_then(|users| users.get(owner))
            .and_then(|node| node.get("readings"))
            .and_then(Value::as_object)
            .map(|readings| {
                readings
                    .iter()
                    .filter_map(|(key, value)| {
                        serde_json::from_value(value.clone())
                            .ok()
                            .map(|record| (key.clone(), record))
                    })
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by(|(a, _), (b, _)| a.cmp(b));
        records
    }

    /// Number of records stored for one owner
    pub fn len_for(&self, owner: &str) -> usize {
        self.records_for(owner).len()
    }

    /// Snapshot of the whole tree as JSON
    pub fn as_json(&self) -> Value {
        Value::Object(self.tree.clone())
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn push(&mut self, record: &RemoteRecord) -> Result<RecordKey> {
        self.attempts += 1;

        require_owner(record)?;

        if let Some(cause) = &self.fail_all {
            return Err(AgroLinkError::Remote(cause.clone()));
        }
        if self.failing_attempts.contains(&self.attempts) {
            return Err(AgroLinkError::Remote(format!(
                "injected failure on push {}",
                self.attempts
            )));
        }

        let key = generate_key();
        let value = serde_json::to_value(record)
            .map_err(|e| AgroLinkError::Remote(format!("record serialization failed: {}", e)))?;

        let users = self
            .tree
            .entry("users".to_string())
            .or_insert_with(|| json!({}));
        if let Value::Object(users) = users {
            let owner = users
                .entry(record.user_id.clone())
                .or_insert_with(|| json!({ "readings": {} }));
            if let Value::Object(owner) = owner {
                let readings = owner
                    .entry("readings".to_string())
                    .or_insert_with(|| json!({}));
                if let Value::Object(readings) = readings {
                    readings.insert(key.clone(), value);
                }
            }
        }

        tracing::debug!(
            "Mirrored reading to {}/{}",
            record.collection_path(),
            key
        );
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reading;

    fn record(owner: &str, gas: i32) -> RemoteRecord {
        RemoteRecord::from_reading(&Reading {
            timestamp_ms: 1_700_000_000_000 + gas as i64,
            gas,
            moisture: 0,
            device_id: "agrobot_main".to_string(),
            owner_id: owner.to_string(),
        })
    }

    #[test]
    fn test_push_stores_under_owner_collection() {
        let mut store = MemoryRemoteStore::new();
        let key = store.push(&record("owner-1", 400)).unwrap();

        let stored = store.records_for("owner-1");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, key);
        assert_eq!(stored[0].1.gas_value, 400);
        assert_eq!(store.len_for("someone-else"), 0);
    }

    #[test]
    fn test_push_assigns_fresh_keys() {
        let mut store = MemoryRemoteStore::new();
        let a = store.push(&record("owner-1", 400)).unwrap();
        let b = store.push(&record("owner-1", 401)).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len_for("owner-1"), 2);
    }

    #[test]
    fn test_unauthenticated_push_refused_without_mutation() {
        let mut store = MemoryRemoteStore::new();
        let result = store.push(&record("", 400));
        assert!(matches!(result, Err(AgroLinkError::Unauthenticated)));
        assert_eq!(store.as_json(), serde_json::json!({}));
    }

    #[test]
    fn test_injected_failure_on_second_push() {
        let mut store = MemoryRemoteStore::new().with_failure_on(2);
        assert!(store.push(&record("owner-1", 1)).is_ok());
        assert!(matches!(
            store.push(&record("owner-1", 2)),
            Err(AgroLinkError::Remote(_))
        ));
        assert!(store.push(&record("owner-1", 3)).is_ok());
        assert_eq!(store.len_for("owner-1"), 2);
    }

    #[test]
    fn test_unreachable_then_recovered() {
        let mut store = MemoryRemoteStore::new().with_unreachable("network down");
        assert!(store.push(&record("owner-1", 1)).is_err());
        store.set_reachable();
        assert!(store.push(&record("owner-1", 2)).is_ok());
    }
}
