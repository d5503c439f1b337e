//! Local pending store for readings awaiting remote persistence
//!
//! When the network is unreachable (or a push fails), readings are appended
//! to a durable append-only log: one line per entry, in the same field
//! notation the device speaks, plus a capture timestamp:
//!
//! ```text
//! G:<gas>,H:<moisture>,T:<timestamp-ms>
//! ```
//!
//! The log is a FIFO queue backed by a single file. All writes replace the
//! file atomically (write to a temp file in the same directory, then
//! rename), so a crash mid-write never corrupts queued entries.
//!
//! # Drain semantics
//!
//! [`PendingStore::drain`] hands queued entries to a [`RemoteStore`] in
//! insertion order. Two delivery policies exist:
//!
//! - [`DrainPolicy::AtLeastOnce`] (default): every entry is attempted;
//!   acknowledged entries are removed individually, failed entries are kept
//!   in order for a later retry. Retries may duplicate records remotely
//!   (keys are server-generated per push).
//! - [`DrainPolicy::AllOrNothing`]: attempts stop at the first failure and
//!   the stored content is left untouched; the log is cleared only after a
//!   fully successful pass.
//!
//! # Single writer
//!
//! Methods take `&mut self`; the link worker is the sole owner, which
//! serializes `append` against `drain`. Nothing here is safe for two
//! concurrent owners of the same backing file.

use crate::cloud::{RemoteRecord, RemoteStore};
use crate::error::{AgroLinkError, Result};
use crate::types::{Reading, MOISTURE_UNKNOWN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Delivery semantics for draining queued readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainPolicy {
    /// Attempt every entry; remove acknowledged entries individually,
    /// keep failures in order for a later retry
    #[default]
    AtLeastOnce,
    /// Stop at the first failure and keep the stored content untouched;
    /// clear only after a fully successful pass
    AllOrNothing,
}

/// Outcome of one drain cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Entries handed to the sink
    pub attempted: usize,
    /// Entries the sink acknowledged
    pub delivered: usize,
    /// Entries still queued after the cycle
    pub remaining: usize,
}

/// File-backed FIFO queue of readings awaiting remote persistence
#[derive(Debug)]
pub struct PendingStore {
    path: PathBuf,
    policy: DrainPolicy,
}

impl PendingStore {
    /// Create a store backed by the given file, creating it lazily on the
    /// first append
    pub fn new(path: impl Into<PathBuf>, policy: DrainPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured drain policy
    pub fn policy(&self) -> DrainPolicy {
        self.policy
    }

    /// Number of queued entries
    pub fn len(&self) -> Result<usize> {
        Ok(entry_lines(&self.read_content()?).count())
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append one reading to the end of the queue
    pub fn append(&mut self, reading: &Reading) -> Result<()> {
        let mut content = self.read_content()?;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&encode_entry(reading));
        content.push('\n');
        self.write_content(&content)?;
        tracing::debug!("Queued reading locally ({} bytes pending)", content.len());
        Ok(())
    }

    /// Hand queued entries to `sink` in insertion order
    ///
    /// Entries are re-attributed to `owner` and `device_id` at drain time
    /// (queued lines carry only the sensor fields and timestamp). A no-op
    /// when the queue is empty. Connectivity is the caller's check.
    pub fn drain(
        &mut self,
        sink: &mut dyn RemoteStore,
        owner: &str,
        device_id: &str,
    ) -> Result<DrainReport> {
        let content = self.read_content()?;
        let lines: Vec<&str> = entry_lines(&content).collect();
        if lines.is_empty() {
            return Ok(DrainReport::default());
        }

        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut report = DrainReport {
            attempted: 0,
            delivered: 0,
            remaining: 0,
        };
        let mut kept: Vec<&str> = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let (gas, moisture, timestamp_ms) = decode_entry(line, now_ms);
            let record = RemoteRecord {
                timestamp: timestamp_ms,
                gas_value: gas,
                humidity_value: moisture,
                device_id: device_id.to_string(),
                user_id: owner.to_string(),
            };

            report.attempted += 1;
            match sink.push(&record) {
                Ok(key) => {
                    report.delivered += 1;
                    tracing::debug!("Drained pending entry {} as {}", index, key);
                }
                Err(e) => {
                    tracing::warn!("Drain push failed on entry {}: {}", index, e);
                    match self.policy {
                        DrainPolicy::AllOrNothing => {
                            // Leave the stored content byte-for-byte intact
                            report.remaining = lines.len();
                            return Ok(report);
                        }
                        DrainPolicy::AtLeastOnce => kept.push(line),
                    }
                }
            }
        }

        report.remaining = kept.len();
        if kept.is_empty() {
            self.write_content("")?;
            tracing::info!("Pending queue drained ({} delivered)", report.delivered);
        } else {
            let mut content = kept.join("\n");
            content.push('\n');
            self.write_content(&content)?;
            tracing::info!(
                "Pending queue partially drained ({} delivered, {} kept)",
                report.delivered,
                report.remaining
            );
        }
        Ok(report)
    }

    fn read_content(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(AgroLinkError::Store(format!(
                "Failed to read pending log {:?}: {}",
                self.path, e
            ))),
        }
    }

    /// Replace the backing file atomically: temp file in the same
    /// directory, then rename over the destination
    fn write_content(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AgroLinkError::Store(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        let tmp_path = self.path.with_extension(format!("tmp-{}", std::process::id()));
        std::fs::write(&tmp_path, content).map_err(|e| {
            AgroLinkError::Store(format!("Failed to write {:?}: {}", tmp_path, e))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            AgroLinkError::Store(format!(
                "Failed to replace pending log {:?}: {}",
                self.path, e
            ))
        })
    }
}

/// Serialize one reading as a queue line
fn encode_entry(reading: &Reading) -> String {
    format!(
        "G:{},H:{},T:{}",
        reading.gas, reading.moisture, reading.timestamp_ms
    )
}

/// Parse one queue line with the same tolerant defaults as the wire parser
///
/// Missing or garbled fields fall back: gas 0, moisture -1, timestamp
/// `now_ms`. Total; never fails.
fn decode_entry(line: &str, now_ms: i64) -> (i32, i32, i64) {
    let mut gas: Option<i32> = None;
    let mut moisture: Option<i32> = None;
    let mut timestamp: Option<i64> = None;

    for field in line.split(',') {
        if let Some(rest) = field.strip_prefix("G:") {
            gas = rest.parse().ok().or(gas);
        } else if let Some(rest) = field.strip_prefix("H:") {
            moisture = rest.parse().ok().or(moisture);
        } else if let Some(rest) = field.strip_prefix("T:") {
            timestamp = rest.parse().ok().or(timestamp);
        }
    }

    (
        gas.unwrap_or(0),
        moisture.unwrap_or(MOISTURE_UNKNOWN),
        timestamp.unwrap_or(now_ms),
    )
}

fn entry_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter(|line| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MemoryRemoteStore;
    use tempfile::TempDir;

    fn reading(gas: i32, moisture: i32, timestamp_ms: i64) -> Reading {
        Reading {
            timestamp_ms,
            gas,
            moisture,
            device_id: "agrobot_main".to_string(),
            owner_id: "owner-1".to_string(),
        }
    }

    fn store_in(dir: &TempDir, policy: DrainPolicy) -> PendingStore {
        PendingStore::new(dir.path().join("pending_readings.log"), policy)
    }

    #[test]
    fn test_append_creates_file_and_encodes_entries() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, DrainPolicy::AtLeastOnce);

        store.append(&reading(5, 0, 100)).unwrap();
        store.append(&reading(6, 1, 200)).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "G:5,H:0,T:100\nG:6,H:1,T:200\n");
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_drain_delivers_in_insertion_order_and_clears() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, DrainPolicy::AtLeastOnce);
        store.append(&reading(5, 0, 100)).unwrap();
        store.append(&reading(6, 1, 200)).unwrap();

        let mut sink = MemoryRemoteStore::new();
        let report = store.drain(&mut sink, "owner-1", "agrobot_main").unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.remaining, 0);
        assert!(store.is_empty().unwrap());

        let records = sink.records_for("owner-1");
        assert_eq!(records.len(), 2);
        // Keys are time-ordered, so insertion order survives
        assert_eq!(records[0].1.gas_value, 5);
        assert_eq!(records[1].1.gas_value, 6);
        assert_eq!(records[0].1.timestamp, 100);
        assert_eq!(records[1].1.timestamp, 200);
    }

    #[test]
    fn test_all_or_nothing_keeps_content_byte_for_byte_on_failure() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, DrainPolicy::AllOrNothing);
        store.append(&reading(5, 0, 100)).unwrap();
        store.append(&reading(6, 1, 200)).unwrap();
        store.append(&reading(7, 0, 300)).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let mut sink = MemoryRemoteStore::new().with_failure_on(2);
        let report = store.drain(&mut sink, "owner-1", "agrobot_main").unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.remaining, 3);
        let after = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn test_at_least_once_removes_acknowledged_entries_individually() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, DrainPolicy::AtLeastOnce);
        store.append(&reading(5, 0, 100)).unwrap();
        store.append(&reading(6, 1, 200)).unwrap();
        store.append(&reading(7, 0, 300)).unwrap();

        let mut sink = MemoryRemoteStore::new().with_failure_on(2);
        let report = store.drain(&mut sink, "owner-1", "agrobot_main").unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.remaining, 1);
        // Only the failed entry survives, unchanged
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "G:6,H:1,T:200\n");

        // A later full retry delivers it
        let report = store.drain(&mut sink, "owner-1", "agrobot_main").unwrap();
        assert_eq!(report.delivered, 1);
        assert!(store.is_empty().unwrap());
        assert_eq!(sink.len_for("owner-1"), 3);
    }

    #[test]
    fn test_drain_empty_store_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir, DrainPolicy::AtLeastOnce);
        let mut sink = MemoryRemoteStore::new();

        let report = store.drain(&mut sink, "owner-1", "agrobot_main").unwrap();
        assert_eq!(report, DrainReport::default());
        assert_eq!(sink.len_for("owner-1"), 0);
        // No file is created by a drain
        assert!(!store.path().exists());
    }

    #[test]
    fn test_decode_entry_tolerant_defaults() {
        assert_eq!(decode_entry("G:5,H:1,T:42", 999), (5, 1, 42));
        assert_eq!(decode_entry("G:abc,H:1,T:42", 999), (0, 1, 42));
        assert_eq!(decode_entry("G:5", 999), (5, MOISTURE_UNKNOWN, 999));
        assert_eq!(decode_entry("garbage", 999), (0, MOISTURE_UNKNOWN, 999));
        assert_eq!(decode_entry("G:5,H:1,T:xx", 999), (5, 1, 999));
    }

    #[test]
    fn test_drain_tolerates_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending_readings.log");
        std::fs::write(&path, "G:5,H:0,T:100\nnot a reading\n\nG:7,H:1,T:300\n").unwrap();
        let mut store = PendingStore::new(&path, DrainPolicy::AtLeastOnce);
        assert_eq!(store.len().unwrap(), 3);

        let mut sink = MemoryRemoteStore::new();
        let report = store.drain(&mut sink, "owner-1", "agrobot_main").unwrap();
        assert_eq!(report.delivered, 3);

        let records = sink.records_for("owner-1");
        // The corrupt line became an all-defaults record, not an error
        assert_eq!(records[1].1.gas_value, 0);
        assert_eq!(records[1].1.humidity_value, MOISTURE_UNKNOWN);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, DrainPolicy::AtLeastOnce);
        assert!(store.is_empty().unwrap());
        assert_eq!(store.len().unwrap(), 0);
    }
}
