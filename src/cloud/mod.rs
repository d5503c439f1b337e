//! Cloud mirroring for sensor readings
//!
//! This module defines the seam between the link session and the remote
//! key-value store that mirrors readings, plus the two collaborator
//! boundaries the session consumes: the identity of the authenticated owner
//! and the network reachability signal.
//!
//! # Record shape
//!
//! Each reading is mirrored as one JSON record under a per-owner collection:
//!
//! ```text
//! users/<ownerId>/readings/<generatedKey>
//! ```
//!
//! The key is server-generated, unique, and time-ordered. Record field names
//! follow the deployed schema (`gasValue`, `humidityValue`, `deviceId`,
//! `userId`).
//!
//! # Retry semantics
//!
//! [`RemoteStore::push`] does not retry internally. Failed pushes are the
//! caller's responsibility; the link worker falls back to the local pending
//! store and retries through its drain cycle.

pub mod memory;

pub use memory::MemoryRemoteStore;

use crate::error::{AgroLinkError, Result};
use crate::types::Reading;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Server-generated unique key of a mirrored record
pub type RecordKey = String;

/// One mirrored reading, in the deployed record schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Gas sensor level
    #[serde(rename = "gasValue")]
    pub gas_value: i32,
    /// Soil moisture code
    #[serde(rename = "humidityValue")]
    pub humidity_value: i32,
    /// Field-unit identifier
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Owner the record is attributed to
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl RemoteRecord {
    /// Build a record from a reading
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            timestamp: reading.timestamp_ms,
            gas_value: reading.gas,
            humidity_value: reading.moisture,
            device_id: reading.device_id.clone(),
            user_id: reading.owner_id.clone(),
        }
    }

    /// Collection path this record belongs under
    pub fn collection_path(&self) -> String {
        format!("users/{}/readings", self.user_id)
    }
}

/// Generate a fresh unique record key
///
/// Millisecond timestamp plus a process-wide sequence number keep keys
/// sortable by creation order even within one millisecond; the UUID suffix
/// guarantees uniqueness across processes and retries.
pub fn generate_key() -> RecordKey {
    static SEQUENCE: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!(
        "{:013}-{:06}-{}",
        chrono::Utc::now().timestamp_millis(),
        seq,
        uuid::Uuid::new_v4().simple()
    )
}

/// Interface to the remote per-owner key-value store
///
/// Implementations must refuse records with an empty `user_id` with
/// [`AgroLinkError::Unauthenticated`] before doing any remote work, and must
/// not retry internally. Implementations must be `Send` so the link worker
/// can own them on its thread.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteStore: Send {
    /// Push one record; on success returns the server-generated key it was
    /// stored under
    fn push(&mut self, record: &RemoteRecord) -> Result<RecordKey>;
}

/// Guard shared by [`RemoteStore`] implementations: refuse unauthenticated
/// records up front
pub(crate) fn require_owner(record: &RemoteRecord) -> Result<()> {
    if record.user_id.is_empty() {
        return Err(AgroLinkError::Unauthenticated);
    }
    Ok(())
}

// ==================== Collaborator boundaries ====================

/// Source of the currently authenticated owner identity
///
/// The auth flow itself is outside this crate; the session only consumes
/// the resulting identity.
pub trait IdentityProvider: Send {
    /// Identity of the authenticated owner, or `None` when signed out
    fn current_owner(&self) -> Option<String>;
}

/// Fixed identity, typically sourced from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    owner: Option<String>,
}

impl StaticIdentity {
    /// Create an identity provider that always reports `owner`
    pub fn new(owner: Option<String>) -> Self {
        Self { owner }
    }

    /// An identity provider for the signed-out state
    pub fn signed_out() -> Self {
        Self { owner: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_owner(&self) -> Option<String> {
        self.owner.clone()
    }
}

/// Source of the "is the network reachable" signal
pub trait ConnectivityProbe: Send {
    /// Whether the remote store is believed reachable right now
    fn is_online(&self) -> bool;
}

/// Connectivity flag shared between the embedder and the link worker
///
/// The embedder flips the flag from its own network callbacks; the worker
/// only reads it.
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    online: Arc<AtomicBool>,
}

impl SharedConnectivity {
    /// Create a flag with the given initial state
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    /// Update the reachability state
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for SharedConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
