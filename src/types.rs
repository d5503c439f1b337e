//! Core data types for the AgroLink device-link session
//!
//! This module contains the fundamental data structures used throughout
//! the crate for representing sensor readings, evaluation verdicts, and
//! the UI-observable state of the link.
//!
//! # Main Types
//!
//! - [`Reading`] - One structured sensor sample with provenance metadata
//! - [`Verdict`] - The fit-for-planting decision derived from a reading
//! - [`ConnectionStatus`] - Lifecycle state of the device link
//! - [`LinkSnapshot`] - Latest UI-observable values published by the worker
//! - [`LinkStats`] - Counters for link activity and persistence outcomes
//!
//! # Moisture codes
//!
//! The soil probe reports moisture as a single digit: `0` = dry, `1` = wet.
//! Anything else (including the parser's `-1` fallback) is treated as
//! unknown; [`moisture_label`] maps codes to display text.

use serde::{Deserialize, Serialize};

/// Moisture code reported for dry soil
pub const MOISTURE_DRY: i32 = 0;

/// Moisture code reported for wet soil
pub const MOISTURE_WET: i32 = 1;

/// Sentinel for a missing or unparseable moisture field
pub const MOISTURE_UNKNOWN: i32 = -1;

/// Map a moisture code to display text
pub fn moisture_label(code: i32) -> &'static str {
    match code {
        MOISTURE_DRY => "dry",
        MOISTURE_WET => "wet",
        _ => "unknown",
    }
}

/// Connection state of the device link
///
/// Published by the worker on every transition. `Disconnected` is always
/// re-enterable; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// No link; a connect request may be issued
    #[default]
    Disconnected,
    /// Device discovery and stream connect in progress
    Connecting,
    /// Stream open, read loop active
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// One structured sensor sample plus provenance metadata
///
/// Created by the worker for every framed message; never mutated. A reading
/// is dropped once it has been mirrored remotely or appended to the pending
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Wall-clock capture time in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Gas sensor level, in raw sensor units (no defined bounds)
    pub gas: i32,
    /// Soil moisture code; expected domain {0, 1}, `-1` when unknown
    pub moisture: i32,
    /// Identifier of the field unit, constant per deployment
    pub device_id: String,
    /// Identity of the authenticated owner at capture time; empty when
    /// unauthenticated
    pub owner_id: String,
}

impl Reading {
    /// Display text for this reading's moisture code
    pub fn moisture_label(&self) -> &'static str {
        moisture_label(self.moisture)
    }
}

/// A violated sub-condition of the planting rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitReason {
    /// Gas level at or below the configured threshold (the rule is strict `>`)
    GasAtOrBelowThreshold,
    /// Moisture code does not match the configured good code
    MoistureNotSuitable,
}

impl std::fmt::Display for FitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitReason::GasAtOrBelowThreshold => {
                write!(f, "gas level at or below threshold")
            }
            FitReason::MoistureNotSuitable => {
                write!(f, "soil moisture not suitable (requires dry soil)")
            }
        }
    }
}

/// The fit-for-planting decision derived from a reading
///
/// Never persisted on its own; only the reading is durable, and only when
/// the verdict is fit (conditional persistence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether conditions are fit for planting
    pub fit: bool,
    /// Violated sub-conditions, in fixed order: gas first, then moisture
    pub reasons: Vec<FitReason>,
}

impl Verdict {
    /// One-line human-readable summary, in the spirit of the field unit's
    /// status display
    pub fn summary(&self) -> String {
        if self.fit {
            "Conditions fit for planting".to_string()
        } else {
            let reasons: Vec<String> = self.reasons.iter().map(|r| r.to_string()).collect();
            format!("Conditions not fit for planting: {}", reasons.join("; "))
        }
    }
}

/// Latest UI-observable values published by the link worker
///
/// Read through [`crate::link::LinkStateCell::snapshot`]; the worker is the
/// only publisher.
#[derive(Debug, Clone, Default)]
pub struct LinkSnapshot {
    /// Current connection state
    pub status: ConnectionStatus,
    /// Most recent gas level, if any reading arrived this session
    pub last_gas: Option<i32>,
    /// Most recent moisture code
    pub last_moisture: Option<i32>,
    /// Verdict for the most recent reading
    pub last_verdict: Option<Verdict>,
    /// Capture time of the most recent reading (ms since epoch)
    pub last_reading_ms: Option<i64>,
}

/// Counters for link activity and persistence outcomes
///
/// Sent over the event channel periodically while connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Messages produced by the framer
    pub messages_framed: u64,
    /// Messages where one or both fields fell back to defaults
    pub parse_fallbacks: u64,
    /// Times the framer discarded an over-long unterminated line
    pub framer_overflows: u64,
    /// Readings run through the evaluation rule
    pub readings_evaluated: u64,
    /// Commands written to the device
    pub commands_sent: u64,
    /// Successful remote pushes (including drained entries)
    pub remote_pushes: u64,
    /// Failed remote pushes
    pub remote_failures: u64,
    /// Readings appended to the local pending store
    pub queued_local: u64,
    /// Pending entries delivered by drain cycles
    pub drained_entries: u64,
    /// Events dropped because the event channel was full
    pub dropped_events: u64,
}
