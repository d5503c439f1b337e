//! # AgroLink: device-link session core for the AgroBot field unit
//!
//! AgroLink owns one serial-over-radio connection to a remote
//! microcontroller: it frames the incoming byte stream into newline-
//! terminated text messages, parses them into structured sensor readings,
//! evaluates a fit-for-planting threshold rule, and mirrors fit readings to
//! a cloud key-value store — falling back to a durable local queue whenever
//! the network is unreachable, and draining that queue opportunistically.
//!
//! ## Architecture
//!
//! - **Link backend**: the session worker runs on a dedicated thread that
//!   exclusively owns the transport stream and the connection state machine
//!   (`Disconnected → Connecting → Connected`)
//! - **Frontend contract**: bounded crossbeam channels carry commands in
//!   and events out; a shared snapshot cell exposes the latest
//!   UI-observable state
//! - **Persistence**: a `RemoteStore` trait seam for the cloud side, with a
//!   file-backed FIFO pending queue for offline operation
//! - **Leniency**: device output is noisy by design — parsing is total and
//!   falls back to sentinel values instead of erroring
//!
//! ## Example
//!
//! ```ignore
//! use agrolink::config::AppConfig;
//! use agrolink::link::{DeviceCommand, DeviceLink, LinkEvent};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let (link, handle) = DeviceLink::new(config)?;
//!
//!     std::thread::spawn(move || link.run());
//!
//!     handle.connect();
//!     handle.send(DeviceCommand::RequestReading);
//!
//!     loop {
//!         for event in handle.drain_events() {
//!             match event {
//!                 LinkEvent::Reading { reading, verdict } => {
//!                     println!("gas {}: {}", reading.gas, verdict.summary());
//!                 }
//!                 LinkEvent::Shutdown => return Ok(()),
//!                 _ => {}
//!             }
//!         }
//!     }
//! }
//! ```

pub mod cloud;
pub mod config;
pub mod error;
pub mod link;
pub mod pending;
pub mod rule;
pub mod types;

// Re-export commonly used types
pub use cloud::{
    ConnectivityProbe, IdentityProvider, MemoryRemoteStore, RemoteRecord, RemoteStore,
    SharedConnectivity, StaticIdentity,
};
pub use config::AppConfig;
pub use error::{AgroLinkError, Result};
pub use link::{DeviceCommand, DeviceLink, LinkCommand, LinkEvent, LinkHandle};
pub use pending::{DrainPolicy, DrainReport, PendingStore};
pub use rule::evaluate;
pub use types::{ConnectionStatus, FitReason, LinkSnapshot, LinkStats, Reading, Verdict};
