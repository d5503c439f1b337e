//! Device-link session backend
//!
//! This module owns the radio connection lifecycle in a separate thread to
//! keep the UI responsive. It uses crossbeam channels for thread-safe
//! communication with the embedding layer.
//!
//! # Architecture
//!
//! The backend runs in a dedicated thread, communicating via channels and a
//! shared snapshot cell:
//!
//! - [`LinkCommand`] - Messages sent from the UI to the worker (connect,
//!   send, drain, shutdown)
//! - [`LinkEvent`] - Messages sent from the worker to the UI (readings,
//!   verdicts, status changes, notices)
//! - [`LinkHandle`] - UI-side handle for sending commands, receiving
//!   events, and reading state snapshots
//! - [`DeviceLink`] - Backend entry point that the embedder runs on its
//!   own thread
//!
//! # Components
//!
//! - [`LineFramer`] - Splits the byte stream into newline-terminated
//!   messages
//! - [`LinkTransport`] / [`SerialPortTransport`] - Stream seam and its real
//!   serial-port implementation
//! - [`MockTransport`] - Scripted transport for tests (feature-gated)
//! - [`LinkWorker`] - Worker loop: state machine, read loop, persistence
//!   routing
//! - [`LinkStateCell`] - Publish/snapshot holder for UI-observable state
//!
//! # Example
//!
//! ```ignore
//! use agrolink::config::AppConfig;
//! use agrolink::link::{DeviceLink, DeviceCommand, LinkEvent};
//!
//! let config = AppConfig::load_or_default();
//! let (link, handle) = DeviceLink::new(config)?;
//!
//! std::thread::spawn(move || link.run());
//!
//! handle.connect();
//! handle.send(DeviceCommand::RequestReading);
//!
//! for event in handle.drain_events() {
//!     if let LinkEvent::Reading { reading, verdict } = event {
//!         println!("gas {} -> {}", reading.gas, verdict.summary());
//!     }
//! }
//! ```

pub mod framing;
#[cfg(any(test, feature = "mock-link"))]
pub mod mock;
pub mod state;
pub mod transport;
pub mod wire;
pub mod worker;

pub use framing::LineFramer;
#[cfg(any(test, feature = "mock-link"))]
pub use mock::{MockStep, MockTransport};
pub use state::LinkStateCell;
pub use transport::{LinkTransport, SerialPortTransport};
pub use wire::{parse_sample, DeviceCommand, Sample};
pub use worker::LinkWorker;

use crate::cloud::{
    ConnectivityProbe, IdentityProvider, MemoryRemoteStore, RecordKey, RemoteStore,
    SharedConnectivity, StaticIdentity,
};
use crate::config::AppConfig;
use crate::error::Result;
use crate::pending::{DrainReport, PendingStore};
use crate::types::{ConnectionStatus, LinkSnapshot, LinkStats, Reading, Verdict};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Capacity of the UI-to-worker command channel
const COMMAND_CAPACITY: usize = 64;

/// Capacity of the worker-to-UI event channel; bounded so a stalled UI
/// applies backpressure instead of growing memory
const EVENT_CAPACITY: usize = 1024;

/// Message sent from the UI to the link worker
#[derive(Debug, Clone)]
pub enum LinkCommand {
    /// Discover the configured device and open the stream
    Connect,
    /// Tear the link down
    Disconnect,
    /// Write one command to the device (requires `Connected`)
    Send(DeviceCommand),
    /// Attempt a drain of the pending store now
    DrainPending,
    /// Stop the worker
    Shutdown,
}

/// Message sent from the link worker to the UI
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Connection state changed
    Status(ConnectionStatus),
    /// Transient user-visible notice (connect failures, link loss,
    /// persistence fallbacks)
    Notice(String),
    /// A framed message was parsed and evaluated
    Reading {
        reading: Reading,
        verdict: Verdict,
    },
    /// A command was written to the device
    CommandSent(DeviceCommand),
    /// A command could not be written
    CommandFailed {
        command: DeviceCommand,
        error: String,
    },
    /// A reading was mirrored remotely under this key
    RemoteStored { key: RecordKey },
    /// A reading was appended to the pending store
    QueuedLocally,
    /// A drain cycle completed
    Drained(DrainReport),
    /// Periodic counters
    Stats(LinkStats),
    /// The worker is shutting down
    Shutdown,
}

/// The injectable parts the worker runs against
///
/// [`DeviceLink::new`] wires the defaults; tests and embedders with their
/// own cloud adapter use [`DeviceLink::with_parts`].
pub struct LinkParts {
    /// Stream transport to the device
    pub transport: Box<dyn LinkTransport>,
    /// Remote key-value store for mirrored readings
    pub remote: Box<dyn RemoteStore>,
    /// Source of the authenticated owner identity
    pub identity: Box<dyn IdentityProvider>,
    /// Network reachability signal
    pub connectivity: Box<dyn ConnectivityProbe>,
    /// Durable queue for readings that could not be mirrored
    pub pending: PendingStore,
}

/// UI-side handle to the link backend
pub struct LinkHandle {
    /// Receiver for worker events
    pub events: Receiver<LinkEvent>,
    /// Sender for commands to the worker
    pub commands: Sender<LinkCommand>,
    /// Shared snapshot of the latest UI-observable state
    pub state: Arc<LinkStateCell>,
}

impl LinkHandle {
    /// Try to receive one event without blocking
    pub fn try_recv(&self) -> Option<LinkEvent> {
        self.events.try_recv().ok()
    }

    /// Receive all pending events
    pub fn drain_events(&self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Read a consistent copy of the latest link state
    pub fn snapshot(&self) -> LinkSnapshot {
        self.state.snapshot()
    }

    /// Send a command to the worker
    pub fn send_command(&self, cmd: LinkCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    /// Request a connect
    pub fn connect(&self) {
        let _ = self.commands.send(LinkCommand::Connect);
    }

    /// Request a disconnect
    pub fn disconnect(&self) {
        let _ = self.commands.send(LinkCommand::Disconnect);
    }

    /// Send one device command
    pub fn send(&self, command: DeviceCommand) {
        let _ = self.commands.send(LinkCommand::Send(command));
    }

    /// Request a drain of the pending store
    pub fn drain_pending(&self) {
        let _ = self.commands.send(LinkCommand::DrainPending);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.commands.send(LinkCommand::Shutdown);
    }
}

/// The link backend, run on its own thread by the embedder
pub struct DeviceLink {
    config: AppConfig,
    parts: LinkParts,
    command_rx: Receiver<LinkCommand>,
    event_tx: Sender<LinkEvent>,
    running: Arc<AtomicBool>,
    state: Arc<LinkStateCell>,
}

impl DeviceLink {
    /// Create a backend with the default parts: a real serial transport,
    /// the in-process remote store, identity and connectivity from config
    pub fn new(config: AppConfig) -> Result<(Self, LinkHandle)> {
        let transport = SerialPortTransport::new(
            config.link.baud_rate,
            Duration::from_millis(config.link.read_timeout_ms),
        );
        let pending = PendingStore::new(config.pending.resolved_path(), config.pending.policy);
        let parts = LinkParts {
            transport: Box::new(transport),
            remote: Box::new(MemoryRemoteStore::new()),
            identity: Box::new(StaticIdentity::new(config.cloud.owner_id.clone())),
            connectivity: Box::new(SharedConnectivity::new(true)),
            pending,
        };
        Ok(Self::with_parts(config, parts))
    }

    /// Create a backend around explicitly injected parts
    pub fn with_parts(config: AppConfig, parts: LinkParts) -> (Self, LinkHandle) {
        let (cmd_tx, cmd_rx) = bounded(COMMAND_CAPACITY);
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        let state = Arc::new(LinkStateCell::new());

        let link = Self {
            config,
            parts,
            command_rx: cmd_rx,
            event_tx,
            running: Arc::new(AtomicBool::new(true)),
            state: Arc::clone(&state),
        };
        let handle = LinkHandle {
            events: event_rx,
            commands: cmd_tx,
            state,
        };
        (link, handle)
    }

    /// Run the worker loop; returns when the backend shuts down
    pub fn run(self) {
        let mut worker = LinkWorker::new(
            self.config,
            self.parts,
            self.command_rx,
            self.event_tx,
            self.running,
            self.state,
        );
        worker.run();
    }

    /// Handle for stopping the backend from outside the command channel
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn test_parts() -> LinkParts {
        let dir = std::env::temp_dir().join(format!("agrolink-test-{}", std::process::id()));
        LinkParts {
            transport: Box::new(mock::MockTransport::new()),
            remote: Box::new(MemoryRemoteStore::new()),
            identity: Box::new(StaticIdentity::new(Some("owner-1".to_string()))),
            connectivity: Box::new(SharedConnectivity::new(true)),
            pending: PendingStore::new(
                dir.join("pending_readings.log"),
                crate::pending::DrainPolicy::AtLeastOnce,
            ),
        }
    }

    #[test]
    fn test_backend_creation() {
        let (link, handle) = DeviceLink::with_parts(AppConfig::default(), test_parts());

        assert!(link.running.load(Ordering::SeqCst));
        assert!(handle.send_command(LinkCommand::Shutdown));
        assert_eq!(
            handle.snapshot().status,
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_handle_commands_enqueue() {
        let (_link, handle) = DeviceLink::with_parts(AppConfig::default(), test_parts());

        handle.connect();
        handle.send(DeviceCommand::ActuatorOn);
        handle.drain_pending();
        handle.disconnect();
        handle.shutdown();
    }

    #[test]
    fn test_backend_thread_lifecycle() {
        let (link, handle) = DeviceLink::with_parts(AppConfig::default(), test_parts());

        let join = std::thread::spawn(move || link.run());
        handle.shutdown();
        join.join().expect("worker thread exits cleanly");

        let events = handle.drain_events();
        assert!(events.iter().any(|e| matches!(e, LinkEvent::Shutdown)));
    }
}
