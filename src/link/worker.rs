//! Link worker thread implementation
//!
//! This module contains the session manager's worker loop. It runs on one
//! dedicated thread, exclusively owns the transport stream, and drives the
//! whole connection lifecycle: discover → connect → read loop → teardown.
//! It communicates with the UI layer through crossbeam channels and the
//! shared snapshot cell.
//!
//! # Responsibilities
//!
//! - **Command processing**: connect, disconnect, send, drain, shutdown
//! - **State machine**: `Disconnected → Connecting → Connected`, with any
//!   I/O failure or explicit teardown returning to `Disconnected`
//! - **Read loop**: framer → parser → evaluation → persistence routing
//! - **Persistence routing**: fit readings go to the remote store when the
//!   network is reachable, to the pending store otherwise; remote failures
//!   fall back to the pending store; drains run opportunistically
//! - **Stats tracking**: counters published periodically while connected
//!
//! Every failure is absorbed at this boundary and surfaced as an event;
//! nothing propagates out of the loop.

use super::framing::LineFramer;
use super::state::LinkStateCell;
use super::wire::{self, DeviceCommand, Sample};
use super::{LinkCommand, LinkEvent, LinkParts};
use crate::cloud::{ConnectivityProbe, IdentityProvider, RemoteRecord, RemoteStore};
use crate::config::AppConfig;
use crate::error::AgroLinkError;
use crate::pending::PendingStore;
use crate::rule::evaluate;
use crate::types::{ConnectionStatus, LinkStats, Reading};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read buffer size per transport call
const READ_CHUNK_SIZE: usize = 512;

/// How long to block waiting for commands while disconnected
const IDLE_COMMAND_WAIT: Duration = Duration::from_millis(100);

/// How often stats are pushed to the UI while connected
const STATS_INTERVAL: Duration = Duration::from_millis(1000);

/// The worker that owns the device link on its own thread
pub struct LinkWorker {
    config: AppConfig,
    command_rx: Receiver<LinkCommand>,
    event_tx: Sender<LinkEvent>,
    running: Arc<AtomicBool>,
    state: Arc<LinkStateCell>,
    transport: Box<dyn super::transport::LinkTransport>,
    remote: Box<dyn RemoteStore>,
    identity: Box<dyn IdentityProvider>,
    connectivity: Box<dyn ConnectivityProbe>,
    pending: PendingStore,
    framer: LineFramer,
    status: ConnectionStatus,
    stats: LinkStats,
    last_stats_time: Instant,
}

impl LinkWorker {
    /// Create a worker from its communication ends and injected parts
    pub fn new(
        config: AppConfig,
        parts: LinkParts,
        command_rx: Receiver<LinkCommand>,
        event_tx: Sender<LinkEvent>,
        running: Arc<AtomicBool>,
        state: Arc<LinkStateCell>,
    ) -> Self {
        let framer = LineFramer::new(config.link.max_line_len);
        Self {
            config,
            command_rx,
            event_tx,
            running,
            state,
            transport: parts.transport,
            remote: parts.remote,
            identity: parts.identity,
            connectivity: parts.connectivity,
            pending: parts.pending,
            framer,
            status: ConnectionStatus::Disconnected,
            stats: LinkStats::default(),
            last_stats_time: Instant::now(),
        }
    }

    /// Run the main worker loop until shutdown
    pub fn run(&mut self) {
        tracing::info!("Link worker started");

        while self.running.load(Ordering::SeqCst) {
            if self.status == ConnectionStatus::Connected {
                self.process_commands();
                if self.status == ConnectionStatus::Connected {
                    self.read_cycle();
                }
                if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                    self.send_stats();
                    self.last_stats_time = Instant::now();
                }
            } else {
                // Nothing to read; block briefly on the command channel
                match self.command_rx.recv_timeout(IDLE_COMMAND_WAIT) {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        self.running.store(false, Ordering::SeqCst);
                    }
                }
            }
        }

        self.teardown();
        self.set_status(ConnectionStatus::Disconnected);
        let _ = self.event_tx.send(LinkEvent::Shutdown);
        tracing::info!("Link worker stopped");
    }

    /// Process pending commands without blocking
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: LinkCommand) {
        match cmd {
            LinkCommand::Connect => self.handle_connect(),
            LinkCommand::Disconnect => self.handle_disconnect(),
            LinkCommand::Send(command) => self.handle_send(command),
            LinkCommand::DrainPending => self.opportunistic_drain(),
            LinkCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Handle a connect request
    ///
    /// A connect while already linked supersedes: the old stream is torn
    /// down first. The link is a single-slot resource.
    fn handle_connect(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            tracing::info!("Connect request supersedes existing link");
            self.teardown();
            self.set_status(ConnectionStatus::Disconnected);
        }

        self.set_status(ConnectionStatus::Connecting);
        match self.transport.connect(&self.config.link.device_name) {
            Ok(()) => {
                self.framer.reset();
                self.set_status(ConnectionStatus::Connected);
                tracing::info!("Connected to '{}'", self.config.link.device_name);
                self.notice(format!("Connected to {}", self.config.link.device_name));
                // The link coming up is a drain opportunity
                self.opportunistic_drain();
            }
            Err(e) => {
                tracing::warn!("Connect failed: {}", e);
                self.notice(format!("Connect failed: {}", e));
                self.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    /// Handle an explicit disconnect request
    fn handle_disconnect(&mut self) {
        self.teardown();
        self.set_status(ConnectionStatus::Disconnected);
        tracing::info!("Disconnected from device");
    }

    /// Write one command to the device
    ///
    /// Requires `Connected`; otherwise fails immediately without touching
    /// the transport. A write failure tears the link down.
    fn handle_send(&mut self, command: DeviceCommand) {
        if self.status != ConnectionStatus::Connected {
            tracing::warn!("Cannot send '{}': not connected", command);
            let _ = self.event_tx.send(LinkEvent::CommandFailed {
                command,
                error: AgroLinkError::NotConnected.to_string(),
            });
            return;
        }

        match self.transport.write_all(&command.encode()) {
            Ok(()) => {
                self.stats.commands_sent += 1;
                tracing::debug!("Sent command '{}'", command);
                let _ = self.event_tx.send(LinkEvent::CommandSent(command));
            }
            Err(e) => {
                tracing::warn!("Write failed, tearing down: {}", e);
                let _ = self.event_tx.send(LinkEvent::CommandFailed {
                    command,
                    error: e.to_string(),
                });
                self.notice(format!("Device link lost: {}", e));
                self.teardown();
                self.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    /// One pass of the read loop: pull bytes, frame, process
    fn read_cycle(&mut self) {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        match self.transport.read_chunk(&mut buf) {
            Ok(0) => {} // quiet interval
            Ok(n) => {
                let messages = self.framer.push(&buf[..n]);
                self.stats.framer_overflows = self.framer.overflows();
                for message in messages {
                    self.handle_message(&message);
                }
            }
            Err(e) => {
                tracing::warn!("Read failed, tearing down: {}", e);
                self.notice(format!("Device link lost: {}", e));
                self.teardown();
                self.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    /// Process one framed message end to end
    fn handle_message(&mut self, message: &str) {
        self.stats.messages_framed += 1;

        let (gas_field, moisture_field) = wire::parse_fields(message);
        if gas_field.is_none() || moisture_field.is_none() {
            self.stats.parse_fallbacks += 1;
            tracing::debug!("Tolerated malformed message: {:?}", message);
        }
        let sample = Sample::from_fields(gas_field, moisture_field);

        let owner_id = self.identity.current_owner().unwrap_or_default();
        let reading = Reading {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            gas: sample.gas,
            moisture: sample.moisture,
            device_id: self.config.cloud.device_id.clone(),
            owner_id,
        };

        self.state
            .publish_sample(reading.gas, reading.moisture, reading.timestamp_ms);

        let verdict = evaluate(reading.gas, reading.moisture, &self.config.rule);
        self.state.publish_verdict(verdict.clone());
        self.stats.readings_evaluated += 1;
        tracing::debug!(
            "Reading gas={} moisture={} fit={}",
            reading.gas,
            reading.moisture,
            verdict.fit
        );

        let fit = verdict.fit;
        self.try_send_event(LinkEvent::Reading { reading: reading.clone(), verdict });

        // Only fit readings are durable; the pass/fail is implicit in
        // whether a record exists
        if fit {
            self.persist(reading);
        }
        self.opportunistic_drain();
    }

    /// Route one fit reading to remote or local persistence
    fn persist(&mut self, reading: Reading) {
        if reading.owner_id.is_empty() {
            // Queuing would leave nothing to attribute the record to later
            tracing::warn!("Reading dropped: not signed in");
            self.notice("Sign in to record readings".to_string());
            return;
        }

        if self.connectivity.is_online() {
            let record = RemoteRecord::from_reading(&reading);
            match self.remote.push(&record) {
                Ok(key) => {
                    self.stats.remote_pushes += 1;
                    tracing::debug!("Reading mirrored as {}", key);
                    let _ = self.event_tx.send(LinkEvent::RemoteStored { key });
                }
                Err(e) => {
                    self.stats.remote_failures += 1;
                    tracing::warn!("Remote push failed, queuing locally: {}", e);
                    self.notice(format!("Cloud unavailable, reading queued: {}", e));
                    self.queue_local(&reading);
                }
            }
        } else {
            self.queue_local(&reading);
        }
    }

    /// Append one reading to the pending store
    fn queue_local(&mut self, reading: &Reading) {
        match self.pending.append(reading) {
            Ok(()) => {
                self.stats.queued_local += 1;
                let _ = self.event_tx.send(LinkEvent::QueuedLocally);
            }
            Err(e) => {
                tracing::error!("Failed to queue reading locally: {}", e);
                self.notice(format!("Failed to queue reading: {}", e));
            }
        }
    }

    /// Drain the pending store when the network is reachable
    ///
    /// A no-op when offline, signed out, or nothing is queued.
    fn opportunistic_drain(&mut self) {
        if !self.connectivity.is_online() {
            return;
        }
        let Some(owner) = self.identity.current_owner() else {
            return;
        };
        match self.pending.is_empty() {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Could not inspect pending store: {}", e);
                return;
            }
        }

        match self
            .pending
            .drain(self.remote.as_mut(), &owner, &self.config.cloud.device_id)
        {
            Ok(report) => {
                self.stats.drained_entries += report.delivered as u64;
                let _ = self.event_tx.send(LinkEvent::Drained(report));
            }
            Err(e) => {
                tracing::warn!("Drain failed: {}", e);
                self.notice(format!("Could not deliver queued readings: {}", e));
            }
        }
    }

    /// Release stream resources; close failures are logged, not propagated
    fn teardown(&mut self) {
        if self.transport.is_connected() {
            self.transport.disconnect();
        }
        self.framer.reset();
    }

    /// Publish a connection-state transition
    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.state.publish_status(status);
        let _ = self.event_tx.send(LinkEvent::Status(status));
    }

    /// Surface a transient user-visible notice
    fn notice(&self, text: String) {
        let _ = self.event_tx.send(LinkEvent::Notice(text));
    }

    /// Push stats to the UI (dropped when the channel is full)
    fn send_stats(&mut self) {
        let stats = self.stats.clone();
        self.try_send_event(LinkEvent::Stats(stats));
    }

    /// Try to send an event, counting drops if the channel is full
    fn try_send_event(&mut self, event: LinkEvent) {
        if self.event_tx.try_send(event).is_err() {
            self.stats.dropped_events += 1;
        }
    }
}
