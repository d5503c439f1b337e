//! Mock transport for testing without real hardware
//!
//! Scripted [`LinkTransport`] implementation: each call to `read_chunk`
//! plays the next step of the script, so tests can stage byte chunks in
//! arbitrary sizes, quiet intervals, and mid-session stream failures.
//! Written commands are captured for assertions through a shared handle
//! that survives moving the transport into the worker.
//!
//! Available under `cfg(test)` and the `mock-link` feature (integration
//! tests run with `cargo test --features mock-link`).

use super::transport::LinkTransport;
use crate::error::{AgroLinkError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One step of a mock read script
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Deliver these bytes on the next read
    Recv(Vec<u8>),
    /// Nothing arrives this interval (a read timeout)
    Idle,
    /// The stream fails (peer gone, radio out of range)
    StreamError,
}

/// Scripted transport for tests
#[derive(Debug, Default)]
pub struct MockTransport {
    script: VecDeque<MockStep>,
    connect_error: Option<String>,
    device_not_found: bool,
    fail_writes: bool,
    connected: bool,
    connects: u32,
    disconnects: u32,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockTransport {
    /// A transport that connects successfully and then stays quiet
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the read script
    pub fn with_script(mut self, steps: impl IntoIterator<Item = MockStep>) -> Self {
        self.script = steps.into_iter().collect();
        self
    }

    /// Make `connect` fail as if no port matched the device name
    pub fn with_device_not_found(mut self) -> Self {
        self.device_not_found = true;
        self
    }

    /// Make `connect` fail as if the transport were unavailable
    pub fn with_transport_unavailable(mut self, cause: impl Into<String>) -> Self {
        self.connect_error = Some(cause.into());
        self
    }

    /// Make every write fail with a broken stream
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Shared handle to the captured writes
    pub fn writes_handle(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.writes)
    }

    /// How many times `connect` succeeded
    pub fn connects(&self) -> u32 {
        self.connects
    }

    /// How many times `disconnect` was called while connected
    pub fn disconnects(&self) -> u32 {
        self.disconnects
    }
}

impl LinkTransport for MockTransport {
    fn connect(&mut self, device_name: &str) -> Result<()> {
        if let Some(cause) = &self.connect_error {
            return Err(AgroLinkError::TransportUnavailable(cause.clone()));
        }
        if self.device_not_found {
            return Err(AgroLinkError::DeviceNotFound {
                name: device_name.to_string(),
            });
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.disconnects += 1;
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.connected {
            return Err(AgroLinkError::NotConnected);
        }
        match self.script.pop_front() {
            Some(MockStep::Recv(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                // Anything that did not fit goes back to the front
                if n < bytes.len() {
                    self.script.push_front(MockStep::Recv(bytes[n..].to_vec()));
                }
                Ok(n)
            }
            Some(MockStep::Idle) | None => Ok(0),
            Some(MockStep::StreamError) => Err(AgroLinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stream closed by peer",
            ))),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(AgroLinkError::NotConnected);
        }
        if self.fail_writes {
            return Err(AgroLinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write to closed stream",
            )));
        }
        match self.writes.lock() {
            Ok(mut writes) => writes.push(bytes.to_vec()),
            Err(poisoned) => poisoned.into_inner().push(bytes.to_vec()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reads_in_order() {
        let mut t = MockTransport::new().with_script([
            MockStep::Recv(b"G:1,".to_vec()),
            MockStep::Idle,
            MockStep::Recv(b"H:0\n".to_vec()),
        ]);
        t.connect("HC-06").unwrap();

        let mut buf = [0u8; 64];
        assert_eq!(t.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"G:1,");
        assert_eq!(t.read_chunk(&mut buf).unwrap(), 0);
        assert_eq!(t.read_chunk(&mut buf).unwrap(), 4);
        // Script exhausted: reads go idle rather than failing
        assert_eq!(t.read_chunk(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_oversized_chunk_carries_over() {
        let mut t = MockTransport::new().with_script([MockStep::Recv(b"abcdef".to_vec())]);
        t.connect("HC-06").unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(t.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"abcd");
        assert_eq!(t.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }

    #[test]
    fn test_connect_failures() {
        let mut t = MockTransport::new().with_device_not_found();
        assert!(matches!(
            t.connect("HC-06"),
            Err(AgroLinkError::DeviceNotFound { .. })
        ));

        let mut t = MockTransport::new().with_transport_unavailable("radio disabled");
        assert!(matches!(
            t.connect("HC-06"),
            Err(AgroLinkError::TransportUnavailable(_))
        ));
    }

    #[test]
    fn test_writes_captured() {
        let mut t = MockTransport::new();
        let writes = t.writes_handle();
        t.connect("HC-06").unwrap();
        t.write_all(b"GET_DATA\n").unwrap();
        assert_eq!(writes.lock().unwrap().as_slice(), &[b"GET_DATA\n".to_vec()]);
    }

    #[test]
    fn test_io_refused_while_disconnected() {
        let mut t = MockTransport::new();
        let mut buf = [0u8; 8];
        assert!(matches!(
            t.read_chunk(&mut buf),
            Err(AgroLinkError::NotConnected)
        ));
        assert!(matches!(
            t.write_all(b"1\n"),
            Err(AgroLinkError::NotConnected)
        ));
    }
}
