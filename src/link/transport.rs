//! Transport seam for the serial-over-radio stream
//!
//! [`LinkTransport`] is the boundary the session manager talks through, so
//! the worker can run against real hardware or a scripted mock. The real
//! implementation is [`SerialPortTransport`]: a paired HC-06 style radio
//! module enumerates as an ordinary serial port on the host, so discovery
//! is an exact-name match over the available ports.

use crate::error::{AgroLinkError, Result};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{Read, Write};
use std::time::Duration;

/// Byte-stream transport to the field unit
///
/// Implementations own the underlying duplex stream. `read_chunk` must
/// treat its bounded timeout as "no data yet" (`Ok(0)`), never as a
/// failure; a hard error means the stream is gone and the session must
/// tear down.
pub trait LinkTransport: Send {
    /// Discover the device by exact, case-sensitive name and open the
    /// stream
    fn connect(&mut self, device_name: &str) -> Result<()>;

    /// Release the stream; close failures are logged, not propagated
    fn disconnect(&mut self);

    /// Whether a stream is currently open
    fn is_connected(&self) -> bool;

    /// Blocking read with a bounded timeout; `Ok(0)` means no data arrived
    /// within the interval
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write raw bytes to the output side of the stream
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Real transport over a host serial port
pub struct SerialPortTransport {
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortTransport {
    /// Create a transport that opens ports at the given baud rate with the
    /// given blocking-read timeout
    pub fn new(baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            baud_rate,
            read_timeout,
            port: None,
        }
    }

    /// Whether a discovered port matches the configured device name
    ///
    /// Exact and case-sensitive, against the OS port name or, for
    /// USB-enumerated ports, the product string.
    fn matches(info: &SerialPortInfo, device_name: &str) -> bool {
        if info.port_name == device_name {
            return true;
        }
        if let SerialPortType::UsbPort(usb) = &info.port_type {
            if usb.product.as_deref() == Some(device_name) {
                return true;
            }
        }
        false
    }
}

impl LinkTransport for SerialPortTransport {
    fn connect(&mut self, device_name: &str) -> Result<()> {
        // A stale handle from a superseded session must not leak
        self.disconnect();

        let ports = serialport::available_ports()
            .map_err(|e| AgroLinkError::TransportUnavailable(e.to_string()))?;
        tracing::debug!("Enumerated {} serial ports", ports.len());

        let info = ports
            .into_iter()
            .find(|p| Self::matches(p, device_name))
            .ok_or_else(|| AgroLinkError::DeviceNotFound {
                name: device_name.to_string(),
            })?;

        let port = serialport::new(&info.port_name, self.baud_rate)
            .timeout(self.read_timeout)
            .open()?;
        tracing::info!(
            "Opened {} at {} baud for device '{}'",
            info.port_name,
            self.baud_rate,
            device_name
        );
        self.port = Some(port);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(port) = self.port.take() {
            // Dropping the handle closes the descriptor; nothing useful to
            // report beyond the fact it happened
            tracing::debug!("Closing serial port {:?}", port.name());
        }
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(AgroLinkError::NotConnected)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(AgroLinkError::Io(e)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(AgroLinkError::NotConnected)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }
}
