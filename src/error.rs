//! Error handling for the AgroLink device-link core
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate. The variants mirror the failure taxonomy of the
//! link session: transport problems, device discovery, stream I/O, remote
//! persistence, and the local pending store.

use thiserror::Error;

/// Main error type for AgroLink operations
#[derive(Error, Debug)]
pub enum AgroLinkError {
    /// The radio transport cannot be used at all (no ports, enumeration failed)
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// No paired device matched the configured name
    #[error("Device '{name}' not found among available ports")]
    DeviceNotFound { name: String },

    /// An operation that requires an open link was attempted while disconnected
    #[error("Not connected to a device")]
    NotConnected,

    /// Errors from the serial port layer
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Stream-level IO errors (read, write, close)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote persistence was attempted without an authenticated owner
    #[error("Not signed in; remote persistence refused")]
    Unauthenticated,

    /// The remote store rejected or failed a push
    #[error("Remote store error: {0}")]
    Remote(String),

    /// Errors from the local pending store
    #[error("Pending store error: {0}")]
    Store(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AgroLinkError>,
    },
}

impl AgroLinkError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AgroLinkError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for AgroLink operations
pub type Result<T> = std::result::Result<T, AgroLinkError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgroLinkError::DeviceNotFound {
            name: "HC-06".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Device 'HC-06' not found among available ports"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = AgroLinkError::Remote("permission denied".to_string());
        let with_ctx = err.with_context("Failed to mirror reading");
        assert!(with_ctx.to_string().contains("Failed to mirror reading"));
        assert!(with_ctx.to_string().contains("permission denied"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(AgroLinkError::NotConnected);
        let err = result.context("Sending actuator command").unwrap_err();
        assert!(err.to_string().contains("Sending actuator command"));
    }

    #[test]
    fn test_unauthenticated_display() {
        let err = AgroLinkError::Unauthenticated;
        assert!(err.to_string().contains("refused"));
    }
}
