//! Error types for the Modbus TCP probe
//!
//! Every fallible boundary (connect, exchange, decode) returns [`ModbusResult`].
//! Variants are kept distinct so callers can tell a refused connection from a
//! timeout or a protocol exception without parsing messages.

use std::io;

use thiserror::Error;

use crate::constants::exception_name;

/// Result alias used throughout the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors produced while framing, transmitting or decoding a Modbus exchange
#[derive(Debug, Error)]
pub enum ModbusError {
    /// No TCP connection was established within the timeout window
    #[error("Connection timeout: {address} did not accept within {timeout_ms}ms")]
    ConnectTimeout { address: String, timeout_ms: u64 },

    /// The remote host actively refused the connection
    #[error("Connection refused by {address}")]
    ConnectionRefused { address: String },

    /// Response shorter than the 9-byte minimum frame
    #[error("Response too short: {len} bytes (minimum 9)")]
    TooShort { len: usize },

    /// Remote returned a Modbus exception response
    #[error("Modbus exception: {code} for function {function:02X}")]
    Exception { function: u8, code: u8 },

    /// Send or receive did not complete within the timeout window
    #[error("Timeout during {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Frame header could not be used to reassemble a response
    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    /// Peer closed the connection before a complete frame arrived
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Exchange attempted on a transport that has been closed
    #[error("Transport is not connected")]
    NotConnected,

    /// Invalid probe or transport configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Any other transport/OS-level failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ModbusError {
    /// Create a send/receive timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid frame error
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    /// True for connect and receive timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::Timeout { .. })
    }

    /// True for failures to establish or keep the TCP connection
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. }
                | Self::ConnectionRefused { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
        )
    }

    /// True when the remote answered but the answer was unusable or an exception
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::TooShort { .. } | Self::Exception { .. } | Self::InvalidFrame { .. }
        )
    }

    /// Exception code with its descriptive name, for console output
    pub fn exception_description(&self) -> Option<String> {
        self.exception_code()
            .map(|code| format!("{} ({})", code, exception_name(code)))
    }

    /// Exception code carried by an exception response, if any
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            Self::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }
}
