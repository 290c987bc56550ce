//! # Modbus Probe - Modbus TCP Connectivity Check
//!
//! A small Modbus TCP client for validating that a remote endpoint (a protocol
//! gateway or PLC) answers read requests correctly. One invocation performs
//! exactly one request/response exchange over one socket.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`protocol`] | Encodes the 12-byte MBAP + PDU read request |
//! | [`codec`] | Decodes a response into registers, raw bytes or an error |
//! | [`transport`] | Owns the TCP socket: connect, send, receive, close |
//! | [`client`] | Runs encoder, transport and decoder as one exchange |
//!
//! Only function codes 0x03 (Read Holding Registers) and 0x04 (Read Input
//! Registers) are decoded into registers; other function codes come back as
//! raw bytes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modbus_probe::{probe, ProbeConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> modbus_probe::ModbusResult<()> {
//!     let report = probe(&ProbeConfig::new("127.0.0.1", 502)).await?;
//!     if let Some(registers) = report.registers() {
//!         println!("Read registers: {:?}", registers);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Format Only
//!
//! ```rust
//! use modbus_probe::{decode_response, encode_read_request, ReadResponse};
//!
//! let request = encode_read_request(1, 1, 0x03, 0, 10);
//! assert_eq!(request.len(), 12);
//!
//! let response = [0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x12, 0x34];
//! assert_eq!(decode_response(&response).unwrap(), ReadResponse::Registers(vec![0x1234]));
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Frame definitions and request encoding
pub mod protocol;

/// Response decoding
pub mod codec;

/// Network transport layer
pub mod transport;

/// Probe client
pub mod client;

/// Logging setup and packet dumps
pub mod logging;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use modbus_probe::tokio) ===
pub use tokio;

// === Core client API ===
pub use client::{probe, run_probe, ModbusProbe, ProbeConfig, ProbeReport};

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Frame encoding / decoding ===
pub use codec::{decode_response, ReadResponse};
pub use protocol::{encode_read_request, MbapHeader, RequestFrame, UnitId};

// === Transport ===
pub use transport::{
    ModbusTransport, ReceiveMode, StreamTransport, TcpTransport, TransportConfig, TransportStats,
};

// === Protocol limits (commonly needed constants) ===
pub use constants::{MAX_PDU_SIZE, MAX_READ_REGISTERS};

/// Default timeout for connect, send and receive (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Modbus Probe v{} - Modbus TCP connectivity check", VERSION)
}
