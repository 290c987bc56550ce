//! Probe client: one Modbus read over one connection
//!
//! The client ties the pieces together:
//!
//! 1. build the 12-byte request ([`RequestFrame`])
//! 2. hand it to a [`ModbusTransport`] for the wire exchange
//! 3. decode the response ([`decode_response`])
//!
//! [`probe`] additionally opens the TCP connection and closes it again on every
//! exit path, so a caller only ever sees a released socket.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modbus_probe::{probe, ProbeConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> modbus_probe::ModbusResult<()> {
//!     let config = ProbeConfig::new("192.168.1.50", 502).with_quantity(10);
//!     let report = probe(&config).await?;
//!     match &report.outcome {
//!         Ok(response) => println!("Read: {:?}", response),
//!         Err(e) => println!("Failed: {}", e),
//!     }
//!     Ok(())
//! }
//! ```

use tracing::{debug, info, warn};

use crate::codec::{decode_response, ReadResponse};
use crate::constants::FC_READ_HOLDING_REGISTERS;
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{function_code_description, MbapHeader, RequestFrame, UnitId};
use crate::transport::{display_address, ModbusTransport, TcpTransport, TransportConfig};
use crate::DEFAULT_TCP_PORT;

/// Default host probed when none is given
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default unit id
pub const DEFAULT_UNIT_ID: UnitId = 1;

/// Default number of registers read
pub const DEFAULT_QUANTITY: u16 = 10;

/// What to probe and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Host name or IP literal
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Target unit id
    pub unit_id: UnitId,
    /// Function code of the read (0x03 or 0x04 for register decoding)
    pub function_code: u8,
    /// First register address
    pub start_address: u16,
    /// Number of registers requested
    pub quantity: u16,
    /// Socket behavior
    pub transport: TransportConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_TCP_PORT,
            unit_id: DEFAULT_UNIT_ID,
            function_code: FC_READ_HOLDING_REGISTERS,
            start_address: 0,
            quantity: DEFAULT_QUANTITY,
            transport: TransportConfig::default(),
        }
    }
}

impl ProbeConfig {
    /// Probe `host:port` with the default read (FC03, unit 1, 10 registers from 0)
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set the unit id.
    pub fn with_unit_id(mut self, unit_id: UnitId) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Set the function code.
    pub fn with_function_code(mut self, function_code: u8) -> Self {
        self.function_code = function_code;
        self
    }

    /// Set the first register address.
    pub fn with_start_address(mut self, start_address: u16) -> Self {
        self.start_address = start_address;
        self
    }

    /// Set the register count.
    pub fn with_quantity(mut self, quantity: u16) -> Self {
        self.quantity = quantity;
        self
    }

    /// Replace the transport configuration.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// `host:port` as used in log lines and errors
    pub fn address(&self) -> String {
        display_address(&self.host, self.port)
    }

    /// Check the values that would make the probe meaningless
    pub fn validate(&self) -> ModbusResult<()> {
        if self.host.trim().is_empty() {
            return Err(ModbusError::configuration("Host must not be empty"));
        }
        if self.port == 0 {
            return Err(ModbusError::configuration("Port must not be 0"));
        }
        self.transport.validate()
    }
}

/// Result of one exchange: what was sent, what came back, and what it meant
#[derive(Debug)]
pub struct ProbeReport {
    /// The request that was sent
    pub request: RequestFrame,
    /// Serialized request
    pub request_bytes: Vec<u8>,
    /// Raw response, if the transport delivered one
    pub response_bytes: Option<Vec<u8>>,
    /// Decoded response or the first failure
    pub outcome: ModbusResult<ReadResponse>,
}

impl ProbeReport {
    /// Whether the exchange produced a decoded response
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Decoded registers, if this was a successful register read
    pub fn registers(&self) -> Option<&[u16]> {
        self.outcome.as_ref().ok().and_then(ReadResponse::registers)
    }
}

/// Client performing read requests over a transport
pub struct ModbusProbe<T: ModbusTransport> {
    transport: T,
    transaction_id: u16,
}

impl<T: ModbusTransport> ModbusProbe<T> {
    /// Create a client; the first request carries transaction id 1
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            transaction_id: 1,
        }
    }

    /// Get a reference to the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn next_transaction_id(&mut self) -> u16 {
        let id = self.transaction_id;
        self.transaction_id = self.transaction_id.wrapping_add(1);
        id
    }

    /// Send one read request and decode the answer
    ///
    /// Failures are carried in [`ProbeReport::outcome`]; the transport is left open.
    pub async fn read(
        &mut self,
        unit_id: UnitId,
        function_code: u8,
        start_address: u16,
        quantity: u16,
    ) -> ProbeReport {
        let request = RequestFrame::read(
            self.next_transaction_id(),
            unit_id,
            function_code,
            start_address,
            quantity,
        );
        let request_bytes = request.to_bytes();
        debug!(
            "Sending FC={:02X} ({}) start={} qty={}",
            function_code,
            function_code_description(function_code),
            start_address,
            quantity
        );

        let response_bytes = match self.transport.exchange(&request_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return ProbeReport {
                    request,
                    request_bytes,
                    response_bytes: None,
                    outcome: Err(e),
                }
            }
        };

        if let Some(header) = MbapHeader::parse(&response_bytes) {
            if !header.transaction_matches(&request) {
                warn!(
                    "Response header tid={} proto={} does not match request tid={}",
                    header.transaction_id, header.protocol_id, request.transaction_id
                );
            }
        }

        let outcome = decode_response(&response_bytes);
        ProbeReport {
            request,
            request_bytes,
            response_bytes: Some(response_bytes),
            outcome,
        }
    }

    /// Close the transport
    pub async fn close(&mut self) -> ModbusResult<()> {
        self.transport.close().await
    }

    /// Run one read and release the transport, whatever the outcome
    pub async fn read_and_close(
        mut self,
        unit_id: UnitId,
        function_code: u8,
        start_address: u16,
        quantity: u16,
    ) -> ProbeReport {
        let report = self
            .read(unit_id, function_code, start_address, quantity)
            .await;
        if let Err(e) = self.close().await {
            warn!("Error while closing transport: {}", e);
        }
        report
    }
}

/// Connect, run the configured read, close
///
/// Connection failures are returned as `Err`; anything after a successful
/// connect is reported in [`ProbeReport::outcome`] with the socket already closed.
pub async fn probe(config: &ProbeConfig) -> ModbusResult<ProbeReport> {
    config.validate()?;
    let transport = TcpTransport::connect(&config.host, config.port, config.transport.clone()).await?;
    info!("Connected to {}", config.address());
    Ok(run_probe(ModbusProbe::new(transport), config).await)
}

/// Run the configured read on an established client and close it
pub async fn run_probe<T: ModbusTransport>(client: ModbusProbe<T>, config: &ProbeConfig) -> ProbeReport {
    client
        .read_and_close(
            config.unit_id,
            config.function_code,
            config.start_address,
            config.quantity,
        )
        .await
}
