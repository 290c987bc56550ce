//! # Modbus TCP Transport
//!
//! Owns one stream for the duration of a request/response exchange.
//!
//! ## Receive Modes
//!
//! TCP does not preserve message boundaries, so a response may arrive split
//! across several segments. Two receive strategies are available:
//!
//! | Mode | Behavior |
//! |------|----------|
//! | [`ReceiveMode::SingleRead`] | One read of up to `max_response_size` bytes. Whatever arrived is returned, even if it is a partial frame. |
//! | [`ReceiveMode::Framed`] | Read the 6-byte MBAP prefix, validate the length field, then read exactly that many more bytes. |
//!
//! `SingleRead` is the default and matches the behavior of simple probe scripts;
//! `Framed` must be selected explicitly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use modbus_probe::transport::{ModbusTransport, TcpTransport, TransportConfig};
//! use modbus_probe::encode_read_request;
//!
//! #[tokio::main]
//! async fn main() -> modbus_probe::ModbusResult<()> {
//!     let mut transport = TcpTransport::connect("127.0.0.1", 502, TransportConfig::default()).await?;
//!     let response = transport.exchange(&encode_read_request(1, 1, 0x03, 0, 10)).await;
//!     transport.close().await?;
//!     println!("{:?}", response?);
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::constants::{
    DEFAULT_RESPONSE_BUFFER_SIZE, MAX_MBAP_LENGTH, MAX_RESPONSE_BUFFER_SIZE, MBAP_HEADER_LEN,
    MIN_RESPONSE_LEN,
};
use crate::error::{ModbusError, ModbusResult};
use crate::logging::log_packet;
use crate::DEFAULT_TIMEOUT_MS;

/// How the response is collected after the request is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveMode {
    /// One blocking read, returned as-is
    #[default]
    SingleRead,
    /// Length-prefixed reassembly of exactly one MBAP frame
    Framed,
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Bound on connect, send and receive
    pub timeout: Duration,
    /// Receive buffer size for [`ReceiveMode::SingleRead`]
    pub max_response_size: usize,
    /// Receive strategy
    pub receive_mode: ReceiveMode,
    /// Emit hex dumps of every frame at info level
    pub packet_logging: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_response_size: DEFAULT_RESPONSE_BUFFER_SIZE,
            receive_mode: ReceiveMode::SingleRead,
            packet_logging: false,
        }
    }
}

impl TransportConfig {
    /// Create a configuration with default values (5 s, 1024 bytes, single read).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect/send/receive timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the single-read receive buffer size.
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Set the receive strategy.
    pub fn with_receive_mode(mut self, mode: ReceiveMode) -> Self {
        self.receive_mode = mode;
        self
    }

    /// Enable or disable packet hex dumps.
    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    /// Timeout in whole milliseconds, for error reporting
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Reject values that can never produce a decodable exchange
    pub fn validate(&self) -> ModbusResult<()> {
        if self.timeout.is_zero() {
            return Err(ModbusError::configuration("Timeout must be greater than zero"));
        }
        if self.max_response_size < MIN_RESPONSE_LEN {
            return Err(ModbusError::configuration(format!(
                "Response buffer of {} bytes cannot hold a {}-byte minimum frame",
                self.max_response_size, MIN_RESPONSE_LEN
            )));
        }
        if self.max_response_size > MAX_RESPONSE_BUFFER_SIZE {
            return Err(ModbusError::configuration(format!(
                "Response buffer of {} bytes exceeds the {}-byte limit",
                self.max_response_size, MAX_RESPONSE_BUFFER_SIZE
            )));
        }
        Ok(())
    }
}

/// Transport layer statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Transport abstraction: one request out, one response back
///
/// Implemented by [`StreamTransport`] for real sockets; tests substitute
/// scripted implementations.
pub trait ModbusTransport: Send {
    /// Write the full request and collect the response bytes
    fn exchange(
        &mut self,
        request: &[u8],
    ) -> impl Future<Output = ModbusResult<Vec<u8>>> + Send;

    /// Whether the underlying stream is still held
    fn is_connected(&self) -> bool;

    /// Release the underlying stream. Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ModbusResult<()>> + Send;

    /// Get communication statistics
    fn get_stats(&self) -> TransportStats;
}

/// Transport over any async byte stream
pub struct StreamTransport<S> {
    stream: Option<S>,
    peer: String,
    config: TransportConfig,
    stats: TransportStats,
}

/// Modbus TCP transport
pub type TcpTransport = StreamTransport<TcpStream>;

impl TcpTransport {
    /// Open a TCP connection within `config.timeout`
    ///
    /// # Errors
    ///
    /// - [`ModbusError::ConnectTimeout`] if the handshake does not finish in time
    /// - [`ModbusError::ConnectionRefused`] if the remote actively refuses
    /// - [`ModbusError::Io`] for resolution and other OS failures
    pub async fn connect(host: &str, port: u16, config: TransportConfig) -> ModbusResult<Self> {
        config.validate()?;
        let peer = display_address(host, port);
        debug!("Connecting to {} (timeout {}ms)", peer, config.timeout_ms());

        let stream = connect_within(&peer, config.timeout, TcpStream::connect((host, port))).await?;
        debug!("Connected to {}", peer);

        Ok(Self::from_stream(stream, peer, config))
    }
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-connected stream
    pub fn from_stream(stream: S, peer: impl Into<String>, config: TransportConfig) -> Self {
        Self {
            stream: Some(stream),
            peer: peer.into(),
            config,
            stats: TransportStats::default(),
        }
    }

    /// Remote address this transport talks to
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Active configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Enable or disable packet logging
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.config.packet_logging = enabled;
    }
}

impl<S> ModbusTransport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn exchange(&mut self, request: &[u8]) -> ModbusResult<Vec<u8>> {
        let limit = self.config.timeout;
        let timeout_ms = self.config.timeout_ms();
        let unit_id = request.get(MBAP_HEADER_LEN).copied();
        self.config.validate()?;
        let stream = self.stream.as_mut().ok_or(ModbusError::NotConnected)?;

        self.stats.requests_sent += 1;
        if self.config.packet_logging {
            log_packet("send", request, unit_id);
        }

        match timeout(limit, stream.write_all(request)).await {
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                return Err(ModbusError::timeout("send request", timeout_ms));
            }
            Ok(Err(e)) => {
                self.stats.errors += 1;
                return Err(e.into());
            }
            Ok(Ok(())) => {}
        }
        self.stats.bytes_sent += request.len() as u64;

        let received = match self.config.receive_mode {
            ReceiveMode::SingleRead => timeout(
                limit,
                read_once(stream, self.config.max_response_size),
            )
            .await
            .map(|r| r.map_err(ModbusError::from)),
            ReceiveMode::Framed => timeout(limit, read_frame(stream)).await,
        };

        let response = match received {
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                return Err(ModbusError::timeout("receive response", timeout_ms));
            }
            Ok(Err(e)) => {
                self.stats.errors += 1;
                return Err(e);
            }
            Ok(Ok(response)) => response,
        };

        self.stats.responses_received += 1;
        self.stats.bytes_received += response.len() as u64;
        if self.config.packet_logging {
            log_packet("receive", &response, unit_id);
        }

        Ok(response)
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Shutdown of {} reported: {}", self.peer, e);
            }
            debug!("Connection to {} closed", self.peer);
        }
        Ok(())
    }

    fn get_stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

/// Render `host:port`, bracketing IPv6 literals
pub fn display_address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Drive a connect future under a deadline, classifying the failure
pub async fn connect_within<T, F>(address: &str, limit: Duration, connecting: F) -> ModbusResult<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout(limit, connecting).await {
        Err(_) => Err(ModbusError::ConnectTimeout {
            address: address.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
            Err(ModbusError::ConnectionRefused {
                address: address.to_string(),
            })
        }
        Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => Err(ModbusError::ConnectTimeout {
            address: address.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
        Ok(Err(e)) => Err(ModbusError::Io(e)),
        Ok(Ok(stream)) => Ok(stream),
    }
}

/// One read of at most `max_len` bytes; may return a partial frame or nothing
pub async fn read_once<R>(reader: &mut R, max_len: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; max_len];
    let n = reader.read(&mut buf).await?;
    buf.truncate(n);
    debug!("Single read returned {} bytes", n);
    Ok(buf)
}

/// Read exactly one MBAP frame using its length field
///
/// # Errors
///
/// - [`ModbusError::InvalidFrame`] if the length field is 0 or above 254
/// - [`ModbusError::ConnectionClosed`] if the stream ends mid-frame
pub async fn read_frame<R>(reader: &mut R) -> ModbusResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; MBAP_HEADER_LEN];
    read_exact_or_closed(reader, &mut header).await?;

    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    if length == 0 || length > MAX_MBAP_LENGTH {
        return Err(ModbusError::invalid_frame(format!(
            "MBAP length {} outside 1..={}",
            length, MAX_MBAP_LENGTH
        )));
    }

    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + length);
    frame.extend_from_slice(&header);
    frame.resize(MBAP_HEADER_LEN + length, 0);
    read_exact_or_closed(reader, &mut frame[MBAP_HEADER_LEN..]).await?;

    debug!("Reassembled frame of {} bytes", frame.len());
    Ok(frame)
}

async fn read_exact_or_closed<R>(reader: &mut R, buf: &mut [u8]) -> ModbusResult<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ModbusError::ConnectionClosed),
        Err(e) => Err(e.into()),
    }
}
