//! Modbus TCP frame definitions and request encoding
//!
//! A Modbus TCP frame is the MBAP header followed by the PDU:
//!
//! ```text
//! +----------------+-------------+--------+---------+----+-----------------+
//! | Transaction ID | Protocol ID | Length | Unit ID | FC | Data ...        |
//! |    2 bytes     |   2 bytes   | 2 bytes| 1 byte  | 1  | (Length - 2)    |
//! +----------------+-------------+--------+---------+----+-----------------+
//! ```
//!
//! All multi-byte fields are big-endian.

use bytes::{Buf, BufMut};
use tracing::debug;

use crate::constants::{
    MBAP_HEADER_WITH_UNIT_LEN, MODBUS_PROTOCOL_ID, READ_REQUEST_FRAME_LEN, READ_REQUEST_LENGTH,
};

/// Modbus unit identifier (slave address on the far side of a gateway)
pub type UnitId = u8;

/// Read request frame (MBAP header + read PDU)
///
/// `protocol_id` and `length` are derived, never caller-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: UnitId,
    pub function_code: u8,
    pub start_address: u16,
    pub quantity: u16,
}

impl RequestFrame {
    /// Create a read request (FC03/FC04 or any other address+quantity function)
    ///
    /// No range validation is performed; every field is written at its fixed width.
    pub fn read(
        transaction_id: u16,
        unit_id: UnitId,
        function_code: u8,
        start_address: u16,
        quantity: u16,
    ) -> Self {
        Self {
            transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            length: READ_REQUEST_LENGTH,
            unit_id,
            function_code,
            start_address,
            quantity,
        }
    }

    /// Serialize to the 12-byte wire representation
    pub fn encode(&self) -> [u8; READ_REQUEST_FRAME_LEN] {
        let mut frame = [0u8; READ_REQUEST_FRAME_LEN];
        let mut buf = &mut frame[..];
        buf.put_u16(self.transaction_id);
        buf.put_u16(self.protocol_id);
        buf.put_u16(self.length);
        buf.put_u8(self.unit_id);
        buf.put_u8(self.function_code);
        buf.put_u16(self.start_address);
        buf.put_u16(self.quantity);

        debug!(
            "Request encoded: tid={} unit={} FC={:02X} ({}) start={} qty={}",
            self.transaction_id,
            self.unit_id,
            self.function_code,
            function_code_description(self.function_code),
            self.start_address,
            self.quantity
        );

        frame
    }

    /// Serialize to an owned buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode().to_vec()
    }
}

/// Build the 12-byte read request frame in one call
///
/// ```rust
/// use modbus_probe::encode_read_request;
///
/// let frame = encode_read_request(1, 1, 0x03, 0, 10);
/// assert_eq!(frame, [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]);
/// ```
pub fn encode_read_request(
    transaction_id: u16,
    unit_id: UnitId,
    function_code: u8,
    start_address: u16,
    quantity: u16,
) -> [u8; READ_REQUEST_FRAME_LEN] {
    RequestFrame::read(transaction_id, unit_id, function_code, start_address, quantity).encode()
}

/// Modbus TCP MBAP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Transaction identifier
    pub transaction_id: u16,
    /// Protocol identifier (fixed to 0)
    pub protocol_id: u16,
    /// Byte count of Unit ID + PDU that follow
    pub length: u16,
    /// Unit identifier
    pub unit_id: UnitId,
}

impl MbapHeader {
    /// Parse the first 7 bytes of a frame; `None` if fewer are available
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < MBAP_HEADER_WITH_UNIT_LEN {
            return None;
        }
        let mut buf = &frame[..MBAP_HEADER_WITH_UNIT_LEN];
        Some(Self {
            transaction_id: buf.get_u16(),
            protocol_id: buf.get_u16(),
            length: buf.get_u16(),
            unit_id: buf.get_u8(),
        })
    }

    /// Whether this header answers `request`
    pub fn transaction_matches(&self, request: &RequestFrame) -> bool {
        self.transaction_id == request.transaction_id && self.protocol_id == request.protocol_id
    }
}

/// Get human-readable function code description
pub fn function_code_description(fc: u8) -> &'static str {
    match fc & 0x7F {
        0x01 => "Read Coils",
        0x02 => "Read Discrete Inputs",
        0x03 => "Read Holding Registers",
        0x04 => "Read Input Registers",
        0x05 => "Write Single Coil",
        0x06 => "Write Single Register",
        0x0F => "Write Multiple Coils",
        0x10 => "Write Multiple Registers",
        0x17 => "Read/Write Multiple Registers",
        _ => "Unknown Function",
    }
}
