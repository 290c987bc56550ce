//! Modbus TCP protocol constants
//!
//! Frame sizes follow the Modbus Application Protocol specification:
//! - Maximum PDU size: 253 bytes (inherited from RS485 ADU limit of 256 bytes)
//! - MBAP prefix: Transaction ID(2) + Protocol ID(2) + Length(2)
//! - The Length field counts the Unit ID plus the PDU that follow it

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Bytes preceding the Unit ID in the MBAP header.
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) = 6 bytes
/// Note: the Length field describes everything after these 6 bytes
pub const MBAP_HEADER_LEN: usize = 6;

/// Full MBAP header including the Unit ID (7 bytes)
pub const MBAP_HEADER_WITH_UNIT_LEN: usize = MBAP_HEADER_LEN + 1;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum MBAP length field value (Unit ID + PDU)
/// = 1 (Unit ID) + 253 (Max PDU) = 254 bytes
pub const MAX_MBAP_LENGTH: usize = 1 + MAX_PDU_SIZE;

/// Protocol identifier carried by every Modbus TCP frame
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// Length field of a read request: Unit ID(1) + FC(1) + Address(2) + Quantity(2)
pub const READ_REQUEST_LENGTH: u16 = 6;

/// Serialized size of a read request frame (MBAP prefix + length field payload)
pub const READ_REQUEST_FRAME_LEN: usize = MBAP_HEADER_LEN + READ_REQUEST_LENGTH as usize;

/// Smallest response the decoder accepts: 7-byte MBAP header + FC + one more byte
/// (byte count or exception code)
pub const MIN_RESPONSE_LEN: usize = 9;

/// Byte offset of the function code within a TCP frame
pub const FUNCTION_CODE_OFFSET: usize = 7;

/// Byte offset of the byte count (or exception code) within a TCP frame
pub const BYTE_COUNT_OFFSET: usize = 8;

/// Byte offset of the first register data byte within a read response
pub const REGISTER_DATA_OFFSET: usize = 9;

/// Receive buffer used for a single-read exchange
///
/// The theoretical max frame is 6 + 254 = 260 bytes; 1024 leaves headroom for
/// gateways that append trailing bytes.
pub const DEFAULT_RESPONSE_BUFFER_SIZE: usize = 1024;

/// Largest receive buffer a transport will allocate
pub const MAX_RESPONSE_BUFFER_SIZE: usize = u16::MAX as usize;

/// Bit set in the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers for FC03/FC04 (Read Holding/Input Registers)
///
/// Calculation for response PDU:
/// - Function Code: 1 byte
/// - Byte Count: 1 byte
/// - Register Data: N × 2 bytes
/// - Total: 1 + 1 + (N × 2) ≤ 253
/// - Therefore: N ≤ (253 - 2) / 2 = 125.5 → 125 registers
pub const MAX_READ_REGISTERS: usize = 125;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Server Device Failure
pub const EXCEPTION_SERVER_DEVICE_FAILURE: u8 = 0x04;

/// Acknowledge
pub const EXCEPTION_ACKNOWLEDGE: u8 = 0x05;

/// Server Device Busy
pub const EXCEPTION_SERVER_DEVICE_BUSY: u8 = 0x06;

/// Memory Parity Error
pub const EXCEPTION_MEMORY_PARITY_ERROR: u8 = 0x08;

/// Gateway Path Unavailable
pub const EXCEPTION_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;

/// Gateway Target Device Failed to Respond
pub const EXCEPTION_GATEWAY_TARGET_FAILED: u8 = 0x0B;

/// Human-readable name of an exception code, for display only
pub fn exception_name(code: u8) -> &'static str {
    match code {
        EXCEPTION_ILLEGAL_FUNCTION => "Illegal Function",
        EXCEPTION_ILLEGAL_DATA_ADDRESS => "Illegal Data Address",
        EXCEPTION_ILLEGAL_DATA_VALUE => "Illegal Data Value",
        EXCEPTION_SERVER_DEVICE_FAILURE => "Server Device Failure",
        EXCEPTION_ACKNOWLEDGE => "Acknowledge",
        EXCEPTION_SERVER_DEVICE_BUSY => "Server Device Busy",
        EXCEPTION_MEMORY_PARITY_ERROR => "Memory Parity Error",
        EXCEPTION_GATEWAY_PATH_UNAVAILABLE => "Gateway Path Unavailable",
        EXCEPTION_GATEWAY_TARGET_FAILED => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}
