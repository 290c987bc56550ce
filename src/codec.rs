//! # Response Decoding
//!
//! Turns one received Modbus TCP frame into register values, an opaque payload
//! or a protocol error. Decoding is a single pass over a buffer that is assumed
//! to hold the whole frame; reassembly is the transport's job.
//!
//! ## Decoding Order
//!
//! | Step | Check | Outcome |
//! |------|-------|---------|
//! | 1 | fewer than 9 bytes | `TooShort` |
//! | 2 | FC high bit set | `Exception(code)` |
//! | 3 | FC 0x03 / 0x04 | `Registers` |
//! | 4 | any other FC | `Raw` bytes from offset 8 |

use bytes::Buf;
use tracing::{debug, warn};

use crate::constants::{
    BYTE_COUNT_OFFSET, EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS,
    FUNCTION_CODE_OFFSET, MIN_RESPONSE_LEN, REGISTER_DATA_OFFSET,
};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{function_code_description, MbapHeader};

/// Successfully decoded response payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResponse {
    /// FC03/FC04 register values in ascending address order
    Registers(Vec<u16>),
    /// Payload of any other function code, from the byte after the FC onward.
    /// Carries no 16-bit register semantics.
    Raw(Vec<u8>),
}

impl ReadResponse {
    /// Register values, if this was a register read
    pub fn registers(&self) -> Option<&[u16]> {
        match self {
            Self::Registers(values) => Some(values),
            Self::Raw(_) => None,
        }
    }

    /// Number of registers or raw bytes carried
    pub fn len(&self) -> usize {
        match self {
            Self::Registers(values) => values.len(),
            Self::Raw(data) => data.len(),
        }
    }

    /// True if nothing was carried
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a received Modbus TCP frame
///
/// # Example
///
/// ```rust
/// use modbus_probe::{decode_response, ReadResponse};
///
/// let frame = [
///     0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x01, 0x03, 0x06,
///     0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C,
/// ];
/// assert_eq!(
///     decode_response(&frame).unwrap(),
///     ReadResponse::Registers(vec![100, 200, 300])
/// );
/// ```
pub fn decode_response(frame: &[u8]) -> ModbusResult<ReadResponse> {
    if frame.len() < MIN_RESPONSE_LEN {
        return Err(ModbusError::TooShort { len: frame.len() });
    }

    if let Some(header) = MbapHeader::parse(frame) {
        debug!(
            "Response header: tid={} proto={} len={} unit={}",
            header.transaction_id, header.protocol_id, header.length, header.unit_id
        );
    }

    let function_code = frame[FUNCTION_CODE_OFFSET];

    if function_code & EXCEPTION_FLAG != 0 {
        let code = frame[BYTE_COUNT_OFFSET];
        debug!(
            "Exception response: FC={:02X} ({}), exception_code={:02X}",
            function_code,
            function_code_description(function_code),
            code
        );
        return Err(ModbusError::Exception {
            function: function_code & !EXCEPTION_FLAG,
            code,
        });
    }

    match function_code {
        FC_READ_HOLDING_REGISTERS | FC_READ_INPUT_REGISTERS => {
            let byte_count = frame[BYTE_COUNT_OFFSET] as usize;
            let end = (REGISTER_DATA_OFFSET + byte_count).min(frame.len());
            let data = &frame[REGISTER_DATA_OFFSET..end];
            if data.len() < byte_count {
                warn!(
                    "Byte count {} exceeds received data ({} bytes), decoding what arrived",
                    byte_count,
                    data.len()
                );
            }
            Ok(ReadResponse::Registers(parse_registers(data)))
        }
        _ => {
            debug!(
                "FC={:02X} ({}) has no register decoding, returning raw payload",
                function_code,
                function_code_description(function_code)
            );
            Ok(ReadResponse::Raw(frame[BYTE_COUNT_OFFSET..].to_vec()))
        }
    }
}

/// Decode big-endian u16 values in 2-byte strides; a trailing odd byte is dropped
pub fn parse_registers(mut data: &[u8]) -> Vec<u16> {
    let mut registers = Vec::with_capacity(data.len() / 2);
    while data.remaining() >= 2 {
        registers.push(data.get_u16());
    }
    registers
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Build an FC03/FC04 response frame carrying `payload` after the byte count
    fn register_frame(fc: u8, byte_count: u8, payload: &[u8]) -> Vec<u8> {
        let length = (3 + payload.len()) as u16;
        let mut frame = vec![0x00, 0x01, 0x00, 0x00];
        frame.extend_from_slice(&length.to_be_bytes());
        frame.extend_from_slice(&[0x01, fc, byte_count]);
        frame.extend_from_slice(payload);
        frame
    }

    fn values_to_bytes(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn test_decode_reference_registers() {
        let frame = register_frame(0x03, 6, &[0x00, 0x64, 0x00, 0xC8, 0x01, 0x2C]);
        let response = decode_response(&frame).unwrap();
        assert_eq!(response, ReadResponse::Registers(vec![100, 200, 300]));
        assert_eq!(response.registers(), Some(&[100u16, 200, 300][..]));
    }

    #[test]
    fn test_decode_input_registers() {
        let frame = register_frame(0x04, 4, &[0xAB, 0xCD, 0xFF, 0xFF]);
        assert_eq!(
            decode_response(&frame).unwrap(),
            ReadResponse::Registers(vec![0xABCD, 0xFFFF])
        );
    }

    #[test]
    fn test_too_short() {
        for len in 0..MIN_RESPONSE_LEN {
            let frame = vec![0u8; len];
            match decode_response(&frame) {
                Err(ModbusError::TooShort { len: got }) => assert_eq!(got, len),
                other => panic!("expected TooShort for {} bytes, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_exception_response() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02];
        match decode_response(&frame) {
            Err(ModbusError::Exception { function, code }) => {
                assert_eq!(function, 0x03);
                assert_eq!(code, 2);
            }
            other => panic!("expected exception, got {:?}", other),
        }
    }

    #[test]
    fn test_exception_takes_precedence_over_payload() {
        // Trailing bytes after the exception code look like register data
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x01, 0x84, 0x0B, 0x00, 0x01];
        let err = decode_response(&frame).unwrap_err();
        assert_eq!(err.exception_code(), Some(0x0B));
    }

    #[test]
    fn test_odd_byte_count_drops_trailing_byte() {
        let frame = register_frame(0x03, 3, &[0x12, 0x34, 0x56]);
        assert_eq!(
            decode_response(&frame).unwrap(),
            ReadResponse::Registers(vec![0x1234])
        );
    }

    #[test]
    fn test_byte_count_larger_than_received_data() {
        // Claims 6 bytes, only 4 arrived
        let frame = register_frame(0x03, 6, &[0x00, 0x01, 0x00, 0x02]);
        assert_eq!(
            decode_response(&frame).unwrap(),
            ReadResponse::Registers(vec![1, 2])
        );
    }

    #[test]
    fn test_trailing_bytes_beyond_byte_count_ignored() {
        let frame = register_frame(0x03, 2, &[0x00, 0x2A, 0xFF, 0xFF]);
        assert_eq!(
            decode_response(&frame).unwrap(),
            ReadResponse::Registers(vec![42])
        );
    }

    #[test]
    fn test_zero_byte_count() {
        let frame = register_frame(0x03, 0, &[]);
        let response = decode_response(&frame).unwrap();
        assert_eq!(response, ReadResponse::Registers(vec![]));
        assert!(response.is_empty());
    }

    #[test]
    fn test_other_function_code_returns_raw() {
        // FC06 echo: address 0x0001, value 0x0003
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x01, 0x00, 0x03];
        let response = decode_response(&frame).unwrap();
        assert_eq!(response, ReadResponse::Raw(vec![0x00, 0x01, 0x00, 0x03]));
        assert_eq!(response.registers(), None);
        assert_eq!(response.len(), 4);
    }

    #[test]
    fn test_parse_registers() {
        assert_eq!(parse_registers(&[]), Vec::<u16>::new());
        assert_eq!(parse_registers(&[0x01]), Vec::<u16>::new());
        assert_eq!(parse_registers(&[0x01, 0x02, 0x03]), vec![0x0102]);
    }

    proptest! {
        #[test]
        fn registers_roundtrip(values in proptest::collection::vec(any::<u16>(), 0..=125)) {
            let payload = values_to_bytes(&values);
            let frame = register_frame(0x03, payload.len() as u8, &payload);
            prop_assert_eq!(decode_response(&frame).unwrap(), ReadResponse::Registers(values));
        }

        #[test]
        fn even_byte_count_yields_half_as_many_registers(half in 0usize..=125) {
            let byte_count = half * 2;
            let payload = vec![0x5A; byte_count];
            let frame = register_frame(0x04, byte_count as u8, &payload);
            let response = decode_response(&frame).unwrap();
            prop_assert_eq!(response.registers().map(|r| r.len()), Some(byte_count / 2));
        }

        #[test]
        fn short_frames_never_decode(frame in proptest::collection::vec(any::<u8>(), 0..MIN_RESPONSE_LEN)) {
            let is_too_short = matches!(decode_response(&frame), Err(ModbusError::TooShort { .. }));
            prop_assert!(is_too_short);
        }

        #[test]
        fn arbitrary_frames_never_panic(frame in proptest::collection::vec(any::<u8>(), 0..300)) {
            let _ = decode_response(&frame);
        }
    }
}
