#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_probe::constants::MIN_RESPONSE_LEN;
use modbus_probe::{decode_response, ModbusError, ReadResponse};

fuzz_target!(|data: &[u8]| {
    match decode_response(data) {
        Ok(ReadResponse::Registers(registers)) => {
            assert!(data.len() >= MIN_RESPONSE_LEN);
            assert!(registers.len() <= (data.len() - MIN_RESPONSE_LEN) / 2);
        }
        Ok(ReadResponse::Raw(payload)) => {
            assert_eq!(payload.len(), data.len() - 8);
        }
        Err(ModbusError::TooShort { len }) => assert!(len < MIN_RESPONSE_LEN),
        Err(ModbusError::Exception { function, .. }) => assert!(function < 0x80),
        Err(other) => panic!("decoder produced a transport error: {}", other),
    }
});
