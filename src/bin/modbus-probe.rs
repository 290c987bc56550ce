//! Modbus TCP probe
//!
//! Connects to a Modbus TCP endpoint, reads a block of registers once and
//! reports what came back.
//!
//! Usage: modbus-probe [host] [port] [options]
//! Example: modbus-probe 192.168.1.50 502 --quantity 4 --function 0x04
//!
//! Exit code 0 when the read succeeds, 1 on any failure.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use modbus_probe::client::{DEFAULT_HOST, DEFAULT_QUANTITY, DEFAULT_UNIT_ID};
use modbus_probe::constants::DEFAULT_RESPONSE_BUFFER_SIZE;
use modbus_probe::logging::{format_hex_packet, init_logging};
use modbus_probe::protocol::function_code_description;
use modbus_probe::{
    run_probe, ModbusError, ModbusProbe, ProbeConfig, ProbeReport, ReadResponse, ReceiveMode,
    TcpTransport, TransportConfig, DEFAULT_TCP_PORT, DEFAULT_TIMEOUT_MS,
};

#[derive(Parser, Debug)]
#[command(name = "modbus-probe")]
#[command(about = "Check that a Modbus TCP endpoint answers a register read")]
#[command(version)]
struct Cli {
    /// Host name or IP address of the Modbus TCP endpoint
    #[arg(default_value = DEFAULT_HOST)]
    host: String,

    /// TCP port
    #[arg(default_value_t = DEFAULT_TCP_PORT)]
    port: u16,

    /// Unit id (slave address behind a gateway)
    #[arg(long, default_value_t = DEFAULT_UNIT_ID)]
    unit_id: u8,

    /// Function code, decimal or 0x-prefixed hex (3 = holding, 4 = input registers)
    #[arg(long, default_value = "0x03", value_parser = parse_byte)]
    function: u8,

    /// First register address
    #[arg(long, default_value_t = 0)]
    start: u16,

    /// Number of registers to read
    #[arg(long, default_value_t = DEFAULT_QUANTITY)]
    quantity: u16,

    /// Connect/send/receive timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Receive buffer size for the single-read mode
    #[arg(long, default_value_t = DEFAULT_RESPONSE_BUFFER_SIZE)]
    buffer_size: usize,

    /// Reassemble the response from its MBAP length instead of a single read
    #[arg(long)]
    framed: bool,

    /// Log every frame as hex
    #[arg(long)]
    packet_log: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn probe_config(&self) -> ProbeConfig {
        let receive_mode = if self.framed {
            ReceiveMode::Framed
        } else {
            ReceiveMode::SingleRead
        };
        let transport = TransportConfig::new()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_response_size(self.buffer_size)
            .with_receive_mode(receive_mode)
            .with_packet_logging(self.packet_log);

        ProbeConfig::new(self.host.clone(), self.port)
            .with_unit_id(self.unit_id)
            .with_function_code(self.function)
            .with_start_address(self.start)
            .with_quantity(self.quantity)
            .with_transport(transport)
    }
}

fn parse_byte(value: &str) -> Result<u8, String> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => trimmed.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid byte value '{}': {}", value, e))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Same as clap's Error::exit: a failed write to stderr is ignored
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("[ERROR] {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("[ERROR] Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if runtime.block_on(run(&cli.probe_config())) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(config: &ProbeConfig) -> bool {
    let address = config.address();
    println!("Testing Modbus connection to {}", address);

    if let Err(e) = config.validate() {
        println!("[ERROR] {}", e);
        return false;
    }

    println!("Connecting to {}...", address);
    let transport =
        match TcpTransport::connect(&config.host, config.port, config.transport.clone()).await {
            Ok(transport) => transport,
            Err(e) => {
                print_error(&e);
                return false;
            }
        };
    println!("[OK] Connected successfully");

    println!(
        "Sending read request (FC={:02X} {}, Start={}, Qty={})...",
        config.function_code,
        function_code_description(config.function_code),
        config.start_address,
        config.quantity
    );
    let report = run_probe(ModbusProbe::new(transport), config).await;
    let success = print_report(&report, config.start_address);
    println!("Connection closed");
    success
}

fn print_report(report: &ProbeReport, start_address: u16) -> bool {
    println!("Request bytes: {}", format_hex_packet(&report.request_bytes));
    if let Some(response) = &report.response_bytes {
        println!("Received {} bytes", response.len());
        println!("Response bytes: {}", format_hex_packet(response));
    }

    match &report.outcome {
        Ok(ReadResponse::Registers(registers)) => {
            println!("[OK] Successfully read {} registers:", registers.len());
            for (i, value) in registers.iter().enumerate() {
                println!(
                    "  Register {}: {} (0x{:04X})",
                    start_address as usize + i,
                    value,
                    value
                );
            }
            true
        }
        Ok(ReadResponse::Raw(payload)) => {
            println!(
                "[OK] Received {} payload bytes: {}",
                payload.len(),
                format_hex_packet(payload)
            );
            true
        }
        Err(e) => {
            print_error(e);
            false
        }
    }
}

fn print_error(error: &ModbusError) {
    println!("{}", error_line(error));
}

fn error_line(error: &ModbusError) -> String {
    match error {
        ModbusError::ConnectTimeout { .. } => "[ERROR] Connection timeout".to_string(),
        ModbusError::ConnectionRefused { .. } => "[ERROR] Connection refused".to_string(),
        ModbusError::Exception { .. } => format!(
            "[ERROR] Modbus Exception: {}",
            error.exception_description().unwrap_or_default()
        ),
        other => format!("[ERROR] {}", other),
    }
}
