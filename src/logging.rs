//! Logging setup and packet dump helpers
//!
//! The library only emits `tracing` events; binaries call [`init_logging`] to
//! install a subscriber. Log output goes to stderr so the probe report on stdout
//! stays clean.

use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    EnvFilter,
};

use crate::error::{ModbusError, ModbusResult};

/// Format raw bytes as hex string for packet logging
///
/// ```rust
/// use modbus_probe::logging::format_hex_packet;
///
/// assert_eq!(format_hex_packet(&[0x00, 0x01, 0xAB]), "00 01 AB");
/// ```
pub fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log packet with direction and unit id
pub fn log_packet(direction: &str, data: &[u8], unit_id: Option<u8>) {
    let hex_string = format_hex_packet(data);
    match unit_id {
        Some(id) => info!("[MODBUS-TCP] {} unit:{} {}", direction, id, hex_string),
        None => info!("[MODBUS-TCP] {} {}", direction, hex_string),
    }
}

fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter that outputs: `timestamp [LEVEL] message`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.3fZ"))?;
        write!(writer, "{} ", format_level(event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Parse a log level name (`trace`, `debug`, `info`, `warn`, `error`, `off`)
pub fn parse_filter(level: &str) -> ModbusResult<EnvFilter> {
    let normalized = level.trim().to_lowercase();
    match normalized.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
        _ => {
            return Err(ModbusError::configuration(format!(
                "Unknown log level: {}",
                level
            )))
        }
    }
    EnvFilter::try_new(&normalized)
        .map_err(|e| ModbusError::configuration(format!("Invalid log filter: {}", e)))
}

/// Install the global stderr subscriber at the given level
///
/// Calling this twice is harmless: the second call reports a configuration
/// error and leaves the first subscriber in place.
pub fn init_logging(level: &str) -> ModbusResult<()> {
    let filter = parse_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(BracketedLevelFormat)
        .try_init()
        .map_err(|e| ModbusError::configuration(format!("Logger already initialized: {}", e)))
}
