//! `log` facade backend, serial-backed (§3.1 ambient stack).
//!
//! Bringup (C14) and driver init use `log::info!`/`log::warn!`/`log::error!`
//! for structured, level-tagged breadcrumbs; hot paths that must stay
//! allocation- and formatting-minimal (interrupt handlers, the panic
//! handler, the exception diagnostic panel) keep using `serial_println!`
//! directly instead.

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::serial_println;

struct SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            serial_println!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Install the serial-backed logger as the global `log` sink.
///
/// Must be called at most once, before any bringup step that logs.
///
/// # Panics
/// Panics if a logger has already been installed.
#[expect(
    clippy::unwrap_used,
    reason = "a double-init here is a bringup-order bug, not a recoverable condition"
)]
pub fn init() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);
}
