//! Kernel logger
//!
//! Backs the `log` facade with the kernel console. Lines look like
//! `[WARN ] userprog::syscall::handler: ...`.
//!
//! User-visible output such as the exit line is written to the console
//! directly and never goes through here.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Once;

use crate::services::Console;

/// Log sink writing to a [`Console`].
pub struct ConsoleLogger {
    console: Once<&'static dyn Console>,
}

impl ConsoleLogger {
    pub const fn new() -> Self {
        Self {
            console: Once::new(),
        }
    }

    /// Attach the console. Only the first call has an effect.
    pub fn attach(&self, console: &'static dyn Console) {
        self.console.call_once(|| console);
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter so `write!` can format straight into the console.
struct Sink<'a>(&'a dyn Console);

impl Write for Sink<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = self.console.get() {
            let _ = writeln!(
                Sink(*console),
                "[{:<5}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger::new();

/// Route `log` output to `console` at `level` and below.
pub fn init(console: &'static dyn Console, level: LevelFilter) -> Result<(), SetLoggerError> {
    LOGGER.attach(console);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
