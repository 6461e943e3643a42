//! Console output sink for the server's pipeline consumer.
//!
//! [`ConsoleSink`] prints each forwarded payload to stdout (UART / USB-CDC
//! on the device), the form the operator tooling parses.  A failed write is
//! logged through the `log` facade and the line is lost.

use std::io::Write;

use log::warn;

use crate::app::ports::OutputSink;

/// Prefix the operator tooling keys on.
pub const LINE_PREFIX: &str = "[DATA]: ";

/// Writes `[DATA]: <payload>` lines to stdout.
#[derive(Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl OutputSink for ConsoleSink {
    fn write_line(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        if writeln!(out, "{LINE_PREFIX}{text}").is_err() {
            warn!("CONSOLE | stdout write failed, line lost");
        }
    }
}
