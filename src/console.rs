//! Text backend writing human-readable event lines to a stream.

use std::{
    io::{self, Write},
    sync::Arc,
};

use chrono::{Local, TimeZone};
use parking_lot::Mutex;

use crate::{
    diagnostics::{DiagnosticLogger, StdLogDiagnostics},
    error::PostError,
    sink::{Record, Sink},
    time::EventTime,
};

const DEFAULT_TIME_FORMAT: &str = "%b %e %H:%M:%S";

/// Sink rendering events as `"<time> <tag>: key=value ..."` lines.
///
/// Values are rendered as JSON so strings stay quoted and nested structures
/// remain readable. Write failures go to the diagnostics sink, not the caller.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    time_format: String,
    diagnostics: Arc<dyn DiagnosticLogger>,
}

impl ConsoleSink {
    /// Console sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Console sink writing to standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Console sink writing to an arbitrary writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
            time_format: DEFAULT_TIME_FORMAT.into(),
            diagnostics: Arc::new(StdLogDiagnostics),
        }
    }

    /// Override the strftime format used for the line timestamp.
    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    /// Externally supplied diagnostic sink for write failures. Defaults to
    /// the `log` facade.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticLogger>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    fn render(&self, tag: &str, record: &Record, time: EventTime) -> String {
        let stamp = Local
            .timestamp_opt(time.secs() as i64, time.nanos())
            .single()
            .map(|stamp| stamp.format(&self.time_format).to_string())
            .unwrap_or_else(|| time.secs().to_string());
        let mut line = format!("{stamp} {tag}:");
        for (key, value) in record {
            line.push_str(&format!(" {key}={value}"));
        }
        line
    }
}

impl Sink for ConsoleSink {
    fn post_with_time(
        &self,
        tag: &str,
        record: &Record,
        time: EventTime,
    ) -> Result<bool, PostError> {
        let line = self.render(tag, record, time);
        let mut out = self.out.lock();
        match writeln!(out, "{line}") {
            Ok(()) => Ok(true),
            Err(err) => {
                self.diagnostics
                    .warn(&format!("console sink write failed: {err}"));
                Ok(false)
            }
        }
    }

    fn close(&self) {
        if let Err(err) = self.out.lock().flush() {
            self.diagnostics
                .warn(&format!("console sink flush failed: {err}"));
        }
    }
}
