//! Post a single event to a Fluentd-compatible collector.
//!
//! Exit status: 0 when the event was delivered, 1 when it could only be
//! buffered (collector unreachable), 2 on usage or configuration errors.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use fluent_forward::{DiagnosticLogger, ForwarderBuilder, Record};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "fluent-post", version, about = "Send one event to a Fluentd-compatible collector")]
struct Cli {
    /// Event tag.
    #[arg(short, long)]
    tag: String,

    /// Collector hostname or IP address.
    #[arg(long, default_value = fluent_forward::DEFAULT_HOST)]
    host: String,

    /// Collector TCP port.
    #[arg(short, long, default_value_t = fluent_forward::DEFAULT_PORT)]
    port: u16,

    /// Unix-domain socket path, instead of host/port.
    #[arg(long, conflicts_with_all = ["host", "port"])]
    unix: Option<PathBuf>,

    /// Record field as key=value. Values parse as JSON where possible and
    /// fall back to plain strings. Repeatable.
    #[arg(short = 'v', long = "field", value_parser = parse_field)]
    fields: Vec<(String, Value)>,

    /// Static prefix joined to the tag with a dot.
    #[arg(long)]
    prefix: Option<String>,

    /// Encode the timestamp with nanosecond precision.
    #[arg(long)]
    nanosecond: bool,

    /// Print per-event diagnostic lines.
    #[arg(long)]
    debug: bool,
}

fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Diagnostics straight to stderr, so failures are visible without a
/// configured logging backend.
struct StderrDiagnostics {
    debug: bool,
}

impl DiagnosticLogger for StderrDiagnostics {
    fn error(&self, message: &str) {
        eprintln!("fluent-post: {message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("fluent-post: {message}");
    }

    fn debug(&self, message: &str) {
        if self.debug {
            eprintln!("fluent-post: {message}");
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut builder = ForwarderBuilder::new()
        .nanosecond_precision(cli.nanosecond)
        .debug(cli.debug)
        .diagnostics(Arc::new(StderrDiagnostics { debug: cli.debug }));
    builder = match cli.unix {
        Some(path) => builder.unix_path(path),
        None => builder.host(cli.host).port(cli.port),
    };
    if let Some(prefix) = cli.prefix {
        builder = builder.tag_prefix(prefix);
    }

    let forwarder = match builder.build() {
        Ok(forwarder) => forwarder,
        Err(err) => {
            eprintln!("fluent-post: {err}");
            return ExitCode::from(2);
        }
    };

    let record: Record = cli.fields.into_iter().collect();
    match forwarder.post(&cli.tag, &record) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("fluent-post: event was buffered but not delivered");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("fluent-post: {err}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fields_parse_json_values() {
        let (key, value) = parse_field("count=3").expect("valid field");
        assert_eq!(key, "count");
        assert_eq!(value, Value::from(3));
    }

    #[test]
    fn fields_fall_back_to_strings() {
        let (key, value) = parse_field("agent=foo bar").expect("valid field");
        assert_eq!(key, "agent");
        assert_eq!(value, Value::String("foo bar".into()));
    }

    #[test]
    fn fields_require_a_separator_and_key() {
        assert!(parse_field("no-separator").is_err());
        assert!(parse_field("=value").is_err());
    }
}
