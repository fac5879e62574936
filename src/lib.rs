//! Buffered, reconnecting client for Fluentd-compatible log collectors.
//!
//! Application code calls [`Forwarder::post`] with a tag and any
//! serializable mapping; the forwarder encodes a `[tag, time, record]`
//! MessagePack frame and ships it over a persistent TCP or Unix-domain
//! connection. While the collector is unreachable, frames accumulate in an
//! in-memory pending buffer and are retried on later posts under
//! backoff-governed burst suppression; past the configured byte limit the
//! buffer is evicted through an overflow callback. Network trouble never
//! surfaces as an error — `post` returns `Ok(false)` and the diagnostic log
//! carries the details.
//!
//! ```no_run
//! use fluent_forward::ForwarderBuilder;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Access<'a> {
//!     agent: &'a str,
//! }
//!
//! let forwarder = ForwarderBuilder::new().host("localhost").port(24224).build()?;
//! let delivered = forwarder.post("myapp.access", &Access { agent: "foo" })?;
//! # let _ = delivered;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Alternate backends ([`ConsoleSink`], [`NullSink`], [`TestSink`]) share the
//! [`Sink`] facade, and [`registry`] holds a replaceable process-wide default
//! sink.

mod buffer;
mod console;
pub mod diagnostics;
mod encode;
mod error;
pub mod event;
mod forwarder;
pub mod registry;
mod sink;
mod test_sink;
mod time;
mod transport;

pub use console::ConsoleSink;
pub use diagnostics::{DiagnosticLogger, MemoryDiagnostics, StdLogDiagnostics};
pub use encode::{EVENT_TIME_EXT_TYPE, encode_frame};
pub use error::{BuildError, EncodeError, EventError, PostError};
pub use event::{EventBuilder, EventSchema};
pub use forwarder::{
    Forwarder,
    config::{DEFAULT_BUFFER_LIMIT, ForwarderBuilder, OverflowHandler},
    connection::{BackoffPolicy, RECONNECT_WAIT_BASE, RECONNECT_WAIT_MAX, RECONNECT_WAIT_RATE},
};
pub use sink::{NullSink, Record, Sink};
pub use test_sink::{CapturedEvent, DEFAULT_CAPTURE_LIMIT, TestSink};
pub use time::EventTime;
pub use transport::{DEFAULT_HOST, DEFAULT_PORT, Endpoint};
