//! The stable facade implemented by every output backend.

use serde_json::Value;

use crate::{error::PostError, time::EventTime};

/// Ordered record type carried across the object-safe sink facade.
///
/// Keys keep insertion order (`serde_json` with `preserve_order`), matching
/// the wire format's ordered maps.
pub type Record = serde_json::Map<String, Value>;

/// A destination for tagged, timestamped records.
///
/// Implemented by the network [`Forwarder`](crate::Forwarder) and by the local
/// backends ([`ConsoleSink`](crate::ConsoleSink), [`NullSink`],
/// [`TestSink`](crate::TestSink)). The contract is small on purpose: callers
/// depend on it, not on a concrete backend.
pub trait Sink: Send + Sync {
    /// Ship `record` under `tag`, stamped with the current time.
    fn post(&self, tag: &str, record: &Record) -> Result<bool, PostError> {
        self.post_with_time(tag, record, EventTime::now())
    }

    /// Ship `record` under `tag` with an explicit timestamp.
    fn post_with_time(&self, tag: &str, record: &Record, time: EventTime)
    -> Result<bool, PostError>;

    /// Flush what can be flushed and release resources. Idempotent.
    fn close(&self);

    /// Whether the sink currently holds a live connection. Local sinks are
    /// always considered connected.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Sink that accepts and discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn post_with_time(
        &self,
        _tag: &str,
        _record: &Record,
        _time: EventTime,
    ) -> Result<bool, PostError> {
        Ok(true)
    }

    fn close(&self) {}
}
