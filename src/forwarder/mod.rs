//! The forwarding core: encode, buffer, transmit, recover.
//!
//! `Forwarder` serializes tagged records into MessagePack frames and ships
//! them over a single persistent connection. When the collector is away the
//! frames accumulate in a pending buffer that is retried on the next post,
//! governed by backoff-based burst suppression; past the configured byte limit
//! the buffer is evicted through the overflow callback. All buffer mutation
//! and socket I/O happens synchronously in the caller's thread inside one
//! critical section, because byte order on the wire must match buffer order.

pub(crate) mod config;
pub(crate) mod connection;


use std::{io, time::Instant};

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    buffer::PendingBuffer,
    diagnostics::DiagnosticLogger,
    encode::encode_frame,
    error::{EncodeError, PostError},
    sink::{Record, Sink},
    time::EventTime,
    transport::Endpoint,
};

use config::{ForwarderConfig, OverflowHandler};
use connection::ConnectionManager;

/// Client-side forwarder shipping `[tag, time, record]` frames to a collector.
///
/// Network unavailability is never an error: `post` returns `Ok(false)` and
/// the event stays buffered for the next attempt. Only a record that can never
/// be delivered (not a map) produces an `Err`.
///
/// Safe to share across threads; concurrent posts serialize on an internal
/// lock so frames never interleave on the wire.
pub struct Forwarder {
    tag_prefix: Option<String>,
    nanosecond_precision: bool,
    wait_writeable: bool,
    debug: bool,
    endpoint: Endpoint,
    diagnostics: Arc<dyn DiagnosticLogger>,
    inner: Mutex<Inner>,
}

struct Inner {
    buffer: PendingBuffer,
    connection: ConnectionManager,
    limit: usize,
    overflow_handler: Option<OverflowHandler>,
    last_error: Option<io::Error>,
}

impl Forwarder {
    pub(crate) fn from_config(config: ForwarderConfig) -> Self {
        let diagnostics = config.diagnostics;
        let mut connection = ConnectionManager::new(
            config.endpoint.clone(),
            config.backoff,
            config.log_reconnect_error_threshold,
            config.use_nonblock,
            diagnostics.clone(),
        );
        let mut last_error = None;
        if let Err(err) = connection.connect() {
            diagnostics.error(&format!("Failed to connect to {}: {err}", config.endpoint));
            diagnostics.error("Connection will be retried.");
            last_error = Some(err);
        }
        Self {
            tag_prefix: config.tag_prefix,
            nanosecond_precision: config.nanosecond_precision,
            wait_writeable: config.wait_writeable,
            debug: config.debug,
            endpoint: config.endpoint,
            diagnostics,
            inner: Mutex::new(Inner {
                buffer: PendingBuffer::new(),
                connection,
                limit: config.buffer_limit,
                overflow_handler: config.overflow_handler,
                last_error,
            }),
        }
    }

    /// Ship `record` under `tag`, stamped with the current time.
    ///
    /// `Ok(true)` means the whole pending buffer reached the collector;
    /// `Ok(false)` means the event is buffered (or, on terminal encode
    /// failure and overflow, dropped — see the diagnostic log).
    pub fn post<S>(&self, tag: &str, record: &S) -> Result<bool, PostError>
    where
        S: Serialize + ?Sized,
    {
        self.post_with_time(tag, record, EventTime::now())
    }

    /// Like [`post`](Self::post) with an explicit timestamp.
    pub fn post_with_time<S>(
        &self,
        tag: &str,
        record: &S,
        time: impl Into<EventTime>,
    ) -> Result<bool, PostError>
    where
        S: Serialize + ?Sized,
    {
        let tag = self.qualified_tag(tag);
        let frame = match encode_frame(&tag, time.into(), record, self.nanosecond_precision) {
            Ok(frame) => frame,
            Err(EncodeError::NotAMap(found)) => return Err(PostError::InvalidRecord(found)),
            Err(err) => {
                self.diagnostics
                    .error(&format!("Can't convert record to msgpack: {err}"));
                return Ok(false);
            }
        };
        if self.debug {
            self.diagnostics
                .debug(&format!("event: {tag} ({} bytes)", frame.len()));
        }
        Ok(self.ship(&frame))
    }

    /// Whether a live connection to the collector is currently held.
    pub fn is_connected(&self) -> bool {
        self.inner.lock().connection.is_connected()
    }

    /// Bytes currently buffered awaiting a successful flush.
    pub fn pending_bytes(&self) -> usize {
        self.inner.lock().buffer.bytesize()
    }

    /// The most recent hard connect or send failure, if any.
    ///
    /// Retained across later successful flushes; inspect the return of `post`
    /// for the current delivery state.
    pub fn last_error(&self) -> Option<io::Error> {
        self.inner
            .lock()
            .last_error
            .as_ref()
            .map(|err| io::Error::new(err.kind(), err.to_string()))
    }

    /// The configured collector endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Flush any pending buffer best-effort, then tear the connection down.
    ///
    /// A failed final flush is logged and the leftover bytes are handed to the
    /// overflow callback; it never panics or returns an error. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if !inner.buffer.is_empty() {
            let sent = {
                let Inner {
                    buffer, connection, ..
                } = &mut *inner;
                connection.send(buffer.as_slice())
            };
            if let Err(err) = sent {
                self.diagnostics
                    .error(&format!("Can't send logs to {}: {err}", self.endpoint));
                let leftover = inner.buffer.take();
                if let Some(handler) = inner.overflow_handler.as_mut() {
                    handler(&leftover);
                }
                inner.last_error = Some(err);
            }
            inner.buffer.clear();
        }
        inner.connection.disconnect();
    }

    /// Append the frame and attempt to flush the whole buffer.
    fn ship(&self, frame: &[u8]) -> bool {
        let mut inner = self.inner.lock();
        inner.buffer.append(frame);

        // Suppress reconnection bursts, unless the buffer has outgrown the
        // limit and must attempt transmission regardless.
        if inner.buffer.bytesize() <= inner.limit && inner.connection.suppress(Instant::now()) {
            return false;
        }

        let sent = {
            let Inner {
                buffer, connection, ..
            } = &mut *inner;
            connection.send(buffer.as_slice())
        };
        match sent {
            Ok(()) => {
                inner.buffer.clear();
                true
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock && self.wait_writeable => {
                // The peer is healthy, just not accepting bytes right now.
                self.diagnostics.debug(&format!(
                    "send to {} would block; keeping {} bytes buffered",
                    self.endpoint,
                    inner.buffer.bytesize()
                ));
                false
            }
            Err(err) => {
                self.diagnostics
                    .error(&format!("Can't send logs to {}: {err}", self.endpoint));
                if inner.buffer.bytesize() > inner.limit {
                    self.drop_overflow(&mut inner);
                }
                inner.connection.disconnect();
                inner.last_error = Some(err);
                false
            }
        }
    }

    fn drop_overflow(&self, inner: &mut Inner) {
        let evicted = inner.buffer.take();
        self.diagnostics.error(&format!(
            "pending buffer exceeded {} bytes; dropping {} buffered bytes",
            inner.limit,
            evicted.len()
        ));
        if let Some(handler) = inner.overflow_handler.as_mut() {
            handler(&evicted);
        }
    }

    fn qualified_tag(&self, tag: &str) -> String {
        match &self.tag_prefix {
            Some(prefix) => format!("{prefix}.{tag}"),
            None => tag.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn connect_failures(&self) -> usize {
        self.inner.lock().connection.failure_count()
    }
}

impl Sink for Forwarder {
    fn post_with_time(&self, tag: &str, record: &Record, time: EventTime) -> Result<bool, PostError> {
        Forwarder::post_with_time(self, tag, record, time)
    }

    fn close(&self) {
        Forwarder::close(self);
    }

    fn is_connected(&self) -> bool {
        Forwarder::is_connected(self)
    }
}

impl Drop for Forwarder {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("endpoint", &self.endpoint)
            .field("tag_prefix", &self.tag_prefix)
            .finish()
    }
}
