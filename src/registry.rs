//! Process-wide default sink.
//!
//! A convenience singleton, not a concurrency-critical structure: the lock
//! only guards pointer replacement. The default is lazily a stdout console
//! sink until [`open`] or [`set_default_sink`] installs something else.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{
    console::ConsoleSink,
    error::{BuildError, PostError},
    forwarder::{Forwarder, config::ForwarderBuilder},
    sink::{Record, Sink},
    time::EventTime,
};

static DEFAULT_SINK: Lazy<RwLock<Option<Arc<dyn Sink>>>> = Lazy::new(|| RwLock::new(None));

/// The current process-wide default sink, creating a stdout console sink on
/// first access if none is installed.
pub fn default_sink() -> Arc<dyn Sink> {
    if let Some(sink) = DEFAULT_SINK.read().as_ref() {
        return Arc::clone(sink);
    }
    let mut guard = DEFAULT_SINK.write();
    Arc::clone(guard.get_or_insert_with(|| Arc::new(ConsoleSink::stdout())))
}

/// Replace the default sink. The previous one is returned, not closed.
pub fn set_default_sink(sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
    DEFAULT_SINK.write().replace(sink)
}

/// Build a forwarder, install it as the default sink, and close whatever was
/// installed before.
pub fn open(builder: ForwarderBuilder) -> Result<Arc<Forwarder>, BuildError> {
    let forwarder = Arc::new(builder.build()?);
    let prior = DEFAULT_SINK
        .write()
        .replace(Arc::clone(&forwarder) as Arc<dyn Sink>);
    if let Some(prior) = prior {
        prior.close();
    }
    Ok(forwarder)
}

/// Close and remove the default sink, if any.
pub fn close_default() {
    let prior = DEFAULT_SINK.write().take();
    if let Some(prior) = prior {
        prior.close();
    }
}

/// Post through the default sink, stamped with the current time.
pub fn post(tag: &str, record: &Record) -> Result<bool, PostError> {
    default_sink().post(tag, record)
}

/// Post through the default sink with an explicit timestamp.
pub fn post_with_time(tag: &str, record: &Record, time: EventTime) -> Result<bool, PostError> {
    default_sink().post_with_time(tag, record, time)
}
