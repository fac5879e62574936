//! In-memory capture backend for test assertions.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{
    error::PostError,
    sink::{Record, Sink},
    time::EventTime,
};

/// Default number of captured events kept before the oldest are dropped.
pub const DEFAULT_CAPTURE_LIMIT: usize = 1024;

/// One event captured by a [`TestSink`].
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub tag: String,
    pub time: EventTime,
    pub record: Record,
}

/// Sink that stores every posted event in a bounded FIFO queue.
///
/// Shared across test code the way application code shares any other sink;
/// snapshots are cheap clones.
#[derive(Debug)]
pub struct TestSink {
    max: usize,
    queue: Mutex<VecDeque<CapturedEvent>>,
}

impl Default for TestSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSink {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CAPTURE_LIMIT)
    }

    /// Capture queue bounded to `max` events; at least one is always kept.
    pub fn with_limit(max: usize) -> Self {
        Self {
            max: max.max(1),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Snapshot of every captured event, oldest first.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Captured events whose tag equals `tag`.
    pub fn events_for_tag(&self, tag: &str) -> Vec<CapturedEvent> {
        self.queue
            .lock()
            .iter()
            .filter(|event| event.tag == tag)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Sink for TestSink {
    fn post_with_time(
        &self,
        tag: &str,
        record: &Record,
        time: EventTime,
    ) -> Result<bool, PostError> {
        let mut queue = self.queue.lock();
        while queue.len() >= self.max {
            queue.pop_front();
        }
        queue.push_back(CapturedEvent {
            tag: tag.to_string(),
            time,
            record: record.clone(),
        });
        Ok(true)
    }

    fn close(&self) {}
}
