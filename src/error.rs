//! Error taxonomy for the forwarder and its collaborators.
//!
//! Network unavailability is deliberately absent here: a dropped collector is
//! an expected condition reported through the boolean result of
//! [`Forwarder::post`](crate::Forwarder::post) and the diagnostic sink, never
//! through an error value.

use thiserror::Error;

/// Errors produced while encoding a record into a wire frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The record serialized to something other than a map. Caller contract
    /// violation rather than a data problem.
    #[error("record must serialize to a map, got {0}")]
    NotAMap(&'static str),
    /// The record could not be represented natively and the lossy text
    /// fallback failed as well. The event cannot be put on the wire.
    #[error("record has no wire representation: {primary}; fallback failed: {fallback}")]
    Unencodable { primary: String, fallback: String },
    /// Writing the frame header failed. Frames are assembled in memory, so
    /// this only occurs on pathological inputs such as oversized tags.
    #[error("failed to write frame: {0}")]
    Frame(String),
}

/// Errors surfaced synchronously by `post`.
///
/// `post` returns `Ok(false)` for every recoverable delivery problem; an `Err`
/// always means the caller handed over something that can never be delivered.
#[derive(Debug, Error)]
pub enum PostError {
    /// The record argument was not a mapping type.
    #[error("record must serialize to a map, got {0}")]
    InvalidRecord(&'static str),
}

/// Errors produced while building a [`Forwarder`](crate::Forwarder).
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid forwarder configuration: {0}")]
    InvalidConfig(String),
}

/// Errors produced by the event schema builder.
#[derive(Debug, Error)]
pub enum EventError {
    /// The key is not part of the event schema.
    #[error("unknown event key {0:?}")]
    UnknownKey(String),
}
