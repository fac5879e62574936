//! Schema-validated event construction.
//!
//! A schema declares the keys an event may carry plus optional default
//! values; builders produced from it reject unknown keys at `set` time. This
//! replaces runtime-generated accessor types with a plain, checkable builder.

use serde_json::Value;

use crate::{
    error::{EventError, PostError},
    sink::{Record, Sink},
};

/// Ordered key list and default values for one family of events.
#[derive(Clone, Debug, Default)]
pub struct EventSchema {
    keys: Vec<String>,
    defaults: Record,
}

impl EventSchema {
    /// Schema over the given keys, in order, without defaults.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut schema = Self::default();
        for key in keys {
            let key = key.into();
            if !schema.keys.contains(&key) {
                schema.keys.push(key);
            }
        }
        schema
    }

    /// Add a key with a default value. The key joins the schema if it is not
    /// already declared.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !self.keys.contains(&key) {
            self.keys.push(key.clone());
        }
        self.defaults.insert(key, value.into());
        self
    }

    /// Declared keys, in declaration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Start an event pre-populated with the schema defaults.
    pub fn event(&self) -> EventBuilder<'_> {
        EventBuilder {
            schema: self,
            map: self.defaults.clone(),
        }
    }
}

/// One event under construction, validated against its schema.
#[derive(Clone, Debug)]
pub struct EventBuilder<'a> {
    schema: &'a EventSchema,
    map: Record,
}

impl EventBuilder<'_> {
    /// Set a declared key. Unknown keys are rejected.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Result<Self, EventError> {
        if !self.schema.keys.iter().any(|k| k == key) {
            return Err(EventError::UnknownKey(key.to_string()));
        }
        self.map.insert(key.to_string(), value.into());
        Ok(self)
    }

    /// Set every entry of `other`, validating each key.
    pub fn merge(self, other: &Record) -> Result<Self, EventError> {
        let mut builder = self;
        for (key, value) in other {
            builder = builder.set(key, value.clone())?;
        }
        Ok(builder)
    }

    /// The record assembled so far.
    pub fn record(&self) -> &Record {
        &self.map
    }

    /// Consume the builder, yielding the record.
    pub fn into_record(self) -> Record {
        self.map
    }

    /// Post the assembled record to a sink.
    pub fn post_to(&self, sink: &dyn Sink, tag: &str) -> Result<bool, PostError> {
        sink.post(tag, &self.map)
    }
}
