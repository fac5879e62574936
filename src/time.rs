//! Event timestamps with optional nanosecond precision.

use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamp attached to every forwarded event.
///
/// Carries whole seconds since the Unix epoch plus a nanosecond remainder.
/// Whether the nanoseconds reach the wire depends on the forwarder's
/// `nanosecond_precision` setting; without it only the seconds are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventTime {
    secs: u64,
    nanos: u32,
}

impl EventTime {
    /// Build a timestamp from raw parts. `nanos` must be below one second.
    pub fn new(secs: u64, nanos: u32) -> Self {
        Self {
            secs,
            nanos: nanos % 1_000_000_000,
        }
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        SystemTime::now().into()
    }

    /// Whole seconds since the Unix epoch.
    pub fn secs(&self) -> u64 {
        self.secs
    }

    /// Nanosecond remainder, always below one second.
    pub fn nanos(&self) -> u32 {
        self.nanos
    }
}

impl From<SystemTime> for EventTime {
    fn from(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            secs: since_epoch.as_secs(),
            nanos: since_epoch.subsec_nanos(),
        }
    }
}

impl From<u64> for EventTime {
    fn from(secs: u64) -> Self {
        Self { secs, nanos: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_secs_has_no_nanos() {
        let time = EventTime::from(1_700_000_000u64);
        assert_eq!(time.secs(), 1_700_000_000);
        assert_eq!(time.nanos(), 0);
    }

    #[test]
    fn new_wraps_excess_nanos() {
        let time = EventTime::new(10, 1_500_000_000);
        assert_eq!(time.nanos(), 500_000_000);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(EventTime::now().secs() > 1_577_836_800);
    }
}
