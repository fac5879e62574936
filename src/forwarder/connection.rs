//! Connection lifecycle: connect/reconnect, failure history, burst suppression.

use std::{
    collections::VecDeque,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    diagnostics::DiagnosticLogger,
    transport::{self, Endpoint, Stream},
};

/// Default base delay applied after the first connect failure.
pub const RECONNECT_WAIT_BASE: Duration = Duration::from_millis(500);
/// Default geometric growth rate of the reconnect delay.
pub const RECONNECT_WAIT_RATE: f64 = 1.5;
/// Default ceiling for the reconnect delay.
pub const RECONNECT_WAIT_MAX: Duration = Duration::from_secs(60);

/// Upper bound on the history-length computation, guarding degenerate
/// policies (zero base, rate below one) that never reach the ceiling.
const HISTORY_CEILING: usize = 100;

/// Geometric backoff governing how long send attempts stay suppressed after
/// consecutive connect failures.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub rate: f64,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: RECONNECT_WAIT_BASE,
            rate: RECONNECT_WAIT_RATE,
            max: RECONNECT_WAIT_MAX,
        }
    }
}

impl BackoffPolicy {
    /// Suppression delay after `failures` consecutive connect failures:
    /// `min(base * rate^(failures - 1), max)`.
    pub fn wait_for(&self, failures: usize) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        if failures >= self.max_history() {
            return self.max;
        }
        let secs = self.base.as_secs_f64() * self.rate.powi(failures as i32 - 1);
        Duration::from_secs_f64(secs.min(self.max.as_secs_f64()))
    }

    /// Smallest failure count at which the delay saturates at `max`. The
    /// failure history never grows past this length.
    pub fn max_history(&self) -> usize {
        let max = self.max.as_secs_f64();
        let mut wait = self.base.as_secs_f64();
        for n in 1..=HISTORY_CEILING {
            if wait >= max {
                return n;
            }
            wait *= self.rate;
        }
        HISTORY_CEILING
    }
}

/// Owns the single outbound stream and the reconnect bookkeeping around it.
///
/// The forwarder drives this exclusively from inside its critical section, so
/// no internal locking is needed here.
pub(crate) struct ConnectionManager {
    endpoint: Endpoint,
    backoff: BackoffPolicy,
    history_cap: usize,
    log_threshold: usize,
    use_nonblock: bool,
    diagnostics: Arc<dyn DiagnosticLogger>,
    stream: Option<Stream>,
    error_history: VecDeque<Instant>,
    logged_reconnect_error: bool,
}

impl ConnectionManager {
    pub fn new(
        endpoint: Endpoint,
        backoff: BackoffPolicy,
        log_threshold: Option<usize>,
        use_nonblock: bool,
        diagnostics: Arc<dyn DiagnosticLogger>,
    ) -> Self {
        let history_cap = backoff.max_history();
        Self {
            endpoint,
            history_cap,
            log_threshold: log_threshold.unwrap_or(history_cap),
            backoff,
            use_nonblock,
            diagnostics,
            stream: None,
            error_history: VecDeque::new(),
            logged_reconnect_error: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Open a fresh connection, replacing any previous stream.
    ///
    /// Success clears the failure history and re-arms the threshold log line;
    /// failure appends to the history (FIFO, capped) and returns the error.
    pub fn connect(&mut self) -> io::Result<()> {
        match self.open_stream() {
            Ok(stream) => {
                self.stream = Some(stream);
                self.error_history.clear();
                self.logged_reconnect_error = false;
                Ok(())
            }
            Err(err) => {
                self.record_connect_failure(&err);
                Err(err)
            }
        }
    }

    fn open_stream(&self) -> io::Result<Stream> {
        let mut stream = transport::connect(&self.endpoint)?;
        if self.use_nonblock {
            stream.set_nonblocking(true)?;
        }
        Ok(stream)
    }

    fn record_connect_failure(&mut self, err: &io::Error) {
        self.error_history.push_back(Instant::now());
        if self.error_history.len() > self.history_cap {
            self.error_history.pop_front();
        }
        if self.error_history.len() >= self.log_threshold && !self.logged_reconnect_error {
            self.diagnostics.error(&format!(
                "Can't connect to {} ({} retried): {err}",
                self.endpoint,
                self.error_history.len()
            ));
            self.logged_reconnect_error = true;
        }
    }

    /// True when a send attempt should be skipped because too little time has
    /// passed since the last connect failure.
    pub fn suppress(&self, now: Instant) -> bool {
        let Some(&last) = self.error_history.back() else {
            return false;
        };
        now.duration_since(last) < self.backoff.wait_for(self.error_history.len())
    }

    /// Transmit the whole slice, connecting first when disconnected.
    ///
    /// `WouldBlock` from a nonblocking socket is returned as-is; the forwarder
    /// decides whether that is a soft or hard failure.
    pub fn send(&mut self, data: &[u8]) -> io::Result<()> {
        if self.stream.is_none() {
            self.connect()?;
        }
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(io::Error::new(io::ErrorKind::NotConnected, "no connection")),
        };
        write_full(stream, data)?;
        stream.flush()
    }

    /// Drop the stream, closing the socket. Closing an absent connection is a
    /// no-op.
    pub fn disconnect(&mut self) {
        self.stream = None;
    }

    #[cfg(test)]
    pub fn failure_count(&self) -> usize {
        self.error_history.len()
    }
}

fn write_full(stream: &mut Stream, data: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < data.len() {
        match stream.write(&data[written..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;
    use crate::diagnostics::MemoryDiagnostics;

    fn refused_endpoint() -> Endpoint {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        drop(listener);
        Endpoint::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }

    fn manager(
        endpoint: Endpoint,
        backoff: BackoffPolicy,
        threshold: Option<usize>,
    ) -> (ConnectionManager, MemoryDiagnostics) {
        let diagnostics = MemoryDiagnostics::new();
        let manager = ConnectionManager::new(
            endpoint,
            backoff,
            threshold,
            false,
            Arc::new(diagnostics.clone()),
        );
        (manager, diagnostics)
    }

    #[test]
    fn first_failure_waits_base_delay() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.wait_for(1), Duration::from_millis(500));
    }

    #[test]
    fn wait_is_monotonic_and_capped() {
        let policy = BackoffPolicy::default();
        let mut previous = Duration::ZERO;
        for failures in 1..=30 {
            let wait = policy.wait_for(failures);
            assert!(wait >= previous, "wait must not shrink at {failures}");
            assert!(wait <= policy.max, "wait must stay capped at {failures}");
            previous = wait;
        }
        assert_eq!(policy.wait_for(30), policy.max);
    }

    #[test]
    fn default_history_cap_saturates_the_delay() {
        let policy = BackoffPolicy::default();
        let cap = policy.max_history();
        assert_eq!(cap, 13);
        assert_eq!(policy.wait_for(cap), policy.max);
        assert!(policy.wait_for(cap - 1) < policy.max);
    }

    #[test]
    fn degenerate_policy_hits_the_ceiling() {
        let policy = BackoffPolicy {
            base: Duration::ZERO,
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.max_history(), 100);
        assert_eq!(policy.wait_for(5), Duration::ZERO);
    }

    #[test]
    fn history_is_capped_fifo() {
        let (mut manager, _diagnostics) =
            manager(refused_endpoint(), BackoffPolicy::default(), None);
        for _ in 0..20 {
            assert!(manager.connect().is_err());
        }
        assert_eq!(manager.failure_count(), 13);
    }

    #[test]
    fn threshold_line_is_emitted_exactly_once_per_episode() {
        let (mut manager, diagnostics) =
            manager(refused_endpoint(), BackoffPolicy::default(), Some(3));
        for _ in 0..6 {
            assert!(manager.connect().is_err());
        }
        assert_eq!(diagnostics.count_containing("Can't connect to"), 1);
        assert!(diagnostics.contains("(3 retried)"));
    }

    #[test]
    fn successful_connect_resets_history_and_threshold() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        let endpoint = Endpoint::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        let (mut manager, diagnostics) = manager(endpoint, BackoffPolicy::default(), Some(1));

        // Fail once against a dead port, then succeed against the listener.
        let dead = refused_endpoint();
        manager.endpoint = dead;
        assert!(manager.connect().is_err());
        assert_eq!(diagnostics.count_containing("Can't connect to"), 1);

        manager.endpoint = Endpoint::Tcp {
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        manager.connect().expect("connect to live listener");
        assert!(manager.is_connected());
        assert_eq!(manager.failure_count(), 0);

        // A new episode logs again.
        drop(listener);
        manager.disconnect();
        assert!(manager.connect().is_err());
        assert_eq!(diagnostics.count_containing("Can't connect to"), 2);
    }

    #[test]
    fn recent_failure_suppresses_sends() {
        let (mut manager, _diagnostics) =
            manager(refused_endpoint(), BackoffPolicy::default(), None);
        assert!(!manager.suppress(Instant::now()));
        assert!(manager.connect().is_err());
        assert!(manager.suppress(Instant::now()));
        assert!(!manager.suppress(Instant::now() + Duration::from_secs(1)));
    }
}
