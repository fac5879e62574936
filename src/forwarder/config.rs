//! Forwarder configuration and builder.

use std::{path::PathBuf, sync::Arc};

use crate::{
    diagnostics::{DiagnosticLogger, StdLogDiagnostics},
    error::BuildError,
    transport::{DEFAULT_HOST, DEFAULT_PORT, Endpoint},
};

use super::{Forwarder, connection::BackoffPolicy};

/// Default pending-buffer byte limit.
pub const DEFAULT_BUFFER_LIMIT: usize = 8 * 1024 * 1024;

/// Callback receiving the raw bytes evicted when the pending buffer overflows.
pub type OverflowHandler = Box<dyn FnMut(&[u8]) + Send>;

/// Resolved, immutable configuration handed to the forwarder.
pub(crate) struct ForwarderConfig {
    pub endpoint: Endpoint,
    pub tag_prefix: Option<String>,
    pub buffer_limit: usize,
    pub backoff: BackoffPolicy,
    pub log_reconnect_error_threshold: Option<usize>,
    pub overflow_handler: Option<OverflowHandler>,
    pub diagnostics: Arc<dyn DiagnosticLogger>,
    pub nanosecond_precision: bool,
    pub use_nonblock: bool,
    pub wait_writeable: bool,
    pub debug: bool,
}

/// Builder for [`Forwarder`].
///
/// ```no_run
/// use fluent_forward::ForwarderBuilder;
///
/// let forwarder = ForwarderBuilder::new()
///     .host("collector.internal")
///     .port(24224)
///     .tag_prefix("myapp")
///     .build()
///     .expect("valid configuration");
/// ```
#[derive(Default)]
pub struct ForwarderBuilder {
    host: Option<String>,
    port: Option<u16>,
    unix_path: Option<PathBuf>,
    tag_prefix: Option<String>,
    buffer_limit: Option<usize>,
    backoff: Option<BackoffPolicy>,
    log_reconnect_error_threshold: Option<usize>,
    overflow_handler: Option<OverflowHandler>,
    diagnostics: Option<Arc<dyn DiagnosticLogger>>,
    nanosecond_precision: bool,
    use_nonblock: bool,
    wait_writeable: bool,
    debug: bool,
}

impl ForwarderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector hostname or IP address. Default `localhost`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Collector TCP port. Default `24224`.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Unix-domain socket path. Mutually exclusive with `host`/`port`.
    pub fn unix_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.unix_path = Some(path.into());
        self
    }

    /// Static prefix joined to every posted tag with a dot.
    pub fn tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = Some(prefix.into());
        self
    }

    /// Pending-buffer byte limit. Default 8 MiB.
    pub fn buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = Some(limit);
        self
    }

    /// Reconnect suppression policy.
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Failure count at which the once-per-episode reconnect error line is
    /// emitted. Defaults to the history cap derived from the backoff policy.
    pub fn log_reconnect_error_threshold(mut self, threshold: usize) -> Self {
        self.log_reconnect_error_threshold = Some(threshold);
        self
    }

    /// Callback receiving evicted bytes on buffer overflow.
    pub fn overflow_handler(mut self, handler: impl FnMut(&[u8]) + Send + 'static) -> Self {
        self.overflow_handler = Some(Box::new(handler));
        self
    }

    /// Externally supplied diagnostic sink. Defaults to the `log` facade.
    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticLogger>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Encode timestamps as the `(seconds, nanoseconds)` extension value
    /// instead of integer seconds.
    pub fn nanosecond_precision(mut self, enabled: bool) -> Self {
        self.nanosecond_precision = enabled;
        self
    }

    /// Put the socket into nonblocking mode for writes.
    pub fn use_nonblock(mut self, enabled: bool) -> Self {
        self.use_nonblock = enabled;
        self
    }

    /// With nonblocking writes, treat a would-block condition as
    /// success-pending (keep buffered, return `false`) rather than as a
    /// network error.
    pub fn wait_writeable(mut self, enabled: bool) -> Self {
        self.wait_writeable = enabled;
        self
    }

    /// Emit a debug diagnostic line for every accepted post.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Validate the configuration and construct the forwarder.
    ///
    /// An initial connect is attempted eagerly; its failure is logged and
    /// retried on the first post rather than reported as a build error.
    pub fn build(self) -> Result<Forwarder, BuildError> {
        let endpoint = match (self.unix_path, self.host, self.port) {
            (Some(path), None, None) => Endpoint::Unix { path },
            (Some(_), _, _) => {
                return Err(BuildError::InvalidConfig(
                    "unix_path is mutually exclusive with host/port".into(),
                ));
            }
            (None, host, port) => Endpoint::Tcp {
                host: host.unwrap_or_else(|| DEFAULT_HOST.into()),
                port: port.unwrap_or(DEFAULT_PORT),
            },
        };
        let buffer_limit = self.buffer_limit.unwrap_or(DEFAULT_BUFFER_LIMIT);
        if buffer_limit == 0 {
            return Err(BuildError::InvalidConfig(
                "buffer_limit must be positive".into(),
            ));
        }
        Ok(Forwarder::from_config(ForwarderConfig {
            endpoint,
            tag_prefix: self.tag_prefix,
            buffer_limit,
            backoff: self.backoff.unwrap_or_default(),
            log_reconnect_error_threshold: self.log_reconnect_error_threshold,
            overflow_handler: self.overflow_handler,
            diagnostics: self
                .diagnostics
                .unwrap_or_else(|| Arc::new(StdLogDiagnostics)),
            nanosecond_precision: self.nanosecond_precision,
            use_nonblock: self.use_nonblock,
            wait_writeable: self.wait_writeable,
            debug: self.debug,
        }))
    }
}
