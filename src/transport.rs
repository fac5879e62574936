//! Transport primitives: the collector endpoint and the stream connected to it.

use std::{
    fmt,
    io::{self, Write},
    net::TcpStream,
    path::PathBuf,
};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Default collector host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default collector port.
pub const DEFAULT_PORT: u16 = 24224;

/// Remote endpoint the forwarder ships frames to.
///
/// TCP and Unix-domain endpoints are mutually exclusive; the builder enforces
/// this at construction time.
#[derive(Clone, Debug)]
pub enum Endpoint {
    /// TCP connection to `host:port`.
    Tcp { host: String, port: u16 },
    /// Unix-domain stream socket at the given path.
    Unix { path: PathBuf },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            Endpoint::Unix { path } => write!(f, "{}", path.display()),
        }
    }
}

/// An established stream connection.
///
/// Owned exclusively by one connection manager. Reconnection always replaces
/// the whole value; a half-open socket is never reused.
pub(crate) enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    /// Write part of `buf`, returning the number of bytes accepted.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Stream::Unix(stream) => stream.write(buf),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Stream::Unix(stream) => stream.flush(),
        }
    }

    pub fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.set_nonblocking(nonblocking),
            #[cfg(unix)]
            Stream::Unix(stream) => stream.set_nonblocking(nonblocking),
        }
    }
}

/// Open one stream to the endpoint.
///
/// No explicit connect timeout is applied; the transport default governs how
/// long establishment may take.
pub(crate) fn connect(endpoint: &Endpoint) -> io::Result<Stream> {
    match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))?;
            Ok(Stream::Tcp(stream))
        }
        Endpoint::Unix { path } => {
            #[cfg(unix)]
            {
                let stream = UnixStream::connect(path)?;
                Ok(Stream::Unix(stream))
            }
            #[cfg(not(unix))]
            {
                let _ = path;
                Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix domain sockets are not supported on this platform",
                ))
            }
        }
    }
}
