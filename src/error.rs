//! Unified error type.

use std::fmt;

/// The error type returned by weathervane's fallible operations.
///
/// Application-level outcomes (redirects, 401, 404, etc.) are expressed as
/// HTTP [`Response`](crate::Response) values, not as `Error`s. This type
/// surfaces what can actually take the process down: binding the listener,
/// accepting a connection, or malformed startup configuration. Only the
/// `Config` variant is allowed to be fatal — it means the process must not
/// begin accepting requests.
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure (bind, accept).
    Io(std::io::Error),
    /// Malformed or unreadable startup configuration.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
