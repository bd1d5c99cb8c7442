//! Error types for distcache

use std::fmt;
use std::time::Duration;

/// Result type alias for distcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by groups, the registry and the peer boundary
///
/// `Clone` so one failed fetch can be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid construction or registration parameters
    Config(String),

    /// No group registered under this name
    UnknownGroup(String),

    /// The loader reported that the key does not exist
    NotFound {
        /// Requested key
        key: String,
    },

    /// The loader failed
    Load {
        /// Requested key
        key: String,
        /// Loader's description of the failure
        message: String,
    },

    /// The owning peer could not be reached or answered with an error
    PeerFetch {
        /// Peer address
        peer: String,
        /// Failure description
        message: String,
    },

    /// The owning peer did not answer within the fetch budget
    PeerTimeout {
        /// Peer address
        peer: String,
        /// Budget that expired
        timeout: Duration,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::UnknownGroup(name) => write!(f, "Unknown group: {}", name),
            Error::NotFound { key } => write!(f, "Key not found: {}", key),
            Error::Load { key, message } => {
                write!(f, "Load error for key {}: {}", key, message)
            }
            Error::PeerFetch { peer, message } => {
                write!(f, "Peer fetch from {} failed: {}", peer, message)
            }
            Error::PeerTimeout { peer, timeout } => {
                write!(f, "Peer {} timed out after {:?}", peer, timeout)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<distlru::Error> for Error {
    fn from(err: distlru::Error) -> Self {
        Error::Config(err.to_string())
    }
}
