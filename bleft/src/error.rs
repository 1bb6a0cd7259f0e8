//! Error types for file transfer operations
// (c) 2026 Ross Younger

use crate::transport::TransportError;

/// The outcome class of a failed operation.
///
/// Every kind is terminal to the single operation in flight; the connection remains usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum ErrorKind {
    /// The target of a read, delete or move does not exist (or a directory to be deleted was not empty)
    MissingFile,
    /// The target of a mkdir or listdir was invalid or inaccessible
    InvalidPath,
    /// The responder declined a write
    WriteRejected,
    /// The peer sent something that did not fit the protocol: an unexpected command,
    /// an out-of-sequence offset or a declared length that was violated
    Protocol,
    /// The operation needs a newer protocol version than the peer reports
    UnsupportedByPeer,
}

/// Error type for all protocol engine operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation failed for a protocol-level reason
    #[error("{kind}: {message}")]
    Operation {
        /// What class of failure this was
        kind: ErrorKind,
        /// Human-readable detail
        message: String,
    },
    /// The underlying packet transport failed (for example, the peer disconnected)
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl Error {
    /// Constructor
    pub(crate) fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self::Operation {
            kind,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`ErrorKind::Protocol`]
    pub(crate) fn protocol<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// The kind of protocol failure, or `None` if this was a transport failure
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Operation { kind, .. } => Some(*kind),
            Error::Transport(_) => None,
        }
    }

    /// Was this caused by the transport disconnecting?
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Disconnected))
    }
}

/// Result type for protocol engine operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
