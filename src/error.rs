//! Error taxonomy for secure connections.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::net::HandshakeState;

/// Failure of a secure connection's initialization or handshake.
///
/// `MissingTlsInitHandler`, `InvalidTlsContext` and `InvalidState` are
/// returned synchronously. The handshake variants are only ever delivered
/// through the completion callback.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("no TLS init handler configured")]
    MissingTlsInitHandler,

    #[error("TLS init handler returned no usable context")]
    InvalidTlsContext,

    #[error("TLS handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    /// The TLS engine rejected the handshake.
    #[error("TLS handshake failed: {0}")]
    HandshakeFailed(#[source] io::Error),

    /// Transport error surfaced verbatim.
    #[error("transport error: {0}")]
    PassThrough(#[source] io::Error),

    #[error("operation not allowed in state {0:?}")]
    InvalidState(HandshakeState),
}

impl SocketError {
    /// Sort a handshake I/O error into engine failure or transport noise.
    ///
    /// tokio-rustls reports protocol errors as `io::Error`s wrapping a
    /// [`rustls::Error`]; anything else came from the socket.
    pub(crate) fn from_handshake(error: io::Error) -> Self {
        let from_engine = error
            .get_ref()
            .is_some_and(|inner| inner.is::<rustls::Error>());
        if from_engine {
            SocketError::HandshakeFailed(error)
        } else {
            SocketError::PassThrough(error)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SocketError::HandshakeTimeout(_))
    }
}
