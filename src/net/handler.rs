//! Handler capabilities injected into connections.

use tokio::net::TcpStream;

use crate::net::{ConnectionHandle, TlsContext};

/// Called once per connection with the raw TCP socket, before any TLS bytes
/// are exchanged. Use it to set socket options.
pub trait SocketInitHandler: Send + Sync {
    fn init_socket(&self, handle: ConnectionHandle, socket: &TcpStream);
}

impl<F> SocketInitHandler for F
where
    F: Fn(ConnectionHandle, &TcpStream) + Send + Sync,
{
    fn init_socket(&self, handle: ConnectionHandle, socket: &TcpStream) {
        self(handle, socket)
    }
}

/// Supplies the TLS context for a connection.
///
/// Returning `None` fails that connection's transport initialization with
/// [`SocketError::InvalidTlsContext`](crate::SocketError::InvalidTlsContext).
pub trait TlsInitHandler: Send + Sync {
    fn tls_context(&self, handle: ConnectionHandle) -> Option<TlsContext>;
}

impl<F> TlsInitHandler for F
where
    F: Fn(ConnectionHandle) -> Option<TlsContext> + Send + Sync,
{
    fn tls_context(&self, handle: ConnectionHandle) -> Option<TlsContext> {
        self(handle)
    }
}
