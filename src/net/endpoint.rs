//! Endpoint-wide TLS socket configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::config::HandshakeConfig;
use crate::net::connection::DEFAULT_HANDSHAKE_TIMEOUT;
use crate::net::{Connection, ConnectionHandle, SocketInitHandler, TlsInitHandler};

/// Holds the handlers and handshake deadline shared by every connection of
/// a listener or client, and stamps them onto new connections.
#[derive(Clone)]
pub struct Endpoint {
    socket_init_handler: Option<Arc<dyn SocketInitHandler>>,
    tls_init_handler: Option<Arc<dyn TlsInitHandler>>,
    handshake_timeout: Duration,
}

impl Endpoint {
    /// Create an endpoint with no handlers and the default deadline.
    pub fn new() -> Self {
        Self {
            socket_init_handler: None,
            tls_init_handler: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Endpoint with the configured deadline. When `nodelay` is set, installs
    /// a socket init handler that disables Nagle's algorithm.
    pub fn from_config(config: &HandshakeConfig) -> Self {
        let mut endpoint = Self::new();
        endpoint.set_handshake_timeout(config.timeout());
        if config.nodelay {
            endpoint.set_socket_init_handler(|handle: ConnectionHandle, socket: &TcpStream| {
                if let Err(error) = socket.set_nodelay(true) {
                    tracing::warn!(connection = %handle, error = %error, "Failed to set TCP_NODELAY");
                }
            });
        }
        endpoint
    }

    /// Always true: every connection this endpoint creates is TLS.
    pub fn is_secure(&self) -> bool {
        true
    }

    /// Set the raw socket handler copied onto every new connection.
    pub fn set_socket_init_handler<H>(&mut self, handler: H)
    where
        H: SocketInitHandler + 'static,
    {
        self.socket_init_handler = Some(Arc::new(handler));
    }

    /// Set the TLS context handler copied onto every new connection.
    pub fn set_tls_init_handler<H>(&mut self, handler: H)
    where
        H: TlsInitHandler + 'static,
    {
        self.tls_init_handler = Some(Arc::new(handler));
    }

    /// Set the handshake deadline copied onto every new connection.
    pub fn set_handshake_timeout(&mut self, timeout: Duration) {
        self.handshake_timeout = timeout;
    }

    /// Get the handshake deadline for new connections.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Copy this endpoint's handlers and deadline onto `connection`.
    ///
    /// A missing TLS init handler is not an error here; it surfaces from
    /// [`Connection::init_transport`].
    pub fn init(&self, connection: &mut Connection) {
        tracing::trace!(connection = %connection.handle(), "Initializing TLS socket component");
        connection.set_handlers(
            self.socket_init_handler.clone(),
            self.tls_init_handler.clone(),
        );
        connection.set_handshake_timeout(self.handshake_timeout);
    }

    /// A fresh connection already initialized by this endpoint.
    pub fn connection(&self) -> Connection {
        let mut connection = Connection::new();
        self.init(&mut connection);
        connection
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("socket_init_handler", &self.socket_init_handler.is_some())
            .field("tls_init_handler", &self.tls_init_handler.is_some())
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}
