//! TCP listener that hands out server-role secure connections.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Enforce max_connections via a semaphore
//! - Wrap each accepted stream in a [`Connection`] with its transport bound

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use crate::config::ListenerConfig;
use crate::error::SocketError;
use crate::net::{Connection, Endpoint, Role};

/// Error type for listener and connect operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept a connection.
    Accept(std::io::Error),
    /// Failed to dial a peer.
    Connect(std::io::Error),
    /// The connection limit semaphore was closed.
    Closed,
    /// The accepted stream could not be bound to a secure connection.
    Transport(SocketError),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
            ListenerError::Connect(e) => write!(f, "Failed to connect: {}", e),
            ListenerError::Closed => write!(f, "Listener closed"),
            ListenerError::Transport(e) => write!(f, "Failed to initialize transport: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind(e) | ListenerError::Accept(e) | ListenerError::Connect(e) => Some(e),
            ListenerError::Transport(e) => Some(e),
            ListenerError::Closed => None,
        }
    }
}

/// A bounded TCP listener producing TLS server connections.
///
/// When `max_connections` connections are held, `accept` waits until a
/// [`ConnectionPermit`] is dropped.
pub struct SecureListener {
    inner: TcpListener,
    endpoint: Endpoint,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl SecureListener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig, endpoint: Endpoint) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            handshake_timeout_ms = endpoint.handshake_timeout().as_millis() as u64,
            "Secure listener bound"
        );

        Ok(Self {
            inner: listener,
            endpoint,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Accept the next connection, respecting the connection limit.
    ///
    /// The returned connection is ready for [`Connection::init`]; the permit
    /// must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(Connection, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        let mut connection = self.endpoint.connection();
        connection
            .init_transport(Handle::current(), stream, Role::Server)
            .map_err(ListenerError::Transport)?;

        tracing::debug!(
            peer_addr = %addr,
            connection = %connection.handle(),
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((connection, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get the number of connection slots currently free.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get the maximum number of concurrent connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A connection slot, released when dropped.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
