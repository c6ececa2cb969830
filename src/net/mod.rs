//! Secure socket layer.
//!
//! # Data Flow
//! ```text
//! Endpoint (handlers + handshake timeout)
//!     → endpoint.init(&mut connection)
//!     → connection.init_transport(runtime, tcp_stream, role)
//!         TLS init handler → TlsContext → SecureSocket + DeadlineTimer
//!     → connection.init(callback)
//!         socket init handler → arm timer → spawn handshake
//!         select { handshake done, timer expired } → callback (once)
//!     → connection.shutdown()
//! ```
//!
//! `listener.rs` and `client.rs` are thin transports that produce
//! connections with their transport already bound.

pub mod client;
pub mod connection;
pub mod endpoint;
pub mod handle;
pub mod handler;
pub mod listener;
pub mod socket;
pub mod timer;
pub mod tls;

pub use client::connect;
pub use connection::{Connection, HandshakeState, Role, DEFAULT_HANDSHAKE_TIMEOUT};
pub use endpoint::Endpoint;
pub use handle::ConnectionHandle;
pub use handler::{SocketInitHandler, TlsInitHandler};
pub use listener::{ConnectionPermit, ListenerError, SecureListener};
pub use socket::SecureSocket;
pub use timer::{DeadlineTimer, TimerEvent, TimerState};
pub use tls::{ContextError, TlsContext};
