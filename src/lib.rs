//! TLS socket component: upgrades connected TCP streams to TLS and drives
//! the handshake against a deadline, reporting exactly one outcome.

pub mod config;
pub mod error;
pub mod net;
pub mod observability;

pub use config::SocketConfig;
pub use error::SocketError;
pub use net::{Connection, Endpoint, Role, TlsContext};
