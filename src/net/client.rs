//! Client-side dialing.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::runtime::Handle;

use crate::net::listener::ListenerError;
use crate::net::{Connection, Endpoint, Role};

/// Dial `addr` and return a client-role connection ready for
/// [`Connection::init`].
pub async fn connect(endpoint: &Endpoint, addr: SocketAddr) -> Result<Connection, ListenerError> {
    let stream = TcpStream::connect(addr).await.map_err(ListenerError::Connect)?;

    let mut connection = endpoint.connection();
    connection
        .init_transport(Handle::current(), stream, Role::Client)
        .map_err(ListenerError::Transport)?;

    tracing::debug!(peer_addr = %addr, connection = %connection.handle(), "Connected");
    Ok(connection)
}
