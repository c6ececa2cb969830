//! Encrypted stream wrapper over a raw TCP socket.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio_rustls::{TlsAcceptor, TlsConnector, TlsStream};

use crate::error::SocketError;
use crate::net::{Role, TlsContext};

type Handshake = io::Result<TlsStream<TcpStream>>;

/// Where the underlying stream currently lives.
#[derive(Debug)]
enum Stage {
    Raw(TcpStream),
    /// Moved into a running handshake task.
    Handshaking,
    Secure(Box<TlsStream<TcpStream>>),
    Closed,
}

/// A raw stream paired with the TLS context that will secure it.
#[derive(Debug)]
pub struct SecureSocket {
    context: TlsContext,
    stage: Stage,
}

impl SecureSocket {
    pub(crate) fn new(context: TlsContext, stream: TcpStream) -> Self {
        Self {
            context,
            stage: Stage::Raw(stream),
        }
    }

    pub fn context(&self) -> &TlsContext {
        &self.context
    }

    /// The lowest-layer TCP socket, when this socket holds it.
    pub fn raw(&self) -> Option<&TcpStream> {
        match &self.stage {
            Stage::Raw(stream) => Some(stream),
            Stage::Secure(tls) => Some(tls.get_ref().0),
            Stage::Handshaking | Stage::Closed => None,
        }
    }

    pub fn secure(&self) -> Option<&TlsStream<TcpStream>> {
        match &self.stage {
            Stage::Secure(tls) => Some(tls.as_ref()),
            _ => None,
        }
    }

    pub fn secure_mut(&mut self) -> Option<&mut TlsStream<TcpStream>> {
        match &mut self.stage {
            Stage::Secure(tls) => Some(tls.as_mut()),
            _ => None,
        }
    }

    /// Hand the raw stream to a handshake task on `runtime`.
    pub(crate) fn start_handshake(
        &mut self,
        role: Role,
        runtime: &Handle,
    ) -> Result<HandshakeTask, SocketError> {
        if !self.context.supports(role) {
            return Err(SocketError::InvalidTlsContext);
        }
        let stream = match std::mem::replace(&mut self.stage, Stage::Handshaking) {
            Stage::Raw(stream) => stream,
            other => {
                self.stage = other;
                return Err(SocketError::PassThrough(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "raw socket is no longer available",
                )));
            }
        };

        let task = match role {
            Role::Server => {
                let acceptor = self
                    .context
                    .server_config()
                    .map(|config| TlsAcceptor::from(Arc::clone(config)));
                runtime.spawn(async move {
                    match acceptor {
                        Some(acceptor) => acceptor.accept(stream).await.map(TlsStream::from),
                        None => Err(io::Error::other("no server configuration")),
                    }
                })
            }
            Role::Client => {
                let connector = self
                    .context
                    .client_config()
                    .map(|(config, name)| (TlsConnector::from(Arc::clone(config)), name.clone()));
                runtime.spawn(async move {
                    match connector {
                        Some((connector, name)) => {
                            connector.connect(name, stream).await.map(TlsStream::from)
                        }
                        None => Err(io::Error::other("no client configuration")),
                    }
                })
            }
        };

        Ok(HandshakeTask(task))
    }

    pub(crate) fn establish(&mut self, stream: TlsStream<TcpStream>) {
        self.stage = Stage::Secure(Box::new(stream));
    }

    /// Send close_notify and shut down the write side, if secured.
    ///
    /// Leaves the socket closed whatever the outcome.
    pub(crate) async fn shutdown(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.stage, Stage::Closed) {
            Stage::Secure(mut tls) => tls.shutdown().await,
            _ => Ok(()),
        }
    }
}

/// A spawned handshake. Aborted when dropped so that a discarded
/// connection never leaves its socket behind in a detached task.
#[derive(Debug)]
pub(crate) struct HandshakeTask(JoinHandle<Handshake>);

impl HandshakeTask {
    pub(crate) fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Future for HandshakeTask {
    type Output = Result<Handshake, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl Drop for HandshakeTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
