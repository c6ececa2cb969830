//! Per-socket TLS handshake driver.
//!
//! # Lifecycle
//! ```text
//! Idle ──init_transport──▶ Ready ──init──▶ Handshaking ──┬──▶ Established
//!                                                        ├──▶ Failed
//!                                                        └──▶ TimedOut
//! any ──shutdown──▶ Shutdown
//! ```
//!
//! # The race
//! `init` arms the deadline timer, spawns the handshake, and selects over
//! both. Only a timer *expiry* may win against the handshake; a cancelled
//! timer reports [`TimerEvent::Aborted`] and never resolves anything. The
//! completion callback is an `FnOnce` consumed at a single point after the
//! select, so it runs at most once per attempt, and never if the `init`
//! future is dropped first.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio_rustls::TlsStream;

use crate::error::SocketError;
use crate::net::socket::{HandshakeTask, SecureSocket};
use crate::net::timer::{DeadlineTimer, TimerEvent, TimerState};
use crate::net::{ConnectionHandle, SocketInitHandler, TlsContext, TlsInitHandler};

/// Handshake deadline used unless configured otherwise.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Handshake direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepts the handshake.
    Server,
    /// Initiates the handshake.
    Client,
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Constructed, transport not yet bound.
    Idle,
    /// Socket and timer built, handshake not started.
    Ready,
    Handshaking,
    Established,
    Failed,
    TimedOut,
    Shutdown,
}

/// How the race ended.
enum Resolution {
    Completed(Result<std::io::Result<TlsStream<TcpStream>>, tokio::task::JoinError>),
    Expired,
}

/// TLS socket component of one connection.
pub struct Connection {
    handle: ConnectionHandle,
    role: Option<Role>,
    runtime: Option<Handle>,
    socket: Option<SecureSocket>,
    timer: Option<DeadlineTimer>,
    handshake_timeout: Duration,
    state: HandshakeState,
    /// Handshake left running after its deadline; its result is discarded.
    abandoned: Option<HandshakeTask>,
    socket_init_handler: Option<Arc<dyn SocketInitHandler>>,
    tls_init_handler: Option<Arc<dyn TlsInitHandler>>,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            handle: ConnectionHandle::new(),
            role: None,
            runtime: None,
            socket: None,
            timer: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            state: HandshakeState::Idle,
            abandoned: None,
            socket_init_handler: None,
            tls_init_handler: None,
        }
    }

    /// Always true: this component only produces TLS connections.
    pub fn is_secure(&self) -> bool {
        true
    }

    /// Get the identity handed to this connection's handlers.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// Set the identity passed to handlers. Call before `init_transport`.
    pub fn set_handle(&mut self, handle: ConnectionHandle) {
        self.handle = handle;
    }

    /// Get the role bound by `init_transport`, if any.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Get the current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// State of the deadline timer, `None` before `init_transport`.
    pub fn timer_state(&self) -> Option<TimerState> {
        self.timer.as_ref().map(DeadlineTimer::state)
    }

    /// Get the deadline applied to the next handshake.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Set the handshake deadline. Takes effect at the next `init`.
    pub fn set_handshake_timeout(&mut self, timeout: Duration) {
        self.handshake_timeout = timeout;
    }

    /// Set the handler run on the raw socket just before the handshake.
    pub fn set_socket_init_handler<H>(&mut self, handler: H)
    where
        H: SocketInitHandler + 'static,
    {
        self.socket_init_handler = Some(Arc::new(handler));
    }

    /// Set the handler that supplies this connection's TLS context.
    pub fn set_tls_init_handler<H>(&mut self, handler: H)
    where
        H: TlsInitHandler + 'static,
    {
        self.tls_init_handler = Some(Arc::new(handler));
    }

    pub(crate) fn set_handlers(
        &mut self,
        socket_init: Option<Arc<dyn SocketInitHandler>>,
        tls_init: Option<Arc<dyn TlsInitHandler>>,
    ) {
        self.socket_init_handler = socket_init;
        self.tls_init_handler = tls_init;
    }

    /// The TLS context obtained during `init_transport`.
    pub fn tls_context(&self) -> Option<&TlsContext> {
        self.socket.as_ref().map(SecureSocket::context)
    }

    /// Lowest-layer TCP socket, for setting options.
    ///
    /// `None` before `init_transport`, while the handshake owns the stream,
    /// and after shutdown.
    pub fn raw_socket(&self) -> Option<&TcpStream> {
        self.socket.as_ref().and_then(SecureSocket::raw)
    }

    /// Encrypted stream for the layers above, once the handshake succeeded.
    pub fn wrapped_socket(&mut self) -> Option<&mut TlsStream<TcpStream>> {
        self.socket.as_mut().and_then(SecureSocket::secure_mut)
    }

    /// Bind the connection to a runtime and a connected stream.
    ///
    /// Obtains the TLS context from the TLS init handler and builds the
    /// socket and its deadline timer. On error nothing is built and the
    /// stream is dropped.
    pub fn init_transport(
        &mut self,
        runtime: Handle,
        stream: TcpStream,
        role: Role,
    ) -> Result<(), SocketError> {
        if self.state != HandshakeState::Idle {
            return Err(SocketError::InvalidState(self.state));
        }

        let Some(tls_init) = &self.tls_init_handler else {
            tracing::debug!(connection = %self.handle, "No TLS init handler configured");
            return Err(SocketError::MissingTlsInitHandler);
        };

        let context = tls_init
            .tls_context(self.handle)
            .filter(|context| context.supports(role))
            .ok_or(SocketError::InvalidTlsContext)?;

        self.socket = Some(SecureSocket::new(context, stream));
        self.timer = Some(DeadlineTimer::new(&runtime));
        self.runtime = Some(runtime);
        self.role = Some(role);
        self.state = HandshakeState::Ready;

        tracing::trace!(connection = %self.handle, role = ?role, "Transport initialized");
        Ok(())
    }

    /// Run the handshake and report its outcome to `on_complete`.
    ///
    /// Returns `Err` without calling `on_complete` if the connection is not
    /// ready for a handshake. Otherwise `on_complete` runs exactly once with
    /// `Ok(())`, `HandshakeTimeout`, `HandshakeFailed` or `PassThrough`.
    pub async fn init<F>(&mut self, on_complete: F) -> Result<(), SocketError>
    where
        F: FnOnce(Result<(), SocketError>),
    {
        let handshake = self.start()?;
        let outcome = self.resolve(handshake).await;
        on_complete(outcome);
        Ok(())
    }

    /// [`init`](Self::init) returning the outcome instead of calling back.
    pub async fn handshake(&mut self) -> Result<(), SocketError> {
        let handshake = self.start()?;
        self.resolve(handshake).await
    }

    fn start(&mut self) -> Result<HandshakeTask, SocketError> {
        if self.state != HandshakeState::Ready {
            return Err(SocketError::InvalidState(self.state));
        }
        let (Some(socket), Some(timer), Some(runtime), Some(role)) = (
            self.socket.as_mut(),
            self.timer.as_mut(),
            self.runtime.as_ref(),
            self.role,
        ) else {
            return Err(SocketError::InvalidState(self.state));
        };

        if let (Some(handler), Some(raw)) = (&self.socket_init_handler, socket.raw()) {
            handler.init_socket(self.handle, raw);
        }

        timer.expires_after(self.handshake_timeout);
        let handshake = match socket.start_handshake(role, runtime) {
            Ok(handshake) => handshake,
            Err(err) => {
                timer.cancel();
                self.state = HandshakeState::Failed;
                return Err(err);
            }
        };
        self.state = HandshakeState::Handshaking;

        tracing::debug!(
            connection = %self.handle,
            role = ?role,
            timeout_ms = self.handshake_timeout.as_millis() as u64,
            "TLS handshake started"
        );
        Ok(handshake)
    }

    async fn resolve(&mut self, mut handshake: HandshakeTask) -> Result<(), SocketError> {
        let Some(timer) = self.timer.as_mut() else {
            return Err(SocketError::InvalidState(self.state));
        };

        let resolution = tokio::select! {
            joined = &mut handshake => Resolution::Completed(joined),
            TimerEvent::Expired = timer.wait() => Resolution::Expired,
        };

        match resolution {
            Resolution::Expired => {
                tracing::debug!(
                    connection = %self.handle,
                    timeout_ms = self.handshake_timeout.as_millis() as u64,
                    "TLS handshake timed out"
                );
                self.state = HandshakeState::TimedOut;
                self.abandoned = Some(handshake);
                Err(SocketError::HandshakeTimeout(self.handshake_timeout))
            }
            Resolution::Completed(joined) => {
                if let Some(timer) = self.timer.as_mut() {
                    timer.cancel();
                }
                self.finish(joined)
            }
        }
    }

    fn finish(
        &mut self,
        joined: Result<std::io::Result<TlsStream<TcpStream>>, tokio::task::JoinError>,
    ) -> Result<(), SocketError> {
        let outcome = match joined {
            Ok(Ok(stream)) => {
                if let Some(socket) = self.socket.as_mut() {
                    socket.establish(stream);
                }
                Ok(())
            }
            Ok(Err(err)) => Err(SocketError::from_handshake(err)),
            Err(join_err) => Err(SocketError::PassThrough(std::io::Error::other(join_err))),
        };

        match &outcome {
            Ok(()) => {
                self.state = HandshakeState::Established;
                tracing::debug!(connection = %self.handle, "TLS handshake complete");
            }
            Err(error) => {
                self.state = HandshakeState::Failed;
                tracing::debug!(connection = %self.handle, error = %error, "TLS handshake failed");
            }
        }
        outcome
    }

    /// Best-effort TLS shutdown. Errors are logged and discarded.
    pub async fn shutdown(&mut self) {
        if let Some(abandoned) = self.abandoned.take() {
            if abandoned.is_finished() {
                tracing::trace!(connection = %self.handle, "Discarding late handshake result");
            }
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }

        if let Some(socket) = self.socket.as_mut() {
            if let Err(error) = socket.shutdown().await {
                tracing::debug!(connection = %self.handle, error = %error, "TLS shutdown failed");
            }
        }
        self.state = HandshakeState::Shutdown;
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("handle", &self.handle)
            .field("role", &self.role)
            .field("state", &self.state)
            .field("timer", &self.timer_state())
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}
