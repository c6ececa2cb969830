//! Opaque connection identity passed to every handler.

use std::sync::atomic::{AtomicU64, Ordering};

/// Relaxed ordering is enough: handles only need to be unique.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identity of one secure connection.
///
/// Handlers receive it so they can tell connections apart (for example to
/// pick a per-tenant TLS context). The owning transport may replace the
/// generated value with its own via [`Connection::set_handle`].
///
/// Generated and raw handles share one value space and nothing checks
/// them against each other. A transport that installs raw handles owns
/// their uniqueness, and should not mix them with [`ConnectionHandle::new`]
/// on connections whose handlers key state by handle.
///
/// [`Connection::set_handle`]: crate::net::Connection::set_handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(u64);

impl ConnectionHandle {
    /// Allocate a fresh process-unique handle.
    pub fn new() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a handle value chosen by the owning transport, such as its own
    /// session id. The value is passed to handlers and logged unchanged.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
