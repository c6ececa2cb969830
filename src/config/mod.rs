//! Configuration management.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SocketConfig (validated, immutable)
//!     → Endpoint::from_config / TlsContext::from_config / SecureListener::bind
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{HandshakeConfig, ListenerConfig, ObservabilityConfig, SocketConfig, TlsConfig};
pub use validation::{validate_config, ValidationError};
