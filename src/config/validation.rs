//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and that the TLS material
//! is coherent. Every problem is reported, not just the first.

use std::net::SocketAddr;

use rustls::pki_types::ServerName;
use thiserror::Error;

use crate::config::schema::SocketConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("handshake.timeout_ms must be greater than zero")]
    ZeroHandshakeTimeout,

    #[error("tls.cert_path and tls.key_path must be set together")]
    IncompleteServerIdentity,

    #[error("tls.server_name {0:?} is not a valid DNS name or IP address")]
    InvalidServerName(String),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

impl ValidationError {
    /// The TOML table the offending key lives in.
    pub fn section(&self) -> &'static str {
        match self {
            ValidationError::InvalidBindAddress(_) | ValidationError::ZeroMaxConnections => "listener",
            ValidationError::ZeroHandshakeTimeout => "handshake",
            ValidationError::IncompleteServerIdentity | ValidationError::InvalidServerName(_) => "tls",
            ValidationError::InvalidLogLevel(_) => "observability",
        }
    }
}

pub fn validate_config(config: &SocketConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.handshake.timeout_ms == 0 {
        errors.push(ValidationError::ZeroHandshakeTimeout);
    }
    if config.tls.cert_path.is_some() != config.tls.key_path.is_some() {
        errors.push(ValidationError::IncompleteServerIdentity);
    }
    if let Some(name) = &config.tls.server_name {
        if ServerName::try_from(name.as_str()).is_err() {
            errors.push(ValidationError::InvalidServerName(name.clone()));
        }
    }
    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&SocketConfig::default()), Ok(()));
    }

    #[test]
    fn all_errors_are_reported() {
        let mut config = SocketConfig::default();
        config.listener.bind_address = "not an address".into();
        config.handshake.timeout_ms = 0;
        config.tls.cert_path = Some("cert.pem".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress("not an address".into()),
                ValidationError::ZeroHandshakeTimeout,
                ValidationError::IncompleteServerIdentity,
            ]
        );
    }

    #[test]
    fn bad_server_name_and_level_are_rejected() {
        let mut config = SocketConfig::default();
        config.tls.server_name = Some("bad name!".into());
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidServerName("bad name!".into())));
        assert!(errors.contains(&ValidationError::InvalidLogLevel("loud".into())));
        assert!(errors.iter().any(|e| e.section() == "tls"));
        assert!(errors.iter().any(|e| e.section() == "observability"));
    }
}
