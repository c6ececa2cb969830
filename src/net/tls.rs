//! TLS contexts and certificate loading.
//!
//! A [`TlsContext`] is the opaque capability a connection handshakes with.
//! It bundles an optional rustls server configuration and an optional client
//! configuration (with the name to verify), so one context can serve both
//! roles. Cloning is cheap; the configurations sit behind `Arc`s and are
//! meant to be shared across many connections.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, InvalidDnsNameError, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use thiserror::Error;

use crate::config::TlsConfig;
use crate::net::{ConnectionHandle, Role, TlsInitHandler};

/// Server name used when a client context does not configure one.
pub const DEFAULT_SERVER_NAME: &str = "localhost";

/// Error building a [`TlsContext`].
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read PEM material: {0}")]
    Io(#[from] io::Error),

    #[error("no certificates found in {0}")]
    NoCertificates(String),

    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    #[error("invalid server name: {0}")]
    InvalidServerName(#[from] InvalidDnsNameError),

    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Certificate and cipher configuration for one or both handshake roles.
#[derive(Clone, Default)]
pub struct TlsContext {
    server: Option<Arc<ServerConfig>>,
    client: Option<(Arc<ClientConfig>, ServerName<'static>)>,
}

impl TlsContext {
    /// Context that can only accept handshakes.
    pub fn server(config: Arc<ServerConfig>) -> Self {
        Self {
            server: Some(config),
            client: None,
        }
    }

    /// Context that can only initiate handshakes, verifying `server_name`.
    pub fn client(config: Arc<ClientConfig>, server_name: ServerName<'static>) -> Self {
        Self {
            server: None,
            client: Some((config, server_name)),
        }
    }

    /// Add server-side configuration, keeping any client side.
    pub fn with_server(mut self, config: Arc<ServerConfig>) -> Self {
        self.server = Some(config);
        self
    }

    /// Add client-side configuration, keeping any server side.
    pub fn with_client(mut self, config: Arc<ClientConfig>, server_name: ServerName<'static>) -> Self {
        self.client = Some((config, server_name));
        self
    }

    /// Whether this context can drive a handshake in `role`.
    pub fn supports(&self, role: Role) -> bool {
        match role {
            Role::Server => self.server.is_some(),
            Role::Client => self.client.is_some(),
        }
    }

    /// Get the configuration used to accept handshakes.
    pub fn server_config(&self) -> Option<&Arc<ServerConfig>> {
        self.server.as_ref()
    }

    /// Get the configuration and expected name used to initiate handshakes.
    pub fn client_config(&self) -> Option<(&Arc<ClientConfig>, &ServerName<'static>)> {
        self.client.as_ref().map(|(config, name)| (config, name))
    }

    /// Build a server context from in-memory PEM certificate chain and key.
    pub fn server_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, ContextError> {
        let certs = read_certs(&mut &cert_pem[..], "certificate PEM")?;
        let key = read_key(&mut &key_pem[..], "key PEM")?;
        Ok(Self::server(Arc::new(server_config(certs, key)?)))
    }

    /// Load a server context from certificate and key files.
    pub fn load_server(cert_path: &Path, key_path: &Path) -> Result<Self, ContextError> {
        let certs = read_certs(&mut open(cert_path)?, &cert_path.display().to_string())?;
        let key = read_key(&mut open(key_path)?, &key_path.display().to_string())?;
        Ok(Self::server(Arc::new(server_config(certs, key)?)))
    }

    /// Load a client context trusting the CA certificates in `ca_path`.
    pub fn load_client(ca_path: &Path, server_name: &str) -> Result<Self, ContextError> {
        let certs = read_certs(&mut open(ca_path)?, &ca_path.display().to_string())?;
        let mut roots = RootCertStore::empty();
        for cert in certs {
            roots.add(cert)?;
        }

        let config = ClientConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        let name = ServerName::try_from(server_name.to_string())?;
        Ok(Self::client(Arc::new(config), name))
    }

    /// Build whatever roles the configuration provides material for.
    pub fn from_config(config: &TlsConfig) -> Result<Self, ContextError> {
        let mut context = TlsContext::default();

        if let (Some(cert), Some(key)) = (&config.cert_path, &config.key_path) {
            if let Some(server) = Self::load_server(Path::new(cert), Path::new(key))?.server {
                context = context.with_server(server);
            }
        }

        if let Some(ca) = &config.ca_path {
            let name = config.server_name.as_deref().unwrap_or(DEFAULT_SERVER_NAME);
            if let Some((client, server_name)) = Self::load_client(Path::new(ca), name)?.client {
                context = context.with_client(client, server_name);
            }
        }

        Ok(context)
    }
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext")
            .field("server", &self.server.is_some())
            .field("client", &self.client.as_ref().map(|(_, name)| name))
            .finish()
    }
}

/// A fixed context hands the same shared configuration to every connection.
impl TlsInitHandler for TlsContext {
    fn tls_context(&self, _handle: ConnectionHandle) -> Option<TlsContext> {
        Some(self.clone())
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<ServerConfig, ContextError> {
    let config = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    Ok(config)
}

fn open(path: &Path) -> Result<BufReader<File>, ContextError> {
    if !path.exists() {
        return Err(ContextError::NotFound(path.to_path_buf()));
    }
    Ok(BufReader::new(File::open(path)?))
}

fn read_certs(
    reader: &mut dyn io::BufRead,
    source: &str,
) -> Result<Vec<CertificateDer<'static>>, ContextError> {
    let certs = rustls_pemfile::certs(reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(ContextError::NoCertificates(source.to_string()));
    }
    Ok(certs)
}

fn read_key(reader: &mut dyn io::BufRead, source: &str) -> Result<PrivateKeyDer<'static>, ContextError> {
    rustls_pemfile::private_key(reader)?.ok_or_else(|| ContextError::NoPrivateKey(source.to_string()))
}
