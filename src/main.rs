//! TLS echo server and client built on the secure socket component.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use secure_socket::config::{load_config, SocketConfig};
use secure_socket::net::{self, Connection, ConnectionHandle, SecureListener};
use secure_socket::observability::logging;
use secure_socket::{Endpoint, TlsContext};

#[derive(Parser)]
#[command(name = "secure-socket")]
#[command(about = "TLS echo server and client with bounded handshakes", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept TLS connections and echo whatever they send
    Serve,
    /// Connect to a TLS echo server, send a message and print the reply
    Connect {
        /// Server address, e.g. 127.0.0.1:8443
        addr: SocketAddr,

        #[arg(short, long, default_value = "hello")]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SocketConfig::default(),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init_logging(&logging::default_directive(level));

    let context = TlsContext::from_config(&config.tls)?;
    let mut endpoint = Endpoint::from_config(&config.handshake);
    endpoint.set_tls_init_handler(context);

    tracing::info!(
        handshake_timeout_ms = config.handshake.timeout_ms,
        nodelay = config.handshake.nodelay,
        "secure-socket v0.1.0 starting"
    );

    match cli.command {
        Commands::Serve => serve(&config, endpoint).await?,
        Commands::Connect { addr, message } => {
            let reply = request(&endpoint, addr, message.as_bytes()).await?;
            println!("{}", String::from_utf8_lossy(&reply));
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(config: &SocketConfig, endpoint: Endpoint) -> Result<(), Box<dyn std::error::Error>> {
    let listener = SecureListener::bind(&config.listener, endpoint).await?;

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, no longer accepting");
                return Ok(());
            }
        };

        let (connection, peer_addr, permit) = match accepted {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(error = %error, "Accept failed");
                continue;
            }
        };

        tokio::spawn(async move {
            let _permit = permit;
            echo(connection, peer_addr).await;
        });
    }
}

async fn echo(mut connection: Connection, peer_addr: SocketAddr) {
    let handle = connection.handle();
    let mut established = false;
    let started = connection
        .init(|outcome| match outcome {
            Ok(()) => established = true,
            Err(error) => report_failure(handle, peer_addr, &error),
        })
        .await;
    if let Err(error) = started {
        report_failure(handle, peer_addr, &error);
    }

    if established {
        if let Some(stream) = connection.wrapped_socket() {
            let mut buf = vec![0u8; 4096];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Err(error) = stream.write_all(&buf[..n]).await {
                            tracing::debug!(connection = %handle, error = %error, "Echo write failed");
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::debug!(connection = %handle, error = %error, "Echo read failed");
                        break;
                    }
                }
            }
        }
    }

    connection.shutdown().await;
}

fn report_failure(handle: ConnectionHandle, peer_addr: SocketAddr, error: &secure_socket::SocketError) {
    tracing::warn!(connection = %handle, peer_addr = %peer_addr, error = %error, "Handshake failed");
}

async fn request(
    endpoint: &Endpoint,
    addr: SocketAddr,
    message: &[u8],
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut connection = net::connect(endpoint, addr).await?;
    connection.handshake().await?;

    let mut reply = Vec::with_capacity(message.len());
    if let Some(stream) = connection.wrapped_socket() {
        stream.write_all(message).await?;
        stream.flush().await?;

        let mut buf = vec![0u8; message.len()];
        stream.read_exact(&mut buf).await?;
        reply.extend_from_slice(&buf);
    }

    connection.shutdown().await;
    Ok(reply)
}
