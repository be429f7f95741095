//! Plugin server startup: TLS, the go-plugin handshake, and shutdown.
//!
//! [`serve`] owns the whole lifecycle of a provider process. It brings up a
//! tonic server on an ephemeral localhost port, prints the single handshake
//! line Terraform reads from stdout, and then serves protocol v6 until
//! Terraform calls StopProvider or kills the process.
//!
//! Nothing else may write to stdout. Terraform parses exactly one line from
//! it; all logging goes to stderr, where Terraform captures and re-emits it.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::provider_server::ProviderServer;
use crate::provider::Provider;
use std::path::PathBuf;
use std::time::Duration;
use tonic::transport::{Identity, Server, ServerTlsConfig};

/// Verbosity threshold for the stderr subscriber [`serve`] installs.
#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Settings for [`serve`].
///
/// The TLS certificate and key are required; Terraform refuses plaintext
/// plugin connections. The remaining fields have workable defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// Cap on a single gRPC message in either direction, in bytes.
    pub max_message_size: usize,
    /// When false, [`serve`] installs no tracing subscriber and the binary
    /// is expected to have set one up itself.
    pub enable_logging: bool,
    pub log_level: LogLevel,
    /// How long in-flight requests may run after StopProvider before the
    /// process exits anyway.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./certs/localhost.pem"),
            key_path: PathBuf::from("./certs/localhost-key.pem"),
            max_message_size: 256 << 20, // 256MB
            enable_logging: true,
            log_level: LogLevel::Info,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn without_logging(mut self) -> Self {
        self.enable_logging = false;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Run `provider` as a Terraform plugin until shutdown.
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    // Stdout is reserved for the handshake line, so logs go to stderr
    // where Terraform collects and forwards them
    if config.enable_logging {
        let level = match config.log_level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        };
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init();
    }

    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let grpc_server = GrpcProviderServer::new(provider);
    let mut stop_rx = grpc_server.stop_signal();
    let mut timeout_rx = grpc_server.stop_signal();
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let cert = tokio::fs::read(&config.cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;

    let key = tokio::fs::read(&config.key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

    let identity = Identity::from_pem(cert, key);
    let tls_config = ServerTlsConfig::new().identity(identity);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let actual_addr = listener.local_addr()?;

    // go-plugin handshake: core-version|protocol-version|network|address|protocol
    println!("1|6|tcp|{}|grpc", actual_addr);
    tracing::info!(address = %actual_addr, "provider server listening");

    let server = Server::builder()
        .tls_config(tls_config)?
        .add_service(provider_service);

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    let serve_future = server.serve_with_incoming_shutdown(incoming, async move {
        let _ = stop_rx.changed().await;
        tracing::info!("stop requested, draining in-flight requests");
    });

    // StopProvider starts a graceful drain; the timeout caps how long
    // in-flight requests can hold the process open
    let shutdown_timeout = config.shutdown_timeout;
    tokio::select! {
        result = serve_future => result?,
        _ = async {
            let _ = timeout_rx.changed().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!("graceful shutdown timed out, exiting");
        }
    }

    Ok(())
}

/// [`serve`] with [`ServerConfig::default`].
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}
