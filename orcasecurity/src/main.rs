use orcasecurity::OrcaProvider;
use std::env;
use tfplug::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Stdout carries the plugin handshake line, so logs must go to stderr
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    // Terraform launches the binary from its plugin directory, so the TLS
    // material sits next to the executable
    let exe_dir = env::current_exe()?
        .parent()
        .map(|dir| dir.to_path_buf())
        .unwrap_or_default();

    let config = ServerConfig::new()
        .with_cert_path(exe_dir.join("cert.pem"))
        .with_key_path(exe_dir.join("key.pem"));

    tfplug::serve(OrcaProvider::new(), config).await?;

    Ok(())
}
