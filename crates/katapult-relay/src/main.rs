use clap::Parser;
use katapult_relay::Cli;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = Cli::parse().into_settings();
    let app = katapult_relay::app(&settings)?;

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .inspect_err(|e| error!(addr = %settings.bind_addr, "failed to bind: {e}"))?;
    info!(
        addr = %listener.local_addr()?,
        upstream = %settings.upstream_base_url,
        origin = %settings.allowed_origin,
        "relay listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
