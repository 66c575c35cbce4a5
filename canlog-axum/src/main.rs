use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = canlog_axum::ServerConfig::from_env()?;
    let addr = config.addr();
    let app = canlog_axum::build(&config).await?;

    tracing::info!(%addr, backend = %config.backend, "[canlog] listening on http://{addr}");

    app.listen(addr).await?;

    Ok(())
}
