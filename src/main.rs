use anyhow::Result;
use tracing_subscriber::EnvFilter;
use useradmin::config::AdminConfig;
use useradmin::server::ServerBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AdminConfig::from_env()?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        public_url = %config.public_url,
        root_role = %config.root_role,
        "starting useradmin"
    );

    ServerBuilder::new().with_config(config).serve().await
}
