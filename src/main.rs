use tracing::info;
use tracing_subscriber::EnvFilter;

use docintake_lib::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A missing TYPLESS_API_KEY stops the process here, before anything is served.
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: typless_url={}, db={}, addr={}",
        config.typless_api_url,
        config.db_path.display(),
        config.bind_addr()
    );

    docintake_lib::run(config).await?;
    Ok(())
}
