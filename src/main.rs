use anyhow::Result;
use docs_locale_gate::{config, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docs_locale_gate=info".parse()?),
        )
        .init();

    info!("Starting docs dev server");

    // Load configuration from environment
    let config = config::Config::from_env()?;
    info!(
        "Locales: {:?} (default {}), cookie '{}'",
        config.locale.supported_locales, config.locale.default_locale, config.locale.cookie_name
    );

    server::serve(config).await
}
