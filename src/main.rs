use anyhow::Result;
use interview_analysis::{core::ConfigManager, start_web_server};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

#[tokio::main]
async fn main() -> Result<()> {
    Registry::default()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("interview_analysis=info,rocket::server=off")),
        )
        .init();

    let config = ConfigManager::load()?;

    info!("Starting interview analysis service");
    info!("Environment: {}", config.environment_name);
    info!("Vendor API: {}", config.vendor.api_url);

    start_web_server(config).await
}
