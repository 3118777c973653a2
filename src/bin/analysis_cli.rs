use anyhow::Result;
use clap::Parser;
use interview_analysis::analysis_cli::{handle_analysis_command, AnalysisCli};
use interview_analysis::core::ConfigManager;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so reports can be piped from stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("interview_analysis=info")),
        )
        .init();

    let cli = AnalysisCli::parse();
    let config = ConfigManager::load()?;
    handle_analysis_command(cli, config).await
}
