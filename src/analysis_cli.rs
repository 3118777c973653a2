// src/analysis_cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::{
    AnalysisNormalizer, AnalysisRequest, AnalysisResult, SummaryReportRenderer,
};
use crate::core::{ConfigManager, Database};
use crate::service::AnalysisService;
use crate::utils;
use crate::vendor::VendorClient;

#[derive(Parser)]
#[command(name = "analysis-cli")]
#[command(about = "Analyze interview fragments and manage interview sessions")]
pub struct AnalysisCli {
    #[command(subcommand)]
    pub command: AnalysisCommand,

    /// Overrides the database path from config.yaml
    #[arg(long, global = true)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
pub enum AnalysisCommand {
    /// Analyze a fragments JSON file without touching the database
    Analyze {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "markdown")]
        format: OutputFormat,
        /// Candidate name for the report, overrides the file
        #[arg(long)]
        candidate: Option<String>,
        /// Position for the report, overrides the file
        #[arg(long)]
        position: Option<String>,
    },
    /// Create or migrate the database
    Init,
    /// Schedule an interview session and print its id
    Schedule { candidate: String, position: String },
    /// Link a vendor call to a session
    Link { session_id: String, call_id: String },
    /// Analyze a fragments file and store the result on a session
    Apply { session_id: String, file: PathBuf },
    /// Pull the session's call from the vendor and analyze it
    Pull { session_id: String },
    /// Print the stored analysis of a session
    Show {
        session_id: String,
        #[arg(long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },
    /// List recent sessions
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

pub async fn handle_analysis_command(cli: AnalysisCli, config: ConfigManager) -> Result<()> {
    match cli.command {
        AnalysisCommand::Analyze {
            file,
            format,
            candidate,
            position,
        } => analyze_file(&file, format, candidate, position).await,
        command => {
            let database_path = cli
                .database_path
                .unwrap_or_else(|| config.environment.database_path.clone());
            handle_session_command(command, &database_path, &config).await
        }
    }
}

async fn analyze_file(
    file: &Path,
    format: OutputFormat,
    candidate: Option<String>,
    position: Option<String>,
) -> Result<()> {
    let mut request = read_request(file).await?;
    if let Some(candidate) = candidate {
        request.candidate_name = candidate;
    }
    if let Some(position) = position {
        request.position = position;
    }

    let candidate_name = request.candidate_name.clone();
    let position = request.position.clone();
    let result = AnalysisNormalizer::analyze(&request.into_input());
    print_result(&result, &candidate_name, &position, format)
}

async fn handle_session_command(
    command: AnalysisCommand,
    database_path: &Path,
    config: &ConfigManager,
) -> Result<()> {
    let database = Arc::new(Database::new(database_path).await?);
    let vendor_client = Arc::new(VendorClient::new(&config.vendor)?);
    let service = AnalysisService::new(database.clone(), vendor_client);
    let repo = database.sessions();

    match command {
        AnalysisCommand::Analyze { file, format, .. } => {
            analyze_file(&file, format, None, None).await?;
        }

        AnalysisCommand::Init => {
            info!("Database ready: {}", database_path.display());
        }

        AnalysisCommand::Schedule {
            candidate,
            position,
        } => {
            let session = repo.create_session(&candidate, &position).await?;
            println!("{}", session.id);
        }

        AnalysisCommand::Link {
            session_id,
            call_id,
        } => {
            repo.attach_call(&session_id, &call_id).await?;
            info!("Session {} now tracks call {}", session_id, call_id);
        }

        AnalysisCommand::Apply { session_id, file } => {
            let request = read_request(&file).await?;
            let result = service
                .apply_fragments(&session_id, &request.fragments)
                .await?;
            info!(
                "Stored analysis for session {}: {}/100, {}",
                session_id, result.overall_score, result.hiring_recommendation
            );
        }

        AnalysisCommand::Pull { session_id } => {
            let outcome = service.get_or_compute(&session_id).await?;
            if let Some(save_error) = &outcome.save_error {
                warn!("Analysis was not saved: {}", save_error);
            }
            print_result(
                &outcome.result,
                &outcome.session.candidate_name,
                &outcome.session.position,
                OutputFormat::Markdown,
            )?;
        }

        AnalysisCommand::Show { session_id, format } => {
            let session = repo
                .find_by_id(&session_id)
                .await?
                .with_context(|| format!("Interview session not found: {}", session_id))?;

            match repo.load_analysis(&session_id).await? {
                Some(result) => {
                    print_result(&result, &session.candidate_name, &session.position, format)?
                }
                None => println!("No analysis stored for session {} yet", session_id),
            }
        }

        AnalysisCommand::List { limit } => {
            let sessions = repo.list_recent(limit).await?;
            if sessions.is_empty() {
                println!("No interview sessions found.");
            } else {
                println!(
                    "{:<38} {:<20} {:<20} {:<12} {:<9}",
                    "ID", "Candidate", "Position", "Status", "Analyzed"
                );
                println!("{}", "-".repeat(101));
                for session in sessions {
                    println!(
                        "{:<38} {:<20} {:<20} {:<12} {:<9}",
                        session.id,
                        utils::preview(&session.candidate_name, 17),
                        utils::preview(&session.position, 17),
                        session.status,
                        if session.has_analysis() { "yes" } else { "no" }
                    );
                }
            }
        }
    }

    Ok(())
}

async fn read_request(path: &Path) -> Result<AnalysisRequest> {
    let content = utils::read_file_safe(path).await?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fragments file: {}", path.display()))
}

fn print_result(
    result: &AnalysisResult,
    candidate_name: &str,
    position: &str,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(result).context("Failed to serialize analysis")?;
            println!("{}", json);
        }
        OutputFormat::Markdown => {
            print!(
                "{}",
                SummaryReportRenderer::render(result, candidate_name, position)
            );
        }
    }
    Ok(())
}
