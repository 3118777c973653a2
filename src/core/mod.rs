// src/core/mod.rs
//! Configuration and persistence shared by the server and the CLI

pub mod analysis_columns;
pub mod config_manager;
pub mod database;

pub use analysis_columns::AnalysisColumns;
pub use config_manager::{ConfigManager, VendorConfig};
pub use database::{CallArtifacts, Database, InterviewSession, SessionRepository, SessionStatus};
