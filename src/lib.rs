//! Interview analysis service: normalizes voice-AI interview fragments into a
//! scored assessment, persists it per session and renders Markdown reports.

pub mod analysis;
pub mod analysis_cli;
pub mod core;
pub mod service;
pub mod utils;
pub mod vendor;
pub mod web;

pub use analysis::{AnalysisInput, AnalysisNormalizer, AnalysisResult, SummaryReportRenderer};
pub use service::AnalysisService;
pub use web::start_web_server;
