// src/analysis/mod.rs
//! Interview-analysis normalization pipeline

pub mod flow;
pub mod fragments;
pub mod normalizer;
pub mod report;
pub mod types;

pub use fragments::{
    AnalysisInput, AnalysisRequest, Fragment, RawFragments, StructuredData, SuccessEvaluation,
    SummaryFragment,
};
pub use normalizer::AnalysisNormalizer;
pub use report::SummaryReportRenderer;
pub use types::{
    AnalysisResult, CategoryScores, HiringRecommendation, InterviewFlow, QuestionAnalysis,
};
