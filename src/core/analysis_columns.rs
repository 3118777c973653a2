// src/core/analysis_columns.rs
//! The single place where `AnalysisResult` fields meet their snake_case
//! columns on `interview_sessions`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::analysis::{AnalysisResult, HiringRecommendation};

/// `(result field, persisted column)` for every analysis field
pub const FIELD_COLUMNS: [(&str, &str); 9] = [
    ("overallScore", "overall_score"),
    ("categoryScores", "category_scores"),
    ("strengths", "strengths"),
    ("areasForImprovement", "areas_for_improvement"),
    ("detailedFeedback", "detailed_feedback"),
    ("hiringRecommendation", "hiring_recommendation"),
    ("keyInsights", "key_insights"),
    ("questionAnalysis", "question_analysis"),
    ("interviewFlow", "interview_flow"),
];

/// Persisted form of an analysis; lists and maps are JSON text
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AnalysisColumns {
    pub overall_score: i64,
    pub category_scores: String,
    pub strengths: String,
    pub areas_for_improvement: String,
    pub detailed_feedback: String,
    pub hiring_recommendation: String,
    pub key_insights: String,
    pub question_analysis: String,
    pub interview_flow: String,
}

fn to_json<T: Serialize>(column: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("Failed to encode column {}", column))
}

fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Failed to decode column {}", column))
}

impl AnalysisColumns {
    pub fn from_result(result: &AnalysisResult) -> Result<Self> {
        Ok(Self {
            overall_score: i64::from(result.overall_score),
            category_scores: to_json("category_scores", &result.category_scores)?,
            strengths: to_json("strengths", &result.strengths)?,
            areas_for_improvement: to_json("areas_for_improvement", &result.areas_for_improvement)?,
            detailed_feedback: result.detailed_feedback.clone(),
            hiring_recommendation: result.hiring_recommendation.as_str().to_string(),
            key_insights: to_json("key_insights", &result.key_insights)?,
            question_analysis: to_json("question_analysis", &result.question_analysis)?,
            interview_flow: to_json("interview_flow", &result.interview_flow)?,
        })
    }

    pub fn into_result(self) -> Result<AnalysisResult> {
        let overall_score = u32::try_from(self.overall_score)
            .with_context(|| format!("Invalid overall_score: {}", self.overall_score))?;

        Ok(AnalysisResult {
            overall_score,
            category_scores: from_json("category_scores", &self.category_scores)?,
            strengths: from_json("strengths", &self.strengths)?,
            areas_for_improvement: from_json("areas_for_improvement", &self.areas_for_improvement)?,
            detailed_feedback: self.detailed_feedback,
            hiring_recommendation: self.hiring_recommendation.parse::<HiringRecommendation>()?,
            key_insights: from_json("key_insights", &self.key_insights)?,
            question_analysis: from_json("question_analysis", &self.question_analysis)?,
            interview_flow: from_json("interview_flow", &self.interview_flow)?,
        })
    }

    /// Comma-separated column list for SELECT statements
    pub fn select_list() -> String {
        FIELD_COLUMNS
            .iter()
            .map(|(_, column)| *column)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `column = ?` assignments for UPDATE statements, in `FIELD_COLUMNS` order
    pub fn assignment_list() -> String {
        FIELD_COLUMNS
            .iter()
            .map(|(_, column)| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
