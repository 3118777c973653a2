// src/analysis/fragments.rs
//! Typed views over the loosely-shaped analysis fragments the vendor sends.
//!
//! Every fragment is validated and defaulted once, here. A fragment that
//! cannot be read as the expected shape is treated as absent and logged; it
//! never fails the analysis.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Shared parsing for the three object-shaped fragments.
pub trait Fragment: DeserializeOwned + Sized {
    const NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(raw) => match serde_json::from_str::<Value>(raw.trim()) {
                Ok(parsed) if !parsed.is_string() => Self::from_value(&parsed),
                _ => Self::from_text(raw),
            },
            other => Self::from_shape(other),
        }
    }

    fn from_shape(value: &Value) -> Option<Self> {
        if !value.is_object() {
            warn!("Ignoring {} fragment with unexpected shape", Self::NAME);
            return None;
        }
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                warn!("Ignoring malformed {} fragment: {}", Self::NAME, e);
                None
            }
        }
    }

    /// Free text that is not JSON
    fn from_text(raw: &str) -> Option<Self> {
        if !raw.trim().is_empty() {
            warn!(
                "Ignoring {} fragment that is not valid JSON ({} chars)",
                Self::NAME,
                raw.len()
            );
        }
        None
    }
}

// ===== Lenient field readers =====

pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn text_from_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn bool_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "pass" | "passed" | "success" | "successful" => Some(true),
            "false" | "no" | "fail" | "failed" | "unsuccessful" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_from_value(&value))
}

fn lenient_text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(bool_from_value(&value))
}

fn text_list_from_value(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(text_from_value).collect()),
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
        _ => None,
    }
}

fn lenient_text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_list_from_value(&value))
}

fn lenient_text_list_or_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text_list(deserializer)?.unwrap_or_default())
}

/// Array of objects; entries that do not fit the shape are dropped.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(entries_from_value(&value))
}

fn entries_from_value<T: DeserializeOwned>(value: &Value) -> Option<Vec<T>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        debug!("Dropping malformed list entry: {}", e);
                        None
                    }
                })
                .collect(),
        ),
        _ => None,
    }
}

fn lenient_score_map<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => Some(
            map.iter()
                .filter_map(|(key, score)| number_from_value(score).map(|n| (key.clone(), n)))
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value)
        .filter(|minutes| *minutes > 0.0)
        .map(|minutes| minutes.round().min(u32::MAX as f64) as u32)
        .filter(|minutes| *minutes > 0))
}

// ===== Structured data =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub answer: String,
    #[serde(
        default,
        alias = "response_quality",
        alias = "score",
        deserialize_with = "lenient_number"
    )]
    pub response_quality: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub feedback: String,
    #[serde(default, alias = "key_points", deserialize_with = "lenient_text_list_or_empty")]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    #[serde(default, alias = "overall_score", deserialize_with = "lenient_number")]
    pub overall_score: Option<f64>,
    #[serde(default, alias = "category_scores", deserialize_with = "lenient_score_map")]
    pub category_scores: Option<BTreeMap<String, f64>>,
    #[serde(default, deserialize_with = "lenient_text_list")]
    pub strengths: Option<Vec<String>>,
    #[serde(
        default,
        alias = "areas_for_improvement",
        deserialize_with = "lenient_text_list"
    )]
    pub areas_for_improvement: Option<Vec<String>>,
    #[serde(default, alias = "hiring_recommendation", deserialize_with = "lenient_text")]
    pub hiring_recommendation: Option<String>,
    #[serde(default, alias = "key_insights", deserialize_with = "lenient_text_list")]
    pub key_insights: Option<Vec<String>>,
    #[serde(default, alias = "question_responses", deserialize_with = "lenient_entries")]
    pub question_responses: Option<Vec<QuestionResponse>>,
    #[serde(default, alias = "interview_metrics", deserialize_with = "lenient_score_map")]
    pub interview_metrics: Option<BTreeMap<String, f64>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reasoning: Option<String>,
}

impl Fragment for StructuredData {
    const NAME: &'static str = "structured-data";
}

// ===== Summary =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryAnswer {
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub answer: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default, alias = "key_points", deserialize_with = "lenient_text_list_or_empty")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub evaluation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryFragment {
    #[serde(
        default,
        alias = "questions_and_answers",
        alias = "questions",
        deserialize_with = "lenient_entries"
    )]
    pub questions_and_answers: Option<Vec<SummaryAnswer>>,
    #[serde(default, alias = "overall_flow", deserialize_with = "lenient_text")]
    pub overall_flow: Option<String>,
    #[serde(default, alias = "average_score", deserialize_with = "lenient_number")]
    pub average_score: Option<f64>,
}

impl Fragment for SummaryFragment {
    const NAME: &'static str = "summary";

    fn from_shape(value: &Value) -> Option<Self> {
        match value {
            // A bare list is read as the Q&A list itself
            Value::Array(_) => Some(SummaryFragment {
                questions_and_answers: entries_from_value(value),
                ..Default::default()
            }),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map_err(|e| warn!("Ignoring malformed summary fragment: {}", e))
                .ok(),
            _ => {
                warn!("Ignoring summary fragment with unexpected shape");
                None
            }
        }
    }
}

// ===== Success evaluation =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEvaluation {
    #[serde(default, alias = "success", deserialize_with = "lenient_bool")]
    pub successful: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub feedback: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub details: Option<String>,
}

impl Fragment for SuccessEvaluation {
    const NAME: &'static str = "success-evaluation";

    fn from_shape(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(successful) => Some(SuccessEvaluation {
                successful: Some(*successful),
                ..Default::default()
            }),
            Value::Number(_) => Some(SuccessEvaluation {
                score: number_from_value(value),
                ..Default::default()
            }),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map_err(|e| warn!("Ignoring malformed success-evaluation fragment: {}", e))
                .ok(),
            _ => {
                warn!("Ignoring success-evaluation fragment with unexpected shape");
                None
            }
        }
    }

    fn from_text(raw: &str) -> Option<Self> {
        match bool_from_value(&Value::String(raw.to_string())) {
            Some(successful) => Some(SuccessEvaluation {
                successful: Some(successful),
                ..Default::default()
            }),
            None => {
                warn!("Ignoring success-evaluation text that is neither JSON nor a verdict");
                None
            }
        }
    }
}

// ===== Raw input =====

/// Fragments exactly as received, before any shape validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFragments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_evaluation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub transcript: Option<String>,
    #[serde(
        default,
        alias = "duration",
        deserialize_with = "lenient_minutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_minutes: Option<u32>,
}

/// Direct invocation payload: explicit fragments plus report context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub candidate_name: String,
    #[serde(default, deserialize_with = "lenient_text_or_empty")]
    pub position: String,
    #[serde(flatten)]
    pub fragments: RawFragments,
}

impl AnalysisRequest {
    pub fn into_input(self) -> AnalysisInput {
        AnalysisInput::from_raw(self.candidate_name, self.position, &self.fragments)
    }
}

/// Validated normalizer input.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub candidate_name: String,
    pub position: String,
    pub structured_data: Option<StructuredData>,
    pub summary: Option<SummaryFragment>,
    pub success_evaluation: Option<SuccessEvaluation>,
    pub transcript: Option<String>,
    pub duration_minutes: Option<u32>,
}

impl AnalysisInput {
    pub fn new(candidate_name: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            candidate_name: candidate_name.into(),
            position: position.into(),
            ..Default::default()
        }
    }

    pub fn from_raw(candidate_name: String, position: String, raw: &RawFragments) -> Self {
        Self {
            candidate_name,
            position,
            structured_data: raw.structured_data.as_ref().and_then(StructuredData::from_value),
            summary: raw.summary.as_ref().and_then(SummaryFragment::from_value),
            success_evaluation: raw
                .success_evaluation
                .as_ref()
                .and_then(SuccessEvaluation::from_value),
            transcript: raw
                .transcript
                .as_ref()
                .filter(|text| !text.trim().is_empty())
                .cloned(),
            duration_minutes: raw.duration_minutes.filter(|minutes| *minutes > 0),
        }
    }
}
