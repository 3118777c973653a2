// src/analysis/types.rs
//! Canonical analysis record produced by the normalizer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Clamp a raw vendor score into the 0..=100 integer range.
pub fn clamp_score(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u32
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HiringRecommendation {
    #[serde(rename = "Strong Yes")]
    StrongYes,
    Yes,
    #[default]
    Maybe,
    No,
}

impl HiringRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            HiringRecommendation::StrongYes => "Strong Yes",
            HiringRecommendation::Yes => "Yes",
            HiringRecommendation::Maybe => "Maybe",
            HiringRecommendation::No => "No",
        }
    }

    /// Fixed score thresholds used when no source decided the recommendation
    pub fn from_score(score: u32) -> Self {
        match score {
            85.. => HiringRecommendation::StrongYes,
            75..=84 => HiringRecommendation::Yes,
            60..=74 => HiringRecommendation::Maybe,
            _ => HiringRecommendation::No,
        }
    }

    /// Accepts the canonical labels plus the spellings vendors tend to emit
    /// ("strong_hire", "STRONG YES", "no hire", ...).
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect();

        match normalized.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "strong yes" | "strong hire" | "strongly recommend" => {
                Some(HiringRecommendation::StrongYes)
            }
            "yes" | "hire" | "recommend" => Some(HiringRecommendation::Yes),
            "maybe" | "undecided" | "borderline" => Some(HiringRecommendation::Maybe),
            "no" | "no hire" | "reject" | "do not recommend" => Some(HiringRecommendation::No),
            _ => None,
        }
    }
}

impl fmt::Display for HiringRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HiringRecommendation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s)
            .ok_or_else(|| anyhow::anyhow!("Unknown hiring recommendation: {}", s))
    }
}

/// Per-category scores. The four canonical categories are always present;
/// any other key supplied by structured data passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    #[serde(default)]
    pub communication: u32,
    #[serde(default)]
    pub technical: u32,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub cultural_fit: u32,
    #[serde(flatten)]
    pub other: BTreeMap<String, u32>,
}

impl CategoryScores {
    pub const CANONICAL: [&'static str; 4] =
        ["communication", "technical", "experience", "culturalFit"];

    /// Build from a raw key/score map, routing the canonical names into their
    /// fields and keeping every other key as-is.
    pub fn from_raw(raw: &BTreeMap<String, f64>) -> Self {
        let mut scores = CategoryScores::default();
        for (key, value) in raw {
            scores.set(key, clamp_score(*value));
        }
        scores
    }

    fn canonical_mut(&mut self) -> [&mut u32; 4] {
        [
            &mut self.communication,
            &mut self.technical,
            &mut self.experience,
            &mut self.cultural_fit,
        ]
    }

    pub fn set(&mut self, key: &str, score: u32) {
        match Self::CANONICAL.iter().position(|name| *name == key) {
            Some(index) => *self.canonical_mut()[index] = score,
            None => {
                self.other.insert(key.to_string(), score);
            }
        }
    }

    /// Canonical categories first, then pass-through keys in key order
    pub fn entries(&self) -> Vec<(&str, u32)> {
        let canonical = [
            self.communication,
            self.technical,
            self.experience,
            self.cultural_fit,
        ];
        let mut entries = Vec::with_capacity(Self::CANONICAL.len() + self.other.len());
        for (name, score) in Self::CANONICAL.iter().zip(canonical) {
            entries.push((*name, score));
        }
        entries.extend(self.other.iter().map(|(key, score)| (key.as_str(), *score)));
        entries
    }

    pub fn non_zero(&self) -> Vec<(&str, u32)> {
        self.entries()
            .into_iter()
            .filter(|(_, score)| *score > 0)
            .collect()
    }

    /// Rounded mean of the non-zero scores, `None` when every score is zero
    pub fn non_zero_mean(&self) -> Option<u32> {
        let scores = self.non_zero();
        if scores.is_empty() {
            return None;
        }
        let total: u32 = scores.iter().map(|(_, score)| score).sum();
        Some(clamp_score(total as f64 / scores.len() as f64))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalysis {
    pub question: String,
    pub answer: String,
    pub score: u32,
    pub feedback: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewFlow {
    pub engagement: u32,
    pub clarity: u32,
    pub completeness: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: u32,
    pub category_scores: CategoryScores,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub detailed_feedback: String,
    pub hiring_recommendation: HiringRecommendation,
    pub key_insights: Vec<String>,
    pub question_analysis: Vec<QuestionAnalysis>,
    pub interview_flow: InterviewFlow,
}
