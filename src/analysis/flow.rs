// src/analysis/flow.rs
//! Transcript heuristics: pace, turn-taking, sentence shape and filler words.

use super::types::{clamp_score, InterviewFlow};

const IDEAL_PACE_MIN: f64 = 150.0;
const IDEAL_PACE_MAX: f64 = 200.0;
const IDEAL_PACE_CENTER: f64 = 175.0;
const IDEAL_SENTENCE_MIN: f64 = 15.0;
const IDEAL_SENTENCE_MAX: f64 = 25.0;
const IDEAL_SENTENCE_CENTER: f64 = 20.0;
const EXPECTED_WORDS_PER_MINUTE: f64 = 150.0;
const MAX_FILLER_PENALTY: f64 = 30.0;

const SPEAKER_MARKERS: [&str; 2] = ["interviewer:", "candidate:"];
const SINGLE_WORD_FILLERS: [&str; 5] = ["um", "uh", "like", "actually", "basically"];

pub const ENGAGEMENT_THRESHOLD: u32 = 60;
pub const CLARITY_THRESHOLD: u32 = 70;
pub const COMPLETENESS_THRESHOLD: u32 = 70;

pub const ENGAGEMENT_SUGGESTION: &str =
    "Increase engagement by keeping a steady conversational pace and responding actively to each question";
pub const CLARITY_SUGGESTION: &str =
    "Improve clarity by using well-structured sentences and reducing filler words";
pub const COMPLETENESS_SUGGESTION: &str =
    "Provide more complete answers with concrete examples and supporting detail";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowAssessment {
    pub flow: InterviewFlow,
    pub suggestions: Vec<&'static str>,
}

/// Score a transcript spoken over `duration_minutes`.
///
/// Returns `None` for a zero duration so callers never divide by zero.
pub fn assess(transcript: &str, duration_minutes: u32) -> Option<FlowAssessment> {
    if duration_minutes == 0 {
        return None;
    }

    let duration = duration_minutes as f64;
    let words = word_count(transcript) as f64;

    let engagement = clamp_score(
        (pace_score(words / duration) + interaction_score(transcript, duration)) / 2.0,
    );
    let clarity = clamp_score(clarity_score(transcript));
    let completeness = clamp_score(completeness_score(words, duration));

    let mut suggestions = Vec::new();
    if engagement < ENGAGEMENT_THRESHOLD {
        suggestions.push(ENGAGEMENT_SUGGESTION);
    }
    if clarity < CLARITY_THRESHOLD {
        suggestions.push(CLARITY_SUGGESTION);
    }
    if completeness < COMPLETENESS_THRESHOLD {
        suggestions.push(COMPLETENESS_SUGGESTION);
    }

    Some(FlowAssessment {
        flow: InterviewFlow {
            engagement,
            clarity,
            completeness,
        },
        suggestions,
    })
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|sentence| !sentence.trim().is_empty())
        .count()
}

pub fn pace_score(words_per_minute: f64) -> f64 {
    if (IDEAL_PACE_MIN..=IDEAL_PACE_MAX).contains(&words_per_minute) {
        100.0
    } else {
        (100.0 - 2.0 * (words_per_minute - IDEAL_PACE_CENTER).abs()).max(0.0)
    }
}

/// Speaker turns relative to a baseline of two turns per minute
pub fn interaction_score(transcript: &str, duration_minutes: f64) -> f64 {
    let expected = duration_minutes * 2.0;
    if expected <= 0.0 {
        return 0.0;
    }
    let lower = transcript.to_lowercase();
    let turns: usize = SPEAKER_MARKERS
        .iter()
        .map(|marker| lower.matches(marker).count())
        .sum();
    (turns as f64 / expected * 100.0).min(100.0)
}

pub fn filler_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|word| !word.is_empty())
        .collect();

    let singles = words
        .iter()
        .filter(|word| SINGLE_WORD_FILLERS.contains(word))
        .count();
    let you_know = words
        .windows(2)
        .filter(|pair| pair[0] == "you" && pair[1] == "know")
        .count();

    singles + you_know
}

pub fn clarity_score(transcript: &str) -> f64 {
    let words = word_count(transcript) as f64;
    let sentences = sentence_count(transcript).max(1) as f64;
    let average = words / sentences;

    let base = if (IDEAL_SENTENCE_MIN..=IDEAL_SENTENCE_MAX).contains(&average) {
        100.0
    } else {
        (100.0 - 3.0 * (average - IDEAL_SENTENCE_CENTER).abs()).max(0.0)
    };
    let penalty = (2.0 * filler_count(transcript) as f64).min(MAX_FILLER_PENALTY);

    (base - penalty).max(0.0)
}

pub fn completeness_score(words: f64, duration_minutes: f64) -> f64 {
    let expected = duration_minutes * EXPECTED_WORDS_PER_MINUTE;
    if expected <= 0.0 {
        return 0.0;
    }
    (words / expected).min(1.0) * 100.0
}
