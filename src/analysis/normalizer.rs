// src/analysis/normalizer.rs
//! Folds the optional vendor fragments into one canonical `AnalysisResult`.

use super::flow;
use super::fragments::{AnalysisInput, StructuredData, SuccessEvaluation, SummaryFragment};
use super::types::{
    clamp_score, AnalysisResult, CategoryScores, HiringRecommendation, QuestionAnalysis,
};
use tracing::debug;

/// Characters of a summary question used for the near-match dedup
const DEDUP_PREFIX_CHARS: usize = 20;
/// Success threshold separating "Strong Yes" from "Yes"
const STRONG_SUCCESS_SCORE: u32 = 80;

pub struct AnalysisNormalizer;

impl AnalysisNormalizer {
    /// Merge every present fragment, in precedence order, into a fresh result.
    ///
    /// Structured data claims its fields first; the summary and the success
    /// evaluation only fill what is still at its default; transcript
    /// heuristics, the overall-score mean, the feedback narrative and the
    /// score-based recommendation are fallbacks applied last.
    pub fn analyze(input: &AnalysisInput) -> AnalysisResult {
        let mut result = AnalysisResult::default();

        if let Some(data) = &input.structured_data {
            apply_structured_data(&mut result, data);
        }

        if let Some(summary) = &input.summary {
            apply_summary(&mut result, summary);
        }

        let feedback_from_evaluation = match &input.success_evaluation {
            Some(evaluation) => apply_success_evaluation(&mut result, evaluation),
            None => false,
        };

        if let (Some(transcript), Some(duration)) = (&input.transcript, input.duration_minutes) {
            if let Some(assessment) = flow::assess(transcript, duration) {
                result.interview_flow = assessment.flow;
                result
                    .areas_for_improvement
                    .extend(assessment.suggestions.into_iter().map(str::to_string));
            }
        }

        if result.overall_score == 0 {
            result.overall_score = result.category_scores.non_zero_mean().unwrap_or(0);
        }

        if !feedback_from_evaluation {
            result.detailed_feedback = compose_detailed_feedback(&result);
        }

        if result.hiring_recommendation == HiringRecommendation::Maybe {
            result.hiring_recommendation = HiringRecommendation::from_score(result.overall_score);
        }

        debug!(
            "Analysis for {} ({}): score {}, recommendation {}",
            input.candidate_name, input.position, result.overall_score, result.hiring_recommendation
        );

        result
    }
}

fn apply_structured_data(result: &mut AnalysisResult, data: &StructuredData) {
    if let Some(score) = data.overall_score {
        result.overall_score = clamp_score(score);
    }
    if let Some(categories) = &data.category_scores {
        result.category_scores = CategoryScores::from_raw(categories);
    }
    if let Some(strengths) = &data.strengths {
        result.strengths = strengths.clone();
    }
    if let Some(areas) = &data.areas_for_improvement {
        result.areas_for_improvement = areas.clone();
    }
    if let Some(recommendation) = data
        .hiring_recommendation
        .as_deref()
        .and_then(HiringRecommendation::parse_lenient)
    {
        result.hiring_recommendation = recommendation;
    }
    if let Some(insights) = &data.key_insights {
        result.key_insights = insights.clone();
    }
    if let Some(responses) = &data.question_responses {
        result.question_analysis = responses
            .iter()
            .map(|response| QuestionAnalysis {
                question: response.question.clone(),
                answer: response.answer.clone(),
                score: response.response_quality.map(clamp_score).unwrap_or(0),
                feedback: response.feedback.clone(),
                key_points: response.key_points.clone(),
            })
            .collect();
    }
}

fn apply_summary(result: &mut AnalysisResult, summary: &SummaryFragment) {
    if let Some(answers) = &summary.questions_and_answers {
        let entries = answers.iter().map(|answer| QuestionAnalysis {
            question: answer.question.clone(),
            answer: answer.answer.clone(),
            score: answer.score.map(clamp_score).unwrap_or(0),
            feedback: answer.evaluation.clone(),
            key_points: answer.key_points.clone(),
        });

        if result.question_analysis.is_empty() {
            result.question_analysis = entries.collect();
        } else {
            for entry in entries {
                if !has_near_match(&result.question_analysis, &entry.question) {
                    result.question_analysis.push(entry);
                }
            }
        }
    }

    if let Some(flow) = &summary.overall_flow {
        result.key_insights.push(format!("Interview Flow: {}", flow));
    }
}

/// True when an existing question contains the first characters of `question`
fn has_near_match(existing: &[QuestionAnalysis], question: &str) -> bool {
    let prefix: String = question
        .chars()
        .take(DEDUP_PREFIX_CHARS)
        .collect::<String>()
        .to_lowercase();

    existing
        .iter()
        .any(|entry| entry.question.to_lowercase().contains(&prefix))
}

/// Returns true when the evaluation supplied the feedback narrative
fn apply_success_evaluation(result: &mut AnalysisResult, evaluation: &SuccessEvaluation) -> bool {
    if result.hiring_recommendation == HiringRecommendation::Maybe {
        if let Some(successful) = evaluation.successful {
            result.hiring_recommendation = match successful {
                true if result.overall_score >= STRONG_SUCCESS_SCORE => {
                    HiringRecommendation::StrongYes
                }
                true => HiringRecommendation::Yes,
                false => HiringRecommendation::No,
            };
        }
    }

    if let Some(details) = &evaluation.details {
        result.key_insights.push(details.clone());
    }

    match &evaluation.feedback {
        Some(feedback) => {
            result.detailed_feedback = feedback.clone();
            true
        }
        None => false,
    }
}

/// Narrative built from the merged fields. The overall score always leads;
/// empty list sections are left out.
pub fn compose_detailed_feedback(result: &AnalysisResult) -> String {
    let mut sections = vec![format!(
        "Overall Performance: {}/100",
        result.overall_score
    )];

    let categories = result.category_scores.non_zero();
    if !categories.is_empty() {
        let breakdown = categories
            .iter()
            .map(|(name, score)| format!("{}: {}/100", name, score))
            .collect::<Vec<_>>()
            .join(", ");
        sections.push(format!("Category Breakdown: {}", breakdown));
    }

    if !result.strengths.is_empty() {
        sections.push(format!("Key Strengths: {}", result.strengths.join("; ")));
    }

    if !result.areas_for_improvement.is_empty() {
        sections.push(format!(
            "Areas for Improvement: {}",
            result.areas_for_improvement.join("; ")
        ));
    }

    if !result.key_insights.is_empty() {
        sections.push(format!(
            "Additional Insights: {}",
            result.key_insights.join("; ")
        ));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fragments::{QuestionResponse, SummaryAnswer};
    use crate::analysis::types::InterviewFlow;
    use std::collections::BTreeMap;

    fn structured(overall: Option<f64>) -> StructuredData {
        StructuredData {
            overall_score: overall,
            ..Default::default()
        }
    }

    fn summary_answer(question: &str) -> SummaryAnswer {
        SummaryAnswer {
            question: question.to_string(),
            answer: "An answer".to_string(),
            score: Some(70.0),
            key_points: vec!["point".to_string()],
            evaluation: "Reasonable".to_string(),
        }
    }

    #[test]
    fn test_empty_input_yields_defaults() {
        let result = AnalysisNormalizer::analyze(&AnalysisInput::new("Ada", "Engineer"));
        assert_eq!(result.overall_score, 0);
        assert_eq!(result.category_scores, CategoryScores::default());
        assert_eq!(result.interview_flow, InterviewFlow::default());
        assert_eq!(result.detailed_feedback, "Overall Performance: 0/100");
        assert_eq!(result.hiring_recommendation, HiringRecommendation::No);
    }

    #[test]
    fn test_structured_overall_score_takes_precedence() {
        let mut data = structured(Some(82.0));
        let mut categories = BTreeMap::new();
        categories.insert("communication".to_string(), 40.0);
        data.category_scores = Some(categories);

        let input = AnalysisInput {
            structured_data: Some(data),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.overall_score, 82);
        assert_eq!(result.hiring_recommendation, HiringRecommendation::Yes);
    }

    #[test]
    fn test_overall_score_falls_back_to_category_mean() {
        let mut data = structured(None);
        let mut categories = BTreeMap::new();
        categories.insert("communication".to_string(), 80.0);
        categories.insert("technical".to_string(), 60.0);
        data.category_scores = Some(categories);

        let input = AnalysisInput {
            structured_data: Some(data),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.overall_score, 70);
        assert_eq!(result.hiring_recommendation, HiringRecommendation::Maybe);
    }

    #[test]
    fn test_structured_recommendation_is_kept() {
        let mut data = structured(Some(40.0));
        data.hiring_recommendation = Some("Strong Yes".to_string());
        let input = AnalysisInput {
            structured_data: Some(data),
            success_evaluation: Some(SuccessEvaluation {
                successful: Some(false),
                ..Default::default()
            }),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.hiring_recommendation, HiringRecommendation::StrongYes);
    }

    #[test]
    fn test_summary_merge_deduplicates_near_matches() {
        let mut data = structured(None);
        data.question_responses = Some(vec![QuestionResponse {
            question: "Tell me about your React experience".to_string(),
            answer: "Five years".to_string(),
            response_quality: Some(88.0),
            feedback: "Strong".to_string(),
            key_points: vec![],
        }]);

        let summary = SummaryFragment {
            questions_and_answers: Some(vec![
                summary_answer("TELL ME ABOUT YOUR REACT experience and background"),
                summary_answer("How do you handle conflict?"),
            ]),
            overall_flow: Some("Smooth".to_string()),
            average_score: None,
        };

        let input = AnalysisInput {
            structured_data: Some(data),
            summary: Some(summary),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);

        let questions: Vec<&str> = result
            .question_analysis
            .iter()
            .map(|q| q.question.as_str())
            .collect();
        assert_eq!(
            questions,
            vec!["Tell me about your React experience", "How do you handle conflict?"]
        );
        assert_eq!(result.question_analysis[0].score, 88);
        assert_eq!(result.question_analysis[1].feedback, "Reasonable");
        assert_eq!(result.key_insights, vec!["Interview Flow: Smooth".to_string()]);
    }

    #[test]
    fn test_summary_assigned_outright_when_empty() {
        let summary = SummaryFragment {
            questions_and_answers: Some(vec![
                summary_answer("Same question repeated twice"),
                summary_answer("Same question repeated twice"),
            ]),
            ..Default::default()
        };
        let input = AnalysisInput {
            summary: Some(summary),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.question_analysis.len(), 2);
    }

    #[test]
    fn test_bare_success_flag_yields_yes() {
        let input = AnalysisInput {
            success_evaluation: Some(SuccessEvaluation {
                successful: Some(true),
                ..Default::default()
            }),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.overall_score, 0);
        assert_eq!(result.hiring_recommendation, HiringRecommendation::Yes);
    }

    #[test]
    fn test_success_with_high_structured_score_is_strong_yes() {
        let input = AnalysisInput {
            structured_data: Some(structured(Some(80.0))),
            success_evaluation: Some(SuccessEvaluation {
                successful: Some(true),
                ..Default::default()
            }),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.hiring_recommendation, HiringRecommendation::StrongYes);
    }

    #[test]
    fn test_unsuccessful_evaluation_is_no() {
        let input = AnalysisInput {
            structured_data: Some(structured(Some(95.0))),
            success_evaluation: Some(SuccessEvaluation {
                successful: Some(false),
                ..Default::default()
            }),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.hiring_recommendation, HiringRecommendation::No);
    }

    #[test]
    fn test_evaluation_feedback_replaces_narrative() {
        let input = AnalysisInput {
            structured_data: Some(structured(Some(70.0))),
            success_evaluation: Some(SuccessEvaluation {
                successful: None,
                score: Some(7.0),
                feedback: Some("Candidate met expectations".to_string()),
                details: Some("Asked good questions".to_string()),
            }),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.detailed_feedback, "Candidate met expectations");
        assert_eq!(result.key_insights, vec!["Asked good questions".to_string()]);
        assert_eq!(result.hiring_recommendation, HiringRecommendation::Maybe);
    }

    #[test]
    fn test_flow_heuristics_append_suggestions() {
        let mut data = structured(Some(90.0));
        data.areas_for_improvement = Some(vec!["System design depth".to_string()]);
        let input = AnalysisInput {
            structured_data: Some(data),
            transcript: Some("Interviewer: hi.".to_string()),
            duration_minutes: Some(10),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.areas_for_improvement.len(), 4);
        assert_eq!(result.areas_for_improvement[0], "System design depth");
        assert_eq!(result.areas_for_improvement[1], flow::ENGAGEMENT_SUGGESTION);
        assert!(result.interview_flow.completeness < 70);
    }

    #[test]
    fn test_flow_requires_duration() {
        let input = AnalysisInput {
            transcript: Some("Interviewer: hi.".to_string()),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let result = AnalysisNormalizer::analyze(&input);
        assert_eq!(result.interview_flow, InterviewFlow::default());
        assert!(result.areas_for_improvement.is_empty());
    }

    #[test]
    fn test_compose_detailed_feedback_sections() {
        let mut result = AnalysisResult {
            overall_score: 78,
            strengths: vec!["Clear".to_string(), "Concise".to_string()],
            key_insights: vec!["Interview Flow: Smooth".to_string()],
            ..Default::default()
        };
        result.category_scores.communication = 80;
        result.category_scores.cultural_fit = 76;

        assert_eq!(
            compose_detailed_feedback(&result),
            "Overall Performance: 78/100\n\n\
             Category Breakdown: communication: 80/100, culturalFit: 76/100\n\n\
             Key Strengths: Clear; Concise\n\n\
             Additional Insights: Interview Flow: Smooth"
        );
    }

    #[test]
    fn test_compose_detailed_feedback_keeps_zero_score() {
        let result = AnalysisResult {
            areas_for_improvement: vec!["Depth".to_string()],
            ..Default::default()
        };
        assert_eq!(
            compose_detailed_feedback(&result),
            "Overall Performance: 0/100\n\nAreas for Improvement: Depth"
        );
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let input = AnalysisInput {
            structured_data: Some(structured(Some(66.0))),
            transcript: Some("Interviewer: um, tell me more. Candidate: sure.".to_string()),
            duration_minutes: Some(2),
            ..AnalysisInput::new("Ada", "Engineer")
        };
        let first = serde_json::to_string(&AnalysisNormalizer::analyze(&input)).unwrap();
        let second = serde_json::to_string(&AnalysisNormalizer::analyze(&input)).unwrap();
        assert_eq!(first, second);
    }
}
