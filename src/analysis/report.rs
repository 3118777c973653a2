// src/analysis/report.rs
use super::types::AnalysisResult;
use crate::utils::humanize_key;

/// Markdown summary of an analysis. Every section header is always emitted,
/// even when the list under it is empty.
pub struct SummaryReportRenderer;

impl SummaryReportRenderer {
    pub fn render(result: &AnalysisResult, candidate_name: &str, position: &str) -> String {
        let mut report = String::new();

        report.push_str("# Interview Analysis Report\n\n");
        report.push_str(&format!("**Candidate:** {}\n", candidate_name));
        report.push_str(&format!("**Position:** {}\n\n", position));

        report.push_str(&format!(
            "## Overall Score: {}/100\n\n",
            result.overall_score
        ));
        report.push_str(&format!(
            "## Hiring Recommendation: {}\n\n",
            result.hiring_recommendation
        ));

        report.push_str("## Category Scores\n\n");
        report.push_str("| Category | Score |\n");
        report.push_str("|----------|-------|\n");
        for (name, score) in result.category_scores.entries() {
            report.push_str(&format!("| {} | {}/100 |\n", humanize_key(name), score));
        }
        report.push('\n');

        Self::push_list(&mut report, "Strengths", &result.strengths);
        Self::push_list(
            &mut report,
            "Areas for Improvement",
            &result.areas_for_improvement,
        );
        Self::push_list(&mut report, "Key Insights", &result.key_insights);

        report.push_str("## Interview Flow\n\n");
        report.push_str(&format!(
            "- Engagement: {}/100\n",
            result.interview_flow.engagement
        ));
        report.push_str(&format!("- Clarity: {}/100\n", result.interview_flow.clarity));
        report.push_str(&format!(
            "- Completeness: {}/100\n\n",
            result.interview_flow.completeness
        ));

        report.push_str("## Detailed Feedback\n\n");
        report.push_str(&result.detailed_feedback);
        report.push('\n');

        report
    }

    fn push_list(report: &mut String, title: &str, items: &[String]) {
        report.push_str(&format!("## {}\n\n", title));
        for item in items {
            report.push_str(&format!("- {}\n", item));
        }
        if !items.is_empty() {
            report.push('\n');
        }
    }
}
