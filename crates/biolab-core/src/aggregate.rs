//! Class-level aggregation: per-competency averages, dashboard highlights, and
//! the AI class summary.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;
use crate::model::{
    AnalysisResult, ClassAnalysisResult, Competency, CompetencyCategory, StudentSubmission,
};
use crate::schema::class_analysis_schema;
use crate::traits::{generate_structured, ContentPart, GenerationConfig, LlmProvider};

/// Description attached to every averaged competency.
pub const CLASS_AVERAGE_DESCRIPTION: &str = "class average";

/// Placeholder shown when a value is unavailable.
pub const NOT_AVAILABLE: &str = "N/A";

const CLASS_SYSTEM_INSTRUCTION: &str =
    "You are an experienced biology head teacher advising a colleague about their class.";

/// Whether a free-form competency name refers to `category`.
///
/// Case-insensitive substring match against the category's keywords, so
/// "Scientific Knowledge", "knowledge of bacteria" and "KNOWLEDGE" all match
/// [`CompetencyCategory::Knowledge`]. This tolerates the model rephrasing the
/// names it was asked to use; it also means a name mentioning two keywords
/// matches two categories.
pub fn matches(name: &str, category: CompetencyCategory) -> bool {
    let lowered = name.to_lowercase();
    category.keywords().iter().any(|k| lowered.contains(k))
}

/// Score of the first competency whose name matches `category`.
pub fn category_score(analysis: &AnalysisResult, category: CompetencyCategory) -> Option<f64> {
    analysis
        .competencies
        .iter()
        .find(|c| matches(&c.name, category))
        .map(|c| c.score)
}

/// Average each distinct competency name across `submissions`.
///
/// Names keep first-seen order; each score is the mean over the submissions
/// that contain that name, rounded to the nearest integer.
pub fn compute_averages(submissions: &[StudentSubmission]) -> Vec<Competency> {
    let mut totals: Vec<(&str, f64, u32)> = Vec::new();
    for submission in submissions {
        for competency in &submission.analysis.competencies {
            match totals.iter_mut().find(|(name, _, _)| *name == competency.name) {
                Some((_, sum, count)) => {
                    *sum += competency.score;
                    *count += 1;
                }
                None => totals.push((&competency.name, competency.score, 1)),
            }
        }
    }

    totals
        .into_iter()
        .map(|(name, sum, count)| Competency {
            name: name.to_string(),
            score: (sum / count as f64).round(),
            description: CLASS_AVERAGE_DESCRIPTION.to_string(),
        })
        .collect()
}

/// Highest-scoring average; on ties the later entry wins.
pub fn best_competency(averages: &[Competency]) -> Option<&Competency> {
    averages
        .iter()
        .reduce(|best, c| if best.score > c.score { best } else { c })
}

/// Lowest-scoring average; on ties the later entry wins.
pub fn worst_competency(averages: &[Competency]) -> Option<&Competency> {
    averages
        .iter()
        .reduce(|worst, c| if worst.score < c.score { worst } else { c })
}

/// Headline numbers for the teacher dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub student_count: usize,
    pub averages: Vec<Competency>,
    /// Name of the strongest competency, or `N/A`.
    pub best: String,
    /// Name of the weakest competency, or `N/A`.
    pub worst: String,
}

impl DashboardSummary {
    pub fn from_submissions(submissions: &[StudentSubmission]) -> Self {
        let averages = compute_averages(submissions);
        let name_or_na =
            |c: Option<&Competency>| c.map_or_else(|| NOT_AVAILABLE.to_string(), |c| c.name.clone());
        Self {
            student_count: submissions.len(),
            best: name_or_na(best_competency(&averages)),
            worst: name_or_na(worst_competency(&averages)),
            averages,
        }
    }
}

/// Compose the class summary prompt.
pub fn build_class_prompt(submissions: &[StudentSubmission]) -> String {
    let mut prompt = format!(
        "Analyse the results of a class of {} students on the project \"The growth of bacteria\".\n\n\
         STUDENT DATA:\n",
        submissions.len()
    );

    for (i, sub) in submissions.iter().enumerate() {
        let level = sub
            .quiz_result
            .as_ref()
            .map_or_else(|| NOT_AVAILABLE.to_string(), |q| q.level.to_string());
        let scores: Vec<String> = CompetencyCategory::ALL
            .iter()
            .map(|&c| {
                let score = category_score(&sub.analysis, c)
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |s| format!("{s}"));
                format!("{} {}", c.label(), score)
            })
            .collect();
        let weaknesses = if sub.analysis.weaknesses.is_empty() {
            "none listed".to_string()
        } else {
            sub.analysis.weaknesses.join("; ")
        };

        let _ = write!(
            prompt,
            "{}. {} (quiz level: {})\n   Prediction: \"{}\"\n   Weaknesses: {}\n   Scores: {}\n",
            i + 1,
            sub.student_name,
            level,
            sub.design.prediction,
            weaknesses,
            scores.join(", ")
        );
    }

    prompt.push_str(
        "\nREQUIRED OUTPUT:\n\
         1. An overall assessment of the class's competency level.\n\
         2. The misconceptions most students share (e.g. optimal temperatures, growth phases).\n\
         3. Concrete teaching strategies to address them in the next lessons.",
    );
    prompt
}

/// Ask the AI boundary for a class summary.
///
/// Fails fast, without a network call, when there are no submissions.
pub async fn analyze_class(
    provider: &dyn LlmProvider,
    config: &GenerationConfig,
    submissions: &[StudentSubmission],
) -> Result<ClassAnalysisResult, AssessmentError> {
    if submissions.is_empty() {
        return Err(AssessmentError::validation("There are no submissions to analyse yet."));
    }
    let request = config.request(
        Some(CLASS_SYSTEM_INSTRUCTION),
        vec![ContentPart::Text(build_class_prompt(submissions))],
        class_analysis_schema(),
    );
    generate_structured(provider, &request).await
}
