//! Core data model types for biolab.
//!
//! These are the value types the whole system passes around: what a student
//! submits, what the quiz produces, and what the AI assessment returns.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Competency categories
// ---------------------------------------------------------------------------

/// The three fixed assessment categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompetencyCategory {
    /// Understanding of natural-science concepts, shown through experiment design.
    Knowledge,
    /// Data handling, graphing and observation.
    Inquiry,
    /// Problem solving and real-world application.
    Application,
}

impl CompetencyCategory {
    /// All categories in rubric order.
    pub const ALL: [CompetencyCategory; 3] = [
        CompetencyCategory::Knowledge,
        CompetencyCategory::Inquiry,
        CompetencyCategory::Application,
    ];

    /// Short machine tag used in quiz payloads.
    pub fn tag(self) -> &'static str {
        match self {
            CompetencyCategory::Knowledge => "knowledge",
            CompetencyCategory::Inquiry => "inquiry",
            CompetencyCategory::Application => "application",
        }
    }

    /// Canonical competency name the assessment is asked to use.
    pub fn label(self) -> &'static str {
        match self {
            CompetencyCategory::Knowledge => "Scientific Knowledge",
            CompetencyCategory::Inquiry => "Scientific Inquiry",
            CompetencyCategory::Application => "Applied Science",
        }
    }

    /// Lowercase substrings that identify this category inside a free-form name.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            CompetencyCategory::Knowledge => &["knowledge", "understanding"],
            CompetencyCategory::Inquiry => &["inquiry", "investigat"],
            CompetencyCategory::Application => &["appli", "applying"],
        }
    }
}

impl fmt::Display for CompetencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for CompetencyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        CompetencyCategory::ALL
            .into_iter()
            .find(|c| lowered == c.tag() || c.keywords().iter().any(|k| lowered.contains(k)))
            .ok_or_else(|| format!("unknown competency category: {s}"))
    }
}

impl TryFrom<String> for CompetencyCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompetencyCategory> for String {
    fn from(value: CompetencyCategory) -> Self {
        value.tag().to_string()
    }
}

// ---------------------------------------------------------------------------
// Student input
// ---------------------------------------------------------------------------

/// Module 1 of the project: how the experiment was set up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDesign {
    pub bacteria_type: String,
    pub temperature: String,
    pub ph: String,
    pub nutrient: String,
    /// The student's hypothesis about how the culture will grow.
    pub prediction: String,
}

impl Default for ExperimentDesign {
    fn default() -> Self {
        Self {
            bacteria_type: "E. coli".to_string(),
            temperature: String::new(),
            ph: String::new(),
            nutrient: String::new(),
            prediction: String::new(),
        }
    }
}

/// A single (time, value) measurement. Both sides are free text ("2h", "0.45 OD").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataPoint {
    pub time: String,
    pub value: String,
}

impl DataPoint {
    pub fn new(time: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            value: value.into(),
        }
    }
}

/// Module 2: collected measurements and the student's reading of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentData {
    pub data_points: Vec<DataPoint>,
    pub observation: String,
}

impl Default for ExperimentData {
    fn default() -> Self {
        Self {
            data_points: ["0h", "2h", "4h"]
                .into_iter()
                .map(|t| DataPoint::new(t, ""))
                .collect(),
            observation: String::new(),
        }
    }
}

/// Module 3: conclusion and practical application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentApplication {
    pub conclusion: String,
    pub practical_app: String,
}

/// Everything the student fills in on the input step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmissionForm {
    pub student_name: String,
    #[serde(default)]
    pub design: ExperimentDesign,
    #[serde(default)]
    pub data: ExperimentData,
    #[serde(default)]
    pub application: ExperimentApplication,
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

/// A multiple-choice question produced by the AI boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options` of the right answer.
    pub correct_answer: usize,
    pub competency_type: CompetencyCategory,
}

/// Entry level derived from the quiz score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuizLevel {
    Basic,
    Intermediate,
    Advanced,
}

impl QuizLevel {
    /// Map a 0–10 quiz score to a level: 8+ Advanced, 5–7 Intermediate, otherwise Basic.
    pub fn classify(score: u32) -> Self {
        if score >= 8 {
            QuizLevel::Advanced
        } else if score >= 5 {
            QuizLevel::Intermediate
        } else {
            QuizLevel::Basic
        }
    }

    /// Feedback text shown alongside the level.
    pub fn details(self) -> &'static str {
        match self {
            QuizLevel::Advanced => {
                "Very solid foundations, ready for higher-order reasoning tasks."
            }
            QuizLevel::Intermediate => {
                "Core concepts are in place; practice applying them to new situations."
            }
            QuizLevel::Basic => {
                "Review the basic natural-science concepts before starting the project."
            }
        }
    }
}

impl fmt::Display for QuizLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizLevel::Basic => write!(f, "Basic"),
            QuizLevel::Intermediate => write!(f, "Intermediate"),
            QuizLevel::Advanced => write!(f, "Advanced"),
        }
    }
}

/// Outcome of a finished quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: u32,
    pub level: QuizLevel,
    pub details: String,
}

impl QuizResult {
    pub fn from_score(score: u32) -> Self {
        let level = QuizLevel::classify(score);
        Self {
            score,
            level,
            details: level.details().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Assessment output
// ---------------------------------------------------------------------------

/// One scored competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Competency {
    pub name: String,
    /// Score on a 0–100 scale.
    pub score: f64,
    pub description: String,
}

/// One step of the personalised remediation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathItem {
    pub timeframe: String,
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
}

/// Structured assessment of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub competencies: Vec<Competency>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub learning_path: Vec<LearningPathItem>,
}

/// AI-generated summary of a whole class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAnalysisResult {
    pub overall_assessment: String,
    pub common_misconceptions: Vec<String>,
    pub recommended_teaching_strategies: Vec<String>,
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// Time-ordered submission identifier (UUIDv7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SubmissionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A successfully assessed student report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSubmission {
    pub id: SubmissionId,
    pub student_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub quiz_result: Option<QuizResult>,
    pub design: ExperimentDesign,
    pub data: ExperimentData,
    pub application: ExperimentApplication,
    pub analysis: AnalysisResult,
}

impl StudentSubmission {
    /// Assemble a submission from the form, the optional quiz outcome and the analysis.
    pub fn new(form: SubmissionForm, quiz_result: Option<QuizResult>, analysis: AnalysisResult) -> Self {
        Self {
            id: SubmissionId::new(),
            student_name: form.student_name,
            created_at: Utc::now(),
            quiz_result,
            design: form.design,
            data: form.data,
            application: form.application,
            analysis,
        }
    }
}
