//! TOML submission form parser.
//!
//! Loads a student's worksheet from a TOML file and validates it before it is
//! sent for assessment.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::AssessmentError;
use crate::model::{
    DataPoint, ExperimentApplication, ExperimentData, ExperimentDesign, SubmissionForm,
};

/// Intermediate TOML structure for parsing form files.
#[derive(Debug, Deserialize)]
struct TomlForm {
    #[serde(default)]
    student_name: String,
    #[serde(default)]
    design: Option<TomlDesign>,
    #[serde(default)]
    data: Option<TomlData>,
    #[serde(default)]
    application: Option<TomlApplication>,
}

#[derive(Debug, Deserialize)]
struct TomlDesign {
    #[serde(default = "default_bacteria")]
    bacteria_type: String,
    #[serde(default)]
    temperature: String,
    #[serde(default)]
    ph: String,
    #[serde(default)]
    nutrient: String,
    #[serde(default)]
    prediction: String,
}

fn default_bacteria() -> String {
    ExperimentDesign::default().bacteria_type
}

#[derive(Debug, Deserialize)]
struct TomlData {
    #[serde(default)]
    points: Vec<TomlDataPoint>,
    #[serde(default)]
    observation: String,
}

#[derive(Debug, Deserialize)]
struct TomlDataPoint {
    time: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct TomlApplication {
    #[serde(default)]
    conclusion: String,
    #[serde(default)]
    practical_app: String,
}

/// Parse a single TOML file into a `SubmissionForm`.
pub fn parse_form(path: &Path) -> Result<SubmissionForm> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read form file: {}", path.display()))?;

    parse_form_str(&content, path)
}

/// Parse a TOML string into a `SubmissionForm` (useful for testing).
pub fn parse_form_str(content: &str, source_path: &Path) -> Result<SubmissionForm> {
    let parsed: TomlForm = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let design = match parsed.design {
        Some(d) => ExperimentDesign {
            bacteria_type: d.bacteria_type,
            temperature: d.temperature,
            ph: d.ph,
            nutrient: d.nutrient,
            prediction: d.prediction,
        },
        None => ExperimentDesign::default(),
    };

    let data = match parsed.data {
        Some(d) => ExperimentData {
            data_points: d
                .points
                .into_iter()
                .map(|p| DataPoint::new(p.time, p.value))
                .collect(),
            observation: d.observation,
        },
        None => ExperimentData::default(),
    };

    let application = parsed
        .application
        .map(|a| ExperimentApplication {
            conclusion: a.conclusion,
            practical_app: a.practical_app,
        })
        .unwrap_or_default();

    Ok(SubmissionForm {
        student_name: parsed.student_name,
        design,
        data,
        application,
    })
}

/// A non-blocking issue found in a form.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The form field concerned.
    pub field: &'static str,
    /// Warning message.
    pub message: String,
}

/// Check the fields that must be present before a form can be submitted.
pub fn check_required(form: &SubmissionForm) -> Result<(), AssessmentError> {
    if form.student_name.trim().is_empty() {
        return Err(AssessmentError::validation("Please enter the student's name."));
    }
    Ok(())
}

/// Validate a form: hard errors for missing required fields, warnings for
/// sections that will weaken the assessment.
pub fn validate_form(form: &SubmissionForm) -> Result<Vec<ValidationWarning>, AssessmentError> {
    check_required(form)?;

    let mut warnings = Vec::new();
    let mut warn = |field: &'static str, message: String| {
        warnings.push(ValidationWarning { field, message })
    };

    if form.design.prediction.trim().is_empty() {
        warn("design.prediction", "no prediction given".into());
    }
    if form.data.data_points.is_empty() {
        warn("data.points", "no data points recorded".into());
    }
    for (i, point) in form.data.data_points.iter().enumerate() {
        if point.value.trim().is_empty() {
            warn(
                "data.points",
                format!("data point {} ({}) has no value", i + 1, point.time),
            );
        }
    }
    if form.data.observation.trim().is_empty() {
        warn("data.observation", "no observation of the graph".into());
    }
    if form.application.conclusion.trim().is_empty() {
        warn("application.conclusion", "no conclusion".into());
    }

    Ok(warnings)
}
