//! Single-submission competency assessment.
//!
//! Builds one structured request from the student's three modules (plus the
//! optional image and quiz result), sends it with [`analysis_schema`], and
//! decodes the answer into an [`AnalysisResult`].

use std::fmt::Write as _;

use crate::error::AssessmentError;
use crate::model::{
    AnalysisResult, CompetencyCategory, ExperimentApplication, ExperimentData, ExperimentDesign,
    QuizLevel, QuizResult, SubmissionForm,
};
use crate::schema::analysis_schema;
use crate::traits::{
    generate_structured, Attachment, ContentPart, GenerateRequest, GenerationConfig, LlmProvider,
};

/// Persona sent as the system instruction for assessments.
pub const ANALYSIS_SYSTEM_INSTRUCTION: &str = "You are an enthusiastic, rigorous but encouraging \
biology teacher. Use precise natural-science terminology.";

/// Inputs for one assessment call.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub design: &'a ExperimentDesign,
    pub data: &'a ExperimentData,
    pub application: &'a ExperimentApplication,
    pub image: Option<&'a Attachment>,
    pub quiz_result: Option<&'a QuizResult>,
}

impl<'a> AnalysisInput<'a> {
    pub fn from_form(
        form: &'a SubmissionForm,
        image: Option<&'a Attachment>,
        quiz_result: Option<&'a QuizResult>,
    ) -> Self {
        Self {
            design: &form.design,
            data: &form.data,
            application: &form.application,
            image,
            quiz_result,
        }
    }
}

fn calibration(level: QuizLevel) -> &'static str {
    match level {
        QuizLevel::Basic => {
            "Explain in simple, elementary terms. Start the learning path with foundational \
             concepts and avoid unexplained jargon."
        }
        QuizLevel::Intermediate => {
            "Use standard explanations. Focus the learning path on applying known concepts \
             to new situations."
        }
        QuizLevel::Advanced => {
            "Be rigorous and go deeper. Challenge the student with higher-order reasoning, \
             quantitative analysis and extension experiments."
        }
    }
}

/// Compose the instruction block for an assessment.
pub fn build_analysis_prompt(input: &AnalysisInput<'_>) -> String {
    let design = input.design;
    let data = input.data;
    let app = input.application;

    let mut prompt = String::new();
    prompt.push_str(
        "Role: you are \"BioLab AI\", an expert assessor of natural-science competencies.\n\n\
         Task: assess the student's work on the project \"The growth of bacteria\". Focus on the \
         PROCESS and the REASONING, not only on whether the results are right.\n\n",
    );

    if let Some(quiz) = input.quiz_result {
        let _ = write!(
            prompt,
            "STUDENT CONTEXT: the entry quiz placed this student at level {} ({}/10). {}\n\n",
            quiz.level,
            quiz.score,
            calibration(quiz.level)
        );
    }

    prompt.push_str("STUDENT INPUT:\n\n");
    let _ = write!(
        prompt,
        "1. MODULE 1: DESIGN (assesses {knowledge})\n\
         - Bacteria: {}\n\
         - Temperature: {}\n\
         - pH: {}\n\
         - Nutrient medium: {}\n\
         - Prediction: \"{}\"\n\
         -> Check whether the conditions suit this bacterium (e.g. E. coli grows best at 37°C).\n\n",
        design.bacteria_type,
        design.temperature,
        design.ph,
        design.nutrient,
        design.prediction,
        knowledge = CompetencyCategory::Knowledge.label(),
    );

    let _ = writeln!(
        prompt,
        "2. MODULE 2: DATA & ANALYSIS (assesses {})\n- Collected data:",
        CompetencyCategory::Inquiry.label()
    );
    for point in &data.data_points {
        let _ = writeln!(prompt, "  - Time: {}, Value (OD/colonies): {}", point.time, point.value);
    }
    let _ = write!(
        prompt,
        "- Observation of the graph: \"{}\"\n\
         - Attached image (if any): assess the graph or the petri dish.\n\
         -> Check measurement error and the logic of the growth curve (lag, log, stationary, death phases).\n\n",
        data.observation
    );

    let _ = write!(
        prompt,
        "3. MODULE 3: APPLICATION (assesses {})\n\
         - Conclusion and practical solution: \"{}\"\n\
         - Application (health/food): \"{}\"\n\
         -> Assess the ability to solve real-world problems.\n\n",
        CompetencyCategory::Application.label(),
        app.conclusion,
        app.practical_app
    );

    prompt.push_str("REQUIRED OUTPUT (JSON):\nScore these three core competencies from 0 to 100:\n");
    let rubric = [
        "foundational knowledge shown through the experiment design",
        "data processing, graphing and observation skills",
        "problem solving and practical application",
    ];
    for (i, (category, what)) in CompetencyCategory::ALL.iter().zip(rubric).enumerate() {
        let _ = writeln!(prompt, "{}. \"{}\": {}.", i + 1, category.label(), what);
    }
    prompt.push_str(
        "\nPersonalise the learning path from the student's mistakes (e.g. wrong temperature -> \
         review bacterial physiology; wrong graph -> data processing exercises), in \
         chronological order.",
    );
    prompt
}

/// Assemble the request: image part (if any) first, then the instructions.
pub fn build_analysis_request(input: &AnalysisInput<'_>, config: &GenerationConfig) -> GenerateRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = input.image {
        parts.push(ContentPart::InlineData(image.clone()));
    }
    parts.push(ContentPart::Text(build_analysis_prompt(input)));
    config.request(Some(ANALYSIS_SYSTEM_INSTRUCTION), parts, analysis_schema())
}

/// Check the parts of the payload the schema promises but serde cannot enforce.
pub fn check_analysis(result: &AnalysisResult) -> Result<(), AssessmentError> {
    for competency in &result.competencies {
        if !(0.0..=100.0).contains(&competency.score) {
            return Err(AssessmentError::generation(format!(
                "schema violation: competency '{}' scored {}",
                competency.name, competency.score
            )));
        }
    }
    Ok(())
}

/// Run the assessment for one submission.
pub async fn analyze(
    provider: &dyn LlmProvider,
    config: &GenerationConfig,
    input: &AnalysisInput<'_>,
) -> Result<AnalysisResult, AssessmentError> {
    let request = build_analysis_request(input, config);
    let result: AnalysisResult = generate_structured(provider, &request).await?;
    check_analysis(&result).inspect_err(|e| {
        tracing::error!(error = %e, "assessment payload rejected");
    })?;
    Ok(result)
}
