//! The `biolab analyze` command: one-shot assessment of a form file.

use std::path::PathBuf;

use anyhow::Result;

use biolab_core::assessment::{analyze, AnalysisInput};
use biolab_core::model::{QuizResult, StudentSubmission};
use biolab_core::parser::{parse_form, validate_form};

use crate::display;

pub struct AnalyzeArgs {
    pub input: PathBuf,
    pub image: Option<PathBuf>,
    pub quiz_score: Option<u32>,
    pub html: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: AnalyzeArgs) -> Result<()> {
    let form = parse_form(&args.input)?;
    for w in validate_form(&form)? {
        eprintln!("  [{}] WARNING: {}", w.field, w.message);
    }

    let (config, provider) = super::load_provider(args.config.as_deref(), args.provider.as_deref())?;
    let mut generation = config.generation_config();
    if let Some(model) = args.model {
        generation.model = model;
    }

    let image = args.image.as_ref().map(super::load_image).transpose()?;
    let quiz_result = args.quiz_score.map(QuizResult::from_score);

    println!("Analyzing {} with {}...", form.student_name, provider.name());
    let input = AnalysisInput::from_form(&form, image.as_ref(), quiz_result.as_ref());
    let analysis = analyze(provider.as_ref(), &generation, &input)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "assessment failed");
            anyhow::anyhow!(e.user_message())
        })?;

    let submission = StudentSubmission::new(form, quiz_result, analysis);
    display::print_analysis(&submission);

    if let Some(path) = &args.html {
        biolab_report::write_html_report(&submission, path)?;
        println!("\nHTML report saved to {}", path.display());
    }

    Ok(())
}
