//! The `biolab session` command: an interactive classroom session on the
//! terminal.
//!
//! Students take the entry quiz, fill in their worksheet and get their
//! assessment. The teacher unlocks the dashboard with the access code, browses
//! reports, runs the class analysis and exports the CSV. Submissions live only
//! as long as the process.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use biolab_core::error::AssessmentError;
use biolab_core::model::{DataPoint, StudentSubmission, SubmissionForm};
use biolab_core::parser::parse_form;
use biolab_core::quiz::{QuizProgress, QuizState};
use biolab_core::session::{Session, SessionObserver, StudentStage};

use crate::display;

/// Standard input ended (Ctrl-D or end of a piped script).
#[derive(Debug, Error)]
#[error("input closed")]
struct InputClosed;

struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn prompt(&mut self, label: &str) -> Result<String> {
        print!("{label}");
        std::io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(InputClosed.into()),
        }
    }

    /// Prompt showing the current value; blank input keeps it.
    async fn edit(&mut self, label: &str, value: &mut String) -> Result<()> {
        let label = if value.is_empty() {
            format!("{label}: ")
        } else {
            format!("{label} [{value}]: ")
        };
        let line = self.prompt(&label).await?;
        if !line.is_empty() {
            *value = line;
        }
        Ok(())
    }
}

struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_stage_change(&self, from: &StudentStage, to: &StudentStage) {
        tracing::debug!(%from, %to, "student stage changed");
    }

    fn on_submission_recorded(&self, submission: &StudentSubmission) {
        println!("Report saved for {}.", submission.student_name);
    }
}

pub async fn execute(
    provider: Option<String>,
    model: Option<String>,
    export_dir: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, provider) = super::load_provider(config_path.as_deref(), provider.as_deref())?;
    let mut session_config = config.session_config();
    if let Some(model) = model {
        session_config.generation.model = model;
    }
    tracing::info!(provider = provider.name(), model = %session_config.generation.model, "session started");

    let mut session = Session::new(provider, session_config).with_observer(Arc::new(ConsoleObserver));
    let mut console = Console::new();

    match run(&mut session, &mut console, &export_dir).await {
        Err(e) if e.is::<InputClosed>() => {
            println!();
            Ok(())
        }
        other => other,
    }
}

async fn run(session: &mut Session, console: &mut Console, export_dir: &Path) -> Result<()> {
    println!("Welcome to BioLab: the growth of bacteria.");
    loop {
        println!("\nWho is using BioLab? [s]tudent, [t]eacher, [q]uit");
        let choice = console.prompt("> ").await?.to_lowercase();
        match choice.as_str() {
            "s" | "student" => {
                session.choose_student()?;
                student_track(session, console).await?;
                session.sign_out();
            }
            "t" | "teacher" => {
                let code = console.prompt("Access code: ").await?;
                if session.login_teacher(&code).is_err() {
                    println!("{}", session.login_error().unwrap_or_default());
                    continue;
                }
                teacher_track(session, console, export_dir).await?;
                session.sign_out();
            }
            "q" | "quit" => return Ok(()),
            _ => println!("Please choose s, t or q."),
        }
    }
}

// ---------------------------------------------------------------------------
// Student track
// ---------------------------------------------------------------------------

async fn student_track(session: &mut Session, console: &mut Console) -> Result<()> {
    loop {
        if !take_quiz(session, console).await? {
            return Ok(());
        }
        fill_form(session, console).await?;
        if !submit(session, console).await? {
            return Ok(());
        }

        let next = console.prompt("\n[n]ew student or [q]uit: ").await?;
        if next.eq_ignore_ascii_case("n") {
            session.restart()?;
        } else {
            return Ok(());
        }
    }
}

/// Run the entry quiz. Returns `false` if the student gave up.
async fn take_quiz(session: &mut Session, console: &mut Console) -> Result<bool> {
    loop {
        println!("\nPreparing your entry quiz...");
        let loaded = if matches!(session.quiz().state(), QuizState::Failed(_)) {
            session.retry_quiz().await
        } else {
            session.load_quiz().await
        };
        match loaded {
            Ok(()) => break,
            Err(e) => {
                println!("{}", e.user_message());
                let again = console.prompt("[r]etry or [q]uit: ").await?;
                if !again.eq_ignore_ascii_case("r") {
                    return Ok(false);
                }
            }
        }
    }

    let total = session.quiz().questions().len();
    while let Some(question) = session.quiz().current_question().cloned() {
        let index = session.quiz().current_index();
        println!(
            "\nQuestion {}/{} ({})\n{}",
            index + 1,
            total,
            question.competency_type.label(),
            question.question
        );
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }

        let choice = loop {
            let line = console.prompt("Your answer: ").await?;
            match line.parse::<usize>() {
                Ok(n) if (1..=question.options.len()).contains(&n) => break n - 1,
                _ => println!("Please enter a number from 1 to {}.", question.options.len()),
            }
        };

        let feedback = session.answer_question(index, choice)?;
        if feedback.is_correct {
            println!("Correct!");
        } else {
            println!(
                "Not quite. The answer is {}. {}",
                feedback.correct_index + 1,
                question.options[feedback.correct_index]
            );
        }

        if let QuizProgress::Complete(result) = session.continue_quiz().await? {
            display::print_quiz_result(&result);
            return Ok(true);
        }
    }
    Ok(true)
}

async fn fill_form(session: &mut Session, console: &mut Console) -> Result<()> {
    loop {
        let path = console
            .prompt("\nForm file (leave blank to fill in here): ")
            .await?;
        if path.is_empty() {
            edit_form(session.form_mut()?, console).await?;
            break;
        }
        match parse_form(Path::new(&path)) {
            Ok(form) => {
                session.set_form(form)?;
                break;
            }
            Err(e) => println!("Could not read the form: {e:#}"),
        }
    }

    loop {
        let path = console.prompt("Image file (optional): ").await?;
        if path.is_empty() {
            break;
        }
        match super::load_image(&PathBuf::from(&path)) {
            Ok(image) => {
                session.set_image(Some(image))?;
                break;
            }
            Err(e) => println!("{e:#}"),
        }
    }
    Ok(())
}

/// Value that deletes a time point in the interactive form.
const REMOVE_POINT: &str = "-";

fn remove_marked_points(points: &mut Vec<DataPoint>) {
    points.retain(|p| p.value != REMOVE_POINT);
}

async fn edit_form(form: &mut SubmissionForm, console: &mut Console) -> Result<()> {
    println!("Press Enter to keep the value in brackets.");
    console.edit("Your name", &mut form.student_name).await?;

    println!("\nModule 1: experiment design");
    let design = &mut form.design;
    console.edit("Bacteria", &mut design.bacteria_type).await?;
    console.edit("Temperature", &mut design.temperature).await?;
    console.edit("pH", &mut design.ph).await?;
    console.edit("Nutrient", &mut design.nutrient).await?;
    console.edit("Prediction", &mut design.prediction).await?;

    println!("\nModule 2: data (enter {REMOVE_POINT} as a value to remove that time point)");
    for point in form.data.data_points.iter_mut() {
        let label = format!("Value at {}", point.time);
        console.edit(&label, &mut point.value).await?;
    }
    loop {
        let time = console
            .prompt("Another time point (leave blank to finish): ")
            .await?;
        if time.is_empty() {
            break;
        }
        let value = console.prompt(&format!("Value at {time}: ")).await?;
        form.data.data_points.push(DataPoint::new(time, value));
    }
    remove_marked_points(&mut form.data.data_points);
    console
        .edit("What does the graph show", &mut form.data.observation)
        .await?;

    println!("\nModule 3: conclusion and application");
    console
        .edit("Conclusion", &mut form.application.conclusion)
        .await?;
    console
        .edit("Real-life application", &mut form.application.practical_app)
        .await?;
    Ok(())
}

/// Send the form until it is assessed. Returns `false` if the student gave up.
async fn submit(session: &mut Session, console: &mut Console) -> Result<bool> {
    loop {
        println!("\nAnalyzing your work...");
        match session.submit().await.map(|_| ()) {
            Ok(()) => {
                if let Some(submission) = session.current_result() {
                    display::print_analysis(submission);
                }
                return Ok(true);
            }
            Err(AssessmentError::Validation(message)) => {
                println!("{message}");
                edit_form(session.form_mut()?, console).await?;
            }
            Err(e) => {
                if let StudentStage::Error(message) = session.stage() {
                    println!("{message}");
                }
                session.back_to_input()?;
                let next = console
                    .prompt("[r]etry, [e]dit the form, or [q]uit: ")
                    .await?
                    .to_lowercase();
                match next.as_str() {
                    "e" => edit_form(session.form_mut()?, console).await?,
                    "q" => return Ok(false),
                    _ => tracing::debug!(error = %e, "retrying submission"),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Teacher track
// ---------------------------------------------------------------------------

async fn teacher_track(session: &mut Session, console: &mut Console, export_dir: &Path) -> Result<()> {
    loop {
        let summary = session.dashboard()?;
        display::print_dashboard(&summary, session.submissions());

        let choice = console
            .prompt("\nNumber to open a report, [a]nalyze the class, [e]xport CSV, [q]uit: ")
            .await?
            .to_lowercase();
        match choice.as_str() {
            "a" => {
                println!("Analyzing the class...");
                match session.analyze_class().await {
                    Ok(result) => display::print_class_analysis(&result),
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            "e" => match biolab_report::write_csv_report(session.submissions(), export_dir) {
                Ok(path) => println!("Exported {}", path.display()),
                Err(e) => println!("Export failed: {e:#}"),
            },
            "q" => return Ok(()),
            other => {
                let selected = other
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| session.submissions().get(i))
                    .map(|s| s.id);
                match selected {
                    Some(id) => {
                        display::print_analysis(session.open_submission(id)?);
                        console.prompt("\nPress Enter to go back").await?;
                        session.close_submission();
                    }
                    None => println!("Unknown choice."),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_points_are_removed() {
        let mut points = vec![
            DataPoint::new("0h", "0.05"),
            DataPoint::new("2h", REMOVE_POINT),
            DataPoint::new("4h", ""),
            DataPoint::new("6h", REMOVE_POINT),
        ];
        remove_marked_points(&mut points);
        assert_eq!(points, vec![DataPoint::new("0h", "0.05"), DataPoint::new("4h", "")]);
    }
}
