//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn biolab() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("biolab").unwrap()
}

fn quiz_response() -> String {
    let categories = ["knowledge", "inquiry", "application"];
    let questions: Vec<_> = (0..10)
        .map(|i| {
            json!({
                "id": i + 1,
                "question": format!("Question number {}?", i + 1),
                "options": ["Right", "Wrong", "Also wrong", "Still wrong"],
                "correctAnswer": 0,
                "competencyType": categories[i % 3],
            })
        })
        .collect();
    serde_json::to_string(&questions).unwrap()
}

fn analysis_response() -> String {
    json!({
        "summary": "Solid design, the lag phase needs more attention.",
        "competencies": [
            {"name": "Scientific Knowledge", "score": 80, "description": "Good choice of conditions"},
            {"name": "Scientific Inquiry", "score": 60, "description": "Curve partly explained"},
            {"name": "Applied Science", "score": 70, "description": "Relevant example"}
        ],
        "strengths": ["Clear hypothesis"],
        "weaknesses": ["Lag phase not explained"],
        "learningPath": [{
            "timeframe": "Week 1",
            "title": "Bacterial growth phases",
            "description": "Review lag, log, stationary and death phases.",
            "actionItems": ["Label each phase on your graph"]
        }]
    })
    .to_string()
}

fn class_response() -> String {
    json!({
        "overallAssessment": "The class designs experiments well.",
        "commonMisconceptions": ["Bacteria grow at a constant rate"],
        "recommendedTeachingStrategies": ["Plot a shared class growth curve"]
    })
    .to_string()
}

/// Write an offline config backed by the mock provider.
fn write_config(dir: &Path) -> PathBuf {
    let config = format!(
        r#"default_provider = "offline"
teacher_passphrase = "letmein"
feedback_delay_ms = 0

[providers.offline]
type = "mock"

[[providers.offline.responses]]
contains = "multiple-choice quiz"
response = '''{quiz}'''

[[providers.offline.responses]]
contains = "class of"
response = '''{class}'''

[[providers.offline.responses]]
contains = "MODULE 1"
response = '''{analysis}'''
"#,
        quiz = quiz_response(),
        class = class_response(),
        analysis = analysis_response(),
    );
    let path = dir.join("biolab.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn write_form(dir: &Path, name: &str) -> PathBuf {
    let form = format!(
        r#"student_name = "{name}"

[design]
temperature = "37°C"
ph = "7"
nutrient = "LB broth"
prediction = "Slow start, then fast growth"

[data]
observation = "Flat for two hours, then a steep rise"

[[data.points]]
time = "0h"
value = "0.05"

[[data.points]]
time = "4h"
value = "0.40"

[application]
conclusion = "Lag phase then exponential growth"
practical_app = "Refrigerate food"
"#
    );
    let path = dir.join(format!("{}.toml", name.to_lowercase()));
    std::fs::write(&path, form).unwrap();
    path
}

#[test]
fn help_lists_commands() {
    biolab()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("session"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn version_flag() {
    biolab()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("biolab"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    biolab()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created biolab.toml"))
        .stdout(predicate::str::contains("Created forms/example.toml"));

    assert!(dir.path().join("biolab.toml").exists());
    assert!(dir.path().join("forms/example.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("biolab.toml"), "# mine").unwrap();

    biolab()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("biolab.toml already exists, skipping."));

    let content = std::fs::read_to_string(dir.path().join("biolab.toml")).unwrap();
    assert_eq!(content, "# mine");
}

#[test]
fn init_example_form_validates() {
    let dir = TempDir::new().unwrap();
    biolab().current_dir(dir.path()).arg("init").assert().success();

    biolab()
        .current_dir(dir.path())
        .args(["validate", "--input", "forms/example.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Student (3 data points)"))
        .stdout(predicate::str::contains("Form is valid."));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sparse.toml");
    std::fs::write(&path, "student_name = \"Minh\"\n").unwrap();

    biolab()
        .args(["validate", "--input"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING: no prediction given"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_rejects_missing_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("anon.toml");
    std::fs::write(&path, "[design]\nprediction = \"grows\"\n").unwrap();

    biolab()
        .args(["validate", "--input"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please enter the student's name."));
}

#[test]
fn validate_nonexistent_file() {
    biolab()
        .args(["validate", "--input", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn analyze_with_offline_provider() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let form = write_form(dir.path(), "Lan");
    let html = dir.path().join("out").join("lan.html");

    biolab()
        .arg("analyze")
        .arg("--input")
        .arg(&form)
        .arg("--config")
        .arg(&config)
        .args(["--quiz-score", "4"])
        .arg("--html")
        .arg(&html)
        .assert()
        .success()
        .stdout(predicate::str::contains("Assessment for Lan"))
        .stdout(predicate::str::contains("Entry quiz: Basic (4/10)"))
        .stdout(predicate::str::contains("Bacterial growth phases"))
        .stdout(predicate::str::contains("HTML report saved"));

    let content = std::fs::read_to_string(&html).unwrap();
    assert!(content.contains("<h1>Lan</h1>"));
}

#[test]
fn analyze_rejects_out_of_range_quiz_score() {
    biolab()
        .args(["analyze", "--input", "form.toml", "--quiz-score", "11"])
        .assert()
        .failure();
}

#[test]
fn analyze_unknown_provider() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let form = write_form(dir.path(), "Lan");

    biolab()
        .arg("analyze")
        .arg("--input")
        .arg(&form)
        .arg("--config")
        .arg(&config)
        .args(["--provider", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider 'nowhere' is not configured"));
}

#[test]
fn list_models_for_offline_provider() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    biolab()
        .arg("list-models")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: offline"))
        .stdout(predicate::str::contains("mock-model"));
}

#[test]
fn session_wrong_access_code() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    biolab()
        .arg("session")
        .arg("--config")
        .arg(&config)
        .write_stdin("t\nnope\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("The access code is incorrect."));
}

#[test]
fn session_ends_cleanly_on_closed_input() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    biolab()
        .arg("session")
        .arg("--config")
        .arg(&config)
        .write_stdin("s\n1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 1/10"));
}

#[test]
fn session_student_then_teacher() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let form = write_form(dir.path(), "Lan");
    let export_dir = dir.path().join("exports");

    let mut script = String::from("s\n");
    script.push_str(&"1\n".repeat(10));
    script.push_str(&format!("{}\n", form.display()));
    script.push_str("\nq\n");
    script.push_str("t\nletmein\n1\n\na\ne\nq\nq\n");

    biolab()
        .arg("session")
        .arg("--config")
        .arg(&config)
        .arg("--export-dir")
        .arg(&export_dir)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Quiz complete: 10/10, level Advanced"))
        .stdout(predicate::str::contains("Report saved for Lan."))
        .stdout(predicate::str::contains("Students: 1"))
        .stdout(predicate::str::contains("Bacteria grow at a constant rate"))
        .stdout(predicate::str::contains("Exported"));

    let exported: Vec<_> = std::fs::read_dir(&export_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(exported.len(), 1);
    assert!(exported[0].starts_with("Report_") && exported[0].ends_with(".csv"));

    let csv = std::fs::read_to_string(export_dir.join(&exported[0])).unwrap();
    assert!(csv.contains(",Lan,"));
    assert!(csv.contains("Advanced"));
}

#[test]
fn session_student_fills_form_interactively() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let mut script = String::from("s\n");
    script.push_str(&"2\n".repeat(10));
    // form file prompt, then name and the remaining fields left at their defaults
    script.push_str("\nHoa\n");
    script.push_str(&"\n".repeat(5));
    script.push_str("0.05\n0.2\n0.6\n\n");
    script.push_str("It rises\nIt grows\nYogurt\n");
    // image prompt, then quit after the result
    script.push_str("\nq\nq\n");

    biolab()
        .arg("session")
        .arg("--config")
        .arg(&config)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Quiz complete: 0/10, level Basic"))
        .stdout(predicate::str::contains("Report saved for Hoa."));
}

#[test]
fn session_student_removes_a_time_point() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let mut script = String::from("s\n");
    script.push_str(&"1\n".repeat(10));
    script.push_str("\nMai\n");
    script.push_str(&"\n".repeat(5));
    // keep 0h, drop 2h and 4h, add 6h
    script.push_str("0.05\n-\n-\n6h\n0.8\n\n");
    script.push_str("It rises\nIt grows\nYogurt\n");
    script.push_str("\nq\nt\nletmein\ne\nq\nq\n");

    let export_dir = dir.path().join("exports");
    biolab()
        .arg("session")
        .arg("--config")
        .arg(&config)
        .arg("--export-dir")
        .arg(&export_dir)
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("to remove that time point"))
        .stdout(predicate::str::contains("Report saved for Mai."));
}
