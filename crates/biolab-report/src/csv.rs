//! CSV export of the class submission list.
//!
//! The document starts with a UTF-8 byte-order mark so spreadsheet
//! applications pick the right encoding, then one header line and one line
//! per submission.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};

use biolab_core::aggregate::{category_score, NOT_AVAILABLE};
use biolab_core::model::{CompetencyCategory, StudentSubmission};

/// UTF-8 byte-order mark.
pub const BOM: char = '\u{FEFF}';

/// Timestamp layout used in the export.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const DELIMITER: char = ',';
const LEARNING_PATH_SEPARATOR: &str = " -> ";

fn header() -> String {
    let mut columns = vec!["ID", "Name", "Timestamp", "Quiz Level", "Prediction"];
    columns.extend(CompetencyCategory::ALL.iter().map(|c| c.label()));
    columns.push("Learning Path");
    columns.join(",")
}

/// Quote a field when it contains the delimiter, a quote or a line break.
/// Embedded quotes are doubled.
pub fn escape_field(value: &str) -> String {
    if value.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row<Tz: TimeZone>(sub: &StudentSubmission, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let quiz_level = sub
        .quiz_result
        .as_ref()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |q| q.level.to_string());
    let learning_path = sub
        .analysis
        .learning_path
        .iter()
        .map(|item| item.title.as_str())
        .collect::<Vec<_>>()
        .join(LEARNING_PATH_SEPARATOR);

    let mut fields = vec![
        sub.id.to_string(),
        escape_field(&sub.student_name),
        sub.created_at
            .with_timezone(tz)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        escape_field(&quiz_level),
        escape_field(&sub.design.prediction),
    ];
    fields.extend(
        CompetencyCategory::ALL
            .iter()
            .map(|&c| category_score(&sub.analysis, c).unwrap_or(0.0).to_string()),
    );
    fields.push(escape_field(&learning_path));
    fields.join(",")
}

/// Render `submissions` as CSV with timestamps in `tz`.
pub fn export_csv_in<Tz: TimeZone>(submissions: &[StudentSubmission], tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    out.push(BOM);
    out.push_str(&header());
    out.push('\n');
    for sub in submissions {
        out.push_str(&row(sub, tz));
        out.push('\n');
    }
    out
}

/// Render `submissions` as CSV with timestamps in local time.
pub fn export_csv(submissions: &[StudentSubmission]) -> String {
    export_csv_in(submissions, &Local)
}

/// `Report_<YYYY-MM-DD>.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("Report_{}.csv", date.format("%Y-%m-%d"))
}

/// Write today's export into `dir` and return the file path.
pub fn write_csv_report(submissions: &[StudentSubmission], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    let path = dir.join(export_file_name(Local::now().date_naive()));
    std::fs::write(&path, export_csv(submissions))
        .with_context(|| format!("failed to write CSV report: {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = submissions.len(), "CSV report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biolab_core::model::{
        AnalysisResult, Competency, LearningPathItem, QuizResult, SubmissionForm,
    };
    use chrono::{FixedOffset, Utc};

    fn analysis(scores: &[(&str, f64)], titles: &[&str]) -> AnalysisResult {
        AnalysisResult {
            summary: String::new(),
            competencies: scores
                .iter()
                .map(|(name, score)| Competency {
                    name: (*name).into(),
                    score: *score,
                    description: String::new(),
                })
                .collect(),
            strengths: vec![],
            weaknesses: vec![],
            learning_path: titles
                .iter()
                .map(|t| LearningPathItem {
                    timeframe: "Week 1".into(),
                    title: (*t).into(),
                    description: String::new(),
                    action_items: vec![],
                })
                .collect(),
        }
    }

    fn submission(name: &str, prediction: &str, quiz: Option<u32>, analysis: AnalysisResult) -> StudentSubmission {
        let mut form = SubmissionForm {
            student_name: name.into(),
            ..Default::default()
        };
        form.design.prediction = prediction.into();
        let mut sub = StudentSubmission::new(form, quiz.map(QuizResult::from_score), analysis);
        sub.created_at = Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap();
        sub
    }

    /// Minimal RFC 4180 reader for checking what we write.
    fn parse_csv(input: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = input.chars().peekable();
        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                ('"', true) => in_quotes = false,
                ('"', false) => in_quotes = true,
                (',', false) => row.push(std::mem::take(&mut field)),
                ('\n', false) => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                (c, _) => field.push(c),
            }
        }
        rows
    }

    #[test]
    fn empty_list_exports_header_only() {
        let csv = export_csv_in(&[], &Utc);
        assert!(csv.starts_with('\u{FEFF}'));
        assert_eq!(
            csv.trim_start_matches(BOM),
            "ID,Name,Timestamp,Quiz Level,Prediction,Scientific Knowledge,Scientific Inquiry,Applied Science,Learning Path\n"
        );
    }

    #[test]
    fn comma_in_name_is_quoted() {
        let sub = submission("O'Brien, J.", "", None, analysis(&[], &[]));
        let csv = export_csv_in(std::slice::from_ref(&sub), &Utc);
        let line = csv.lines().nth(1).unwrap();
        assert!(line.contains(",\"O'Brien, J.\","));
    }

    #[test]
    fn row_layout() {
        let sub = submission(
            "Lan",
            "Fast growth",
            Some(9),
            analysis(
                &[
                    ("Scientific Knowledge", 82.0),
                    ("Scientific Inquiry", 64.5),
                    ("Applied Science", 71.0),
                ],
                &["Bacterial physiology", "Growth curves"],
            ),
        );
        let csv = export_csv_in(std::slice::from_ref(&sub), &Utc);
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(
            line,
            format!(
                "{},Lan,07/03/2025 14:05:09,Advanced,Fast growth,82,64.5,71,Bacterial physiology -> Growth curves",
                sub.id
            )
        );
    }

    #[test]
    fn missing_scores_and_quiz_default() {
        let sub = submission("Minh", "", None, analysis(&[("Teamwork", 90.0)], &[]));
        let rows = parse_csv(export_csv_in(&[sub], &Utc).trim_start_matches(BOM));
        assert_eq!(rows[1][3], "N/A");
        assert_eq!(&rows[1][5..8], &["0", "0", "0"]);
        assert_eq!(rows[1][8], "");
    }

    #[test]
    fn scores_match_rephrased_competency_names() {
        let sub = submission(
            "Hoa",
            "",
            Some(3),
            analysis(&[("knowledge of bacteria", 55.0), ("Applying science", 40.0)], &[]),
        );
        let rows = parse_csv(export_csv_in(&[sub], &Utc).trim_start_matches(BOM));
        assert_eq!(&rows[1][5..8], &["55", "0", "40"]);
        assert_eq!(rows[1][3], "Basic");
    }

    #[test]
    fn timestamps_follow_the_given_zone() {
        let sub = submission("An", "", None, analysis(&[], &[]));
        let hanoi = FixedOffset::east_opt(7 * 3600).unwrap();
        let rows = parse_csv(export_csv_in(&[sub], &hanoi).trim_start_matches(BOM));
        assert_eq!(rows[1][2], "07/03/2025 21:05:09");
    }

    #[test]
    fn awkward_fields_round_trip() {
        let name = "Nguyen \"Ken\", Jr.";
        let prediction = "Line one\nline two, with \"quotes\"";
        let subs = vec![
            submission(name, prediction, Some(6), analysis(&[], &["A, then B"])),
            submission("Plain", "none", None, analysis(&[], &[])),
        ];
        let rows = parse_csv(export_csv_in(&subs, &Utc).trim_start_matches(BOM));

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 9));
        assert_eq!(rows[1][0], subs[0].id.to_string());
        assert_eq!(rows[1][1], name);
        assert_eq!(rows[1][4], prediction);
        assert_eq!(rows[1][8], "A, then B");
        assert_eq!(rows[2][1], "Plain");
    }

    #[test]
    fn escape_rules() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\r\nlines"), "\"two\r\nlines\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn file_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        assert_eq!(export_file_name(date), "Report_2025-11-03.csv");
    }

    #[test]
    fn writes_report_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let path = write_csv_report(&[], &out).unwrap();
        assert!(path.starts_with(&out));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Report_") && name.ends_with(".csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with('\u{FEFF}'));
        assert_eq!(content.lines().count(), 1);
    }
}
