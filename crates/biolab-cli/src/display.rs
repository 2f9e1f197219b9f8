//! Console rendering of assessments and dashboards.

use comfy_table::{Cell, Table};

use biolab_core::aggregate::{category_score, DashboardSummary, NOT_AVAILABLE};
use biolab_core::model::{
    ClassAnalysisResult, CompetencyCategory, QuizResult, StudentSubmission,
};

fn bullets(title: &str, items: &[String]) {
    println!("{title}:");
    if items.is_empty() {
        println!("  (none)");
    }
    for item in items {
        println!("  - {item}");
    }
}

pub fn print_quiz_result(result: &QuizResult) {
    println!(
        "Quiz complete: {}/10, level {}. {}",
        result.score, result.level, result.details
    );
}

pub fn print_analysis(submission: &StudentSubmission) {
    let analysis = &submission.analysis;
    println!("\nAssessment for {}", submission.student_name);
    if let Some(quiz) = &submission.quiz_result {
        println!("Entry quiz: {} ({}/10)", quiz.level, quiz.score);
    }
    println!("\n{}\n", analysis.summary);

    let mut table = Table::new();
    table.set_header(vec!["Competency", "Score", "Feedback"]);
    for c in &analysis.competencies {
        table.add_row(vec![
            Cell::new(&c.name),
            Cell::new(c.score),
            Cell::new(&c.description),
        ]);
    }
    println!("{table}\n");

    bullets("Strengths", &analysis.strengths);
    bullets("Areas to improve", &analysis.weaknesses);

    if !analysis.learning_path.is_empty() {
        let mut path = Table::new();
        path.set_header(vec!["When", "Step", "Actions"]);
        for step in &analysis.learning_path {
            path.add_row(vec![
                Cell::new(&step.timeframe),
                Cell::new(format!("{}\n{}", step.title, step.description)),
                Cell::new(step.action_items.join("\n")),
            ]);
        }
        println!("\nLearning path:\n{path}");
    }
}

pub fn print_dashboard(summary: &DashboardSummary, submissions: &[StudentSubmission]) {
    println!("\nStudents: {}", summary.student_count);
    println!("Strongest competency: {}", summary.best);
    println!("Weakest competency: {}", summary.worst);

    if !summary.averages.is_empty() {
        let mut averages = Table::new();
        averages.set_header(vec!["Competency", "Class average"]);
        for c in &summary.averages {
            averages.add_row(vec![Cell::new(&c.name), Cell::new(c.score)]);
        }
        println!("{averages}");
    }

    if submissions.is_empty() {
        println!("No submissions yet.");
        return;
    }

    let mut table = Table::new();
    let mut header = vec!["#", "Name", "Submitted", "Quiz level"];
    header.extend(CompetencyCategory::ALL.iter().map(|c| c.label()));
    table.set_header(header);
    for (i, sub) in submissions.iter().enumerate() {
        let mut row = vec![
            Cell::new(i + 1),
            Cell::new(&sub.student_name),
            Cell::new(sub.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(
                sub.quiz_result
                    .as_ref()
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |q| q.level.to_string()),
            ),
        ];
        row.extend(CompetencyCategory::ALL.iter().map(|&c| {
            Cell::new(
                category_score(&sub.analysis, c)
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |s| s.to_string()),
            )
        }));
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_class_analysis(result: &ClassAnalysisResult) {
    println!("\nClass analysis\n\n{}\n", result.overall_assessment);
    bullets("Common misconceptions", &result.common_misconceptions);
    bullets("Recommended teaching strategies", &result.recommended_teaching_strategies);
}
