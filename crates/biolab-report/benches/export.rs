use criterion::{black_box, criterion_group, criterion_main, Criterion};

use biolab_core::model::{
    AnalysisResult, Competency, CompetencyCategory, LearningPathItem, QuizResult,
    StudentSubmission, SubmissionForm,
};
use biolab_report::csv::export_csv_in;
use biolab_report::html::generate_html;
use chrono::Utc;

fn make_submission(i: usize) -> StudentSubmission {
    let mut form = SubmissionForm {
        student_name: format!("Student {i}, class 7A"),
        ..Default::default()
    };
    form.design.prediction = "Growth doubles every \"20 minutes\"".into();
    let analysis = AnalysisResult {
        summary: String::new(),
        competencies: CompetencyCategory::ALL
            .iter()
            .map(|c| Competency {
                name: c.label().to_string(),
                score: (i % 100) as f64,
                description: String::new(),
            })
            .collect(),
        strengths: vec![],
        weaknesses: vec![],
        learning_path: (1..=3)
            .map(|w| LearningPathItem {
                timeframe: format!("Week {w}"),
                title: format!("Step {w}"),
                description: String::new(),
                action_items: vec![],
            })
            .collect(),
    };
    StudentSubmission::new(form, Some(QuizResult::from_score((i % 11) as u32)), analysis)
}

fn bench_csv(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_csv");

    for size in [30, 300] {
        let subs: Vec<_> = (0..size).map(make_submission).collect();
        group.bench_function(format!("n={size}"), |b| {
            b.iter(|| export_csv_in(black_box(&subs), &Utc))
        });
    }

    group.finish();
}

fn bench_html(c: &mut Criterion) {
    let sub = make_submission(7);
    c.bench_function("generate_html", |b| b.iter(|| generate_html(black_box(&sub))));
}

criterion_group!(benches, bench_csv, bench_html);
criterion_main!(benches);
