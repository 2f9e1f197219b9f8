//! HTML analysis report.
//!
//! Produces a self-contained HTML file (CSS inlined) for one assessed
//! submission: competency bars, strengths, weaknesses and the learning path.

use anyhow::Result;
use std::path::Path;

use biolab_core::model::{Competency, StudentSubmission};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn bullet_list(html: &mut String, class: &str, items: &[String]) {
    if items.is_empty() {
        html.push_str("<p class=\"meta\">None listed.</p>\n");
        return;
    }
    html.push_str(&format!("<ul class=\"{class}\">\n"));
    for item in items {
        html.push_str(&format!("<li>{}</li>\n", html_escape(item)));
    }
    html.push_str("</ul>\n");
}

/// Generate the HTML report for one submission.
pub fn generate_html(submission: &StudentSubmission) -> String {
    let analysis = &submission.analysis;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>BioLab report: {}</title>\n",
        html_escape(&submission.student_name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>{}</h1>\n",
        html_escape(&submission.student_name)
    ));
    let quiz = match &submission.quiz_result {
        Some(q) => format!("Entry quiz: <strong>{}</strong> ({}/10)", q.level, q.score),
        None => "Entry quiz: N/A".to_string(),
    };
    html.push_str(&format!(
        "<p class=\"meta\">{} | {} | Submitted {}</p>\n",
        quiz,
        html_escape(&submission.design.bacteria_type),
        submission.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Summary and competencies
    html.push_str("<section class=\"summary\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str(&format!("<p>{}</p>\n", html_escape(&analysis.summary)));
    if !analysis.competencies.is_empty() {
        html.push_str(&competency_chart(&analysis.competencies));
        html.push_str("<table>\n<thead><tr><th>Competency</th><th>Score</th><th>Feedback</th></tr></thead>\n<tbody>\n");
        for c in &analysis.competencies {
            html.push_str(&format!(
                "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>\n",
                html_escape(&c.name),
                score_class(c.score),
                c.score,
                html_escape(&c.description)
            ));
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str("</section>\n");

    html.push_str("<section class=\"feedback\">\n");
    html.push_str("<h2>Strengths</h2>\n");
    bullet_list(&mut html, "strengths", &analysis.strengths);
    html.push_str("<h2>Areas to improve</h2>\n");
    bullet_list(&mut html, "weaknesses", &analysis.weaknesses);
    html.push_str("</section>\n");

    // Learning path
    html.push_str("<section class=\"learning-path\">\n");
    html.push_str("<h2>Learning path</h2>\n");
    html.push_str("<ol>\n");
    for step in &analysis.learning_path {
        html.push_str(&format!(
            "<li><span class=\"timeframe\">{}</span> <strong>{}</strong>\n<p>{}</p>\n",
            html_escape(&step.timeframe),
            html_escape(&step.title),
            html_escape(&step.description)
        ));
        if !step.action_items.is_empty() {
            html.push_str("<ul>\n");
            for action in &step.action_items {
                html.push_str(&format!("<li>{}</li>\n", html_escape(action)));
            }
            html.push_str("</ul>\n");
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ol>\n</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(submission).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(submission: &StudentSubmission, path: &Path) -> Result<()> {
    let html = generate_html(submission);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn score_class(score: f64) -> &'static str {
    if score >= 80.0 {
        "good"
    } else if score >= 50.0 {
        "fair"
    } else {
        "weak"
    }
}

fn competency_chart(competencies: &[Competency]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let total_height = competencies.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, c) in competencies.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let fraction = (c.score / 100.0).clamp(0.0, 1.0);
        let width = (fraction * max_width as f64) as usize;

        let color = match score_class(c.score) {
            "good" => "#22c55e",
            "fair" => "#eab308",
            _ => "#ef4444",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&c.name)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            c.score
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --good: #dcfce7; --fair: #fef9c3; --weak: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --good: #064e3b; --fair: #713f12; --weak: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); max-width: 960px; }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; vertical-align: top; }
th { background: var(--border); }
.good { background: var(--good); }
.fair { background: var(--fair); }
.weak { background: var(--weak); }
.timeframe { font-size: 0.8rem; text-transform: uppercase; color: #6b7280; }
.learning-path li { margin-bottom: 1rem; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;
