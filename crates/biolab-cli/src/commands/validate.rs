//! The `biolab validate` command.

use std::path::PathBuf;

use anyhow::Result;

use biolab_core::parser::{parse_form, validate_form};

pub fn execute(input: PathBuf) -> Result<()> {
    let form = parse_form(&input)?;
    println!(
        "Form: {} ({} data points)",
        form.student_name,
        form.data.data_points.len()
    );

    let warnings = validate_form(&form)?;
    for w in &warnings {
        println!("  [{}] WARNING: {}", w.field, w.message);
    }

    if warnings.is_empty() {
        println!("Form is valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
