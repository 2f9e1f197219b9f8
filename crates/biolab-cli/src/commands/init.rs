//! The `biolab init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create biolab.toml
    if std::path::Path::new("biolab.toml").exists() {
        println!("biolab.toml already exists, skipping.");
    } else {
        std::fs::write("biolab.toml", SAMPLE_CONFIG)?;
        println!("Created biolab.toml");
    }

    // Create example form
    std::fs::create_dir_all("forms")?;
    let example_path = std::path::Path::new("forms/example.toml");
    if example_path.exists() {
        println!("forms/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_FORM)?;
        println!("Created forms/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY (or edit biolab.toml) and change teacher_passphrase");
    println!("  2. Run: biolab validate --input forms/example.toml");
    println!("  3. Run: biolab analyze --input forms/example.toml");
    println!("  4. Run: biolab session");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# biolab configuration

default_provider = "gemini"
default_model = "gemini-2.5-flash"
temperature = 0.7
max_tokens = 8192
teacher_passphrase = "teacher"
feedback_delay_ms = 1200

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"
"#;

const EXAMPLE_FORM: &str = r#"student_name = "Example Student"

[design]
bacteria_type = "E. coli"
temperature = "37°C"
ph = "7.0"
nutrient = "LB broth"
prediction = "The culture grows slowly at first, then doubles quickly before levelling off."

[data]
observation = "Optical density barely changed for two hours, then rose steeply."

[[data.points]]
time = "0h"
value = "0.05"

[[data.points]]
time = "2h"
value = "0.09"

[[data.points]]
time = "4h"
value = "0.42"

[application]
conclusion = "The curve shows a lag phase followed by exponential growth."
practical_app = "Milk left out of the fridge spoils faster because bacteria multiply quickly when warm."
"#;
