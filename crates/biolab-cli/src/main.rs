//! The `biolab` binary: quiz, assessment and classroom session commands.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

#[derive(Parser)]
#[command(
    name = "biolab",
    version,
    about = "AI-assisted competency assessment for the bacteria-growth lab project"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and an example submission form
    Init,

    /// Check a submission form for errors and gaps
    Validate {
        /// Path to the form TOML file
        #[arg(long)]
        input: PathBuf,
    },

    /// Assess one submission form and print the result
    Analyze {
        /// Path to the form TOML file
        #[arg(long)]
        input: PathBuf,

        /// Photo of the growth curve or petri dish
        #[arg(long)]
        image: Option<PathBuf>,

        /// Entry quiz score (0-10) used to calibrate the feedback
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=10))]
        quiz_score: Option<u32>,

        /// Also write an HTML report to this path
        #[arg(long)]
        html: Option<PathBuf>,

        /// Provider name from the config (default: default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Start an interactive classroom session
    Session {
        /// Provider name from the config (default: default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Directory CSV exports are written to
        #[arg(long, default_value = ".")]
        export_dir: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "biolab=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { input } => commands::validate::execute(input),
        Commands::Analyze {
            input,
            image,
            quiz_score,
            html,
            provider,
            model,
            config,
        } => {
            commands::analyze::execute(commands::analyze::AnalyzeArgs {
                input,
                image,
                quiz_score,
                html,
                provider,
                model,
                config,
            })
            .await
        }
        Commands::Session {
            provider,
            model,
            export_dir,
            config,
        } => commands::session::execute(provider, model, export_dir, config).await,
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
