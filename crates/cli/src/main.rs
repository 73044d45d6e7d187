//! EduPilot CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Write the default config
//! - `schedule` — Resolve the effective mode and material decision for a date
//! - `intent`   — Decide today's teaching intent for a learner fixture
//! - `run`      — Run the full orchestration loop against the model

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "edupilot",
    about = "EduPilot — adaptive teaching decisions for young learners",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Onboard,

    /// Show how a date and material type are handled
    Schedule {
        /// Learning period: school, vacation or exam_prep
        #[arg(short, long, default_value = "school")]
        period: String,

        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Material type, e.g. textbook_lesson or completed_exam
        #[arg(short, long)]
        material: Option<String>,
    },

    /// Decide today's teaching intent for a learner
    Intent {
        /// Learner fixture JSON
        #[arg(short, long)]
        fixture: PathBuf,

        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Caregiver signal kind: emotion_report, schedule_change or other
        #[arg(long)]
        caregiver_kind: Option<String>,

        /// Caregiver note text
        #[arg(long)]
        caregiver_note: Option<String>,
    },

    /// Run the orchestration loop for a learner
    Run {
        /// Learner fixture JSON
        #[arg(short, long)]
        fixture: PathBuf,

        /// daily_plan, process_material, essay_feedback or consult
        #[arg(short, long, default_value = "daily_plan")]
        task: String,

        /// Message from the caregiver
        #[arg(short, long)]
        message: Option<String>,

        /// Text attachment; may be repeated
        #[arg(short, long)]
        attachment: Vec<PathBuf>,

        /// Material type of the attachments
        #[arg(long)]
        material: Option<String>,

        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Schedule {
            period,
            date,
            material,
        } => commands::schedule::run(&period, date.as_deref(), material.as_deref()).await?,
        Commands::Intent {
            fixture,
            date,
            caregiver_kind,
            caregiver_note,
        } => {
            commands::intent::run(&fixture, date.as_deref(), caregiver_kind, caregiver_note).await?
        }
        Commands::Run {
            fixture,
            task,
            message,
            attachment,
            material,
            date,
        } => {
            commands::run::run(commands::run::RunArgs {
                fixture,
                task,
                message,
                attachments: attachment,
                material,
                date,
            })
            .await?
        }
    }

    Ok(())
}
