//! # Sheet Grader CLI (`grader`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `grader init` | Create the SQLite database and schema |
//! | `grader grade <image>` | Grade one answer sheet |
//! | `grader history list` | List past grading runs, most recent first |
//! | `grader history show <id>` | Show one grading run |
//! | `grader history clear` | Delete all grading history |
//! | `grader serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! grader grade sheet.jpg --key-file key.json --threshold 0.75
//! grader grade sheet.jpg --key Paris --key Newton --answers paris Newtown
//! grader history list --limit 5
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `sheet_grader=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sheet_grader::{config, grade, history, migrate, server};

/// Sheet Grader: grade scanned answer sheets with fuzzy matching.
#[derive(Parser)]
#[command(
    name = "grader",
    about = "Sheet Grader: grade scanned answer sheets against an answer key",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// If the file does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/grader.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the history database. Safe to run more than once.
    Init,

    /// Grade one answer sheet and record it in history.
    Grade {
        /// Image reference of the scanned sheet.
        image: String,

        /// Expected answer; repeat once per question, in order.
        #[arg(long = "key", conflicts_with = "key_file")]
        key: Vec<String>,

        /// Answer key file: JSON list, `{"answers": [...]}`, or one answer per line.
        #[arg(long)]
        key_file: Option<PathBuf>,

        /// Minimum similarity to pass, 0.0 to 1.0. Defaults to `[grading].default_threshold`.
        #[arg(long)]
        threshold: Option<f64>,

        /// Use these answers instead of running extraction.
        #[arg(long, num_args = 0..)]
        answers: Option<Vec<String>>,

        /// Also write the grading record as JSON to this file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the record as JSON instead of a report.
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear grading history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List grading runs, most recent first.
    List {
        /// Show at most this many runs.
        #[arg(long)]
        limit: Option<usize>,
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show one grading run.
    Show {
        /// Record ID.
        id: String,
        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete every grading run.
    Clear,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheet_grader=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: &std::path::Path) -> anyhow::Result<config::Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(config::Config::minimal())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Grade {
            image,
            key,
            key_file,
            threshold,
            answers,
            output,
            json,
        } => {
            let answer_key = match key_file {
                Some(path) => grade::load_answer_key_file(&path)?,
                None => key,
            };
            grade::run_grade(
                &cfg,
                grade::GradeOptions {
                    image: &image,
                    answer_key,
                    threshold,
                    answers,
                    output: output.as_deref(),
                    json,
                },
            )
            .await?;
        }
        Commands::History { action } => match action {
            HistoryAction::List { limit, json } => {
                history::run_history_list(&cfg, limit, json).await?;
            }
            HistoryAction::Show { id, json } => {
                history::run_history_show(&cfg, &id, json).await?;
            }
            HistoryAction::Clear => {
                history::run_history_clear(&cfg).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
