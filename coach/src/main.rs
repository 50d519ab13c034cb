//! Verified feedback generation CLI.
//!
//! Classifies two evaluation scores, routes to a feedback strategy, and runs
//! the generate/verify/retry loop against the configured model backend.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use coach::core::level::classify;
use coach::core::route::route;
use coach::core::types::EvaluationInput;
use coach::exit_codes;
use coach::io::config::{CoachConfig, DEFAULT_CONFIG_PATH, load_config, write_config};
use coach::logging;
use coach::orchestrate::{InvalidInputError, LlmOrchestrator};

#[derive(Parser)]
#[command(
    name = "coach",
    version,
    about = "Verified feedback for resume and self-introduction evaluations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one feedback request and print the result as JSON.
    Run {
        /// Resume evaluation text, or `@path` to read it from a file.
        #[arg(long)]
        resume_eval: String,
        /// Self-introduction evaluation text, or `@path` to read it from a file.
        #[arg(long)]
        self_intro_eval: String,
        #[arg(long, allow_hyphen_values = true)]
        resume_score: i64,
        #[arg(long, allow_hyphen_values = true)]
        self_intro_score: i64,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Print the level of a score.
    Classify {
        #[arg(allow_hyphen_values = true)]
        score: i64,
    },
    /// Print the branch chosen for a pair of scores.
    Route {
        #[arg(allow_hyphen_values = true)]
        resume_score: i64,
        #[arg(allow_hyphen_values = true)]
        self_intro_score: i64,
    },
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    logging::init("coach=info");
    let code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            resume_eval,
            self_intro_eval,
            resume_score,
            self_intro_score,
            config,
        } => {
            let input = EvaluationInput::new(
                read_text_arg(&resume_eval)?,
                read_text_arg(&self_intro_eval)?,
                resume_score,
                self_intro_score,
            );
            cmd_run(input, &config).await
        }
        Command::Classify { score } => {
            println!("{}", classify(score).as_str());
            Ok(exit_codes::OK)
        }
        Command::Route {
            resume_score,
            self_intro_score,
        } => {
            println!(
                "{}",
                route(classify(resume_score), classify(self_intro_score)).as_str()
            );
            Ok(exit_codes::OK)
        }
        Command::Init { force, config } => cmd_init(&config, force),
    }
}

async fn cmd_run(input: EvaluationInput, config_path: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let orchestrator = LlmOrchestrator::from_config(&cfg)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let outcome = match orchestrator.run(input, &cancel).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Some(invalid) = err.downcast_ref::<InvalidInputError>() {
                eprintln!("invalid input: {invalid}");
                return Ok(exit_codes::INVALID);
            }
            return Err(err);
        }
    };

    let payload =
        serde_json::to_string_pretty(&outcome.result).context("serialize feedback result")?;
    println!("{payload}");
    Ok(if outcome.result.is_fail() {
        exit_codes::FAILED
    } else {
        exit_codes::OK
    })
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &CoachConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

/// Inline text, or the contents of the file named after a leading `@`.
fn read_text_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("read {path}")),
        None => Ok(value.to_string()),
    }
}
