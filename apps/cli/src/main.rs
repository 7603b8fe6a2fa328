//! Astrea CLI - evaluate and check chart formulas
//!
//! Thin front end over the formula engine. Exit codes: 0 on success, 2
//! when the validator rejects the formula, 3 on a lex/parse error, 4 on an
//! internal (evaluation) error.

use anyhow::Context;
use astrea_chart::{Chart, DignityConfig, Mode};
use astrea_formula::{Engine, Error as FormulaError, Validation};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_REJECTED: u8 = 2;
const EXIT_PARSE_ERROR: u8 = 3;
const EXIT_INTERNAL: u8 = 4;

#[derive(Parser)]
#[command(name = "astrea", about = "Evaluate formulas against natal charts", version)]
struct Cli {
    /// Dignity configuration document (JSON); built-ins are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rulership mode for the built-in configuration: traditional | modern
    #[arg(long, global = true)]
    mode: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, validate and evaluate a formula against a chart
    Eval {
        /// Formula text, e.g. "Sun.Sign == Aries AND Moon.House == 7"
        #[arg(long)]
        formula: String,

        /// Chart document (JSON boundary schema)
        #[arg(long)]
        chart: PathBuf,
    },
    /// Parse and validate a formula, printing diagnostics as JSON lines
    Check {
        #[arg(long)]
        formula: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(error = %error, "command failed");
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref(), cli.mode.as_deref())?;
    let engine = Engine::new(Arc::new(config));

    match cli.command {
        Command::Eval { formula, chart } => {
            let chart = load_chart(&chart)?;
            match engine.run(&formula, &chart) {
                Ok(outcome) => {
                    print_diagnostics(&outcome.validation)?;
                    match outcome.value {
                        Some(value) => {
                            println!("{value}");
                            Ok(ExitCode::SUCCESS)
                        }
                        None => {
                            tracing::warn!(
                                errors = outcome.validation.error_count(),
                                "formula rejected"
                            );
                            Ok(ExitCode::from(EXIT_REJECTED))
                        }
                    }
                }
                Err(error) => Ok(report_error(&error)),
            }
        }
        Command::Check { formula } => match engine.check(&formula) {
            Ok(validation) => {
                print_diagnostics(&validation)?;
                if validation.is_fatal() {
                    Ok(ExitCode::from(EXIT_REJECTED))
                } else {
                    Ok(ExitCode::SUCCESS)
                }
            }
            Err(error) => Ok(report_error(&error)),
        },
    }
}

fn load_config(path: Option<&std::path::Path>, mode: Option<&str>) -> anyhow::Result<DignityConfig> {
    if let Some(path) = path {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        return DignityConfig::from_reader(file)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let mode = match mode {
        Some(text) => text
            .parse::<Mode>()
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        None => Mode::Modern,
    };
    Ok(DignityConfig::for_mode(mode))
}

fn load_chart(path: &std::path::Path) -> anyhow::Result<Chart> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read chart {}", path.display()))?;
    let chart =
        Chart::from_json_str(&text).with_context(|| format!("invalid chart {}", path.display()))?;
    chart
        .validate()
        .with_context(|| format!("inconsistent chart {}", path.display()))?;
    Ok(chart)
}

/// Diagnostics go to stderr as JSON lines so stdout stays machine-readable.
fn print_diagnostics(validation: &Validation) -> anyhow::Result<()> {
    for issue in &validation.issues {
        eprintln!("{}", serde_json::to_string(issue)?);
    }
    Ok(())
}

fn report_error(error: &FormulaError) -> ExitCode {
    tracing::error!(error = %error, "formula error");
    if error.is_syntax_error() {
        ExitCode::from(EXIT_PARSE_ERROR)
    } else {
        ExitCode::from(EXIT_INTERNAL)
    }
}
