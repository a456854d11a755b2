//! `coursecal` CLI: turn a normalized course plan into a dated course calendar.
//!
//! ## Usage
//!
//! ```sh
//! # Build the calendar JSON (plan from stdin, calendar to stdout)
//! cat plan.json | coursecal build
//!
//! # From a YAML plan to a file, failing when anything could not be scheduled
//! coursecal build -i plan.yaml -o calendar.json --strict
//!
//! # Only report whether the plan schedules cleanly
//! coursecal check -i plan.yaml
//!
//! # More logging
//! RUST_LOG=course_calendar=debug coursecal build -i plan.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use course_calendar::{build_schedule, CoursePlan, ScheduleOutcome};
use std::io::{self, Read};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "coursecal",
    version,
    about = "Course calendar builder: meeting slots, topic packing and exam dates"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "error")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the calendar JSON for a plan
    Build {
        /// Plan file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Plan format; inferred from the input extension when omitted
        #[arg(long, value_enum)]
        format: Option<PlanFormat>,
        /// Exit with status 1 when any warning was produced
        #[arg(long)]
        strict: bool,
    },
    /// Schedule a plan and report warnings without writing the calendar
    Check {
        /// Plan file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Plan format; inferred from the input extension when omitted
        #[arg(long, value_enum)]
        format: Option<PlanFormat>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlanFormat {
    Json,
    Yaml,
}

impl PlanFormat {
    /// `.yaml`/`.yml` files are YAML; everything else, including stdin, is JSON.
    fn infer(path: Option<&str>) -> Self {
        let extension = path
            .and_then(|p| Path::new(p).extension())
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Build {
            input,
            output,
            format,
            strict,
        } => {
            let outcome = schedule(input.as_deref(), format)?;
            let json = serde_json::to_string_pretty(&outcome.schedule)
                .context("Failed to serialize schedule")?;
            write_output(output.as_deref(), &json)?;
            report_warnings(&outcome);
            if strict && outcome.has_warnings() {
                process::exit(1);
            }
        }
        Commands::Check { input, format } => {
            let outcome = schedule(input.as_deref(), format)?;
            report_warnings(&outcome);
            if outcome.has_warnings() {
                println!("{} warning(s)", outcome.warnings.len());
                process::exit(1);
            }
            println!(
                "OK: {} rows, {} exams dated",
                outcome.schedule.rows.len(),
                outcome.schedule.exam_dates.len()
            );
        }
    }

    Ok(())
}

/// Install a stderr fmt subscriber. `RUST_LOG` wins over `--log-level`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .try_init();
}

/// Load the plan, validate its timezone and run the scheduler.
fn schedule(input: Option<&str>, format: Option<PlanFormat>) -> Result<ScheduleOutcome> {
    let text = read_input(input)?;
    let format = format.unwrap_or_else(|| PlanFormat::infer(input));
    let plan = parse_plan(&text, format)?;
    plan.term.zone().context("Invalid term timezone")?;
    tracing::debug!(
        sections = plan.sections.len(),
        topics = plan.topics.len(),
        "plan loaded"
    );
    build_schedule(&plan).context("Failed to build schedule")
}

fn parse_plan(text: &str, format: PlanFormat) -> Result<CoursePlan> {
    match format {
        PlanFormat::Json => CoursePlan::from_json_str(text).context("Failed to parse JSON plan"),
        PlanFormat::Yaml => serde_yaml::from_str(text).context("Failed to parse YAML plan"),
    }
}

fn report_warnings(outcome: &ScheduleOutcome) {
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
