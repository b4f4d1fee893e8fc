//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use apolo_telemetry::core::config::Config;
use apolo_telemetry::logger::activity::spawn_logger;
use apolo_telemetry::logger::jsonl::JsonlConfig;
use apolo_telemetry::report::dashboard::render_tables;
use apolo_telemetry::report::store::ReportStore;
use apolo_telemetry::sim::scheduler::{CycleOutcome, SimulationScheduler};
use apolo_telemetry::sim::signals::ShutdownSignal;

/// Apollo telemetry simulator — periodic device-status generation,
/// aggregation, and archival.
#[derive(Debug, Parser)]
#[command(
    name = "aplsim",
    author,
    version,
    about = "Apollo Telemetry Simulator - mission device fleet",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the simulation loop until interrupted.
    Run(RunArgs),
    /// Execute exactly one simulation cycle and exit.
    Cycle,
    /// Read-only viewer over persisted report artifacts.
    Dashboard(DashboardArgs),
    /// View and validate configuration state.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Override the configured inter-cycle interval.
    #[arg(long, value_name = "SECONDS")]
    interval_secs: Option<u64>,
    /// Stop after this many completed cycles (default: run until signaled).
    #[arg(long, value_name = "N")]
    max_cycles: Option<u64>,
}

#[derive(Debug, Clone, Args, Default)]
struct DashboardArgs {
    /// List available report snapshots instead of rendering one.
    #[arg(long)]
    list: bool,
    /// Report snapshot to render (file name under the reports directory).
    /// Defaults to the most recent.
    #[arg(long, value_name = "NAME")]
    report: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_simulation(cli, args),
        Command::Cycle => run_single_cycle(cli),
        Command::Dashboard(args) => run_dashboard(cli, args),
        Command::Config(args) => run_config(cli, args),
    }
}

// ──────────────────── run ────────────────────

fn run_simulation(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;

    let (logger, logger_join) = spawn_logger(
        jsonl_config(&config),
        config.logging.channel_capacity,
    )
    .map_err(|e| CliError::Runtime(e.to_string()))?;

    let scheduler = SimulationScheduler::new(&config, logger.clone())
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    let interval = args
        .interval_secs
        .map_or(scheduler.interval(), Duration::from_secs);
    let handle = scheduler
        .run_with_interval(interval)
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let signal = ShutdownSignal::new();

    if output_mode(cli) == OutputMode::Human {
        println!(
            "{} interval {}s. Ctrl-C to stop.",
            "Simulation running.".green().bold(),
            interval.as_secs()
        );
    }

    let mut last_reported: u64 = 0;
    while !signal.should_shutdown() {
        let status = handle.status();
        if let Some(outcome) = &status.last_outcome {
            if outcome.cycle_id > last_reported {
                last_reported = outcome.cycle_id;
                if output_mode(cli) == OutputMode::Human {
                    println!(
                        "  ciclo {:>4}  {:<8}  generated {:>3}  archived {:>3}",
                        outcome.cycle_id, outcome.mission, outcome.generated, outcome.archived
                    );
                }
                if args.max_cycles.is_some_and(|max| outcome.cycle_id >= max) {
                    break;
                }
            }
        }
        if !handle.is_running() {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    handle.stop();
    logger.shutdown();
    let _ = logger_join.join();

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{} {last_reported} cycle(s) completed.", "Stopped.".bold());
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "run",
                "cycles_completed": last_reported,
            }))?;
        }
    }
    Ok(())
}

// ──────────────────── cycle ────────────────────

fn run_single_cycle(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;

    let (logger, logger_join) = spawn_logger(
        jsonl_config(&config),
        config.logging.channel_capacity,
    )
    .map_err(|e| CliError::Runtime(e.to_string()))?;

    let scheduler = SimulationScheduler::new(&config, logger.clone())
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    // Number the manual cycle after the snapshots already on disk so its
    // dashboard section doesn't collide with prior runs.
    let store = ReportStore::new(config.paths.reports_dir());
    let cycle_id = store
        .list_reports()
        .map_err(|e| CliError::Runtime(e.to_string()))?
        .len() as u64
        + 1;

    let result = scheduler.run_cycle(cycle_id);
    logger.shutdown();
    let _ = logger_join.join();

    let outcome = result.map_err(|e| CliError::Runtime(e.to_string()))?;
    match output_mode(cli) {
        OutputMode::Human => print_outcome_human(&outcome),
        OutputMode::Json => write_json_line(&outcome_json(&outcome))?,
    }
    Ok(())
}

fn print_outcome_human(outcome: &CycleOutcome) {
    println!("{}", format!("Ciclo {}", outcome.cycle_id).bold());
    println!("  Mission:    {}", outcome.mission);
    println!("  Generated:  {}", outcome.generated);
    println!("  Aggregated: {}", outcome.aggregated);
    if outcome.malformed > 0 {
        println!("  Malformed:  {}", outcome.malformed.to_string().yellow());
    }
    println!("  Archived:   {}", outcome.archived);
    if outcome.archive_failed > 0 {
        println!(
            "  Failed:     {}",
            outcome.archive_failed.to_string().red()
        );
    }
    println!("  Report:     {}", outcome.report_path.display());
}

fn outcome_json(outcome: &CycleOutcome) -> Value {
    json!({
        "command": "cycle",
        "cycle_id": outcome.cycle_id,
        "mission": outcome.mission,
        "generated": outcome.generated,
        "aggregated": outcome.aggregated,
        "malformed": outcome.malformed,
        "archived": outcome.archived,
        "archive_missing": outcome.archive_missing,
        "archive_failed": outcome.archive_failed,
        "report_path": outcome.report_path.to_string_lossy(),
    })
}

// ──────────────────── dashboard ────────────────────

fn run_dashboard(cli: &Cli, args: &DashboardArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let store = ReportStore::new(config.paths.reports_dir());

    let reports = store
        .list_reports()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    if args.list {
        match output_mode(cli) {
            OutputMode::Human => {
                if reports.is_empty() {
                    println!("No hay informes disponibles. El tablero está vacío.");
                } else {
                    for path in &reports {
                        println!("{}", path.file_name().unwrap_or_default().to_string_lossy());
                    }
                }
            }
            OutputMode::Json => {
                let names: Vec<String> = reports
                    .iter()
                    .map(|p| p.file_name().unwrap_or_default().to_string_lossy().into_owned())
                    .collect();
                write_json_line(&json!({ "command": "dashboard", "reports": names }))?;
            }
        }
        return Ok(());
    }

    let path = match &args.report {
        Some(name) => {
            let candidate = config.paths.reports_dir().join(name);
            if !candidate.exists() {
                return Err(CliError::User(format!("no such report: {name}")));
            }
            candidate
        }
        None => match reports.last() {
            Some(latest) => latest.clone(),
            None => {
                if output_mode(cli) == OutputMode::Human {
                    println!("No hay informes disponibles. El tablero está vacío.");
                    return Ok(());
                }
                return Err(CliError::User("no reports available".to_string()));
            }
        },
    };

    let analysis = store
        .load_report(&path)
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "{}",
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .bold()
                    .underline()
            );
            print!("{}", render_tables(&analysis));
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "dashboard",
                "report": path.file_name().unwrap_or_default().to_string_lossy(),
                "analysis": serde_json::to_value(&analysis)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match args.command.as_ref().unwrap_or(&ConfigCommand::Show) {
        ConfigCommand::Path => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(Config::default_path);
            match output_mode(cli) {
                OutputMode::Human => println!("{}", path.display()),
                OutputMode::Json => write_json_line(&json!({
                    "command": "config path",
                    "path": path.to_string_lossy(),
                }))?,
            }
            Ok(())
        }
        ConfigCommand::Show => {
            let config = load_config(cli)?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let rendered = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(e.to_string()))?;
                    print!("{rendered}");
                }
                OutputMode::Json => {
                    write_json_line(&serde_json::to_value(&config)?)?;
                }
            }
            Ok(())
        }
        ConfigCommand::Validate => match load_config(cli) {
            Ok(_) => {
                match output_mode(cli) {
                    OutputMode::Human => println!("{}", "Configuration OK".green()),
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "ok": true,
                    }))?,
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
    }
}

// ──────────────────── helpers ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::User(e.to_string()))
}

fn jsonl_config(config: &Config) -> JsonlConfig {
    JsonlConfig {
        path: config.paths.jsonl_log(),
        max_size_bytes: config.logging.max_size_bytes,
        max_rotated_files: config.logging.max_rotated_files,
        ..JsonlConfig::default()
    }
}

const fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
