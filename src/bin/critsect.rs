//! `critsect`: times the user-mode critical section against the native
//! recursive mutex (feature-gated).

use std::io::{self, Write};

use clap::{ArgAction, Args, Parser, Subcommand};
use critsect::bench::{self, LockKind, SharedLog};
use critsect::cli::{
    CliError, ExitCode, OutputFormat, UNOPTIMIZED_BUILD_WARNING, parse_output_format,
    render_comparison, render_run,
};
use critsect::config::{BackendKind, ConfigLoader, CritsectConfig, DriverProfile};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "critsect",
    version,
    about = "Compare a user-mode critical section with the native recursive mutex"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug, Default)]
struct CommonArgs {
    /// Output format: human, json, json-pretty
    #[arg(short = 'f', long = "format", global = true, value_parser = parse_output_format)]
    format: Option<OutputFormat>,

    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    verbosity: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the native lock, then the critical section (default)
    Compare(WorkloadArgs),
    /// Run a single lock
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Lock to time: native or custom
    #[arg(long = "lock", default_value = "custom")]
    lock: LockKind,

    #[command(flatten)]
    workload: WorkloadArgs,
}

#[derive(Args, Debug, Default)]
struct WorkloadArgs {
    /// Base workload: standard, quick, smoke
    #[arg(long = "profile", default_value = "standard")]
    profile: DriverProfile,

    /// Worker threads
    #[arg(long = "workers")]
    workers: Option<usize>,

    /// Iterations per worker
    #[arg(long = "iterations")]
    iterations: Option<u64>,

    /// Capacity of the shared log
    #[arg(long = "slots")]
    slots: Option<usize>,

    /// Pause between consistency scans, in milliseconds
    #[arg(long = "check-interval-ms")]
    check_interval_ms: Option<u64>,

    /// Wait backend of the critical section: parking, eventfd
    #[arg(long = "backend")]
    backend: Option<BackendKind>,

    /// Create the wait event up front instead of on first contention
    #[arg(long = "eager-event", action = ArgAction::SetTrue)]
    eager_event: bool,
}

impl WorkloadArgs {
    /// Profile, then `CRITSECT_*` environment, then these flags.
    fn load(&self) -> Result<CritsectConfig, CliError> {
        let mut loader = ConfigLoader::new().profile(self.profile);
        if let Some(workers) = self.workers {
            loader = loader.override_value("CRITSECT_WORKERS", workers.to_string());
        }
        if let Some(iterations) = self.iterations {
            loader = loader.override_value("CRITSECT_ITERATIONS", iterations.to_string());
        }
        if let Some(slots) = self.slots {
            loader = loader.override_value("CRITSECT_LOG_SLOTS", slots.to_string());
        }
        if let Some(ms) = self.check_interval_ms {
            loader = loader.override_value("CRITSECT_CHECK_INTERVAL_MS", ms.to_string());
        }
        if let Some(backend) = self.backend {
            loader = loader.override_value("CRITSECT_BACKEND", backend.as_str());
        }
        if self.eager_event {
            loader = loader.override_value("CRITSECT_EAGER_EVENT", "true");
        }
        Ok(loader.load()?)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.common.verbosity);
    let format = cli.common.format.unwrap_or_default();

    if cfg!(debug_assertions) && format == OutputFormat::Human {
        println!("{UNOPTIMIZED_BUILD_WARNING}\n");
    }

    let command = cli
        .command
        .unwrap_or_else(|| Command::Compare(WorkloadArgs::default()));
    if let Err(err) = run(&command, format) {
        let _ = write_cli_error(&err, format);
        std::process::exit(err.exit_code);
    }
    std::process::exit(ExitCode::SUCCESS);
}

fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "warn",
        1 => "critsect=info",
        2 => "critsect=debug",
        _ => "critsect=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(command: &Command, format: OutputFormat) -> Result<(), CliError> {
    match command {
        Command::Compare(workload) => {
            let config = workload.load()?;
            let report = bench::compare(&config.lock, &config.driver)?;
            emit(format, &report, || render_comparison(&report))
        }
        Command::Run(args) => {
            let config = args.workload.load()?;
            let log = SharedLog::new(config.driver.log_slots);
            let report = match args.lock {
                LockKind::Native => bench::run_native(&log, &config.driver)?,
                LockKind::Custom => bench::run_custom(&config.lock, &log, &config.driver)?,
            };
            emit(format, &report, || render_run(&report))
        }
    }
}

fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    human: impl FnOnce() -> String,
) -> Result<(), CliError> {
    let text = match format {
        OutputFormat::Human => human(),
        OutputFormat::Json => serde_json::to_string(value).map_err(internal)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value).map_err(internal)?,
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}").map_err(internal)
}

fn internal(err: impl std::fmt::Display) -> CliError {
    CliError::new("output_failed", "Failed to write report")
        .detail(err.to_string())
        .exit_code(ExitCode::INTERNAL_ERROR)
}

fn write_cli_error(err: &CliError, format: OutputFormat) -> io::Result<()> {
    let mut stderr = io::stderr();
    match format {
        OutputFormat::Human => write!(stderr, "{}", err.human_format()),
        OutputFormat::Json => writeln!(
            stderr,
            "{}",
            serde_json::to_string(err).unwrap_or_else(|_| err.title.clone())
        ),
        OutputFormat::JsonPretty => writeln!(
            stderr,
            "{}",
            serde_json::to_string_pretty(err).unwrap_or_else(|_| err.title.clone())
        ),
    }
}
