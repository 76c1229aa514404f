use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use gather_core::{
    apply, build_plan_report, expand_paths, prepare, write_plan_report, AmbiguityBehavior,
    GatherConfig, LogReporter, RollbackBehavior, ScanOptions, SharedDirectoryBehavior,
    EXIT_CODE_FAILED_ROLLBACK,
};
use tracing::{error, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gather",
    version,
    about = "Detect sets of files named with incrementing numbers, and move each set into its own new directory."
)]
struct Cli {
    /// Files to gather.
    #[arg(value_name = "PATHS", required = true)]
    paths: Vec<PathBuf>,

    /// Scan the contents of directories given on the command line as well.
    #[arg(short, long)]
    recurse: bool,

    /// Template for naming new directories. Tokens: {path_prefix}, {name_prefix},
    /// {suffix}, {first}, {last}, {field}.
    #[arg(short = 'd', long = "dir", value_name = "TEMPLATE")]
    dir_template: Option<String>,

    /// Ignore sequences with fewer than COUNT files [default: 3].
    #[arg(short = 'm', long = "min", value_name = "COUNT")]
    min_sequence_length: Option<usize>,

    /// Handling of files that could belong to more than one sequence [default: report].
    #[arg(short = 'a', long, value_name = "ACTION")]
    ambiguities: Option<CliAmbiguityBehavior>,

    /// Handling of sequences that would share a new directory [default: allow].
    #[arg(short = 's', long, value_name = "ACTION")]
    shared: Option<CliSharedBehavior>,

    /// On error, roll back every change (`all`) or only the failing set (`set`) [default: all].
    #[arg(long, value_name = "ACTION")]
    rollback: Option<CliRollbackBehavior>,

    /// List proposed changes without making them.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Increase logging level.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease logging level.
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,

    /// Skip files whose name matches GLOB (repeatable).
    #[arg(long = "exclude", value_name = "GLOB", action = ArgAction::Append)]
    exclude: Vec<String>,

    /// JSON configuration file; command-line options take precedence.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the computed plan as JSON.
    #[arg(long, value_name = "FILE")]
    plan_output: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliAmbiguityBehavior {
    Ignore,
    Report,
    Cancel,
}

impl From<CliAmbiguityBehavior> for AmbiguityBehavior {
    fn from(value: CliAmbiguityBehavior) -> Self {
        match value {
            CliAmbiguityBehavior::Ignore => AmbiguityBehavior::Ignore,
            CliAmbiguityBehavior::Report => AmbiguityBehavior::Report,
            CliAmbiguityBehavior::Cancel => AmbiguityBehavior::Cancel,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliSharedBehavior {
    Allow,
    Skip,
    Cancel,
}

impl From<CliSharedBehavior> for SharedDirectoryBehavior {
    fn from(value: CliSharedBehavior) -> Self {
        match value {
            CliSharedBehavior::Allow => SharedDirectoryBehavior::Allow,
            CliSharedBehavior::Skip => SharedDirectoryBehavior::Skip,
            CliSharedBehavior::Cancel => SharedDirectoryBehavior::Cancel,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum CliRollbackBehavior {
    #[value(alias = "per-set")]
    Set,
    #[value(alias = "whole-run")]
    All,
}

impl From<CliRollbackBehavior> for RollbackBehavior {
    fn from(value: CliRollbackBehavior) -> Self {
        match value {
            CliRollbackBehavior::Set => RollbackBehavior::PerSet,
            CliRollbackBehavior::All => RollbackBehavior::WholeRun,
        }
    }
}

const LOG_LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];
const DEFAULT_LOG_LEVEL_INDEX: usize = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;

    let scan = expand_paths(
        &cli.paths,
        &ScanOptions {
            recurse: cli.recurse,
            excludes: cli.exclude.clone(),
        },
    )?;
    for warning in &scan.warnings {
        warn!("{warning}");
    }

    let mut reporter = LogReporter::new(&config);
    let plan = prepare(&scan.paths, &config, &mut reporter).context("failed to plan")?;

    if let Some(path) = &cli.plan_output {
        write_plan_report(&build_plan_report(&plan, &config), path)?;
    }

    match apply(&plan, &config, &mut reporter) {
        Ok(result) => Ok(ExitCode::from(result.exit_code())),
        // the reporter has already listed the commands left to run by hand
        Err(_) => Ok(ExitCode::from(EXIT_CODE_FAILED_ROLLBACK)),
    }
}

fn load_config(cli: &Cli) -> Result<GatherConfig> {
    let mut config = match &cli.config {
        Some(path) => GatherConfig::from_json_file(path)?,
        None => GatherConfig::default(),
    };

    if let Some(template) = &cli.dir_template {
        config.dir_template = template.clone();
    }
    if let Some(min) = cli.min_sequence_length {
        config.min_sequence_length = min;
    }
    if let Some(behavior) = cli.ambiguities {
        config.ambiguity_behavior = behavior.into();
    }
    if let Some(behavior) = cli.shared {
        config.shared_directory_behavior = behavior.into();
    }
    if let Some(behavior) = cli.rollback {
        config.rollback_behavior = behavior.into();
    }
    if cli.dry_run {
        config.dry_run = true;
    }

    config.validate()?;
    Ok(config)
}

fn decide_log_level(verbose: u8, quiet: u8) -> Level {
    let index = (DEFAULT_LOG_LEVEL_INDEX + usize::from(verbose))
        .saturating_sub(usize::from(quiet))
        .min(LOG_LEVELS.len() - 1);
    LOG_LEVELS[index]
}

fn init_tracing(verbose: u8, quiet: u8) {
    let level = decide_log_level(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .try_init();
}
