pub mod collect;
pub mod config;
pub mod execute;
pub mod graph;
pub mod group;
pub mod handler;
pub mod model;
pub mod name;
pub mod planner;
pub mod reporter;
pub mod scan;
pub mod template;
pub mod transaction;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

pub use collect::Collector;
pub use config::GatherConfig;
pub use execute::execute_plan;
pub use handler::{Handler, NoOpHandler};
pub use model::{
    Ambiguity, AmbiguityBehavior, CancelReason, Direction, GatherResult, NameInfo, PlanEntry,
    RollbackBehavior, Sequence, SharedDirectoryBehavior, EXIT_CODE_FAILED_ROLLBACK,
};
pub use name::parse_name;
pub use planner::{build_plan, build_plan_report, write_plan_report, Plan, PlanReport};
pub use reporter::LogReporter;
pub use scan::{expand_paths, ScanError, ScanOptions, ScanOutput};
pub use template::{DirTemplate, TemplateError, DEFAULT_DIR_TEMPLATE};
pub use transaction::{
    Action, DryRun, FilesystemTransaction, RollbackError, TransactionError, Transactor,
};

#[derive(Debug, Error)]
pub enum GatherError {
    #[error(transparent)]
    Config(#[from] anyhow::Error),
    #[error("invalid directory template: {0}")]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Rollback(#[from] RollbackError),
}

/// Validates `config`, collects `paths` and builds the plan without touching the filesystem.
pub fn prepare<I, P>(
    paths: I,
    config: &GatherConfig,
    handler: &mut dyn Handler,
) -> Result<Plan, GatherError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    config.validate()?;
    let template = DirTemplate::parse(&config.dir_template)?;

    let mut collector = Collector::new();
    let candidates = collector.collect_all(paths);
    debug!("collected {candidates} numbered file(s)");

    Ok(build_plan(&collector, &template, config, handler))
}

/// Carries out `plan`. A cancelled plan never reaches the filesystem; in a dry
/// run it is still previewed so the handler sees every step.
pub fn apply(
    plan: &Plan,
    config: &GatherConfig,
    handler: &mut dyn Handler,
) -> Result<GatherResult, RollbackError> {
    if config.dry_run {
        let result = execute_plan(plan, &mut DryRun, config.rollback_behavior, handler)?;
        return Ok(if plan.is_cancelled() {
            GatherResult::Cancel
        } else {
            result
        });
    }

    if plan.is_cancelled() {
        info!("nothing was moved");
        return Ok(GatherResult::Cancel);
    }

    let mut transaction = FilesystemTransaction::new();
    execute_plan(plan, &mut transaction, config.rollback_behavior, handler)
}

/// Plans and applies in one step.
pub fn gather<I, P>(
    paths: I,
    config: &GatherConfig,
    handler: &mut dyn Handler,
) -> Result<GatherResult, GatherError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let plan = prepare(paths, config, handler)?;
    Ok(apply(&plan, config, handler)?)
}
