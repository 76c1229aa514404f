use tracing::{debug, warn};

use crate::handler::Handler;
use crate::model::{GatherResult, PlanEntry, RollbackBehavior};
use crate::planner::Plan;
use crate::transaction::{RollbackError, TransactionError, Transactor};

/// Runs every plan entry through `transactor`, rolling back at the configured
/// granularity when an action fails.
///
/// A failed rollback is the only fatal outcome and is returned as `Err` after
/// the handler has seen it; no further entries are attempted.
pub fn execute_plan(
    plan: &Plan,
    transactor: &mut dyn Transactor,
    rollback_behavior: RollbackBehavior,
    handler: &mut dyn Handler,
) -> Result<GatherResult, RollbackError> {
    let total = plan.entries.len();
    let mut rollbacks = 0usize;

    for (position, entry) in plan.entries.iter().enumerate() {
        let Err(error) = move_entry(entry, transactor, rollback_behavior, handler) else {
            continue;
        };

        warn!("{} failed: {error}", entry.directory.display());
        handler.before_rollback(&error);
        if let Err(rollback_error) = transactor.rollback() {
            handler.rollback_error(&rollback_error);
            return Err(rollback_error);
        }
        handler.after_rollback();

        match rollback_behavior {
            RollbackBehavior::PerSet => rollbacks += 1,
            RollbackBehavior::WholeRun => {
                handler.plan_execution_complete(total, position + 1);
                return Ok(GatherResult::ErrorFullRollback);
            }
        }
    }

    handler.plan_execution_complete(total, rollbacks);
    debug!("executed {total} entr(ies), {rollbacks} rolled back");

    Ok(if rollbacks == 0 {
        GatherResult::Ok
    } else if rollbacks == total {
        GatherResult::ErrorFullRollback
    } else {
        GatherResult::ErrorPartialRollback
    })
}

fn move_entry(
    entry: &PlanEntry,
    transactor: &mut dyn Transactor,
    rollback_behavior: RollbackBehavior,
    handler: &mut dyn Handler,
) -> Result<(), TransactionError> {
    handler.before_sequence_move(&entry.directory);
    transactor.make_dirs(&entry.directory)?;

    for path in &entry.paths {
        let target = match path.file_name() {
            Some(file_name) => entry.directory.join(file_name),
            None => entry.directory.join(path),
        };
        handler.before_file_move(path, &target);
        transactor.move_file(path, &target)?;
    }

    if rollback_behavior == RollbackBehavior::PerSet {
        transactor.commit();
    }
    handler.after_sequence_move(&entry.directory);
    Ok(())
}
