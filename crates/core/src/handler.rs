use std::collections::BTreeSet;
use std::path::Path;

use crate::model::{Ambiguity, CancelReason, Sequence};
use crate::planner::Plan;
use crate::transaction::{RollbackError, TransactionError};

/// Notification points raised while planning and executing a run.
///
/// Every method defaults to doing nothing, so implementors only override what
/// they present.
pub trait Handler {
    fn handle_ambiguities(&mut self, _ambiguities: &[Ambiguity]) {}

    fn handle_rejected_sequences(&mut self, _sequences: &[Sequence]) {}

    fn handle_shared_sequences(&mut self, _directory: &Path, _sequences: &[Sequence]) {}

    fn handle_cancel_reasons(&mut self, _reasons: &BTreeSet<CancelReason>) {}

    fn plan_generation_complete(&mut self, _plan: &Plan) {}

    fn before_sequence_move(&mut self, _directory: &Path) {}

    fn before_file_move(&mut self, _from: &Path, _to: &Path) {}

    fn after_sequence_move(&mut self, _directory: &Path) {}

    fn before_rollback(&mut self, _error: &TransactionError) {}

    fn after_rollback(&mut self) {}

    fn rollback_error(&mut self, _error: &RollbackError) {}

    fn plan_execution_complete(&mut self, _sequence_count: usize, _rollback_count: usize) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl Handler for NoOpHandler {}
