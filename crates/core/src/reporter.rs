use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, error, info, warn, Level};

use crate::config::GatherConfig;
use crate::handler::Handler;
use crate::model::{Ambiguity, AmbiguityBehavior, CancelReason, Sequence, SharedDirectoryBehavior};
use crate::planner::Plan;
use crate::transaction::{RollbackError, TransactionError};

const SHARED_COACH: &str = "Use the --dir option to create distinct directory names, \
or allow directories to contain multiple sequences with --shared allow";
pub const DRY_RUN_NOTICE: &str = "--dry-run specified. No changes were made.";

fn log_at(level: Level, message: &str) {
    if level == Level::ERROR {
        error!("{message}");
    } else if level == Level::WARN {
        warn!("{message}");
    } else if level == Level::INFO {
        info!("{message}");
    } else {
        debug!("{message}");
    }
}

fn ambiguity_level(behavior: AmbiguityBehavior) -> Level {
    match behavior {
        AmbiguityBehavior::Ignore => Level::DEBUG,
        AmbiguityBehavior::Report => Level::INFO,
        AmbiguityBehavior::Cancel => Level::ERROR,
    }
}

fn shared_level(behavior: SharedDirectoryBehavior) -> Level {
    match behavior {
        SharedDirectoryBehavior::Allow => Level::DEBUG,
        SharedDirectoryBehavior::Skip => Level::WARN,
        SharedDirectoryBehavior::Cancel => Level::ERROR,
    }
}

/// Presents run events as log lines, with severity following the configured policies.
#[derive(Debug, Clone)]
pub struct LogReporter {
    min_sequence_length: usize,
    dry_run: bool,
    allow_shared: bool,
    ambiguity_level: Level,
    shared_level: Level,
    show_shared_coach: bool,
}

impl LogReporter {
    pub fn new(config: &GatherConfig) -> Self {
        Self {
            min_sequence_length: config.min_sequence_length,
            dry_run: config.dry_run,
            allow_shared: config.shared_directory_behavior == SharedDirectoryBehavior::Allow,
            ambiguity_level: ambiguity_level(config.ambiguity_behavior),
            shared_level: shared_level(config.shared_directory_behavior),
            show_shared_coach: false,
        }
    }
}

impl Handler for LogReporter {
    fn handle_ambiguities(&mut self, ambiguities: &[Ambiguity]) {
        log_at(self.ambiguity_level, "The following files are ambiguous sequence members:");
        for ambiguity in ambiguities {
            log_at(self.ambiguity_level, &format!("  {ambiguity}"));
        }
    }

    fn handle_rejected_sequences(&mut self, sequences: &[Sequence]) {
        let line_level = |sequence: &Sequence| {
            if sequence.len() > 1 {
                Level::INFO
            } else {
                Level::DEBUG
            }
        };
        let header_level = if sequences.iter().any(|sequence| sequence.len() > 1) {
            Level::INFO
        } else {
            Level::DEBUG
        };

        log_at(
            header_level,
            &format!(
                "The following sequences will be skipped because they are shorter than the minimum length {}",
                self.min_sequence_length
            ),
        );
        for sequence in sequences {
            log_at(
                line_level(sequence),
                &format!("  ({}) {sequence}", sequence.len()),
            );
        }
    }

    fn handle_shared_sequences(&mut self, directory: &Path, sequences: &[Sequence]) {
        let header = if self.allow_shared {
            "Directory will contain multiple sequences:"
        } else {
            "Directory would contain multiple sequences:"
        };
        log_at(self.shared_level, header);
        log_at(self.shared_level, &format!("  {}", directory.display()));
        for sequence in sequences {
            log_at(self.shared_level, &format!("    {sequence}"));
        }

        if !self.allow_shared {
            self.show_shared_coach = true;
        }
    }

    fn handle_cancel_reasons(&mut self, reasons: &BTreeSet<CancelReason>) {
        let text = reasons
            .iter()
            .map(|reason| reason.describe())
            .collect::<Vec<_>>()
            .join(", ");
        error!("Stopping because {text}");
    }

    fn plan_generation_complete(&mut self, _plan: &Plan) {
        if self.show_shared_coach {
            info!("{SHARED_COACH}");
            self.show_shared_coach = false;
        }
    }

    fn before_sequence_move(&mut self, directory: &Path) {
        info!("{}", directory.display());
    }

    fn before_file_move(&mut self, from: &Path, _to: &Path) {
        info!("  {}", from.display());
    }

    fn before_rollback(&mut self, error: &TransactionError) {
        error!("Error: {error}. Rolling back...");
    }

    fn after_rollback(&mut self) {
        info!("Rollback complete");
    }

    fn rollback_error(&mut self, failure: &RollbackError) {
        error!("Error while rolling back - incomplete commands follow.");
        error!("# The first command listed failed with: {}", failure.source);
        for action in &failure.pending {
            error!("  {action}");
        }
        error!("# End incomplete commands");
    }

    fn plan_execution_complete(&mut self, sequence_count: usize, rollback_count: usize) {
        if rollback_count > 0 {
            warn!("{rollback_count} of {sequence_count} sequences failed and were rolled back.");
        }
        if self.dry_run {
            info!("{DRY_RUN_NOTICE}");
        }
    }
}
