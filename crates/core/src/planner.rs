use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::collect::Collector;
use crate::config::GatherConfig;
use crate::group::OrderedGroups;
use crate::handler::Handler;
use crate::model::{AmbiguityBehavior, CancelReason, PlanEntry, Sequence, SharedDirectoryBehavior};
use crate::template::DirTemplate;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
    pub cancel_reasons: BTreeSet<CancelReason>,
    pub ambiguity_count: usize,
    pub rejected_count: usize,
    pub shared_directory_count: usize,
}

impl Plan {
    pub fn is_cancelled(&self) -> bool {
        !self.cancel_reasons.is_empty()
    }
}

/// Turns collected sequences into an ordered, policy-filtered plan.
///
/// Pure with respect to the filesystem; every decision is reported through
/// `handler` before the plan is returned.
pub fn build_plan(
    collector: &Collector,
    template: &DirTemplate,
    config: &GatherConfig,
    handler: &mut dyn Handler,
) -> Plan {
    let mut plan = Plan {
        ambiguity_count: collector.ambiguities().len(),
        ..Plan::default()
    };

    if collector.has_ambiguities() {
        handler.handle_ambiguities(collector.ambiguities());
        match config.ambiguity_behavior {
            AmbiguityBehavior::Cancel => {
                plan.cancel_reasons.insert(CancelReason::Ambiguities);
            }
            AmbiguityBehavior::Ignore | AmbiguityBehavior::Report => {}
        }
    }

    let (qualifying, rejected): (Vec<Sequence>, Vec<Sequence>) = collector
        .sequences()
        .into_iter()
        .partition(|sequence| sequence.len() >= config.min_sequence_length);
    plan.rejected_count = rejected.len();
    if !rejected.is_empty() {
        handler.handle_rejected_sequences(&rejected);
    }

    let by_directory = qualifying
        .into_iter()
        .map(|sequence| (template.render(&sequence), sequence))
        .collect::<OrderedGroups<PathBuf, Sequence>>();

    for (directory, sequences) in by_directory {
        if sequences.len() > 1 {
            plan.shared_directory_count += 1;
            handler.handle_shared_sequences(&directory, &sequences);
            match config.shared_directory_behavior {
                SharedDirectoryBehavior::Allow => {}
                SharedDirectoryBehavior::Skip => continue,
                SharedDirectoryBehavior::Cancel => {
                    plan.cancel_reasons.insert(CancelReason::SharedDirectories);
                    continue;
                }
            }
        }

        for sequence in sequences {
            plan.entries.push(PlanEntry {
                directory: directory.clone(),
                paths: sequence.paths,
            });
        }
    }

    if plan.is_cancelled() {
        handler.handle_cancel_reasons(&plan.cancel_reasons);
    }
    debug!(
        "plan ready: {} entr(ies), {} rejected, {} shared director(ies)",
        plan.entries.len(),
        plan.rejected_count,
        plan.shared_directory_count
    );
    handler.plan_generation_complete(&plan);

    plan
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanReport {
    pub run_id: String,
    pub generated_at: String,
    pub dry_run: bool,
    pub entries: Vec<PlanEntry>,
    pub cancel_reasons: Vec<CancelReason>,
    pub ambiguity_count: usize,
    pub rejected_count: usize,
    pub shared_directory_count: usize,
}

pub fn build_plan_report(plan: &Plan, config: &GatherConfig) -> PlanReport {
    PlanReport {
        run_id: Uuid::new_v4().to_string(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        dry_run: config.dry_run,
        entries: plan.entries.clone(),
        cancel_reasons: plan.cancel_reasons.iter().copied().collect(),
        ambiguity_count: plan.ambiguity_count,
        rejected_count: plan.rejected_count,
        shared_directory_count: plan.shared_directory_count,
    }
}

/// Writes `report` to `path` as pretty-printed JSON.
pub fn write_plan_report(report: &PlanReport, path: &Path) -> Result<()> {
    let payload = serde_json::to_string_pretty(report).context("failed to serialize plan")?;
    fs::write(path, payload)
        .with_context(|| format!("failed to write plan to {}", path.display()))?;
    debug!("wrote plan {} to {}", report.run_id, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::{build_plan, build_plan_report, write_plan_report, Plan, PlanReport};
    use crate::collect::Collector;
    use crate::config::GatherConfig;
    use crate::handler::Handler;
    use crate::model::{
        Ambiguity, AmbiguityBehavior, CancelReason, Sequence, SharedDirectoryBehavior,
    };
    use crate::template::DirTemplate;

    #[derive(Default)]
    struct Recorder {
        ambiguities: usize,
        rejected: Vec<usize>,
        shared: Vec<(PathBuf, usize)>,
        cancel_reasons: Option<BTreeSet<CancelReason>>,
        completed: bool,
    }

    impl Handler for Recorder {
        fn handle_ambiguities(&mut self, ambiguities: &[Ambiguity]) {
            self.ambiguities += ambiguities.len();
        }

        fn handle_rejected_sequences(&mut self, sequences: &[Sequence]) {
            self.rejected = sequences.iter().map(Sequence::len).collect();
        }

        fn handle_shared_sequences(&mut self, directory: &Path, sequences: &[Sequence]) {
            self.shared.push((directory.to_path_buf(), sequences.len()));
        }

        fn handle_cancel_reasons(&mut self, reasons: &BTreeSet<CancelReason>) {
            self.cancel_reasons = Some(reasons.clone());
        }

        fn plan_generation_complete(&mut self, _plan: &Plan) {
            self.completed = true;
        }
    }

    fn plan_for(names: &[&str], template: &str, config: GatherConfig) -> (Plan, Recorder) {
        let mut collector = Collector::new();
        collector.collect_all(names);
        let template = DirTemplate::parse(template).expect("template parses");
        let mut recorder = Recorder::default();
        let plan = build_plan(&collector, &template, &config, &mut recorder);
        (plan, recorder)
    }

    fn config(min: usize) -> GatherConfig {
        GatherConfig {
            min_sequence_length: min,
            ..GatherConfig::default()
        }
    }

    #[test]
    fn single_run_becomes_one_entry() {
        let (plan, recorder) = plan_for(
            &["img9.png", "img10.png", "img11.png"],
            "{path_prefix}[{first}-{last}]{suffix}",
            config(3),
        );

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].directory, PathBuf::from("img[9-11].png"));
        assert_eq!(
            plan.entries[0].paths,
            vec![
                PathBuf::from("img9.png"),
                PathBuf::from("img10.png"),
                PathBuf::from("img11.png")
            ]
        );
        assert!(!plan.is_cancelled());
        assert!(recorder.completed);
        assert!(recorder.cancel_reasons.is_none());
    }

    #[test]
    fn minimum_length_is_inclusive() {
        let names = ["a1", "a2", "a3", "b1", "b2"];

        let (plan, recorder) = plan_for(&names, "{name_prefix}", config(3));
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].directory, PathBuf::from("a"));
        assert_eq!(recorder.rejected, vec![2]);
        assert_eq!(plan.rejected_count, 1);

        let (plan, recorder) = plan_for(&names, "{name_prefix}", config(2));
        assert_eq!(plan.entries.len(), 2);
        assert!(recorder.rejected.is_empty());
    }

    #[test]
    fn shared_directory_policies() {
        let names = ["x1.jpg", "x2.jpg", "x1.png", "x2.png", "y1.jpg", "y2.jpg"];
        let template = "{name_prefix}";

        let allow = GatherConfig {
            shared_directory_behavior: SharedDirectoryBehavior::Allow,
            ..config(2)
        };
        let (plan, recorder) = plan_for(&names, template, allow);
        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.entries[0].directory, plan.entries[1].directory);
        assert_eq!(recorder.shared, vec![(PathBuf::from("x"), 2)]);
        assert!(!plan.is_cancelled());

        let skip = GatherConfig {
            shared_directory_behavior: SharedDirectoryBehavior::Skip,
            ..config(2)
        };
        let (plan, recorder) = plan_for(&names, template, skip);
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].directory, PathBuf::from("y"));
        assert_eq!(recorder.shared.len(), 1);
        assert!(!plan.is_cancelled());

        let cancel = GatherConfig {
            shared_directory_behavior: SharedDirectoryBehavior::Cancel,
            ..config(2)
        };
        let (plan, recorder) = plan_for(&names, template, cancel);
        assert!(plan.is_cancelled());
        assert_eq!(
            recorder.cancel_reasons,
            Some(BTreeSet::from([CancelReason::SharedDirectories]))
        );
    }

    #[test]
    fn shared_cancel_reason_is_recorded_once_for_many_directories() {
        let names = ["x1.a", "x2.a", "x1.b", "x2.b", "y1.a", "y2.a", "y1.b", "y2.b"];
        let cancel = GatherConfig {
            shared_directory_behavior: SharedDirectoryBehavior::Cancel,
            ..config(2)
        };
        let (plan, recorder) = plan_for(&names, "{name_prefix}", cancel);

        assert_eq!(recorder.shared.len(), 2);
        assert_eq!(plan.shared_directory_count, 2);
        assert_eq!(plan.cancel_reasons.len(), 1);
        assert!(plan.entries.is_empty());
    }

    #[test]
    fn ambiguity_policy_controls_cancellation() {
        let names = ["a09", "a9", "a10", "z1", "z2", "z3"];

        let (plan, recorder) = plan_for(&names, "{name_prefix}", config(3));
        assert_eq!(recorder.ambiguities, 1);
        assert_eq!(plan.ambiguity_count, 1);
        assert!(!plan.is_cancelled());
        assert_eq!(plan.entries.len(), 1);

        let cancel = GatherConfig {
            ambiguity_behavior: AmbiguityBehavior::Cancel,
            ..config(3)
        };
        let (plan, recorder) = plan_for(&names, "{name_prefix}", cancel);
        assert!(plan.is_cancelled());
        assert_eq!(
            recorder.cancel_reasons,
            Some(BTreeSet::from([CancelReason::Ambiguities]))
        );
        // the plan itself is still computed; cancellation is the caller's call
        assert_eq!(plan.entries.len(), 1);
    }

    #[test]
    fn report_mirrors_plan() {
        let (plan, _) = plan_for(&["q1", "q2", "q3"], "{name_prefix}", config(3));
        let report = build_plan_report(&plan, &GatherConfig::default());

        assert_eq!(report.entries, plan.entries);
        assert!(report.cancel_reasons.is_empty());
        assert!(!report.run_id.is_empty());
        assert!(!report.dry_run);
    }

    #[test]
    fn written_report_reads_back() {
        let (plan, _) = plan_for(&["q1", "q2", "q3"], "{name_prefix}", config(3));
        let report = build_plan_report(&plan, &GatherConfig::default());
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("plan.json");

        write_plan_report(&report, &path).expect("write report");

        let text = std::fs::read_to_string(&path).expect("read report");
        let parsed: PlanReport = serde_json::from_str(&text).expect("parse report");
        assert_eq!(parsed, report);
        assert!(text.contains("\"generated_at\""));
    }

    #[test]
    fn report_into_missing_directory_fails_with_path() {
        let (plan, _) = plan_for(&["q1", "q2", "q3"], "{name_prefix}", config(3));
        let report = build_plan_report(&plan, &GatherConfig::default());
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("absent").join("plan.json");

        let err = write_plan_report(&report, &path).expect_err("no parent directory");
        assert!(format!("{err:#}").contains("absent"));
    }
}
