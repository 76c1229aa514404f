use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Numeric-name descriptor derived once from a candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameInfo {
    pub path: PathBuf,
    pub container: PathBuf,
    pub name: String,
    /// Literal digit run, leading zeros included.
    pub number: String,
    pub value: u64,
    pub digit_count: usize,
    pub prefix: String,
    pub suffix: String,
}

impl NameInfo {
    pub fn set_key(&self) -> SetKey {
        SetKey {
            container: self.container.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
        }
    }
}

/// Files sharing a set key are candidates for the same run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetKey {
    pub container: PathBuf,
    pub prefix: String,
    pub suffix: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Previous,
    Next,
}

/// A rejected link attempt: `file` has two competing candidates for the same slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ambiguity {
    pub direction: Direction,
    pub file: PathBuf,
    pub choices: [PathBuf; 2],
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Previous => write!(
                f,
                "{} or {} could precede {}",
                self.choices[0].display(),
                self.choices[1].display(),
                self.file.display()
            ),
            Direction::Next => write!(
                f,
                "{} could be followed by {} or {}",
                self.file.display(),
                self.choices[0].display(),
                self.choices[1].display()
            ),
        }
    }
}

/// A maximal, unambiguous run of files in ascending numeric order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub paths: Vec<PathBuf>,
    pub first: NameInfo,
    pub last: NameInfo,
}

impl Sequence {
    pub fn container(&self) -> &Path {
        &self.first.container
    }

    pub fn prefix(&self) -> &str {
        &self.first.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.first.suffix
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = format!(
            "{}[{}-{}]{}",
            self.prefix(),
            self.first.number,
            self.last.number,
            self.suffix()
        );
        write!(f, "{}", self.container().join(label).display())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    pub directory: PathBuf,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityBehavior {
    Ignore,
    #[default]
    Report,
    Cancel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SharedDirectoryBehavior {
    #[default]
    Allow,
    Skip,
    Cancel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RollbackBehavior {
    #[serde(rename = "set", alias = "per_set")]
    PerSet,
    #[default]
    #[serde(rename = "all", alias = "whole_run")]
    WholeRun,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Ambiguities,
    SharedDirectories,
}

impl CancelReason {
    pub fn describe(self) -> &'static str {
        match self {
            CancelReason::Ambiguities => "ambiguous sequences",
            CancelReason::SharedDirectories => "multiple sequences sharing a directory",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GatherResult {
    Ok,
    Cancel,
    ErrorFullRollback,
    ErrorPartialRollback,
}

pub const EXIT_CODE_FAILED_ROLLBACK: u8 = 5;

impl GatherResult {
    pub fn exit_code(self) -> u8 {
        match self {
            GatherResult::Ok => 0,
            GatherResult::Cancel => 2,
            GatherResult::ErrorFullRollback => 3,
            GatherResult::ErrorPartialRollback => 4,
        }
    }
}
