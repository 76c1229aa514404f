use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{AmbiguityBehavior, RollbackBehavior, SharedDirectoryBehavior};
use crate::template::{DirTemplate, DEFAULT_DIR_TEMPLATE};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatherConfig {
    #[serde(default = "default_dir_template")]
    pub dir_template: String,
    #[serde(default = "default_min_sequence_length")]
    pub min_sequence_length: usize,
    #[serde(default)]
    pub ambiguity_behavior: AmbiguityBehavior,
    #[serde(default)]
    pub shared_directory_behavior: SharedDirectoryBehavior,
    #[serde(default)]
    pub rollback_behavior: RollbackBehavior,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_dir_template() -> String {
    DEFAULT_DIR_TEMPLATE.to_string()
}

fn default_min_sequence_length() -> usize {
    3
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            dir_template: default_dir_template(),
            min_sequence_length: default_min_sequence_length(),
            ambiguity_behavior: AmbiguityBehavior::default(),
            shared_directory_behavior: SharedDirectoryBehavior::default(),
            rollback_behavior: RollbackBehavior::default(),
            dry_run: false,
        }
    }
}

impl GatherConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_sequence_length == 0 {
            return Err(anyhow!("min_sequence_length must be at least 1"));
        }
        DirTemplate::parse(&self.dir_template)
            .with_context(|| format!("invalid directory template '{}'", self.dir_template))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::GatherConfig;
    use crate::model::{AmbiguityBehavior, RollbackBehavior, SharedDirectoryBehavior};

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: GatherConfig = serde_json::from_str(
            r#"{ "min_sequence_length": 5, "shared_directory_behavior": "skip", "rollback_behavior": "set" }"#,
        )
        .expect("config parses");

        assert_eq!(config.min_sequence_length, 5);
        assert_eq!(config.shared_directory_behavior, SharedDirectoryBehavior::Skip);
        assert_eq!(config.rollback_behavior, RollbackBehavior::PerSet);
        assert_eq!(config.ambiguity_behavior, AmbiguityBehavior::Report);
        assert_eq!(config.dir_template, GatherConfig::default().dir_template);
        assert!(!config.dry_run);
    }

    #[test]
    fn rollback_accepts_long_aliases() {
        let config: GatherConfig =
            serde_json::from_str(r#"{ "rollback_behavior": "whole_run" }"#).expect("parses");
        assert_eq!(config.rollback_behavior, RollbackBehavior::WholeRun);
    }

    #[test]
    fn loads_and_validates_file() {
        let temp = TempDir::new().expect("tempdir");
        let good = temp.path().join("good.json");
        let bad = temp.path().join("bad.json");
        fs::write(&good, r#"{ "dir_template": "{name_prefix}{field}" }"#).expect("write good");
        fs::write(&bad, r#"{ "dir_template": "{nope}" }"#).expect("write bad");

        let config = GatherConfig::from_json_file(&good).expect("good config loads");
        assert_eq!(config.dir_template, "{name_prefix}{field}");
        assert!(GatherConfig::from_json_file(&bad).is_err());
        assert!(GatherConfig::from_json_file(&temp.path().join("missing.json")).is_err());
    }

    #[test]
    fn zero_minimum_is_rejected() {
        let config = GatherConfig {
            min_sequence_length: 0,
            ..GatherConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
