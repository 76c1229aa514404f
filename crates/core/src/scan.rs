use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("failed to compile exclude patterns: {0}")]
    Compile(#[source] globset::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub recurse: bool,
    /// Globs matched against file names; a matching file is never a candidate.
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub paths: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Expands command-line roots into candidate paths.
///
/// Without `recurse` roots are passed through as given. With it, directories
/// are walked in file-name order; only files are kept, and links to
/// directories are neither kept nor followed.
pub fn expand_paths<P: AsRef<Path>>(
    roots: &[P],
    options: &ScanOptions,
) -> Result<ScanOutput, ScanError> {
    let filter = NameFilter::new(&options.excludes)?;
    let mut output = ScanOutput::default();

    for root in roots {
        let root = root.as_ref();
        if !options.recurse {
            filter.keep(root, &mut output.paths);
            continue;
        }

        match root.metadata() {
            Ok(metadata) if metadata.is_dir() => walk_root(root, &filter, &mut output),
            Ok(metadata) if metadata.is_file() => filter.keep(root, &mut output.paths),
            Ok(_) => output
                .warnings
                .push(format!("skipping {}: not a file or directory", root.display())),
            Err(err) => output
                .warnings
                .push(format!("cannot read {}: {err}", root.display())),
        }
    }

    debug!(
        "expanded {} root(s) into {} path(s)",
        roots.len(),
        output.paths.len()
    );
    Ok(output)
}

fn walk_root(root: &Path, filter: &NameFilter, output: &mut ScanOutput) {
    for item in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                output
                    .warnings
                    .push(format!("walk error under {}: {}", root.display(), err));
                continue;
            }
        };
        if entry.file_type().is_dir() || is_link_to_dir(&entry) {
            continue;
        }
        filter.keep(entry.path(), &mut output.paths);
    }
}

fn is_link_to_dir(entry: &DirEntry) -> bool {
    entry.path_is_symlink() && entry.path().is_dir()
}

/// Exclude globs applied to the last path component.
struct NameFilter {
    excludes: Option<GlobSet>,
}

impl NameFilter {
    fn new(patterns: &[String]) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();
        let mut count = 0;
        for pattern in patterns.iter().map(|pattern| pattern.trim()) {
            if pattern.is_empty() {
                continue;
            }
            let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
            count += 1;
        }

        if count == 0 {
            return Ok(Self { excludes: None });
        }
        let excludes = builder.build().map_err(ScanError::Compile)?;
        Ok(Self {
            excludes: Some(excludes),
        })
    }

    fn is_excluded(&self, path: &Path) -> bool {
        match (&self.excludes, path.file_name()) {
            (Some(excludes), Some(name)) => excludes.is_match(name),
            _ => false,
        }
    }

    fn keep(&self, path: &Path, paths: &mut Vec<PathBuf>) {
        if self.is_excluded(path) {
            trace!("excluded {}", path.display());
        } else {
            paths.push(path.to_path_buf());
        }
    }
}
