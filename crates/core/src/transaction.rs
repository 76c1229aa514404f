use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[cfg(windows)]
const ERROR_NOT_SAME_DEVICE: i32 = 17;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("moving {}: destination exists: {}", from.display(), to.display())]
    DestinationExists { from: PathBuf, to: PathBuf },
    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("reached a root while creating parents of {}", .0.display())]
    NoAncestor(PathBuf),
    #[error("{action} failed: {source}")]
    Io {
        action: Action,
        #[source]
        source: io::Error,
    },
}

/// An inverse action failed; `pending` lists what is left to undo, failed action first.
#[derive(Debug, Error)]
#[error("error while rolling back: {source}")]
pub struct RollbackError {
    pub pending: Vec<Action>,
    #[source]
    pub source: TransactionError,
}

/// A reversible filesystem step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move { from: PathBuf, to: PathBuf },
    MakeDir(PathBuf),
    RemoveDir(PathBuf),
}

impl Action {
    pub fn execute(&self) -> Result<(), TransactionError> {
        match self {
            Action::Move { from, to } => {
                if fs::symlink_metadata(to).is_ok() {
                    return Err(TransactionError::DestinationExists {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
                move_path(from, to).map_err(|source| self.io_error(source))
            }
            Action::MakeDir(path) => fs::create_dir(path).map_err(|source| self.io_error(source)),
            Action::RemoveDir(path) => fs::remove_dir(path).map_err(|source| self.io_error(source)),
        }
    }

    pub fn inverse(&self) -> Action {
        match self {
            Action::Move { from, to } => Action::Move {
                from: to.clone(),
                to: from.clone(),
            },
            Action::MakeDir(path) => Action::RemoveDir(path.clone()),
            Action::RemoveDir(path) => Action::MakeDir(path.clone()),
        }
    }

    fn io_error(&self, source: io::Error) -> TransactionError {
        TransactionError::Io {
            action: self.clone(),
            source,
        }
    }
}

/// Renders as the shell command an operator would run by hand.
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { from, to } => write!(f, "mv {} {}", shell_quote(from), shell_quote(to)),
            Action::MakeDir(path) => write!(f, "mkdir {}", shell_quote(path)),
            Action::RemoveDir(path) => write!(f, "rmdir {}", shell_quote(path)),
        }
    }
}

fn shell_quote(path: &Path) -> String {
    let text = path.to_string_lossy();
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '.' | '_' | '-' | '+' | ','));
    if plain {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    relocate(from, to, |from, to| fs::rename(from, to))
}

/// Renames `from` to `to`, copying then deleting when the two sit on different filesystems.
///
/// A failed copy removes whatever reached `to`. A file whose source cannot be
/// deleted afterwards has its copy removed again; a directory keeps both trees.
fn relocate<F>(from: &Path, to: &Path, rename: F) -> io::Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let err = match rename(from, to) {
        Err(err) if is_cross_device(&err) => err,
        other => return other,
    };
    debug!("{} and {} are on different filesystems ({err}); copying", from.display(), to.display());

    let source_is_dir = fs::symlink_metadata(from)?.is_dir();
    if let Err(err) = copy_entry(from, to) {
        let _ = remove_entry(to);
        return Err(err);
    }
    if let Err(err) = remove_entry(from) {
        if !source_is_dir {
            let _ = remove_entry(to);
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(ERROR_NOT_SAME_DEVICE)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

fn copy_entry(from: &Path, to: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(from)?;
    if !metadata.is_dir() {
        return copy_single(from, to, metadata.file_type());
    }

    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            to.to_path_buf()
        } else {
            to.join(relative)
        };
        copy_single(entry.path(), &target, entry.file_type())?;
    }
    Ok(())
}

fn copy_single(from: &Path, to: &Path, file_type: fs::FileType) -> io::Result<()> {
    if file_type.is_dir() {
        fs::create_dir(to)
    } else if file_type.is_symlink() {
        copy_symlink(from, to)
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

fn remove_entry(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Directory-creation and move contract shared by the real and dry-run executors.
pub trait Transactor {
    fn make_dirs(&mut self, path: &Path) -> Result<(), TransactionError>;

    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), TransactionError>;

    /// Forget the undo history accumulated so far.
    fn commit(&mut self);

    /// Undo everything since the last commit, newest first.
    fn rollback(&mut self) -> Result<(), RollbackError>;
}

#[derive(Debug, Default)]
pub struct FilesystemTransaction {
    undo: Vec<Action>,
}

impl FilesystemTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inverse actions waiting to be applied on rollback, oldest first.
    pub fn undo_log(&self) -> &[Action] {
        &self.undo
    }

    fn execute_with_undo(&mut self, action: Action) -> Result<(), TransactionError> {
        action.execute()?;
        debug!("{action}");
        self.undo.push(action.inverse());
        Ok(())
    }
}

impl Transactor for FilesystemTransaction {
    fn make_dirs(&mut self, path: &Path) -> Result<(), TransactionError> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }

        let mut missing = Vec::new();
        let mut cursor = path;
        loop {
            match fs::create_dir(cursor) {
                Ok(()) => {
                    debug!("mkdir {}", cursor.display());
                    self.undo.push(Action::RemoveDir(cursor.to_path_buf()));
                    break;
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if missing.is_empty() && !cursor.is_dir() {
                        return Err(TransactionError::NotADirectory(cursor.to_path_buf()));
                    }
                    break;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    missing.push(cursor.to_path_buf());
                    cursor = match cursor.parent() {
                        Some(parent) if !parent.as_os_str().is_empty() => parent,
                        _ => return Err(TransactionError::NoAncestor(path.to_path_buf())),
                    };
                }
                Err(source) => {
                    return Err(TransactionError::Io {
                        action: Action::MakeDir(cursor.to_path_buf()),
                        source,
                    })
                }
            }
        }

        while let Some(directory) = missing.pop() {
            self.execute_with_undo(Action::MakeDir(directory))?;
        }
        Ok(())
    }

    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), TransactionError> {
        self.execute_with_undo(Action::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        })
    }

    fn commit(&mut self) {
        self.undo.clear();
    }

    fn rollback(&mut self) -> Result<(), RollbackError> {
        while let Some(action) = self.undo.last() {
            if let Err(source) = action.execute() {
                warn!("rollback stopped at {action}: {source}");
                let pending = self.undo.drain(..).rev().collect();
                return Err(RollbackError { pending, source });
            }
            debug!("undo {action}");
            self.undo.pop();
        }
        Ok(())
    }
}

/// Accepts every action and touches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRun;

impl Transactor for DryRun {
    fn make_dirs(&mut self, _path: &Path) -> Result<(), TransactionError> {
        Ok(())
    }

    fn move_file(&mut self, _from: &Path, _to: &Path) -> Result<(), TransactionError> {
        Ok(())
    }

    fn commit(&mut self) {}

    fn rollback(&mut self) -> Result<(), RollbackError> {
        Ok(())
    }
}
