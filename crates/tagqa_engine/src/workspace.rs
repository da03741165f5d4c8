//! On-disk layout for captures, sessions, logs and reports.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use thiserror::Error;

use crate::persist::{ensure_output_dir, PersistError};

pub const ROOT_DIR_NAME: &str = "Tag_QA_Files";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("{0} already contains a {ROOT_DIR_NAME} folder")]
    TargetExists(PathBuf),
    #[error("the workspace is already under {0}")]
    SameLocation(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// `<parent>/Tag_QA_Files` and its four subfolders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    parent: PathBuf,
}

impl Workspace {
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: parent.into(),
        }
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    pub fn root(&self) -> PathBuf {
        self.parent.join(ROOT_DIR_NAME)
    }

    pub fn pictures(&self) -> PathBuf {
        self.root().join("Pictures")
    }

    pub fn sessions(&self) -> PathBuf {
        self.root().join("Sessions")
    }

    pub fn logs(&self) -> PathBuf {
        self.root().join("Logs")
    }

    pub fn outputs(&self) -> PathBuf {
        self.root().join("Outputs")
    }

    /// Creates any missing folder.
    pub fn bootstrap(&self) -> Result<(), WorkspaceError> {
        for dir in [self.pictures(), self.sessions(), self.logs(), self.outputs()] {
            ensure_output_dir(&dir)?;
        }
        Ok(())
    }

    /// Moves the whole tree under `new_parent` and returns the moved workspace.
    pub fn relocate(&self, new_parent: &Path) -> Result<Workspace, WorkspaceError> {
        if same_dir(&self.parent, new_parent) {
            return Err(WorkspaceError::SameLocation(new_parent.to_path_buf()));
        }
        let target = Workspace::new(new_parent);
        if target.root().exists() {
            return Err(WorkspaceError::TargetExists(new_parent.to_path_buf()));
        }
        fs::create_dir_all(new_parent)?;
        if self.root().exists() {
            move_tree(&self.root(), &target.root())?;
        }
        target.bootstrap()?;
        engine_info!(
            "Moved workspace from {} to {}",
            self.root().display(),
            target.root().display()
        );
        Ok(target)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

// A rename cannot cross filesystems; fall back to copy then delete.
fn move_tree(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_tree(from, to)?;
    fs::remove_dir_all(from)
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), dest)?;
        }
    }
    Ok(())
}
