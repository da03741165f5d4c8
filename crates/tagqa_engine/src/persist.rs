use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Suffixes tried after the requested name before giving up.
const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("every name derived from {0} is taken")]
    NamesExhausted(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure `dir` exists and accepts new files; create it if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Stores captures, reports, logs and sessions in one folder.
///
/// Files appear complete or not at all, and an earlier artifact is never
/// replaced: when the requested name is taken the next free
/// `{stem}_{n}.{ext}` is used instead.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrites `filename` in place, for files that hold current settings
    /// rather than a record of a run.
    pub fn replace(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let tmp = self.staged(content)?;
        let target = self.dir.join(filename);
        tmp.persist(&target).map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }

    pub fn store_text(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.store(filename, content.as_bytes())
    }

    /// Writes `content` under `filename` or the first free variant of it.
    /// Returns the path actually written.
    pub fn store(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut tmp = self.staged(content)?;
        for candidate in candidate_names(filename).take(MAX_NAME_ATTEMPTS) {
            let target = self.dir.join(&candidate);
            match tmp.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => tmp = err.file,
                Err(err) => return Err(PersistError::Io(err.error)),
            }
        }
        Err(PersistError::NamesExhausted(filename.to_string()))
    }

    fn staged(&self, content: &[u8]) -> Result<NamedTempFile, PersistError> {
        ensure_output_dir(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        Ok(tmp)
    }
}

/// `name.ext`, then `name_2.ext`, `name_3.ext` and so on.
fn candidate_names(filename: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, extension) = match filename.rfind('.') {
        Some(dot) if dot > 0 => filename.split_at(dot),
        _ => (filename, ""),
    };
    std::iter::once(filename.to_string())
        .chain((2..).map(move |n| format!("{stem}_{n}{extension}")))
}
