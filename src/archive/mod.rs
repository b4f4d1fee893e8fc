//! Archivist: moves consumed record files from the active devices area to
//! backup storage.
//!
//! Per-file failures never abort the batch. A missing source means the file
//! was already moved, which is counted but not fatal, so archiving is
//! idempotent with respect to re-delivered paths.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::errors::AplError;

/// Moves record files devices → backups.
pub struct Archivist {
    backup_dir: PathBuf,
}

/// Per-batch accounting returned to the scheduler for logging.
#[derive(Debug, Default)]
pub struct ArchiveOutcome {
    /// Files moved to backup.
    pub archived: u64,
    /// Sources that no longer existed (already moved).
    pub missing: Vec<PathBuf>,
    /// Sources that failed to move for any other reason.
    pub failed: Vec<(PathBuf, AplError)>,
}

impl ArchiveOutcome {
    /// Whether every file was either archived or found already gone.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Archivist {
    /// Build an archivist targeting the given backup directory.
    #[must_use]
    pub fn new(backup_dir: PathBuf) -> Self {
        Self { backup_dir }
    }

    /// Move each file into the backup area, keeping its file name.
    ///
    /// Only the paths enumerated by the caller are touched; records written
    /// after that enumeration stay in the active area for the next cycle.
    #[must_use]
    pub fn archive(&self, paths: &[PathBuf]) -> ArchiveOutcome {
        let mut outcome = ArchiveOutcome::default();
        for src in paths {
            let Some(name) = src.file_name() else {
                outcome.failed.push((
                    src.clone(),
                    AplError::Runtime {
                        details: format!("record path has no file name: {}", src.display()),
                    },
                ));
                continue;
            };
            let dst = self.backup_dir.join(name);

            match move_file(src, &dst) {
                Ok(()) => outcome.archived += 1,
                Err(AplError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                    outcome.missing.push(src.clone());
                }
                Err(error) => outcome.failed.push((src.clone(), error)),
            }
        }
        outcome
    }
}

/// Rename, falling back to copy + remove when rename fails for a reason
/// other than a missing source (e.g. the backup area is on another
/// filesystem).
fn move_file(src: &Path, dst: &Path) -> Result<(), AplError> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Err(AplError::io(src, error)),
        Err(_) => {
            fs::copy(src, dst).map_err(|source| AplError::io(src, source))?;
            fs::remove_file(src).map_err(|source| AplError::io(src, source))?;
            Ok(())
        }
    }
}
