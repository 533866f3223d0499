use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{BuddyError, Result};

/// The fixed set of models the assistant knows how to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Category,
    /// Reserved for amount prediction; nothing trains it yet.
    #[allow(dead_code)]
    Amount,
}

impl ModelKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::Category => "category_prediction_model.json",
            ModelKind::Amount => "amount_prediction_model.json",
        }
    }
}

/// Durable home for serialized models. Saving replaces any previous artifact
/// of the same kind in one step.
pub trait ModelStore {
    fn save(&self, kind: ModelKind, bytes: &[u8]) -> Result<()>;
    fn load(&self, kind: ModelKind) -> Result<Option<Vec<u8>>>;
}

/// Stores artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    dir: PathBuf,
}

impl FsModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: ModelKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

fn storage_err(action: &str, path: &Path, err: impl std::fmt::Display) -> BuddyError {
    BuddyError::StorageFailure(format!("{action} {}: {err}", path.display()))
}

impl ModelStore for FsModelStore {
    fn save(&self, kind: ModelKind, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| storage_err("creating", &self.dir, e))?;
        let target = self.path_for(kind);
        // Write beside the target and rename over it so readers never see a
        // partial file.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| storage_err("creating temp file in", &self.dir, e))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| storage_err("writing", tmp.path(), e))?;
        tmp.persist(&target)
            .map_err(|e| storage_err("replacing", &target, e.error))?;
        tracing::debug!(path = %target.display(), bytes = bytes.len(), "saved model artifact");
        Ok(())
    }

    fn load(&self, kind: ModelKind) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(kind);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err("reading", &path, e)),
        }
    }
}
