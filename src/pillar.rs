use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_yaml::Value;

use crate::errors::PillarError;

/// Untyped nested document exchanged with the provisioning engine.
///
/// A pillar may be backed by a file (usually an `.sls` document under the
/// pillar root) or live purely in memory. The form-data engine only touches
/// its document structurally; loading and saving stay here.
///
/// Persisting writes a temporary file and renames it into place; an advisory
/// lock is acquired around the write for cross-process safety.
#[derive(Clone, Debug, Default)]
pub struct Pillar {
    path: Option<PathBuf>,
    data: Value,
}

impl Pillar {
    /// An in-memory pillar holding `data`.
    pub fn new(data: Value) -> Self {
        Self { path: None, data }
    }

    /// An empty in-memory pillar.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Opens a file-backed pillar and loads its document. A missing or
    /// blank file yields an empty document.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, PillarError> {
        let mut pillar = Self {
            path: Some(path.into()),
            data: Value::Null,
        };
        pillar.load()?;
        Ok(pillar)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    /// Re-reads the document from the backing file.
    pub fn load(&mut self) -> Result<(), PillarError> {
        let path = self.path.clone().ok_or(PillarError::NoPath)?;
        if !path.exists() {
            log::debug!("no pillar at {}, starting empty", path.display());
            self.data = Value::Null;
            return Ok(());
        }
        let text = fs::read_to_string(&path)?;
        self.data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(&text)?
        };
        log::debug!("loaded pillar from {}", path.display());
        Ok(())
    }

    /// Persists the document to the backing file.
    pub fn save(&self) -> Result<(), PillarError> {
        let path = self.path.as_ref().ok_or(PillarError::NoPath)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = self.dump()?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        lock_file.lock_exclusive()?;
        let result = write_atomically(path, text.as_bytes());
        lock_file.unlock()?;
        result?;

        log::info!("pillar saved to {}", path.display());
        Ok(())
    }

    /// The document serialized as YAML text.
    pub fn dump(&self) -> Result<String, PillarError> {
        Ok(serde_yaml::to_string(&self.data)?)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), PillarError> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
