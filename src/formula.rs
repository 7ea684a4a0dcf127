use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use crate::errors::{FormError, PillarError};
use crate::form::Form;
use crate::form_data::FormData;
use crate::pillar::Pillar;

/// Formula metadata, read from `metadata.yml` next to the form description.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub description: String,
}

/// A provisioning formula: a form description plus metadata, discovered in
/// a formulas directory, optionally paired with the pillar holding its
/// current values.
#[derive(Clone, Debug)]
pub struct Formula {
    path: PathBuf,
    id: String,
    metadata: Metadata,
    form: Arc<Form>,
    pillar: Option<Pillar>,
}

impl Formula {
    /// Reads the formula stored in `path`. The directory must contain a
    /// `form.yml`; a missing or malformed `metadata.yml` only costs the
    /// description.
    pub fn from_dir(path: impl Into<PathBuf>) -> Result<Formula, FormError> {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let form = Arc::new(Form::from_file(path.join("form.yml"))?);
        let metadata = match fs::read_to_string(path.join("metadata.yml")) {
            Ok(text) => serde_yaml::from_str(&text).unwrap_or_else(|err| {
                log::warn!("ignoring malformed metadata for formula '{id}': {err}");
                Metadata::default()
            }),
            Err(_) => {
                log::debug!("formula '{id}' has no metadata");
                Metadata::default()
            }
        };
        Ok(Formula {
            path,
            id,
            metadata,
            form,
            pillar: None,
        })
    }

    /// All formulas found in `dir`: every subdirectory carrying a
    /// `form.yml`, sorted by id. Entries whose form fails to parse are
    /// skipped with a warning.
    pub fn all(dir: impl AsRef<Path>) -> anyhow::Result<Vec<Formula>> {
        let dir = dir.as_ref();
        let mut formulas = Vec::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("reading formulas directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || !path.join("form.yml").exists() {
                continue;
            }
            match Formula::from_dir(&path) {
                Ok(formula) => formulas.push(formula),
                Err(err) => {
                    log::warn!("skipping formula at {}: {err}", path.display());
                }
            }
        }
        formulas.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(formulas)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    pub fn form(&self) -> &Arc<Form> {
        &self.form
    }

    pub fn pillar(&self) -> Option<&Pillar> {
        self.pillar.as_ref()
    }

    pub fn set_pillar(&mut self, pillar: Pillar) {
        self.pillar = Some(pillar);
    }

    /// Form data for this formula, merged from the attached pillar (or an
    /// empty one when none is attached).
    pub fn form_data(&self) -> FormData {
        match &self.pillar {
            Some(pillar) => FormData::from_pillar(self.form.clone(), pillar),
            None => FormData::from_pillar(self.form.clone(), &Pillar::empty()),
        }
    }

    /// Persists the attached pillar. Returns `false` when no pillar is
    /// attached.
    pub fn write_pillar(&self) -> Result<bool, PillarError> {
        match &self.pillar {
            Some(pillar) => {
                pillar.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
