//! Saved translation session, so continue/resume work across process runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TranslateError};
use crate::resource::StringResource;

pub const SESSION_DIR: &str = ".vtu";
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// File the resources were parsed from
    pub source_file: PathBuf,
    pub target_language: String,
    pub resources: Vec<StringResource>,
}

impl Session {
    pub fn new(
        source_file: impl Into<PathBuf>,
        target_language: impl Into<String>,
        resources: Vec<StringResource>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            target_language: target_language.into(),
            resources,
        }
    }

    /// `<base>/.vtu/session.json`
    pub fn default_path<P: AsRef<Path>>(base: P) -> PathBuf {
        base.as_ref().join(SESSION_DIR).join(SESSION_FILE)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TranslateError::FileNotFound(format!(
                "{} (no saved session, run `translate` first)",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        debug!("Saved session with {} strings to {}", self.resources.len(), path.display());
        Ok(())
    }

    /// Remove the saved session; returns false when there was none
    pub fn clear<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }
}
