//! Persisted user settings (`settings.json`).
//!
//! The data-entry screens read the data directory and subject list from this
//! file, and the import bridge keeps its token here. Keys this crate does not
//! know about are carried through untouched when the file is rewritten.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub data_path: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub subject_param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Opens the store at `path`. A missing file yields defaults; nothing is
    /// written until [`ensure_file`](Self::ensure_file) or an update.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Settings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Configured data directory, or `None` when `data_path` is blank.
    pub fn data_dir(&self) -> Option<PathBuf> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let trimmed = guard.data_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    /// Writes the current (default) settings if the file does not exist yet.
    pub fn ensure_file(&self) -> Result<(), SettingsError> {
        if self.path.exists() {
            return Ok(());
        }
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        self.persist(&guard)
    }

    /// Applies `f` to a copy of the settings and persists it. The in-memory
    /// value only changes once the write succeeded.
    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> Result<R, SettingsError> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        let out = f(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    pub fn reload(&self) -> Result<(), SettingsError> {
        let data = read_settings(&self.path)?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn read_settings(path: &Path) -> Result<Settings, SettingsError> {
    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
