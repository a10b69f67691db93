// src/config.rs
//
// taskies.toml:
//
//   [general]
//   lang = "en-US"
//
//   [database]
//   databasePath = "/path/to/taskies.db"

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::environment::Environment;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSection {
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self { lang: default_lang() }
    }
}

fn default_lang() -> String {
    "en-US".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(rename = "databasePath", default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub general: GeneralSection,
    #[serde(default)]
    pub database: DatabaseSection,
}

impl Configuration {
    /// Читает конфиг окружения. Нет файла -> значения по умолчанию (язык — из локали).
    pub fn load(env: &Environment) -> Result<Self, ConfigError> {
        let path = env.configuration_path();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self {
                general: GeneralSection {
                    lang: env.current_locale(),
                },
                database: DatabaseSection::default(),
            });
        }
        Self::load_file(&path)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, env: &Environment) -> Result<(), ConfigError> {
        let path = env.configuration_path();
        let text = toml::to_string_pretty(self)?;
        fs::write(&path, text).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn user_interface_language(&self) -> &str {
        &self.general.lang
    }

    pub fn set_user_interface_language(&mut self, value: impl Into<String>) {
        self.general.lang = value.into();
    }

    /// Путь из конфига, иначе путь окружения по умолчанию.
    pub fn database_path(&self, env: &Environment) -> PathBuf {
        self.database
            .database_path
            .clone()
            .unwrap_or_else(|| env.database_path())
    }

    pub fn set_database_path(&mut self, value: impl Into<PathBuf>) {
        self.database.database_path = Some(value.into());
    }
}
