// src/environment.rs
//
// Где лежат файлы приложения: база, лог, конфиг, переводы.

use log::debug;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DATA_DIR_ENV: &str = "TASKIES_DATA_DIR";

const APP_DIR_NAME: &str = "taskies";
const DATABASE_NAME: &str = "taskies.db";
const LOG_NAME: &str = "taskies.log";
const CONFIG_NAME: &str = "taskies.toml";
const LANGUAGES_DIR: &str = "lang";
const LOGS_DIR: &str = "logs";

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("cannot determine the application data directory")]
    NoDataDir,

    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildConfiguration {
    Debug,
    Release,
}

impl BuildConfiguration {
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildConfiguration::Debug
        } else {
            BuildConfiguration::Release
        }
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    build: BuildConfiguration,
    data_dir: PathBuf,
}

impl Environment {
    /// Порядок выбора каталога данных:
    /// явный `override_dir` -> `TASKIES_DATA_DIR` -> каталог бинарника (Debug)
    /// -> пользовательский каталог данных + `taskies` (Release).
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self, EnvironmentError> {
        let build = BuildConfiguration::current();
        let data_dir = match override_dir.or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from)) {
            Some(dir) => dir,
            None => match build {
                BuildConfiguration::Debug => executable_dir().ok_or(EnvironmentError::NoDataDir)?,
                BuildConfiguration::Release => user_data_dir()
                    .ok_or(EnvironmentError::NoDataDir)?
                    .join(APP_DIR_NAME),
            },
        };
        debug!("Application data directory: {}", data_dir.display());
        Ok(Self { build, data_dir })
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            build: BuildConfiguration::current(),
            data_dir: data_dir.into(),
        }
    }

    pub fn build_configuration(&self) -> BuildConfiguration {
        self.build
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOGS_DIR).join(LOG_NAME)
    }

    pub fn configuration_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_NAME)
    }

    pub fn languages_path(&self) -> PathBuf {
        self.data_dir.join(LANGUAGES_DIR)
    }

    /// Создаёт каталог данных и каталог логов.
    pub fn prepare(&self) -> Result<(), EnvironmentError> {
        for dir in [self.data_dir.clone(), self.data_dir.join(LOGS_DIR)] {
            fs::create_dir_all(&dir).map_err(|source| EnvironmentError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// `en_US.UTF-8` -> `en-US`; по умолчанию `en-US`.
    pub fn current_locale(&self) -> String {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find_map(|value| normalize_locale(&value))
            .unwrap_or_else(|| "en-US".to_string())
    }
}

fn normalize_locale(value: &str) -> Option<String> {
    let base = value.split(['.', '@']).next()?.trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

fn executable_dir() -> Option<PathBuf> {
    env::current_exe().ok()?.parent().map(Path::to_path_buf)
}

fn user_data_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        return env::var_os("APPDATA").map(PathBuf::from);
    }
    env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_data_dir() {
        let env = Environment::with_data_dir("/tmp/taskies-test");
        assert_eq!(env.database_path(), PathBuf::from("/tmp/taskies-test/taskies.db"));
        assert_eq!(env.log_path(), PathBuf::from("/tmp/taskies-test/logs/taskies.log"));
        assert_eq!(env.configuration_path(), PathBuf::from("/tmp/taskies-test/taskies.toml"));
        assert_eq!(env.languages_path(), PathBuf::from("/tmp/taskies-test/lang"));
    }

    #[test]
    fn explicit_dir_wins() -> Result<(), EnvironmentError> {
        let env = Environment::resolve(Some(PathBuf::from("/srv/taskies")))?;
        assert_eq!(env.data_dir(), Path::new("/srv/taskies"));
        Ok(())
    }

    #[test]
    fn prepare_creates_directories() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let env = Environment::with_data_dir(dir.path().join("nested"));
        env.prepare()?;
        assert!(env.data_dir().is_dir());
        assert!(env.log_path().parent().map(Path::is_dir).unwrap_or(false));
        Ok(())
    }

    #[test]
    fn locale_normalization() {
        assert_eq!(normalize_locale("en_US.UTF-8").as_deref(), Some("en-US"));
        assert_eq!(normalize_locale("ru_RU@euro").as_deref(), Some("ru-RU"));
        assert_eq!(normalize_locale("C"), None);
        assert_eq!(normalize_locale(""), None);
    }
}
