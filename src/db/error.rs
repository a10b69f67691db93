// src/db/error.rs

use thiserror::Error;

/// Ошибки прогона миграций.
///
/// Любая из них означает, что схема не была приведена к актуальной версии
/// и приложение не должно продолжать запуск.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("cannot open database: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("database worker is unavailable: {0}")]
    ConnectionClosed(#[from] tokio_rusqlite::Error),

    #[error("cannot create or read migration history: {0}")]
    HistorySchema(#[source] rusqlite::Error),

    #[error("migration '{name}' failed at statement {index}: {source}")]
    ScriptExecution {
        name: String,
        index: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot record migration '{name}' in history: {source}")]
    HistoryRecord {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration transaction failed: {0}")]
    Transaction(#[source] rusqlite::Error),

    #[error("migration registry error: {0}")]
    Registry(String),
}

impl MigrationError {
    /// Имя миграции, на которой упал прогон (если ошибка к ней относится).
    pub fn migration_name(&self) -> Option<&str> {
        match self {
            MigrationError::ScriptExecution { name, .. }
            | MigrationError::HistoryRecord { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Ошибка выполнения отдельной инструкции внутри скрипта.
/// `index` считается с единицы.
#[derive(Debug, Error)]
#[error("statement {index}: {source}")]
pub struct ScriptError {
    pub index: usize,
    #[source]
    pub source: rusqlite::Error,
}

impl ScriptError {
    pub fn into_migration_error(self, name: &str) -> MigrationError {
        MigrationError::ScriptExecution {
            name: name.to_string(),
            index: self.index,
            source: self.source,
        }
    }
}
