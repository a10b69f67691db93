// src/db/migration.rs

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::MigrationError;

/// Одна миграция: стабильное имя + сырой SQL (может содержать несколько инструкций).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub name: String,
    pub script: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
        }
    }

    /// `0002_clients.sql` -> `0002_clients`.
    /// Каталоги в пути отбрасываются, остаётся только имя файла без расширения.
    pub fn from_file_name(file_name: &str, script: String) -> Result<Self, MigrationError> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                MigrationError::Registry(format!("cannot derive migration name from '{file_name}'"))
            })?;
        Ok(Self::new(stem, script))
    }
}

/// Строка таблицы `migration_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationHistoryRecord {
    pub id: i64,
    pub name: String,
}

/// Итог успешного прогона.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl MigrationReport {
    /// Ничего не применено: схема уже актуальна.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Что уже применено (в порядке журнала) и что ещё ждёт (в порядке реестра).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
}

/// Состояния одного вызова `Migrator::migrate`.
///
/// `Aborted` — прогон остановлен до открытия транзакции (журнал, реестр, BEGIN),
/// `RolledBack` — транзакция была открыта и откачена.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationState {
    NotStarted,
    HistoryEnsured,
    TransactionOpen,
    Committed,
    RolledBack,
    Aborted,
}

impl MigrationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MigrationState::Committed | MigrationState::RolledBack | MigrationState::Aborted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_file_stem() -> Result<(), MigrationError> {
        let m = Migration::from_file_name("0002_clients.sql", "SELECT 1;".to_string())?;
        assert_eq!(m.name, "0002_clients");

        let nested = Migration::from_file_name("core/0003_projects.sql", String::new())?;
        assert_eq!(nested.name, "0003_projects");
        Ok(())
    }

    #[test]
    fn empty_file_name_is_rejected() {
        let err = Migration::from_file_name("", String::new()).unwrap_err();
        assert!(matches!(err, MigrationError::Registry(_)));
    }

    #[test]
    fn terminal_states() {
        assert!(MigrationState::Committed.is_terminal());
        assert!(MigrationState::RolledBack.is_terminal());
        assert!(MigrationState::Aborted.is_terminal());
        assert!(!MigrationState::TransactionOpen.is_terminal());
    }

    #[test]
    fn report_noop() {
        let mut report = MigrationReport::default();
        assert!(report.is_noop());
        report.skipped.push("0001_init".into());
        assert!(report.is_noop());
        report.applied.push("0002_more".into());
        assert!(!report.is_noop());
    }
}
