use log::{trace, warn};
use rusqlite::{params, Connection};

use super::error::MigrationError;
use super::migration::MigrationHistoryRecord;

pub const MIGRATION_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS migration_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
)
"#;

/// Журнал применённых миграций.
///
/// Строки только добавляются: ни обновлений, ни удалений.
/// Работает поверх переданного соединения (или транзакции — `Transaction`
/// разыменовывается в `Connection`), своего соединения не держит.
pub struct MigrationHistory<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationHistory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// CREATE TABLE IF NOT EXISTS ...
    pub fn ensure_schema(&self) -> Result<(), MigrationError> {
        self.conn
            .execute(MIGRATION_HISTORY_TABLE, [])
            .map_err(MigrationError::HistorySchema)?;
        Ok(())
    }

    /// Есть ли журнал в базе. Ничего не создаёт.
    pub fn table_exists(&self) -> Result<bool, MigrationError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'migration_history'",
                [],
                |row| row.get(0),
            )
            .map_err(MigrationError::HistorySchema)?;
        Ok(count > 0)
    }

    pub fn exists(&self, name: &str) -> Result<bool, MigrationError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM migration_history WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map_err(MigrationError::HistorySchema)?;

        if count > 1 {
            warn!("Migration '{}' is recorded {} times in history", name, count);
        }
        trace!("History lookup '{}': {}", name, count);
        Ok(count > 0)
    }

    /// Добавляет запись и возвращает её id.
    pub fn record(&self, name: &str) -> Result<i64, MigrationError> {
        self.conn
            .execute(
                "INSERT INTO migration_history (name) VALUES (?1)",
                params![name],
            )
            .map_err(|source| MigrationError::HistoryRecord {
                name: name.to_string(),
                source,
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn applied(&self) -> Result<Vec<MigrationHistoryRecord>, MigrationError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM migration_history ORDER BY id ASC")
            .map_err(MigrationError::HistorySchema)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MigrationHistoryRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(MigrationError::HistorySchema)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(MigrationError::HistorySchema)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_schema_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let history = MigrationHistory::new(&conn);
        history.ensure_schema()?;
        history.record("0001_init")?;
        history.ensure_schema()?;

        assert!(history.exists("0001_init")?);
        assert_eq!(history.applied()?.len(), 1);
        Ok(())
    }

    #[test]
    fn table_exists_does_not_create() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let history = MigrationHistory::new(&conn);
        assert!(!history.table_exists()?);
        assert!(!history.table_exists()?);

        history.ensure_schema()?;
        assert!(history.table_exists()?);
        Ok(())
    }

    #[test]
    fn record_then_exists() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let history = MigrationHistory::new(&conn);
        history.ensure_schema()?;

        assert!(!history.exists("0001_init")?);
        let first = history.record("0001_init")?;
        let second = history.record("0002_clients")?;
        assert!(second > first);
        assert!(history.exists("0001_init")?);

        let names: Vec<String> = history.applied()?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["0001_init", "0002_clients"]);
        Ok(())
    }

    #[test]
    fn duplicate_record_fails_loudly() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let history = MigrationHistory::new(&conn);
        history.ensure_schema()?;
        history.record("0001_init")?;

        let err = history.record("0001_init").unwrap_err();
        assert!(matches!(err, MigrationError::HistoryRecord { ref name, .. } if name == "0001_init"));
        Ok(())
    }

    #[test]
    fn duplicate_rows_still_count_as_applied() -> Result<(), Box<dyn std::error::Error>> {
        // Старая таблица без UNIQUE: такое бывает только в испорченной базе.
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE migration_history (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL);
             INSERT INTO migration_history (name) VALUES ('0001_init');
             INSERT INTO migration_history (name) VALUES ('0001_init');",
        )?;
        let history = MigrationHistory::new(&conn);
        history.ensure_schema()?;
        assert!(history.exists("0001_init")?);
        Ok(())
    }

    #[test]
    fn lookup_without_table_is_history_error() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let err = MigrationHistory::new(&conn).exists("0001_init").unwrap_err();
        assert!(matches!(err, MigrationError::HistorySchema(_)));
        Ok(())
    }
}
