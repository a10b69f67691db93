// src/db/settings.rs
//
// Хранилище состояния интерфейса (размеры окон, последние выбранные вкладки и т.п.)
// в таблице `persistent_objects`, которую создаёт первая вшитая миграция.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use thiserror::Error;
use tokio_rusqlite::Connection;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("SqlError: {0}")]
    Sql(#[from] tokio_rusqlite::Error),

    #[error("value '{value}' stored under '{key}' is not a valid {kind:?}")]
    InvalidValue {
        key: String,
        kind: SettingKind,
        value: String,
    },
}

/// Ключ вида `kind/name/field`, например `Frame/MainFrame/Width`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingKey {
    pub kind: String,
    pub name: String,
    pub field: String,
}

impl SettingKey {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            field: field.into(),
        }
    }
}

impl Display for SettingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.name, self.field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKind {
    Bool,
    Int,
    Long,
    Text,
}

/// Значение настройки. Вместо указателей-«выходных параметров» — один тип-сумма.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Text(String),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::Int(_) => SettingKind::Int,
            SettingValue::Long(_) => SettingKind::Long,
            SettingValue::Text(_) => SettingKind::Text,
        }
    }

    // Всё хранится текстом; bool — как "1"/"0".
    fn encode(&self) -> String {
        match self {
            SettingValue::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            SettingValue::Int(i) => i.to_string(),
            SettingValue::Long(l) => l.to_string(),
            SettingValue::Text(s) => s.clone(),
        }
    }

    fn decode(key: &SettingKey, kind: SettingKind, raw: String) -> Result<Self, SettingsError> {
        let invalid = |value: &str| SettingsError::InvalidValue {
            key: key.to_string(),
            kind,
            value: value.to_string(),
        };
        match kind {
            SettingKind::Bool => raw
                .trim()
                .parse::<i64>()
                .map(|v| SettingValue::Bool(v > 0))
                .map_err(|_| invalid(&raw)),
            SettingKind::Int => raw
                .trim()
                .parse::<i32>()
                .map(SettingValue::Int)
                .map_err(|_| invalid(&raw)),
            SettingKind::Long => raw
                .trim()
                .parse::<i64>()
                .map(SettingValue::Long)
                .map_err(|_| invalid(&raw)),
            SettingKind::Text => Ok(SettingValue::Text(raw)),
        }
    }
}

/// Асинхронный репозиторий настроек.
pub struct PersistenceStore {
    conn: Arc<Connection>,
}

impl PersistenceStore {
    pub fn new(conn: Arc<Connection>) -> Self {
        Self { conn }
    }

    /// INSERT OR REPLACE
    pub async fn save(&self, key: &SettingKey, value: SettingValue) -> Result<(), SettingsError> {
        let key = key.to_string();
        let encoded = value.encode();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO persistent_objects (key, value) VALUES (?1, ?2)",
                    params![key, encoded],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// `None`, если ключа нет (или значение NULL).
    pub async fn restore(
        &self,
        key: &SettingKey,
        kind: SettingKind,
    ) -> Result<Option<SettingValue>, SettingsError> {
        let raw_key = key.to_string();
        let raw: Option<String> = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM persistent_objects WHERE key = ?1",
                        params![raw_key],
                        |row| row.get::<_, Option<String>>(0),
                    )
                    .optional()?;
                Ok(value.flatten())
            })
            .await?;

        raw.map(|r| SettingValue::decode(key, kind, r)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::migrate_async;
    use crate::db::registry::EmbeddedRegistry;

    async fn store() -> Result<PersistenceStore, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory().await?;
        migrate_async(&conn, EmbeddedRegistry).await?;
        Ok(PersistenceStore::new(Arc::new(conn)))
    }

    #[test]
    fn key_format() {
        let key = SettingKey::new("Frame", "MainFrame", "Width");
        assert_eq!(key.to_string(), "Frame/MainFrame/Width");
    }

    #[tokio::test]
    async fn save_and_restore_each_kind() -> Result<(), Box<dyn std::error::Error>> {
        let store = store().await?;
        let cases = [
            (SettingKey::new("Frame", "Main", "Maximized"), SettingValue::Bool(true)),
            (SettingKey::new("Frame", "Main", "Width"), SettingValue::Int(-1280)),
            (SettingKey::new("Frame", "Main", "Stamp"), SettingValue::Long(1_700_000_000_123)),
            (SettingKey::new("Book", "Tabs", "Selected"), SettingValue::Text("tasks".into())),
        ];
        for (key, value) in &cases {
            store.save(key, value.clone()).await?;
        }
        for (key, value) in &cases {
            assert_eq!(store.restore(key, value.kind()).await?, Some(value.clone()));
        }
        Ok(())
    }

    #[tokio::test]
    async fn save_replaces_existing_value() -> Result<(), Box<dyn std::error::Error>> {
        let store = store().await?;
        let key = SettingKey::new("Frame", "Main", "Maximized");
        store.save(&key, SettingValue::Bool(true)).await?;
        store.save(&key, SettingValue::Bool(false)).await?;
        assert_eq!(
            store.restore(&key, SettingKind::Bool).await?,
            Some(SettingValue::Bool(false))
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_key_is_none() -> Result<(), Box<dyn std::error::Error>> {
        let store = store().await?;
        let key = SettingKey::new("Frame", "Nope", "Width");
        assert_eq!(store.restore(&key, SettingKind::Int).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_kind_is_invalid_value() -> Result<(), Box<dyn std::error::Error>> {
        let store = store().await?;
        let key = SettingKey::new("Book", "Tabs", "Selected");
        store.save(&key, SettingValue::Text("tasks".into())).await?;
        let err = store.restore(&key, SettingKind::Int).await.unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { kind: SettingKind::Int, .. }));
        Ok(())
    }

    #[tokio::test]
    async fn without_migrations_store_reports_sql_error() -> Result<(), Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory().await?;
        let store = PersistenceStore::new(Arc::new(conn));
        let err = store
            .save(&SettingKey::new("a", "b", "c"), SettingValue::Int(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::Sql(_)));
        Ok(())
    }
}
