// src/db/mod.rs
//
// Здесь:
// 1) подключаем модули движка миграций и хранилища настроек,
// 2) открываем файл базы с нужными PRAGMA,
// 3) регистрируем hooks (логируем commit/rollback).

pub mod error;
pub mod executor;
pub mod history;
pub mod migration;
pub mod migrations;
pub mod monitoring;
pub mod registry;
pub mod settings;

use log::debug;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use error::MigrationError;

/// Открывает (или создаёт) файл базы и включает внешние ключи.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection, MigrationError> {
    let path = path.as_ref();
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(MigrationError::Connection)?;
    enable_foreign_keys(&conn)?;
    debug!("Opened database {}", path.display());
    Ok(conn)
}

pub fn enable_foreign_keys(conn: &Connection) -> Result<(), MigrationError> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(MigrationError::Connection)
}

// commit_hook / rollback_hook: только логирование.
pub fn register_hooks(conn: &Connection) {
    conn.commit_hook(Some(|| {
        debug!("::HOOK:: Commit detected");
        // true превратил бы commit в rollback
        false
    }));

    conn.rollback_hook(Some(|| {
        debug!("::HOOK:: Rollback detected");
    }));
}
