// src/lib.rs

use log::{error, info};
use rusqlite::Connection;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;

pub mod config;
pub mod db;
pub mod environment;

pub use db::error::{MigrationError, ScriptError};
pub use db::migration::{
    Migration, MigrationHistoryRecord, MigrationReport, MigrationState, MigrationStatus,
};
pub use db::migrations::{migrate_async, migration_status, setup_migrations, Migrator};
pub use db::registry::{DirectoryRegistry, EmbeddedRegistry, MemoryRegistry, MigrationRegistry};

/// Открывает базу, прогоняет вшитые миграции и вешает hooks.
///
/// Ошибка здесь фатальна для запуска: с недомигрированной схемой работать нельзя.
pub fn init_database(path: impl AsRef<Path>) -> Result<Connection, MigrationError> {
    let mut conn = db::open_database(path)?;
    let report = setup_migrations(&mut conn)?;
    db::register_hooks(&conn);
    info!(
        "init_database success: {} applied, {} already present",
        report.applied.len(),
        report.skipped.len()
    );
    Ok(conn)
}

// ---------------------- Экспортируемые функции ----------------------

/// Прогон миграций для нативной оболочки приложения.
///
/// Возвращает `0`, если всё ок, `1` — база не открылась, `2` — миграции не прошли.
///
/// # Safety
/// `db_path` должен быть валидной C-строкой, завершённой нулём, либо null.
#[no_mangle]
pub unsafe extern "C" fn taskies_migrate(db_path: *const c_char) -> i32 {
    let _ = env_logger::try_init();

    if db_path.is_null() {
        error!("taskies_migrate: db_path is null");
        return 1;
    }
    let db_path_str = CStr::from_ptr(db_path).to_string_lossy().to_string();

    let mut conn = match db::open_database(&db_path_str) {
        Ok(conn) => conn,
        Err(e) => {
            error!("Cannot open db: {}", e);
            return 1;
        }
    };

    match setup_migrations(&mut conn) {
        Ok(_) => 0,
        Err(e) => {
            error!("setup_migrations error: {}", e);
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn init_database_migrates_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("taskies.db");

        let conn = init_database(&path)?;
        let applied: i64 = conn.query_row("SELECT COUNT(*) FROM migration_history", [], |r| r.get(0))?;
        assert_eq!(applied as usize, EmbeddedRegistry.migrations()?.len());
        drop(conn);

        // повторный запуск ничего не добавляет
        let conn = init_database(&path)?;
        let again: i64 = conn.query_row("SELECT COUNT(*) FROM migration_history", [], |r| r.get(0))?;
        assert_eq!(again, applied);
        Ok(())
    }

    #[test]
    fn c_abi_return_codes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let ok = CString::new(dir.path().join("taskies.db").to_string_lossy().into_owned())?;
        assert_eq!(unsafe { taskies_migrate(ok.as_ptr()) }, 0);

        let bad = CString::new("/definitely/not/here/taskies.db")?;
        assert_eq!(unsafe { taskies_migrate(bad.as_ptr()) }, 1);
        assert_eq!(unsafe { taskies_migrate(std::ptr::null()) }, 1);
        Ok(())
    }
}
