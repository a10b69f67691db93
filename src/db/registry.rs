// src/db/registry.rs
//
// Источники миграций. Движку всё равно, откуда взялись скрипты:
// ему нужна только упорядоченная последовательность `Migration`.

use log::debug;
use rust_embed::Embed;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::MigrationError;
use super::migration::Migration;

/// Упорядоченный список миграций.
///
/// Порядок, который вернул реестр, и есть порядок применения.
pub trait MigrationRegistry {
    fn migrations(&self) -> Result<Vec<Migration>, MigrationError>;
}

/// Скрипты из каталога `migrations/`, вшитые в бинарник при сборке.
/// Порядок — лексикографический по имени.
#[derive(Embed)]
#[folder = "migrations/"]
struct MigrationAssets;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedRegistry;

impl MigrationRegistry for EmbeddedRegistry {
    fn migrations(&self) -> Result<Vec<Migration>, MigrationError> {
        let mut migrations = Vec::new();
        for file in MigrationAssets::iter() {
            if !is_sql_file(Path::new(file.as_ref())) {
                continue;
            }
            let asset = MigrationAssets::get(file.as_ref()).ok_or_else(|| {
                MigrationError::Registry(format!("embedded migration '{file}' is missing"))
            })?;
            let script = String::from_utf8(asset.data.into_owned()).map_err(|e| {
                MigrationError::Registry(format!("embedded migration '{file}' is not UTF-8: {e}"))
            })?;
            migrations.push(Migration::from_file_name(file.as_ref(), script)?);
        }
        sort_by_name(&mut migrations);
        validate(&migrations)?;
        debug!("Embedded registry holds {} migrations", migrations.len());
        Ok(migrations)
    }
}

/// `*.sql` из каталога на диске. Порядок — лексикографический по имени.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    dir: PathBuf,
}

impl DirectoryRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MigrationRegistry for DirectoryRegistry {
    fn migrations(&self) -> Result<Vec<Migration>, MigrationError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            MigrationError::Registry(format!("cannot read {}: {e}", self.dir.display()))
        })?;

        let mut migrations = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| MigrationError::Registry(format!("cannot read {}: {e}", self.dir.display())))?
                .path();
            if !path.is_file() || !is_sql_file(&path) {
                continue;
            }
            let script = fs::read_to_string(&path).map_err(|e| {
                MigrationError::Registry(format!("cannot read {}: {e}", path.display()))
            })?;
            let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
                MigrationError::Registry(format!("non UTF-8 file name: {}", path.display()))
            })?;
            migrations.push(Migration::from_file_name(file_name, script)?);
        }
        sort_by_name(&mut migrations);
        validate(&migrations)?;
        debug!("Loaded {} migrations from {}", migrations.len(), self.dir.display());
        Ok(migrations)
    }
}

/// Список в памяти. Порядок сохраняется как есть (в том числе дубликаты).
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    migrations: Vec<Migration>,
}

impl MemoryRegistry {
    pub fn new(migrations: Vec<Migration>) -> Self {
        Self { migrations }
    }

    pub fn push(&mut self, name: impl Into<String>, script: impl Into<String>) -> &mut Self {
        self.migrations.push(Migration::new(name, script));
        self
    }
}

impl MigrationRegistry for MemoryRegistry {
    fn migrations(&self) -> Result<Vec<Migration>, MigrationError> {
        validate(&self.migrations)?;
        Ok(self.migrations.clone())
    }
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("sql"))
        .unwrap_or(false)
}

// Стабильная сортировка: одинаковые имена остаются в исходном порядке.
fn sort_by_name(migrations: &mut [Migration]) {
    migrations.sort_by(|a, b| a.name.cmp(&b.name));
}

fn validate(migrations: &[Migration]) -> Result<(), MigrationError> {
    if let Some(pos) = migrations.iter().position(|m| m.name.trim().is_empty()) {
        return Err(MigrationError::Registry(format!(
            "migration #{} has an empty name",
            pos + 1
        )));
    }
    Ok(())
}
