// src/db/migrations.rs
//
// Приведение схемы к последней версии:
// 1) журнал `migration_history` (создаём, если нет),
// 2) одна транзакция на весь прогон,
// 3) миграции строго в порядке реестра, уже применённые пропускаем,
// 4) любая ошибка -> откат всего прогона, включая успешно выполненные ранее миграции.

use log::{debug, error, info};
use rusqlite::{Connection, Transaction};
use std::collections::HashSet;

use super::error::MigrationError;
use super::executor::execute_script;
use super::history::MigrationHistory;
use super::migration::{Migration, MigrationReport, MigrationState, MigrationStatus};
use super::monitoring::{measure_migration_run, MIGRATIONS_APPLIED, MIGRATIONS_SKIPPED};
use super::registry::{EmbeddedRegistry, MigrationRegistry};

/// Движок миграций. На время прогона владеет соединением эксклюзивно.
pub struct Migrator<'c> {
    conn: &'c mut Connection,
    state: MigrationState,
}

impl<'c> Migrator<'c> {
    pub fn new(conn: &'c mut Connection) -> Self {
        Self {
            conn,
            state: MigrationState::NotStarted,
        }
    }

    /// Состояние последнего (или текущего) прогона.
    pub fn state(&self) -> MigrationState {
        self.state
    }

    pub fn migrate<R>(&mut self, registry: &R) -> Result<MigrationReport, MigrationError>
    where
        R: MigrationRegistry + ?Sized,
    {
        self.state = MigrationState::NotStarted;
        measure_migration_run(|| self.run(registry))
    }

    fn run<R>(&mut self, registry: &R) -> Result<MigrationReport, MigrationError>
    where
        R: MigrationRegistry + ?Sized,
    {
        if let Err(e) = MigrationHistory::new(self.conn).ensure_schema() {
            error!("Cannot create migration history table: {}", e);
            advance(&mut self.state, MigrationState::Aborted);
            return Err(e);
        }
        advance(&mut self.state, MigrationState::HistoryEnsured);

        let migrations = registry.migrations().map_err(|e| {
            advance(&mut self.state, MigrationState::Aborted);
            e
        })?;

        let tx = self.conn.transaction().map_err(|e| {
            advance(&mut self.state, MigrationState::Aborted);
            MigrationError::Transaction(e)
        })?;
        advance(&mut self.state, MigrationState::TransactionOpen);

        match apply_pending(&tx, &migrations) {
            Ok(report) => {
                if let Err(e) = tx.commit() {
                    // Drop транзакции откатит её сам.
                    error!("Failed to commit migrations: {}", e);
                    advance(&mut self.state, MigrationState::RolledBack);
                    return Err(MigrationError::Transaction(e));
                }
                advance(&mut self.state, MigrationState::Committed);

                MIGRATIONS_APPLIED.inc_by(report.applied.len() as u64);
                MIGRATIONS_SKIPPED.inc_by(report.skipped.len() as u64);
                if report.is_noop() {
                    info!("Database schema is up to date ({} migrations known)", migrations.len());
                } else {
                    info!("Applied {} migration(s)", report.applied.len());
                }
                Ok(report)
            }
            Err(e) => {
                error!("Migration run aborted: {}", e);
                if let Err(rollback_err) = tx.rollback() {
                    error!("Failed to roll back migrations: {}", rollback_err);
                }
                advance(&mut self.state, MigrationState::RolledBack);
                Err(e)
            }
        }
    }
}

fn advance(state: &mut MigrationState, next: MigrationState) {
    debug!("Migration state {:?} -> {:?}", state, next);
    *state = next;
}

fn apply_pending(tx: &Transaction<'_>, migrations: &[Migration]) -> Result<MigrationReport, MigrationError> {
    let history = MigrationHistory::new(tx);
    let mut report = MigrationReport::default();

    for migration in migrations {
        if history.exists(&migration.name)? {
            debug!("Skipping already applied migration '{}'", migration.name);
            report.skipped.push(migration.name.clone());
            continue;
        }

        let statements = execute_script(tx, &migration.script)
            .map_err(|e| e.into_migration_error(&migration.name))?;
        history.record(&migration.name)?;

        info!("Applied migration '{}' ({} statements)", migration.name, statements);
        report.applied.push(migration.name.clone());
    }

    Ok(report)
}

/// Сравнение журнала с реестром без записи в базу.
///
/// Нет журнала -> ничего не применено. Повторяющиеся имена реестра попадают в `pending` один раз.
pub fn migration_status<R>(conn: &Connection, registry: &R) -> Result<MigrationStatus, MigrationError>
where
    R: MigrationRegistry + ?Sized,
{
    let history = MigrationHistory::new(conn);
    let applied: Vec<String> = if history.table_exists()? {
        history.applied()?.into_iter().map(|r| r.name).collect()
    } else {
        Vec::new()
    };

    let mut seen: HashSet<String> = applied.iter().cloned().collect();
    let pending = registry
        .migrations()?
        .into_iter()
        .map(|m| m.name)
        .filter(|name| seen.insert(name.clone()))
        .collect();

    Ok(MigrationStatus { applied, pending })
}

/// Прогон вшитых миграций на уже открытом соединении.
pub fn setup_migrations(conn: &mut Connection) -> Result<MigrationReport, MigrationError> {
    Migrator::new(conn).migrate(&EmbeddedRegistry)
}

/// То же самое через асинхронное соединение: движок выполняется в потоке соединения.
pub async fn migrate_async<R>(
    conn: &tokio_rusqlite::Connection,
    registry: R,
) -> Result<MigrationReport, MigrationError>
where
    R: MigrationRegistry + Send + 'static,
{
    conn.call(move |conn| Ok(Migrator::new(conn).migrate(&registry)))
        .await?
}
