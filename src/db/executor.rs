// src/db/executor.rs
//
// Выполнение скрипта миграции, в котором может быть несколько инструкций подряд.
// Своего разборщика SQL нет: каждую следующую инструкцию готовит сам SQLite
// (prepare возвращает «хвост» скрипта), см. `rusqlite::Batch`.

use log::trace;
use rusqlite::{Batch, Connection, Statement};

use super::error::ScriptError;

/// Ленивая, конечная и одноразовая последовательность инструкций скрипта.
///
/// Заканчивается, когда хвост пуст или в нём остались только пробелы/комментарии.
/// После первой ошибки больше ничего не отдаёт.
pub struct ScriptStatements<'conn, 'sql> {
    batch: Batch<'conn, 'sql>,
    index: usize,
    finished: bool,
}

impl<'conn, 'sql> ScriptStatements<'conn, 'sql> {
    pub fn new(conn: &'conn Connection, script: &'sql str) -> Self {
        Self {
            batch: Batch::new(conn, script),
            index: 0,
            finished: false,
        }
    }
}

impl<'conn> Iterator for ScriptStatements<'conn, '_> {
    /// Номер инструкции (с единицы) и подготовленная инструкция.
    type Item = Result<(usize, Statement<'conn>), ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.batch.next() {
            Ok(Some(stmt)) => {
                self.index += 1;
                Some(Ok((self.index, stmt)))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(source) => {
                self.finished = true;
                Some(Err(ScriptError {
                    index: self.index + 1,
                    source,
                }))
            }
        }
    }
}

/// Выполняет все инструкции скрипта по порядку, возвращает их количество.
///
/// Строки, которые возвращает инструкция (например `PRAGMA`), вычитываются до конца.
/// Первая же ошибка прерывает скрипт.
pub fn execute_script(conn: &Connection, script: &str) -> Result<usize, ScriptError> {
    let mut executed = 0;
    for item in ScriptStatements::new(conn, script) {
        let (index, mut stmt) = item?;
        step_to_completion(&mut stmt).map_err(|source| ScriptError { index, source })?;
        trace!("Executed statement {}", index);
        executed = index;
    }
    Ok(executed)
}

fn step_to_completion(stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}
