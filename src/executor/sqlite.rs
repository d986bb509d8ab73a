//! SQLite execution backend
//!
//! Renders every step with [`Dialect::Sqlite`] and runs the whole plan in one
//! deferred transaction, so all steps read the same snapshot. While a step is
//! running, cancelling the request interrupts the connection.

use super::{
    log_sql, log_stmt, CancelToken, ExecutionPlan, ExecutionTimer, LogLevel, QueryExecutor,
    StepOutput,
};
use crate::ast::{render_with, Dialect, Param, ParamValue};
use crate::error::{ExecutionError, GraphQLError, GraphQLResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode, TransactionBehavior};

/// [`QueryExecutor`] over a single SQLite connection
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
    log_level: LogLevel,
}

impl SqliteExecutor {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            log_level: LogLevel::Off,
        }
    }

    pub fn open_in_memory() -> GraphQLResult<Self> {
        let conn = Connection::open_in_memory().map_err(backend_error)?;
        Ok(Self::new(conn))
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Exclusive access to the underlying connection, e.g. for migrations
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    fn run_step(
        tx: &rusqlite::Transaction<'_>,
        sql: &str,
        params: &[Param],
    ) -> rusqlite::Result<Vec<Vec<ParamValue>>> {
        let mut stmt = tx.prepare(sql)?;
        let column_count = stmt.column_count();

        let mut ordered: Vec<&Param> = params.iter().collect();
        ordered.sort_by_key(|p| p.index);
        let bound = ordered.into_iter().map(|p| to_sqlite_value(&p.value));

        let mut rows = stmt.query(params_from_iter(bound))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(from_sqlite_value(row.get_ref(i)?)?);
            }
            out.push(values);
        }
        Ok(out)
    }
}

impl QueryExecutor for SqliteExecutor {
    fn execute_read(
        &self,
        plan: &ExecutionPlan,
        cancel: &CancelToken,
    ) -> GraphQLResult<Vec<StepOutput>> {
        let steps = plan.steps_in_order()?;
        cancel.check()?;

        let mut conn = self.conn.lock();
        let handle = conn.get_interrupt_handle();
        let _interrupt = cancel.register_interrupt(move || handle.interrupt());

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(backend_error)?;

        let mut outputs = Vec::with_capacity(steps.len());
        for step in steps {
            cancel.check()?;

            let sql = render_with(&step.stmt, Dialect::Sqlite);
            log_sql(self.log_level, &step.id, &sql, &step.params);
            log_stmt(self.log_level, &step.id, &step.stmt, Dialect::Sqlite);

            let timer = ExecutionTimer::new(self.log_level, step.id.as_str());
            let rows = match Self::run_step(&tx, &sql, &step.params) {
                Ok(rows) => rows,
                Err(e) => {
                    let err = classify(e, cancel);
                    timer.failure(&err.to_string());
                    return Err(err);
                }
            };
            timer.success();

            // An interrupt may land after the last row was read
            cancel.check()?;
            tracing::debug!(step = %step.id, rows = rows.len(), "step fetched");
            outputs.push(StepOutput::new(step.id.as_str(), rows));
        }

        tx.commit().map_err(backend_error)?;
        Ok(outputs)
    }
}

fn to_sqlite_value(value: &ParamValue) -> Value {
    match value {
        ParamValue::Null => Value::Null,
        ParamValue::Bool(b) => Value::Integer(i64::from(*b)),
        ParamValue::String(s) => Value::Text(s.clone()),
        ParamValue::Integer(n) => Value::Integer(*n),
        ParamValue::Float(f) => Value::Real(*f),
        ParamValue::Json(v) => Value::Text(v.to_string()),
    }
}

fn from_sqlite_value(value: ValueRef<'_>) -> rusqlite::Result<ParamValue> {
    Ok(match value {
        ValueRef::Null => ParamValue::Null,
        ValueRef::Integer(n) => ParamValue::Integer(n),
        ValueRef::Real(f) => ParamValue::Float(f),
        ValueRef::Text(bytes) => ParamValue::String(
            std::str::from_utf8(bytes)
                .map_err(rusqlite::Error::Utf8Error)?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => ParamValue::String(STANDARD.encode(bytes)),
    })
}

fn classify(err: rusqlite::Error, cancel: &CancelToken) -> GraphQLError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.code {
            ErrorCode::OperationInterrupted if cancel.is_cancelled() => {
                return ExecutionError::Cancelled.into();
            }
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                return GraphQLError::sql_execution(err.to_string(), true);
            }
            _ => {}
        }
    }
    backend_error(err)
}

fn backend_error(err: rusqlite::Error) -> GraphQLError {
    GraphQLError::sql_execution(err.to_string(), false)
}
