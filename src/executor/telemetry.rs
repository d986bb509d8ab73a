//! Telemetry and logging for SQL execution
//!
//! Events go through `tracing`; what gets emitted is governed by a
//! [`LogLevel`] carried in [`crate::config::EngineConfig`]. The level can be
//! seeded from the environment.
//!
//! # Configuration
//!
//! Set the `TRACKER_GRAPHQL_LOG_LEVEL` environment variable to one of:
//! - `off` - No logging (default)
//! - `basic` - Log SQL and timing only
//! - `detailed` - Log full SQL, parameters, and plan tags
//! - `debug` - Additionally log pretty-printed SQL
//!
//! # Example
//!
//! ```bash
//! export TRACKER_GRAPHQL_LOG_LEVEL=detailed
//! ```

use super::ExecutionPlan;
use crate::ast::{render_pretty, Dialect, Param, Stmt};
use serde::Deserialize;
use std::time::Instant;

/// Environment variable consulted by [`get_log_level`]
pub const LOG_LEVEL_ENV: &str = "TRACKER_GRAPHQL_LOG_LEVEL";

/// SQL longer than this is truncated below [`LogLevel::Detailed`]
const BASIC_SQL_LIMIT: usize = 1000;

/// Log level for SQL telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging
    #[default]
    Off = 0,
    /// Basic info: SQL and timing
    Basic = 1,
    /// Detailed: full SQL, parameters, plan tags
    Detailed = 2,
    /// Debug: everything including pretty SQL
    Debug = 3,
}

impl LogLevel {
    /// Parse from string. Unknown values mean `Off`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "basic" => Self::Basic,
            "detailed" => Self::Detailed,
            "debug" => Self::Debug,
            _ => Self::Off,
        }
    }
}

/// Get the log level from the environment
pub fn get_log_level() -> LogLevel {
    std::env::var(LOG_LEVEL_ENV)
        .map(|s| LogLevel::from_str(&s))
        .unwrap_or(LogLevel::Off)
}

fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Log an execution plan before it runs
pub fn log_plan(level: LogLevel, plan: &ExecutionPlan) {
    if level < LogLevel::Basic {
        return;
    }

    tracing::info!(
        steps = plan.steps.len(),
        table = plan.telemetry.table.as_deref().unwrap_or(""),
        operation = plan.telemetry.operation_name.as_deref().unwrap_or(""),
        elapsed_ms = plan.telemetry.elapsed_ms() as u64,
        "execution plan"
    );

    if level >= LogLevel::Detailed {
        for (key, value) in &plan.telemetry.tags {
            tracing::info!(tag = %key, value = %value, "plan tag");
        }
    }
}

/// Log one statement about to be executed
pub fn log_sql(level: LogLevel, step: &str, sql: &str, params: &[Param]) {
    if level < LogLevel::Basic {
        return;
    }

    let sql_display = if level >= LogLevel::Detailed {
        sql.to_string()
    } else {
        truncate(sql, BASIC_SQL_LIMIT)
    };
    tracing::info!(step, sql = %sql_display, "executing");

    if level >= LogLevel::Detailed {
        for param in params {
            tracing::info!(
                step,
                index = param.index,
                value = ?param.value,
                sql_type = %param.sql_type,
                "param"
            );
        }
    }
}

/// Log the pretty-printed form of a statement
pub fn log_stmt(level: LogLevel, step: &str, stmt: &Stmt, dialect: Dialect) {
    if level < LogLevel::Debug {
        return;
    }
    tracing::debug!(step, "\n{}", render_pretty(stmt, dialect));
}

/// Log the outcome of a step or plan
pub fn log_result(level: LogLevel, context: &str, start: Instant, success: bool) {
    if level < LogLevel::Basic {
        return;
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    if success {
        tracing::info!(context, elapsed_ms, "completed");
    } else {
        tracing::warn!(context, elapsed_ms, "failed");
    }
}

/// Log an error
pub fn log_error(level: LogLevel, context: &str, error: &str) {
    if level < LogLevel::Basic {
        return;
    }
    tracing::warn!(context, error, "execution error");
}

/// A guard that logs execution timing on drop
pub struct ExecutionTimer {
    start: Instant,
    context: String,
    level: LogLevel,
    logged: bool,
}

impl ExecutionTimer {
    /// Start a new execution timer
    pub fn new(level: LogLevel, context: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            context: context.into(),
            level,
            logged: false,
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Mark as successful and log
    pub fn success(mut self) {
        self.logged = true;
        log_result(self.level, &self.context, self.start, true);
    }

    /// Mark as failed and log
    pub fn failure(mut self, error: &str) {
        self.logged = true;
        log_error(self.level, &self.context, error);
        log_result(self.level, &self.context, self.start, false);
    }
}

impl Drop for ExecutionTimer {
    fn drop(&mut self) {
        // Dropped without a verdict: an early return or a panic
        if !self.logged {
            log_result(self.level, &self.context, self.start, false);
        }
    }
}
