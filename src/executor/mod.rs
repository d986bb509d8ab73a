//! Execution of planned statements
//!
//! This module handles running the statements produced by [`crate::ast`]:
//!
//! - [`ExecutionPlan`]: one or more statements sharing a snapshot
//! - [`QueryExecutor`]: the backend seam, one implementation per database
//! - [`CancelToken`]: cooperative cancellation with interrupt hooks
//! - Telemetry and logging through `tracing`
//!
//! ```text
//! ExecutionPlan
//!   └── ExecutionStep[]
//!         ├── stmt: Stmt (AST)
//!         ├── params: Vec<Param>
//!         └── depends_on: Vec<StepId>
//! ```

mod cancel;
mod plan;
mod telemetry;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use cancel::*;
pub use plan::*;
pub use telemetry::*;

#[cfg(feature = "sqlite")]
pub use sqlite::*;

use crate::ast::ParamValue;
use crate::error::GraphQLResult;

/// Rows returned by one step, in select-list order
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Id of the [`ExecutionStep`] that produced the rows
    pub id: String,
    pub rows: Vec<Vec<ParamValue>>,
}

impl StepOutput {
    pub fn new(id: impl Into<String>, rows: Vec<Vec<ParamValue>>) -> Self {
        Self {
            id: id.into(),
            rows,
        }
    }
}

/// A database able to run read-only plans
///
/// Implementations run every step of the plan, in
/// [`ExecutionPlan::steps_in_order`] order, inside a single read
/// transaction, and return one [`StepOutput`] per step in that order. The
/// token is checked before and after each step; a cancelled request never
/// yields partial output.
pub trait QueryExecutor {
    fn execute_read(
        &self,
        plan: &ExecutionPlan,
        cancel: &CancelToken,
    ) -> GraphQLResult<Vec<StepOutput>>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn execute_read(
        &self,
        plan: &ExecutionPlan,
        cancel: &CancelToken,
    ) -> GraphQLResult<Vec<StepOutput>> {
        (**self).execute_read(plan, cancel)
    }
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for std::sync::Arc<E> {
    fn execute_read(
        &self,
        plan: &ExecutionPlan,
        cancel: &CancelToken,
    ) -> GraphQLResult<Vec<StepOutput>> {
        (**self).execute_read(plan, cancel)
    }
}
