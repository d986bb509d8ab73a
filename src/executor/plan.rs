//! Execution plans
//!
//! A plan is an ordered set of read statements that must observe the same
//! snapshot. A connection request produces two steps, [`RECORDS_STEP`] and
//! [`AGGREGATES_STEP`]; the executor runs them inside one read transaction.

use crate::ast::{ConnectionAst, Param, Stmt};
use crate::error::{GraphQLResult, PlanningError};
use std::collections::HashSet;
use std::time::Instant;

/// Step id of the windowed record fetch
pub const RECORDS_STEP: &str = "records";
/// Step id of the count and page boundary checks
pub const AGGREGATES_STEP: &str = "aggregates";

/// Statements to run together against one snapshot
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
    pub telemetry: PlanTelemetry,
}

/// A single statement of an [`ExecutionPlan`]
#[derive(Debug, Clone)]
pub struct ExecutionStep {
    /// Unique within the plan
    pub id: String,
    pub stmt: Stmt,
    pub params: Vec<Param>,
    /// Human-readable description, used in logs and error messages
    pub description: String,
    /// Ids of steps that must run before this one
    pub depends_on: Vec<String>,
}

/// Context attached to a plan for logging
#[derive(Debug, Clone)]
pub struct PlanTelemetry {
    pub operation_name: Option<String>,
    /// Collection the plan reads from
    pub table: Option<String>,
    pub created_at: Instant,
    pub tags: Vec<(String, String)>,
}

impl Default for PlanTelemetry {
    fn default() -> Self {
        Self {
            operation_name: None,
            table: None,
            created_at: Instant::now(),
            tags: Vec::new(),
        }
    }
}

impl PlanTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Milliseconds since the plan was created
    pub fn elapsed_ms(&self) -> u128 {
        self.created_at.elapsed().as_millis()
    }
}

impl ExecutionPlan {
    pub fn new(steps: Vec<ExecutionStep>) -> Self {
        Self {
            steps,
            telemetry: PlanTelemetry::default(),
        }
    }

    /// The two-step plan of a connection request.
    ///
    /// The steps are independent; records run first so a failure there
    /// never pays for the count.
    pub fn connection(ast: ConnectionAst, table: &str) -> Self {
        Self::new(vec![
            ExecutionStep::new(
                RECORDS_STEP,
                ast.records,
                ast.record_params,
                format!("page of `{}`", table),
            ),
            ExecutionStep::new(
                AGGREGATES_STEP,
                ast.aggregates,
                ast.aggregate_params,
                format!("totals of `{}`", table),
            ),
        ])
        .with_telemetry(PlanTelemetry::new().with_table(table))
    }

    pub fn with_telemetry(mut self, telemetry: PlanTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.telemetry.operation_name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.telemetry.tags.push((key.into(), value.into()));
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn get_step(&self, id: &str) -> Option<&ExecutionStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps sorted so that every dependency runs before its dependents.
    ///
    /// Among ready steps the declaration order is kept. A cycle or a
    /// dependency on a missing step is a [`PlanningError`].
    pub fn steps_in_order(&self) -> GraphQLResult<Vec<&ExecutionStep>> {
        let mut result = Vec::with_capacity(self.steps.len());
        let mut completed: HashSet<&str> = HashSet::new();

        while result.len() < self.steps.len() {
            let mut made_progress = false;

            for step in &self.steps {
                if completed.contains(step.id.as_str()) {
                    continue;
                }
                let ready = step
                    .depends_on
                    .iter()
                    .all(|dep| completed.contains(dep.as_str()));
                if ready {
                    result.push(step);
                    completed.insert(&step.id);
                    made_progress = true;
                }
            }

            if !made_progress {
                let stuck = self
                    .steps
                    .iter()
                    .find(|s| !completed.contains(s.id.as_str()))
                    .map(|s| s.id.clone())
                    .unwrap_or_default();
                return Err(PlanningError::UnsatisfiableStep { step: stuck }.into());
            }
        }

        Ok(result)
    }
}

impl ExecutionStep {
    pub fn new(
        id: impl Into<String>,
        stmt: Stmt,
        params: Vec<Param>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            stmt,
            params,
            description: description.into(),
            depends_on: vec![],
        }
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.push(step_id.into());
        self
    }
}
