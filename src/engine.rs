//! Request entry point
//!
//! [`ConnectionEngine`] ties the pieces together for one collection request:
//! validate the descriptor, build both statements, run them as one plan and
//! assemble the page. It holds no per-request state.

use crate::ast::{render_with, AstBuildContext, ParamValue};
use crate::builder::{ConnectionBuilder, PageDirection, QueryDescriptor};
use crate::config::EngineConfig;
use crate::error::{ExecutionError, GraphQLResult};
use crate::executor::{
    log_plan, CancelToken, ExecutionPlan, ExecutionTimer, QueryExecutor, StepOutput,
    AGGREGATES_STEP, RECORDS_STEP,
};
use crate::page::Page;
use crate::sql_types::Schema;
use std::sync::Arc;

pub struct ConnectionEngine<E> {
    schema: Arc<Schema>,
    config: EngineConfig,
    executor: E,
}

impl<E: QueryExecutor> ConnectionEngine<E> {
    pub fn new(schema: Arc<Schema>, config: EngineConfig, executor: E) -> Self {
        Self {
            schema,
            config,
            executor,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Serve one page of `table`.
    ///
    /// Usage errors are raised before the executor is touched. Cancelling
    /// `cancel` aborts the plan and yields `ExecutionError::Cancelled`.
    pub fn plan_and_execute(
        &self,
        table: &str,
        descriptor: &QueryDescriptor,
        cancel: &CancelToken,
    ) -> GraphQLResult<Page> {
        let (conn, plan) = self.prepare(table, descriptor)?;
        log_plan(self.config.log_level, &plan);

        let timer = ExecutionTimer::new(self.config.log_level, table);
        let outputs = match self.executor.execute_read(&plan, cancel) {
            Ok(outputs) => outputs,
            Err(e) => {
                timer.failure(&e.to_string());
                return Err(e);
            }
        };

        let (records, aggregates) = split_outputs(outputs)?;
        let page = Page::assemble(&conn, records, aggregates)?;
        timer.success();

        tracing::debug!(
            table,
            rows = page.edges.len(),
            total_count = page.total_count,
            "page assembled"
        );
        Ok(page)
    }

    /// The plan `plan_and_execute` would run, without running it
    pub fn plan(&self, table: &str, descriptor: &QueryDescriptor) -> GraphQLResult<ExecutionPlan> {
        self.prepare(table, descriptor).map(|(_, plan)| plan)
    }

    /// Rendered SQL of every step, in the configured dialect
    pub fn explain(&self, table: &str, descriptor: &QueryDescriptor) -> GraphQLResult<Vec<String>> {
        let plan = self.plan(table, descriptor)?;
        Ok(plan
            .steps_in_order()?
            .into_iter()
            .map(|step| render_with(&step.stmt, self.config.dialect))
            .collect())
    }

    fn prepare<'s>(
        &'s self,
        table: &str,
        descriptor: &QueryDescriptor,
    ) -> GraphQLResult<(ConnectionBuilder<'s>, ExecutionPlan)> {
        let conn = ConnectionBuilder::new(&self.schema, table, descriptor, &self.config)?;
        let ast = conn.to_ast(&AstBuildContext::new())?;

        let direction = match conn.window.direction {
            PageDirection::Forward => "forward",
            PageDirection::Backward => "backward",
        };
        let mut plan = ExecutionPlan::connection(ast, table)
            .with_tag("direction", direction)
            .with_tag("pageSize", conn.window.page_size.to_string())
            .with_tag("orderBy", conn.order.signature());
        if let Some(name) = &descriptor.operation_name {
            plan = plan.with_operation_name(name.as_str());
        }
        Ok((conn, plan))
    }
}

type Rows = Vec<Vec<ParamValue>>;

fn split_outputs(outputs: Vec<StepOutput>) -> Result<(Rows, Rows), ExecutionError> {
    let mut records = None;
    let mut aggregates = None;
    for output in outputs {
        match output.id.as_str() {
            RECORDS_STEP => records = Some(output.rows),
            AGGREGATES_STEP => aggregates = Some(output.rows),
            _ => {}
        }
    }
    match (records, aggregates) {
        (Some(r), Some(a)) => Ok((r, a)),
        _ => Err(ExecutionError::Backend {
            message: "executor did not return every step of the plan".to_string(),
            retryable: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Dialect;
    use crate::error::{GraphQLError, UsageError};
    use crate::sql_types::{Attribute, SchemaBuilder, Table, ValueCodec};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replays canned rows and records how often it was called
    struct CannedExecutor {
        records: Vec<Vec<ParamValue>>,
        calls: Mutex<usize>,
    }

    impl QueryExecutor for CannedExecutor {
        fn execute_read(
            &self,
            plan: &ExecutionPlan,
            cancel: &CancelToken,
        ) -> GraphQLResult<Vec<StepOutput>> {
            cancel.check()?;
            *self.calls.lock() += 1;
            assert_eq!(plan.step_count(), 2);
            Ok(vec![
                StepOutput::new(RECORDS_STEP, self.records.clone()),
                StepOutput::new(
                    AGGREGATES_STEP,
                    vec![vec![
                        ParamValue::Integer(self.records.len() as i64),
                        ParamValue::Bool(false),
                        ParamValue::Bool(false),
                        ParamValue::Bool(false),
                    ]],
                ),
            ])
        }
    }

    fn engine(records: Vec<Vec<ParamValue>>) -> ConnectionEngine<CannedExecutor> {
        let schema = SchemaBuilder::new()
            .table(
                Table::new("task")
                    .with_schema("app")
                    .attribute(Attribute::new("id", "id", ValueCodec::Integer))
                    .attribute(Attribute::new("title", "title", ValueCodec::Text))
                    .primary_key(&["id"]),
            )
            .build()
            .unwrap();
        ConnectionEngine::new(
            Arc::new(schema),
            EngineConfig::default(),
            CannedExecutor {
                records,
                calls: Mutex::new(0),
            },
        )
    }

    #[test]
    fn test_plan_and_execute() {
        let engine = engine(vec![vec![ParamValue::Integer(1), "a".into()]]);
        let page = engine
            .plan_and_execute("task", &QueryDescriptor::new(), &CancelToken::new())
            .unwrap();
        assert_eq!(page.nodes, vec![json!({"id": 1, "title": "a"})]);
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn test_usage_error_skips_executor() {
        let engine = engine(vec![]);
        let desc = QueryDescriptor::new().with_filter(json!({}));
        let err = engine
            .plan_and_execute("task", &desc, &CancelToken::new())
            .unwrap_err();
        assert_eq!(
            err,
            GraphQLError::Usage(UsageError::EmptyFilter {
                path: "filter".into()
            })
        );
        assert_eq!(*engine.executor().calls.lock(), 0);
    }

    #[test]
    fn test_plan_tags() {
        let engine = engine(vec![]);
        let plan = engine
            .plan("task", &QueryDescriptor::new().with_last(3))
            .unwrap();
        assert!(plan
            .telemetry
            .tags
            .contains(&("direction".to_string(), "backward".to_string())));
        assert!(plan
            .telemetry
            .tags
            .contains(&("pageSize".to_string(), "3".to_string())));
        assert_eq!(plan.telemetry.operation_name, None);

        let plan = engine
            .plan(
                "task",
                &QueryDescriptor::new().with_operation_name("TaskList"),
            )
            .unwrap();
        assert_eq!(plan.telemetry.operation_name.as_deref(), Some("TaskList"));
        assert_eq!(plan.telemetry.table.as_deref(), Some("task"));
    }

    #[test]
    fn test_explain() {
        let engine = engine(vec![]);
        let sql = engine
            .explain("task", &QueryDescriptor::new().with_first(10))
            .unwrap();
        assert_eq!(sql.len(), 2);
        assert!(sql[0].contains(r#"from "app"."task""#));
        assert!(sql[0].ends_with("limit 11"));
        assert!(sql[1].starts_with(r#"with "__filtered" as"#));
        assert_eq!(engine.config().dialect, Dialect::Postgres);
    }
}
