//! Connection request validation
//!
//! A [`QueryDescriptor`] is what a collection field receives from the
//! transport. [`ConnectionBuilder::new`] turns it into fully validated
//! planning input: a parsed filter, a compiled order and decoded cursor
//! bounds. Every usage error surfaces here, before any SQL exists.

use super::cursor::Cursor;
use super::filter::FilterNode;
use super::order_by::OrderSpec;
use crate::ast::ParamValue;
use crate::config::{EngineConfig, MAX_ROWS_LIMIT};
use crate::error::{GraphQLResult, UsageError};
use crate::sql_types::{Schema, Table};
use serde::Deserialize;
use serde_json::Value;

/// Transport-agnostic arguments of a collection field
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDescriptor {
    pub condition: Option<Value>,
    pub filter: Option<Value>,
    pub order_by: Vec<String>,
    pub first: Option<i64>,
    pub last: Option<i64>,
    pub offset: Option<i64>,
    pub before: Option<String>,
    pub after: Option<String>,
    /// Name of the client operation, carried into plan telemetry
    pub operation_name: Option<String>,
}

impl QueryDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order_by(mut self, directives: &[&str]) -> Self {
        self.order_by = directives.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_first(mut self, first: i64) -> Self {
        self.first = Some(first);
        self
    }

    pub fn with_last(mut self, last: i64) -> Self {
        self.last = Some(last);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn with_before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// Which end of the ordered set the page is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// `first`, or no size at all
    Forward,
    /// `last`
    Backward,
}

/// Validated pagination window
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionWindow {
    pub direction: PageDirection,
    pub page_size: u64,
    pub offset: u64,
    /// Decoded sort key values of the `after` cursor
    pub after: Option<Vec<ParamValue>>,
    /// Decoded sort key values of the `before` cursor
    pub before: Option<Vec<ParamValue>>,
}

/// Everything needed to plan one connection request
#[derive(Debug, Clone)]
pub struct ConnectionBuilder<'a> {
    pub schema: &'a Schema,
    pub table: &'a Table,
    pub filter: Option<FilterNode>,
    pub order: OrderSpec,
    pub window: ConnectionWindow,
}

fn non_negative(argument: &'static str, value: Option<i64>) -> Result<Option<u64>, UsageError> {
    match value {
        Some(v) if v < 0 => Err(UsageError::InvalidPageSize { argument, value: v }),
        Some(v) => Ok(Some(v as u64)),
        None => Ok(None),
    }
}

impl<'a> ConnectionBuilder<'a> {
    pub fn new(
        schema: &'a Schema,
        table_name: &str,
        descriptor: &QueryDescriptor,
        config: &EngineConfig,
    ) -> GraphQLResult<Self> {
        let table = schema.require_table(table_name)?;

        let first = non_negative("first", descriptor.first)?;
        let last = non_negative("last", descriptor.last)?;
        let offset = non_negative("offset", descriptor.offset)?.unwrap_or(0);

        let (direction, requested) = match (first, last) {
            (Some(_), Some(_)) => return Err(UsageError::ConflictingPageSize.into()),
            (Some(n), None) => (PageDirection::Forward, n),
            (None, Some(n)) => (PageDirection::Backward, n),
            (None, None) => (PageDirection::Forward, config.max_rows),
        };
        // a `max_rows` set on the field directly skips the range check
        let page_size = requested.min(config.max_rows).min(MAX_ROWS_LIMIT);

        let order = OrderSpec::compile(table, &descriptor.order_by, config.order_tie_break)?;

        let condition = descriptor
            .condition
            .as_ref()
            .map(|c| FilterNode::from_condition(table, c))
            .transpose()?;
        let filter = descriptor
            .filter
            .as_ref()
            .map(|f| FilterNode::parse(schema, table, f))
            .transpose()?;
        let filter = match (condition, filter) {
            (Some(c), Some(f)) => Some(FilterNode::And(vec![c, f])),
            (c, f) => c.or(f),
        };

        let after = descriptor
            .after
            .as_deref()
            .map(|c| Cursor::decode(&order, c))
            .transpose()?;
        let before = descriptor
            .before
            .as_deref()
            .map(|c| Cursor::decode(&order, c))
            .transpose()?;

        Ok(Self {
            schema,
            table,
            filter,
            order,
            window: ConnectionWindow {
                direction,
                page_size,
                offset,
                after,
                before,
            },
        })
    }
}
