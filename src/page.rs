//! Connection result pages
//!
//! [`Page::assemble`] turns the raw rows of a connection plan into the
//! response shape: nodes, edges with cursors, page info and total count.

use crate::ast::{
    ParamValue, HAS_FOLLOWING_COLUMN, HAS_PRECEDING_COLUMN, OFFSET_SKIPS_ROWS_COLUMN,
    TOTAL_COUNT_COLUMN,
};
use crate::builder::{ConnectionBuilder, Cursor, PageDirection};
use crate::error::{ExecutionError, GraphQLError, GraphQLResult, PlanningError};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub cursor: String,
    pub node: Value,
}

/// One page of a connection. Built once per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub nodes: Vec<Value>,
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
    /// Rows matching the filter, regardless of the window
    pub total_count: u64,
}

/// The single row of the aggregate statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Aggregates {
    total_count: u64,
    has_preceding: bool,
    has_following: bool,
    offset_skips_rows: bool,
}

impl Page {
    /// Build the page from the rows of the records and aggregates steps.
    ///
    /// `records` holds one value per table attribute, in declaration order,
    /// and at most `page_size + 1` rows in fetch order.
    pub fn assemble(
        conn: &ConnectionBuilder<'_>,
        records: Vec<Vec<ParamValue>>,
        aggregates: Vec<Vec<ParamValue>>,
    ) -> GraphQLResult<Page> {
        let table = conn.table;
        let window = &conn.window;
        let aggregates = Aggregates::from_rows(aggregates)?;

        let key_positions = conn
            .order
            .elems()
            .iter()
            .map(|elem| {
                table
                    .attributes
                    .iter()
                    .position(|a| a.name == elem.attribute)
                    .ok_or_else(|| PlanningError::UnknownAttribute {
                        table: table.name.clone(),
                        attribute: elem.attribute.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = records
            .into_iter()
            .map(|row| normalize_row(conn, row))
            .collect::<GraphQLResult<Vec<_>>>()?;

        let page_size = usize::try_from(window.page_size).unwrap_or(usize::MAX);
        let has_extra = rows.len() > page_size;
        rows.truncate(page_size);
        if window.direction == PageDirection::Backward {
            rows.reverse();
        }

        let forward = window.direction == PageDirection::Forward;
        // an offset past every row hides nothing
        let skipped = window.offset > 0 && aggregates.offset_skips_rows;
        let has_next_page =
            (forward && has_extra) || (!forward && skipped) || aggregates.has_following;
        let has_previous_page =
            (!forward && has_extra) || (forward && skipped) || aggregates.has_preceding;

        let mut nodes = Vec::with_capacity(rows.len());
        let mut edges = Vec::with_capacity(rows.len());
        for row in rows {
            let key: Vec<ParamValue> = key_positions.iter().map(|&i| row[i].clone()).collect();
            let cursor = Cursor::encode(&conn.order, &key).into_string();

            let node: Map<String, Value> = table
                .attributes
                .iter()
                .zip(&row)
                .map(|(attr, value)| (attr.name.clone(), value.to_json()))
                .collect();
            let node = Value::Object(node);

            nodes.push(node.clone());
            edges.push(Edge { cursor, node });
        }

        let page_info = PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };

        Ok(Page {
            nodes,
            edges,
            page_info,
            total_count: aggregates.total_count,
        })
    }
}

fn normalize_row(
    conn: &ConnectionBuilder<'_>,
    row: Vec<ParamValue>,
) -> GraphQLResult<Vec<ParamValue>> {
    let attributes = &conn.table.attributes;
    if row.len() != attributes.len() {
        return Err(ExecutionError::RowShape {
            expected: attributes.len(),
            found: row.len(),
        }
        .into());
    }
    attributes
        .iter()
        .zip(row)
        .map(|(attr, value)| {
            attr.codec.normalize(value).ok_or_else(|| {
                GraphQLError::from(ExecutionError::Backend {
                    message: format!(
                        "`{}.{}` returned a value that is not {}",
                        conn.table.name,
                        attr.name,
                        attr.codec.name()
                    ),
                    retryable: false,
                })
            })
        })
        .collect()
}

impl Aggregates {
    fn from_rows(rows: Vec<Vec<ParamValue>>) -> Result<Self, ExecutionError> {
        let row = match <[Vec<ParamValue>; 1]>::try_from(rows) {
            Ok([row]) => row,
            Err(rows) => {
                return Err(ExecutionError::Backend {
                    message: format!("aggregate step returned {} rows", rows.len()),
                    retryable: false,
                })
            }
        };
        let [total, preceding, following, offset] =
            <[ParamValue; 4]>::try_from(row).map_err(|row| ExecutionError::RowShape {
                expected: 4,
                found: row.len(),
            })?;

        let total_count = match total {
            ParamValue::Integer(n) if n >= 0 => n as u64,
            other => return Err(unexpected(TOTAL_COUNT_COLUMN, &other)),
        };
        Ok(Self {
            total_count,
            has_preceding: as_flag(HAS_PRECEDING_COLUMN, preceding)?,
            has_following: as_flag(HAS_FOLLOWING_COLUMN, following)?,
            offset_skips_rows: as_flag(OFFSET_SKIPS_ROWS_COLUMN, offset)?,
        })
    }
}

// Backends without a boolean type report flags as 0/1
fn as_flag(column: &str, value: ParamValue) -> Result<bool, ExecutionError> {
    match value {
        ParamValue::Bool(b) => Ok(b),
        ParamValue::Integer(n) => Ok(n != 0),
        other => Err(unexpected(column, &other)),
    }
}

fn unexpected(column: &str, value: &ParamValue) -> ExecutionError {
    ExecutionError::Backend {
        message: format!("unexpected value {:?} for `{}`", value, column),
        retryable: false,
    }
}
