//! AST-based transpilation for ConnectionBuilder
//!
//! A connection request becomes two statements:
//!
//! - **records**: the window itself. Filter, keyset bounds from the
//!   `after`/`before` cursors, ORDER BY (reversed for `last`), offset, and a
//!   limit one larger than the page so the extra row reveals another page.
//! - **aggregates**: one row over the filtered set: the total count, ignoring
//!   every pagination argument, plus the existence checks behind
//!   `hasPreviousPage`/`hasNextPage` when cursors are present, and whether
//!   an `offset` had any rows between the cursors to skip.
//!
//! The two statements carry separate parameter lists.

use super::{
    build_filter_expr, column_ref, AggregateExpr, AstBuildContext, Cte, Expr, FilterContext,
    FromClause, Param, ParamCollector, SelectColumn, SelectStmt, Stmt, ToAst,
};
use crate::ast::{BinaryOperator, NullsOrder, OrderDirection, ParamValue};
use crate::builder::{ConnectionBuilder, OrderElem, PageDirection};
use crate::error::GraphQLResult;

/// Name of the CTE holding the filtered rows in the aggregate statement
pub const FILTERED_CTE: &str = "__filtered";

pub const TOTAL_COUNT_COLUMN: &str = "total_count";
pub const HAS_PRECEDING_COLUMN: &str = "has_preceding";
pub const HAS_FOLLOWING_COLUMN: &str = "has_following";
pub const OFFSET_SKIPS_ROWS_COLUMN: &str = "offset_skips_rows";

/// The result of transpiling a ConnectionBuilder to AST
#[derive(Debug, Clone)]
pub struct ConnectionAst {
    pub records: Stmt,
    pub record_params: Vec<Param>,
    pub aggregates: Stmt,
    pub aggregate_params: Vec<Param>,
}

impl<'a> ConnectionBuilder<'a> {
    /// Build both statements with aliases drawn from `ctx`
    pub fn to_ast(&self, ctx: &AstBuildContext) -> GraphQLResult<ConnectionAst> {
        let mut record_params = ParamCollector::new();
        let records = RecordsQuery { conn: self, ctx }.to_ast(&mut record_params)?;

        let mut aggregate_params = ParamCollector::new();
        let aggregates = AggregateQuery { conn: self, ctx }.to_ast(&mut aggregate_params)?;

        Ok(ConnectionAst {
            records: Stmt::Select(records),
            record_params: record_params.into_params(),
            aggregates: Stmt::Select(aggregates),
            aggregate_params: aggregate_params.into_params(),
        })
    }

    fn filter_clause(
        &self,
        ctx: &AstBuildContext,
        params: &mut ParamCollector,
    ) -> GraphQLResult<Option<Expr>> {
        let filter_ctx = FilterContext::new(self.schema, self.table, ctx);
        self.filter
            .as_ref()
            .map(|f| build_filter_expr(f, &filter_ctx, params))
            .transpose()
    }

    fn source(&self, block_name: &str) -> FromClause {
        FromClause::table_alias(
            self.table.schema.as_deref(),
            self.table.name.as_str(),
            block_name,
        )
    }
}

/// The windowed record fetch
pub struct RecordsQuery<'b, 'a> {
    pub conn: &'b ConnectionBuilder<'a>,
    pub ctx: &'b AstBuildContext,
}

impl ToAst for RecordsQuery<'_, '_> {
    type Ast = SelectStmt;

    fn to_ast(&self, params: &mut ParamCollector) -> GraphQLResult<Self::Ast> {
        let conn = self.conn;
        let block_name = self.ctx.block_name.as_str();
        let window = &conn.window;

        let mut conditions = vec![];
        if let Some(filter) = conn.filter_clause(self.ctx, params)? {
            conditions.push(filter);
        }
        // Rows strictly after `after` in the natural order
        if let Some(after) = &window.after {
            conditions.push(build_keyset_clause(
                conn.order.elems(),
                after,
                block_name,
                params,
                false,
            ));
        }
        // Rows strictly before `before`, i.e. after it walking backwards
        if let Some(before) = &window.before {
            let reversed = conn.order.reversed();
            conditions.push(build_keyset_clause(
                reversed.elems(),
                before,
                block_name,
                params,
                false,
            ));
        }

        let order = match window.direction {
            PageDirection::Forward => conn.order.clone(),
            PageDirection::Backward => conn.order.reversed(),
        };

        let columns = conn
            .table
            .attributes
            .iter()
            .map(|a| SelectColumn::expr_as(column_ref(block_name, &a.column), a.name.as_str()))
            .collect();

        let mut stmt = SelectStmt::columns(columns)
            .with_from(conn.source(block_name))
            .with_where_opt(combine(conditions))
            .with_order_by(order.to_order_by(block_name))
            .with_limit(window.page_size.saturating_add(1));
        if window.offset > 0 {
            stmt = stmt.with_offset(window.offset);
        }
        Ok(stmt)
    }
}

/// Total count and boundary checks over the filtered set
pub struct AggregateQuery<'b, 'a> {
    pub conn: &'b ConnectionBuilder<'a>,
    pub ctx: &'b AstBuildContext,
}

impl ToAst for AggregateQuery<'_, '_> {
    type Ast = SelectStmt;

    fn to_ast(&self, params: &mut ParamCollector) -> GraphQLResult<Self::Ast> {
        let conn = self.conn;
        let block_name = self.ctx.block_name.as_str();
        let window = &conn.window;

        let filtered = SelectStmt::columns(vec![SelectColumn::qualified_star(block_name)])
            .with_from(conn.source(block_name))
            .with_where_opt(conn.filter_clause(self.ctx, params)?);

        let total_count = Expr::Subquery(Box::new(
            SelectStmt::columns(vec![SelectColumn::expr(Expr::Aggregate(
                AggregateExpr::count_all(),
            ))])
            .with_from(FromClause::table(FILTERED_CTE)),
        ));

        // A row at or before `after` means something precedes the page
        let has_preceding = match &window.after {
            Some(after) => {
                let reversed = conn.order.reversed();
                let bound =
                    build_keyset_clause(reversed.elems(), after, block_name, params, true);
                exists_in_filtered(block_name, Some(bound))
            }
            None => Expr::bool(false),
        };

        // A row at or after `before` means something follows the page
        let has_following = match &window.before {
            Some(before) => {
                let bound =
                    build_keyset_clause(conn.order.elems(), before, block_name, params, true);
                exists_in_filtered(block_name, Some(bound))
            }
            None => Expr::bool(false),
        };

        // The offset only skips something if a row lies between the cursors
        let offset_skips_rows = if window.offset > 0 {
            let mut bounds = vec![];
            if let Some(after) = &window.after {
                bounds.push(build_keyset_clause(
                    conn.order.elems(),
                    after,
                    block_name,
                    params,
                    false,
                ));
            }
            if let Some(before) = &window.before {
                let reversed = conn.order.reversed();
                bounds.push(build_keyset_clause(
                    reversed.elems(),
                    before,
                    block_name,
                    params,
                    false,
                ));
            }
            exists_in_filtered(block_name, combine(bounds))
        } else {
            Expr::bool(false)
        };

        Ok(SelectStmt::columns(vec![
            SelectColumn::expr_as(total_count, TOTAL_COUNT_COLUMN),
            SelectColumn::expr_as(has_preceding, HAS_PRECEDING_COLUMN),
            SelectColumn::expr_as(has_following, HAS_FOLLOWING_COLUMN),
            SelectColumn::expr_as(offset_skips_rows, OFFSET_SKIPS_ROWS_COLUMN),
        ])
        .with_ctes(vec![Cte::select(FILTERED_CTE, filtered)]))
    }
}

fn exists_in_filtered(block_name: &str, predicate: Option<Expr>) -> Expr {
    Expr::exists(
        SelectStmt::columns(vec![SelectColumn::expr(Expr::int(1))])
            .with_from(FromClause::table(FILTERED_CTE).with_alias(block_name))
            .with_where_opt(predicate),
        false,
    )
}

fn combine(conditions: Vec<Expr>) -> Option<Expr> {
    conditions.into_iter().reduce(|acc, c| acc.and(c))
}

/// Keyset predicate: rows positioned after `values` under `elems`.
///
/// Expands lexicographically as
/// `after(k0) or (k0 = v0 and (after(k1) or (k1 = v1 and ...)))`, honouring
/// each key's direction and null placement. With `allow_equality` the row
/// exactly at `values` qualifies too.
///
/// Cursor values are known while planning, so null handling is decided here
/// rather than in SQL.
pub fn build_keyset_clause(
    elems: &[OrderElem],
    values: &[ParamValue],
    block_name: &str,
    params: &mut ParamCollector,
    allow_equality: bool,
) -> Expr {
    build_keyset_clause_recursive(elems, values, block_name, params, allow_equality, 0)
        .unwrap_or_else(|| Expr::bool(false))
}

/// `None` means no row qualifies at this depth
fn build_keyset_clause_recursive(
    elems: &[OrderElem],
    values: &[ParamValue],
    block_name: &str,
    params: &mut ParamCollector,
    allow_equality: bool,
    depth: usize,
) -> Option<Expr> {
    let (elem, value) = match (elems.get(depth), values.get(depth)) {
        (Some(elem), Some(value)) => (elem, value),
        _ => return allow_equality.then(|| Expr::bool(true)),
    };

    let col_expr = elem.column_expr(block_name);

    let (strictly_after, equal) = if value.is_null() {
        let after = match elem.nulls {
            // non-null values follow the nulls
            NullsOrder::First => Some(Expr::is_not_null(col_expr.clone())),
            // nothing sorts after a trailing null
            NullsOrder::Last => None,
        };
        (after, Expr::is_null(col_expr))
    } else {
        let val_expr = params.add(value.clone(), elem.codec.sql_type());
        let compare = match elem.direction {
            OrderDirection::Asc => Expr::binary(col_expr.clone(), BinaryOperator::Gt, val_expr.clone()),
            OrderDirection::Desc => Expr::binary(col_expr.clone(), BinaryOperator::Lt, val_expr.clone()),
        };
        let after = match elem.nulls {
            // trailing nulls follow every value
            NullsOrder::Last if elem.nullable => {
                compare.or(Expr::is_null(col_expr.clone())).nested()
            }
            _ => compare,
        };
        (Some(after), col_expr.eq(val_expr))
    };

    let tied = build_keyset_clause_recursive(
        elems,
        values,
        block_name,
        params,
        allow_equality,
        depth + 1,
    )
    .map(|rest| {
        if rest.is_true_literal() {
            equal
        } else {
            equal.and(rest).nested()
        }
    });

    match (strictly_after, tied) {
        (Some(after), Some(tied)) => Some(after.or(tied).nested()),
        (Some(after), None) => Some(after),
        (None, tied) => tied,
    }
}
