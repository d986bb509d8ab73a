//! AST-based transpilation for filters
//!
//! Compiles a [`FilterNode`] tree into a boolean expression for a WHERE
//! clause. Relation quantifiers become correlated EXISTS sub-queries, each
//! with its own alias so nested relations never capture the wrong row.

use super::{column_ref, AstBuildContext, BinaryOperator, Expr, Literal, ParamCollector};
use super::{FromClause, SelectColumn, SelectStmt};
use crate::builder::{validate_operand, ComparisonOperator, FilterNode, Quantifier};
use crate::error::{GraphQLResult, UsageError};
use crate::sql_types::{Relation, Schema, Table};
use serde_json::Value;

/// Scope a filter is compiled in: the table, and the alias its rows are
/// visible under
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub schema: &'a Schema,
    pub table: &'a Table,
    pub block_name: String,
    pub aliases: &'a AstBuildContext,
}

impl<'a> FilterContext<'a> {
    pub fn new(schema: &'a Schema, table: &'a Table, aliases: &'a AstBuildContext) -> Self {
        Self {
            schema,
            table,
            block_name: aliases.block_name.clone(),
            aliases,
        }
    }

    /// Context for a sub-query over `table` under a fresh alias
    fn nested(&self, table: &'a Table) -> Self {
        Self {
            schema: self.schema,
            table,
            block_name: self.aliases.next_block_name(),
            aliases: self.aliases,
        }
    }
}

/// Build a WHERE clause expression from a filter tree
pub fn build_filter_expr(
    filter: &FilterNode,
    ctx: &FilterContext<'_>,
    params: &mut ParamCollector,
) -> GraphQLResult<Expr> {
    match filter {
        FilterNode::AttributeComparison {
            attribute,
            operator,
            operand,
        } => build_comparison_expr(attribute, *operator, operand, ctx, params),
        FilterNode::And(children) => {
            if children.is_empty() {
                // Empty AND is true
                return Ok(Expr::bool(true));
            }
            let conditions = children
                .iter()
                .map(|c| build_filter_expr(c, ctx, params))
                .collect::<GraphQLResult<Vec<_>>>()?;
            Ok(combine_with_and(conditions))
        }
        FilterNode::Or(children) => {
            if children.is_empty() {
                // Empty OR is false
                return Ok(Expr::bool(false));
            }
            let conditions = children
                .iter()
                .map(|c| build_filter_expr(c, ctx, params))
                .collect::<GraphQLResult<Vec<_>>>()?;
            Ok(combine_with_or(conditions).nested())
        }
        FilterNode::Not(child) => Ok(Expr::not(build_filter_expr(child, ctx, params)?)),
        FilterNode::RelationFilter {
            relation,
            quantifier,
            filter,
        } => {
            let relation = ctx.table.get_relation(relation)?;
            let remote = ctx.schema.remote_table(ctx.table, relation)?;
            let sub_ctx = ctx.nested(remote);
            let sub = build_filter_expr(filter, &sub_ctx, params)?;
            let correlation = correlate(ctx, &sub_ctx, relation)?;
            let (predicate, negated) = match quantifier {
                // no related row exists that fails the sub-filter
                Quantifier::Every => (Expr::not(sub), true),
                Quantifier::Some => (sub, false),
                Quantifier::None => (sub, true),
            };
            Ok(Expr::exists(
                related_rows(&sub_ctx, correlation.and(predicate)),
                negated,
            ))
        }
        FilterNode::RelationExists { relation, expected } => {
            let relation = ctx.table.get_relation(relation)?;
            let remote = ctx.schema.remote_table(ctx.table, relation)?;
            let sub_ctx = ctx.nested(remote);
            let correlation = correlate(ctx, &sub_ctx, relation)?;
            Ok(Expr::exists(related_rows(&sub_ctx, correlation), !expected))
        }
    }
}

/// Combine multiple expressions with AND
pub fn combine_with_and(mut conditions: Vec<Expr>) -> Expr {
    if conditions.is_empty() {
        return Expr::bool(true);
    }
    let mut combined = conditions.remove(0);
    for cond in conditions {
        combined = combined.and(cond);
    }
    combined
}

/// Combine multiple expressions with OR
pub fn combine_with_or(mut conditions: Vec<Expr>) -> Expr {
    if conditions.is_empty() {
        return Expr::bool(false);
    }
    let mut combined = conditions.remove(0);
    for cond in conditions {
        combined = combined.or(cond);
    }
    combined
}

fn build_comparison_expr(
    attribute: &str,
    operator: ComparisonOperator,
    operand: &Value,
    ctx: &FilterContext<'_>,
    params: &mut ParamCollector,
) -> GraphQLResult<Expr> {
    let (col_expr, codec) = ctx.table.resolve(&ctx.block_name, attribute)?;
    let path = format!("{}.{}", attribute, operator.as_key());

    if !codec.supports(operator) {
        return Err(UsageError::UnsupportedOperator {
            path,
            operator: operator.as_key().to_string(),
            codec: codec.name().to_string(),
        }
        .into());
    }
    // Nodes built in code skip the parser, so check shape again here
    validate_operand(operator, operand, &path)?;

    let op = match operator {
        ComparisonOperator::IsNull => {
            let is_null = operand.as_bool().unwrap_or(true);
            return Ok(Expr::IsNull {
                expr: Box::new(col_expr),
                negated: !is_null,
            });
        }
        ComparisonOperator::In | ComparisonOperator::NotIn => {
            let negated = operator == ComparisonOperator::NotIn;
            let items = operand.as_array().map(Vec::as_slice).unwrap_or_default();
            if items.is_empty() {
                // x in () is false for every row, x not in () true
                return Ok(Expr::bool(negated));
            }
            let mut list = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let value = codec.bind(item, &format!("{}[{}]", path, i))?;
                list.push(params.add(value, codec.sql_type()));
            }
            return Ok(Expr::InList {
                expr: Box::new(col_expr),
                list,
                negated,
            });
        }
        ComparisonOperator::EqualTo => BinaryOperator::Eq,
        ComparisonOperator::NotEqualTo => BinaryOperator::NotEq,
        ComparisonOperator::DistinctFrom => BinaryOperator::IsDistinctFrom,
        ComparisonOperator::NotDistinctFrom => BinaryOperator::IsNotDistinctFrom,
        ComparisonOperator::LessThan => BinaryOperator::Lt,
        ComparisonOperator::LessThanOrEqualTo => BinaryOperator::LtEq,
        ComparisonOperator::GreaterThan => BinaryOperator::Gt,
        ComparisonOperator::GreaterThanOrEqualTo => BinaryOperator::GtEq,
        ComparisonOperator::Like => BinaryOperator::Like,
        ComparisonOperator::NotLike => BinaryOperator::NotLike,
    };

    let value = codec.bind(operand, &path)?;
    let param = params.add(value, codec.sql_type());
    Ok(Expr::binary(col_expr, op, param))
}

/// `remote.r_i = local.l_i` for every join pair of the relation
fn correlate(
    outer: &FilterContext<'_>,
    inner: &FilterContext<'_>,
    relation: &Relation,
) -> GraphQLResult<Expr> {
    let mut conditions = Vec::with_capacity(relation.local_attributes.len());
    for (local, remote) in relation
        .local_attributes
        .iter()
        .zip(&relation.remote_attributes)
    {
        let local = outer.table.require_attribute(local)?;
        let remote = inner.table.require_attribute(remote)?;
        conditions.push(Expr::binary(
            column_ref(&inner.block_name, &remote.column),
            BinaryOperator::Eq,
            column_ref(&outer.block_name, &local.column),
        ));
    }
    Ok(combine_with_and(conditions))
}

/// `select 1 from remote alias where <predicate>`
fn related_rows(ctx: &FilterContext<'_>, predicate: Expr) -> SelectStmt {
    SelectStmt::columns(vec![SelectColumn::expr(Expr::Literal(Literal::Integer(1)))])
        .with_from(FromClause::Table {
            schema: ctx.table.schema.as_deref().map(Into::into),
            name: ctx.table.name.as_str().into(),
            alias: Some(ctx.block_name.as_str().into()),
        })
        .with_where(predicate)
}
