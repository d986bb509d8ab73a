//! SQL Abstract Syntax Tree (AST) module
//!
//! This module provides a type-safe representation of the statements the
//! engine issues. Statements are constructed programmatically and rendered
//! to SQL strings for either supported [`Dialect`]. Keeping the AST apart
//! from the executor allows it to be tested without a database.
//!
//! # Architecture
//!
//! - [`expr`]: SQL expressions (columns, literals, operators, sub-queries)
//! - [`stmt`]: SELECT statements
//! - [`cte`]: Common Table Expressions (WITH clauses)
//! - [`types`]: SQL type representations
//! - [`params`]: Parameter handling for prepared statements
//! - [`render`]: SQL string generation
//! - `transpile_*`: planning input to AST
//!
//! # Example
//!
//! ```rust,ignore
//! use tracker_graphql::ast::*;
//!
//! let mut params = ParamCollector::new();
//! let stmt = SelectStmt::columns(vec![SelectColumn::star()])
//!     .with_from(FromClause::table("task").with_alias("t"))
//!     .with_where(Expr::binary(
//!         Expr::qualified_column("t", "id"),
//!         BinaryOperator::Eq,
//!         params.add(ParamValue::Integer(1), SqlType::integer()),
//!     ));
//!
//! let sql = render(&Stmt::Select(stmt));
//! // select * from "task" "t" where "t"."id" = ($1::integer)
//! ```

mod builder_bridge;
mod cte;
mod expr;
mod params;
mod render;
mod stmt;
mod transpile_connection;
mod transpile_filter;
mod types;

// Re-export all public types
pub use builder_bridge::*;
pub use cte::*;
pub use expr::*;
pub use params::*;
pub use render::*;
pub use stmt::*;
pub use transpile_connection::*;
pub use transpile_filter::*;
pub use types::*;

#[cfg(test)]
mod tests;
