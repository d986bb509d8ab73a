//! SQL statement types
//!
//! The engine is read-only, so the only top-level statement is SELECT.

use super::cte::Cte;
use super::expr::{Expr, Ident, OrderByExpr};

/// Top-level SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Select(SelectStmt),
}

impl Stmt {
    pub fn select(stmt: SelectStmt) -> Self {
        Self::Select(stmt)
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStmt {
    /// WITH clause (CTEs)
    pub ctes: Vec<Cte>,
    /// SELECT columns
    pub columns: Vec<SelectColumn>,
    /// FROM clause
    pub from: Option<FromClause>,
    /// WHERE clause
    pub where_clause: Option<Expr>,
    /// ORDER BY clause
    pub order_by: Vec<OrderByExpr>,
    /// LIMIT
    pub limit: Option<u64>,
    /// OFFSET
    pub offset: Option<u64>,
}

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a simple SELECT with columns
    pub fn columns(columns: Vec<SelectColumn>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: FromClause) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_where(mut self, expr: Expr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    /// Set the WHERE clause only when there is one
    pub fn with_where_opt(mut self, expr: Option<Expr>) -> Self {
        self.where_clause = expr;
        self
    }

    pub fn with_ctes(mut self, ctes: Vec<Cte>) -> Self {
        self.ctes = ctes;
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderByExpr>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A column in a SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// An expression with optional alias: expr AS alias
    Expr { expr: Expr, alias: Option<Ident> },
    /// All columns: *
    Star,
    /// All columns from a table: table.*
    QualifiedStar { table: Ident },
}

impl SelectColumn {
    /// Create an expression column without alias
    pub fn expr(expr: Expr) -> Self {
        Self::Expr { expr, alias: None }
    }

    /// Create an expression column with alias
    pub fn expr_as(expr: Expr, alias: impl Into<Ident>) -> Self {
        Self::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    /// Create a star (SELECT *)
    pub fn star() -> Self {
        Self::Star
    }

    /// Create a qualified star (SELECT table.*)
    pub fn qualified_star(table: impl Into<Ident>) -> Self {
        Self::QualifiedStar {
            table: table.into(),
        }
    }
}

/// FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum FromClause {
    /// Simple table reference
    Table {
        schema: Option<Ident>,
        name: Ident,
        alias: Option<Ident>,
    },
}

impl FromClause {
    /// Create a simple table reference
    pub fn table(name: impl Into<Ident>) -> Self {
        Self::Table {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Create a table reference with alias
    pub fn table_alias(
        schema: Option<impl Into<Ident>>,
        name: impl Into<Ident>,
        alias: impl Into<Ident>,
    ) -> Self {
        Self::Table {
            schema: schema.map(|s| s.into()),
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Add an alias to this FROM clause
    pub fn with_alias(self, alias: impl Into<Ident>) -> Self {
        match self {
            Self::Table { schema, name, .. } => Self::Table {
                schema,
                name,
                alias: Some(alias.into()),
            },
        }
    }
}
