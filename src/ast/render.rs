//! SQL string rendering
//!
//! This module converts AST nodes to SQL strings. It is the only place
//! in the codebase where SQL strings are constructed.
//!
//! # Architecture
//!
//! The rendering system is built around two key components:
//!
//! - [`Render`] trait: Implemented by AST nodes to define how they render to SQL
//! - [`SqlRenderer`]: The rendering context that handles output buffering,
//!   formatting and the target [`Dialect`]
//!
//! # Safety
//!
//! All identifiers are quoted. Client values never appear in the output;
//! they are rendered as placeholders (`($1::text)` on PostgreSQL, `?1` on
//! SQLite) and bound by the executor.

use super::cte::Cte;
use super::expr::*;
use super::stmt::*;
use super::types::SqlType;
use serde::Deserialize;

// =============================================================================
// Render Trait
// =============================================================================

/// Trait for AST nodes that can be rendered to SQL.
pub trait Render {
    /// Render this node to the given SQL renderer
    fn render(&self, renderer: &mut SqlRenderer);
}

impl Render for Stmt {
    fn render(&self, renderer: &mut SqlRenderer) {
        match self {
            Stmt::Select(s) => s.render(renderer),
        }
    }
}

impl Render for SelectStmt {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_select(self);
    }
}

impl Render for Expr {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_expr(self);
    }
}

impl Render for Literal {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.render_literal(self);
    }
}

impl Render for Ident {
    fn render(&self, renderer: &mut SqlRenderer) {
        renderer.write_ident(self);
    }
}

// =============================================================================
// Dialect
// =============================================================================

/// SQL dialect of the backend that will run the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    /// `($1::type)` placeholders and `::` casts
    #[default]
    Postgres,
    /// `?1` placeholders and `cast(x as type)`
    Sqlite,
}

// =============================================================================
// Constants
// =============================================================================

/// Default buffer capacity for simple queries
const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Buffer capacity for queries with CTEs
const CTE_BUFFER_CAPACITY: usize = 4096;

/// SQL renderer with optional pretty-printing
pub struct SqlRenderer {
    output: String,
    indent_level: usize,
    pretty: bool,
    dialect: Dialect,
}

impl SqlRenderer {
    /// Create a new renderer with compact PostgreSQL output
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a new renderer with a specific buffer capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            output: String::with_capacity(capacity),
            indent_level: 0,
            pretty: false,
            dialect: Dialect::Postgres,
        }
    }

    /// Switch the target dialect
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Enable pretty-printed output
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Estimate appropriate buffer capacity based on statement complexity
    pub fn estimate_capacity(stmt: &Stmt) -> usize {
        match stmt {
            Stmt::Select(s) if !s.ctes.is_empty() => CTE_BUFFER_CAPACITY,
            Stmt::Select(_) => DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Render a statement and return the SQL string
    pub fn render_stmt(&mut self, stmt: &Stmt) -> &str {
        stmt.render(self);
        &self.output
    }

    /// Take ownership of the rendered SQL string
    pub fn into_sql(self) -> String {
        self.output
    }

    // =========================================================================
    // Statement rendering
    // =========================================================================

    fn render_select(&mut self, stmt: &SelectStmt) {
        self.render_ctes(&stmt.ctes);
        self.write("select ");
        self.render_select_columns(&stmt.columns);

        if let Some(from) = &stmt.from {
            self.newline();
            self.write("from ");
            self.render_from(from);
        }

        if let Some(where_clause) = &stmt.where_clause {
            self.newline();
            self.write("where ");
            self.render_expr(where_clause);
        }

        if !stmt.order_by.is_empty() {
            self.newline();
            self.write("order by ");
            self.render_order_by(&stmt.order_by);
        }

        if let Some(limit) = stmt.limit {
            self.newline();
            self.write("limit ");
            self.write(&limit.to_string());
        }

        if let Some(offset) = stmt.offset {
            self.newline();
            self.write("offset ");
            self.write(&offset.to_string());
        }
    }

    // =========================================================================
    // CTE rendering
    // =========================================================================

    fn render_ctes(&mut self, ctes: &[Cte]) {
        if ctes.is_empty() {
            return;
        }

        self.write("with ");
        for (i, cte) in ctes.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_cte(cte);
        }
        self.newline();
    }

    fn render_cte(&mut self, cte: &Cte) {
        self.write_ident(&cte.name);

        if let Some(columns) = &cte.columns {
            self.write("(");
            for (i, col) in columns.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                self.write_ident(col);
            }
            self.write(")");
        }

        self.write(" as (");
        self.indent();
        self.newline();
        self.render_select(&cte.query);
        self.dedent();
        self.newline();
        self.write(")");
    }

    // =========================================================================
    // FROM clause rendering
    // =========================================================================

    fn render_from(&mut self, from: &FromClause) {
        match from {
            FromClause::Table {
                schema,
                name,
                alias,
            } => {
                self.render_table_name(schema.as_ref(), name);
                if let Some(alias) = alias {
                    self.write(" ");
                    self.write_ident(alias);
                }
            }
        }
    }

    // =========================================================================
    // Expression rendering
    // =========================================================================

    fn render_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Column(col) => {
                if let Some(table) = &col.table_alias {
                    self.write_ident(table);
                    self.write(".");
                }
                self.write_ident(&col.column);
            }

            Expr::Literal(lit) => self.render_literal(lit),

            Expr::Param(p) => match self.dialect {
                Dialect::Postgres => {
                    self.write("($");
                    self.write(&p.index.to_string());
                    self.write("::");
                    self.render_type(&p.type_cast);
                    self.write(")");
                }
                Dialect::Sqlite if p.type_cast.is_json() => {
                    self.write("json(?");
                    self.write(&p.index.to_string());
                    self.write(")");
                }
                Dialect::Sqlite => {
                    self.write("?");
                    self.write(&p.index.to_string());
                }
            },

            Expr::BinaryOp { left, op, right } => {
                self.render_operand(left, *op);
                self.write(" ");
                self.write(op.as_sql());
                self.write(" ");
                self.render_operand(right, *op);
            }

            Expr::UnaryOp { op, expr } => {
                self.write(op.as_sql());
                self.write("(");
                self.render_expr(expr);
                self.write(")");
            }

            Expr::Aggregate(agg) => {
                self.render_aggregate(agg);
            }

            Expr::Subquery(query) => {
                self.write("(");
                self.render_select(query);
                self.write(")");
            }

            Expr::Cast { expr, target_type } => match self.dialect {
                Dialect::Postgres => {
                    self.render_expr(expr);
                    self.write("::");
                    self.render_type(target_type);
                }
                // SQLite keeps JSON as text; json() minifies it so equal
                // documents compare equal
                Dialect::Sqlite if target_type.is_json() => {
                    self.write("json(");
                    self.render_expr(expr);
                    self.write(")");
                }
                Dialect::Sqlite => {
                    self.write("cast(");
                    self.render_expr(expr);
                    self.write(" as ");
                    self.render_type(target_type);
                    self.write(")");
                }
            },

            Expr::IsNull { expr, negated } => {
                self.render_expr(expr);
                if *negated {
                    self.write(" is not null");
                } else {
                    self.write(" is null");
                }
            }

            Expr::InList {
                expr,
                list,
                negated,
            } => {
                self.render_expr(expr);
                if *negated {
                    self.write(" not in (");
                } else {
                    self.write(" in (");
                }
                self.render_expr_list(list);
                self.write(")");
            }

            Expr::Exists { subquery, negated } => {
                if *negated {
                    self.write("not ");
                }
                self.write("exists (");
                self.render_select(subquery);
                self.write(")");
            }

            Expr::Nested(inner) => {
                self.write("(");
                self.render_expr(inner);
                self.write(")");
            }

            #[cfg(test)]
            Expr::Raw(sql) => {
                self.write(sql);
            }
        }
    }

    /// Render one side of a binary operation.
    ///
    /// A logical operand under a different logical operator is parenthesized
    /// so `a and (b or c)` never collapses into `a and b or c`.
    fn render_operand(&mut self, operand: &Expr, parent: BinaryOperator) {
        let needs_parens = match operand {
            Expr::BinaryOp { op, .. } => op.is_logical() && *op != parent,
            _ => false,
        };
        if needs_parens {
            self.write("(");
            self.render_expr(operand);
            self.write(")");
        } else {
            self.render_expr(operand);
        }
    }

    fn render_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Null => self.write("null"),
            Literal::Bool(b) => self.write(if *b { "true" } else { "false" }),
            Literal::Integer(n) => self.write(&n.to_string()),
            Literal::String(s) => self.write_literal(s),
        }
    }

    fn render_aggregate(&mut self, agg: &AggregateExpr) {
        self.write(agg.function.as_sql());
        self.write("(");

        if agg.args.is_empty() && matches!(agg.function, AggregateFunction::Count) {
            self.write("*");
        } else {
            self.render_expr_list(&agg.args);
        }

        self.write(")");
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn render_select_columns(&mut self, columns: &[SelectColumn]) {
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            match col {
                SelectColumn::Expr { expr, alias } => {
                    self.render_expr(expr);
                    if let Some(alias) = alias {
                        self.write(" as ");
                        self.write_ident(alias);
                    }
                }
                SelectColumn::Star => self.write("*"),
                SelectColumn::QualifiedStar { table } => {
                    self.write_ident(table);
                    self.write(".*");
                }
            }
        }
    }

    fn render_expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_expr(expr);
        }
    }

    fn render_order_by(&mut self, order_by: &[OrderByExpr]) {
        for (i, ob) in order_by.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.render_expr(&ob.expr);
            if let Some(dir) = &ob.direction {
                self.write(" ");
                self.write(dir.as_sql());
            }
            if let Some(nulls) = &ob.nulls {
                self.write(" ");
                self.write(nulls.as_sql());
            }
        }
    }

    fn render_table_name(&mut self, schema: Option<&Ident>, name: &Ident) {
        if let Some(schema) = schema {
            self.write_ident(schema);
            self.write(".");
        }
        self.write_ident(name);
    }

    fn render_type(&mut self, sql_type: &SqlType) {
        self.output.push_str(&sql_type.name);
    }

    // =========================================================================
    // Low-level output methods
    // =========================================================================

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_ident(&mut self, ident: &Ident) {
        self.output.push('"');
        for c in ident.as_str().chars() {
            if c == '"' {
                self.output.push('"');
            }
            self.output.push(c);
        }
        self.output.push('"');
    }

    fn write_literal(&mut self, s: &str) {
        // Standard quote doubling; valid in both dialects
        self.output.push('\'');
        for c in s.chars() {
            if c == '\'' {
                self.output.push('\'');
            }
            self.output.push(c);
        }
        self.output.push('\'');
    }

    fn newline(&mut self) {
        if self.pretty {
            self.output.push('\n');
            for _ in 0..self.indent_level {
                self.output.push_str("    ");
            }
        } else {
            self.output.push(' ');
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Convenience functions
// =========================================================================

/// Render a statement to a compact PostgreSQL string
pub fn render(stmt: &Stmt) -> String {
    render_with(stmt, Dialect::Postgres)
}

/// Render a statement to a compact string in the given dialect
pub fn render_with(stmt: &Stmt, dialect: Dialect) -> String {
    let capacity = SqlRenderer::estimate_capacity(stmt);
    let mut renderer = SqlRenderer::with_capacity(capacity).dialect(dialect);
    renderer.render_stmt(stmt);
    renderer.into_sql()
}

/// Render a statement to a pretty-printed string in the given dialect
pub fn render_pretty(stmt: &Stmt, dialect: Dialect) -> String {
    let capacity = SqlRenderer::estimate_capacity(stmt);
    let mut renderer = SqlRenderer::with_capacity(capacity)
        .dialect(dialect)
        .pretty();
    renderer.render_stmt(stmt);
    renderer.into_sql()
}

/// Render just an expression (PostgreSQL)
pub fn render_expr(expr: &Expr) -> String {
    let mut renderer = SqlRenderer::new();
    renderer.render_expr(expr);
    renderer.into_sql()
}

/// Render just an expression in the given dialect
pub fn render_expr_with(expr: &Expr, dialect: Dialect) -> String {
    let mut renderer = SqlRenderer::new().dialect(dialect);
    renderer.render_expr(expr);
    renderer.into_sql()
}
