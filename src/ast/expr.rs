//! SQL expression types
//!
//! This module defines the SQL expression types the planner emits: columns,
//! bound parameters, comparisons, boolean connectives, correlated EXISTS
//! sub-queries and the count aggregate.

use super::types::SqlType;

/// A quoted SQL identifier (table name, column name, etc.)
///
/// Identifiers are always quoted when rendered to prevent SQL injection
/// and handle special characters correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(pub String);

impl Ident {
    /// Create a new identifier from any string-like type
    #[inline]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a column, optionally qualified with a table alias
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table alias (e.g., "t" in "t.id")
    pub table_alias: Option<Ident>,
    /// Column name
    pub column: Ident,
}

impl ColumnRef {
    pub fn new(column: impl Into<Ident>) -> Self {
        Self {
            table_alias: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<Ident>, column: impl Into<Ident>) -> Self {
        Self {
            table_alias: Some(table.into()),
            column: column.into(),
        }
    }
}

/// Reference to a bound query parameter with the type it is cast to
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRef {
    /// 1-indexed parameter number
    pub index: usize,
    /// Type to cast the parameter to
    pub type_cast: SqlType,
}

/// SQL literal values
///
/// Only planner-generated constants end up here. Client values always go
/// through [`super::ParamCollector`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    IsDistinctFrom,
    IsNotDistinctFrom,

    // String operators
    Like,
    NotLike,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    /// Get the SQL representation of this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::IsDistinctFrom => "is distinct from",
            Self::IsNotDistinctFrom => "is not distinct from",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Whether the operator joins two predicates rather than two values
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

impl UnaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Not => "not",
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Count => "count",
        }
    }
}

/// An aggregate expression
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub function: AggregateFunction,
    pub args: Vec<Expr>,
}

impl AggregateExpr {
    pub fn new(function: AggregateFunction, args: Vec<Expr>) -> Self {
        Self { function, args }
    }

    /// `count(*)`
    pub fn count_all() -> Self {
        Self::new(AggregateFunction::Count, vec![])
    }
}

/// ORDER BY expression component
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub direction: Option<OrderDirection>,
    pub nulls: Option<NullsOrder>,
}

impl OrderByExpr {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            direction: None,
            nulls: None,
        }
    }

    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: Some(OrderDirection::Asc),
            nulls: None,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: Some(OrderDirection::Desc),
            nulls: None,
        }
    }

    pub fn with_nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// NULLS FIRST/LAST in ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::First => "nulls first",
            Self::Last => "nulls last",
        }
    }
}

/// The main expression enum encompassing all SQL expression types
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: table.column or just column
    Column(ColumnRef),

    /// Literal value
    Literal(Literal),

    /// Parameterized value: $1, $2, etc.
    Param(ParamRef),

    /// Binary operation: expr op expr
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr (e.g., NOT)
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Aggregate function
    Aggregate(AggregateExpr),

    /// Scalar subquery: (SELECT ...)
    Subquery(Box<super::stmt::SelectStmt>),

    /// Type cast: expr::type
    Cast {
        expr: Box<Expr>,
        target_type: SqlType,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// expr IN (values) - for a list
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// EXISTS (subquery)
    Exists {
        subquery: Box<super::stmt::SelectStmt>,
        negated: bool,
    },

    /// Parenthesized expression (for explicit grouping)
    Nested(Box<Expr>),

    /// Raw SQL string, test-only.
    ///
    /// Bypasses escaping entirely. Production code builds typed nodes.
    #[cfg(test)]
    Raw(String),
}

impl Expr {
    /// Create a column reference
    pub fn column(name: impl Into<Ident>) -> Self {
        Self::Column(ColumnRef::new(name))
    }

    /// Create a qualified column reference (table.column)
    pub fn qualified_column(table: impl Into<Ident>, column: impl Into<Ident>) -> Self {
        Self::Column(ColumnRef::qualified(table, column))
    }

    /// Create a NULL literal
    pub fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    /// Create a boolean literal
    pub fn bool(b: bool) -> Self {
        Self::Literal(Literal::Bool(b))
    }

    /// Create an integer literal
    pub fn int(n: i64) -> Self {
        Self::Literal(Literal::Integer(n))
    }

    /// Create a string literal
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Literal::String(s.into()))
    }

    /// Create a binary operation
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a NOT expression
    pub fn not(expr: Expr) -> Self {
        Self::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(expr),
        }
    }

    /// Create an IS NULL expression
    pub fn is_null(expr: Expr) -> Self {
        Self::IsNull {
            expr: Box::new(expr),
            negated: false,
        }
    }

    /// Create an IS NOT NULL expression
    pub fn is_not_null(expr: Expr) -> Self {
        Self::IsNull {
            expr: Box::new(expr),
            negated: true,
        }
    }

    /// Create a type cast
    pub fn cast(expr: Expr, target_type: SqlType) -> Self {
        Self::Cast {
            expr: Box::new(expr),
            target_type,
        }
    }

    /// Create an EXISTS / NOT EXISTS over a subquery
    pub fn exists(subquery: super::stmt::SelectStmt, negated: bool) -> Self {
        Self::Exists {
            subquery: Box::new(subquery),
            negated,
        }
    }

    /// Wrap in parentheses
    pub fn nested(self) -> Self {
        Self::Nested(Box::new(self))
    }

    /// Combine with AND
    pub fn and(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::And, other)
    }

    /// Combine with OR
    pub fn or(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Or, other)
    }

    /// Check equality
    pub fn eq(self, other: Expr) -> Self {
        Self::binary(self, BinaryOperator::Eq, other)
    }

    /// Whether this is the literal `true`
    pub fn is_true_literal(&self) -> bool {
        matches!(self, Self::Literal(Literal::Bool(true)))
    }

    /// Create raw SQL, test-only.
    #[cfg(test)]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }
}
