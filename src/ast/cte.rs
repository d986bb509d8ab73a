//! Common Table Expression (CTE) support
//!
//! The aggregate step filters the source table once into a CTE and runs the
//! count and the boundary checks against it.

use super::expr::Ident;
use super::stmt::SelectStmt;

/// A Common Table Expression (CTE) in a WITH clause
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    /// Name of the CTE
    pub name: Ident,
    /// Optional column list: WITH cte(col1, col2) AS (...)
    pub columns: Option<Vec<Ident>>,
    /// The query that defines the CTE
    pub query: SelectStmt,
}

impl Cte {
    /// Create a new CTE with a SELECT query
    pub fn select(name: impl Into<Ident>, query: SelectStmt) -> Self {
        Self {
            name: name.into(),
            columns: None,
            query,
        }
    }

    /// Add column aliases to the CTE
    pub fn with_columns(mut self, columns: Vec<impl Into<Ident>>) -> Self {
        self.columns = Some(columns.into_iter().map(|c| c.into()).collect());
        self
    }
}
