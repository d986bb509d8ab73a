//! Bridge between validated planning input and the AST
//!
//! Provides the [`ToAst`] trait implemented by the query pieces of a
//! connection, plus the alias bookkeeping shared while they are built.

use super::{ColumnRef, Expr, ParamCollector};
use crate::error::GraphQLResult;
use std::cell::Cell;

/// Trait for converting planning input to AST nodes
///
/// Implementors collect every bound value into `params`; the returned AST
/// only references them by placeholder.
pub trait ToAst {
    /// The AST type this builder produces
    type Ast;

    /// Convert to an AST node, collecting parameters
    fn to_ast(&self, params: &mut ParamCollector) -> GraphQLResult<Self::Ast>;
}

/// Tracks table aliases while one statement is built
///
/// Correlated sub-queries each need an alias distinct from every enclosing
/// one; [`AstBuildContext::next_block_name`] hands those out.
#[derive(Debug, Clone)]
pub struct AstBuildContext {
    /// Alias of the outermost table reference
    pub block_name: String,
    block_counter: Cell<usize>,
}

impl AstBuildContext {
    pub fn new() -> Self {
        Self::with_block_name(Self::generate_block_name())
    }

    /// Create a context with a specific block name
    pub fn with_block_name(block_name: impl Into<String>) -> Self {
        Self {
            block_name: block_name.into(),
            block_counter: Cell::new(0),
        }
    }

    /// Random lowercase alias, so generated aliases never collide with
    /// user-visible names
    fn generate_block_name() -> String {
        use rand::distributions::Alphanumeric;
        use rand::{thread_rng, Rng};
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(7)
            .map(char::from)
            .collect::<String>()
            .to_lowercase()
    }

    /// Get a new unique block name
    pub fn next_block_name(&self) -> String {
        let n = self.block_counter.get() + 1;
        self.block_counter.set(n);
        format!("{}_{}", self.block_name, n)
    }
}

impl Default for AstBuildContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to create a column reference expression
#[inline]
pub fn column_ref(table_alias: &str, column_name: &str) -> Expr {
    Expr::Column(ColumnRef::qualified(table_alias, column_name))
}
