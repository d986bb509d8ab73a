//! Query planning and keyset pagination for the tracker's GraphQL
//! collections.
//!
//! A collection request arrives as a [`QueryDescriptor`] (condition, filter,
//! orderBy and the `first`/`last`/`before`/`after`/`offset` window). The
//! [`ConnectionEngine`] validates it against the registered [`Schema`],
//! compiles it into two parametrized statements (the page and its totals),
//! runs both through a [`QueryExecutor`] on one snapshot and returns a
//! cursor-addressable [`Page`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracker_graphql::*;
//!
//! let schema = SchemaBuilder::new()
//!     .table(
//!         Table::new("task")
//!             .attribute(Attribute::new("id", "id", ValueCodec::Integer))
//!             .attribute(Attribute::new("title", "title", ValueCodec::Text))
//!             .primary_key(&["id"]),
//!     )
//!     .build()?;
//!
//! let engine = ConnectionEngine::new(
//!     Arc::new(schema),
//!     EngineConfig::from_env().with_dialect(Dialect::Sqlite),
//!     SqliteExecutor::open_in_memory()?,
//! );
//! let page = engine.plan_and_execute(
//!     "task",
//!     &QueryDescriptor::new().with_first(10),
//!     &CancelToken::new(),
//! )?;
//! ```

pub mod ast;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod page;
pub mod sql_types;

pub use ast::Dialect;
pub use builder::{ComparisonOperator, Cursor, FilterNode, OrderSpec, Quantifier, QueryDescriptor};
pub use config::{EngineConfig, OrderTieBreak};
pub use engine::ConnectionEngine;
pub use error::{
    ErrorKind, ExecutionError, GraphQLError, GraphQLResult, PlanningError, UsageError,
};
pub use executor::{CancelToken, LogLevel, QueryExecutor, StepOutput};
pub use page::{Edge, Page, PageInfo};
pub use sql_types::{Attribute, Relation, Schema, SchemaBuilder, Table, ValueCodec};

#[cfg(feature = "sqlite")]
pub use executor::SqliteExecutor;
