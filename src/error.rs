//! Error taxonomy for the connection engine
//!
//! Errors are split by who has to act on them:
//!
//! - [`UsageError`]: the client sent something we refuse (empty filter, null
//!   leaf, malformed cursor, ...). Nothing has been executed.
//! - [`PlanningError`]: the table registration is broken. Ideally caught by
//!   [`crate::sql_types::SchemaBuilder::build`] at startup.
//! - [`ExecutionError`]: the backend failed or the request was cancelled.

use thiserror::Error;

/// Result alias used throughout the crate
pub type GraphQLResult<T> = Result<T, GraphQLError>;

/// Coarse classification of a [`GraphQLError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Planning,
    Execution,
}

/// Top-level error returned by every public entry point
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphQLError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl GraphQLError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::Planning(_) => ErrorKind::Planning,
            Self::Execution(_) => ErrorKind::Execution,
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Only backend failures the executor flagged as transient qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Execution(ExecutionError::Backend {
                retryable: true,
                ..
            })
        )
    }

    /// Shorthand for a backend failure
    pub fn sql_execution(message: impl Into<String>, retryable: bool) -> Self {
        Self::Execution(ExecutionError::Backend {
            message: message.into(),
            retryable,
        })
    }
}

/// Rejected client input. Raised before any SQL is built or executed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("empty filter object at `{path}`")]
    EmptyFilter { path: String },

    #[error("null is not allowed at `{path}`; omit the key instead")]
    NullLeaf { path: String },

    #[error("unknown filter field `{field}` at `{path}`")]
    UnknownFilterField { path: String, field: String },

    #[error("operator `{operator}` is not supported for {codec} at `{path}`")]
    UnsupportedOperator {
        path: String,
        operator: String,
        codec: String,
    },

    #[error("invalid operand at `{path}`: {reason}")]
    InvalidOperand { path: String, reason: String },

    #[error("unknown orderBy directive `{directive}`")]
    UnknownOrderDirective { directive: String },

    #[error("malformed cursor: {reason}")]
    MalformedCursor { reason: String },

    #[error("cursor was issued for a different ordering (expected {expected}, found {found})")]
    CursorMismatch { expected: String, found: String },

    #[error("`{argument}` must be a non-negative integer (got {value})")]
    InvalidPageSize { argument: &'static str, value: i64 },

    #[error("`first` and `last` may not be combined")]
    ConflictingPageSize,

    #[error("orderBy on `{table}` does not identify rows uniquely")]
    NonUniqueOrder { table: String },

    #[error("unknown collection `{name}`")]
    UnknownTable { name: String },
}

/// Broken table registration. Never caused by client input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("table `{table}` has no attribute `{attribute}`")]
    UnknownAttribute { table: String, attribute: String },

    #[error("table `{table}` has no relation `{relation}`")]
    UnknownRelation { table: String, relation: String },

    #[error("relation `{relation}` on `{table}` must pair the same, non-zero number of local and remote attributes")]
    RelationArity { table: String, relation: String },

    #[error("relation `{relation}` on `{table}` targets unregistered table `{remote}`")]
    UnknownRemoteTable {
        table: String,
        relation: String,
        remote: String,
    },

    #[error("table `{table}` declares no primary key")]
    MissingPrimaryKey { table: String },

    #[error("`{name}` is declared more than once on `{table}`")]
    DuplicateName { table: String, name: String },

    #[error("execution plan step `{step}` has unsatisfiable dependencies")]
    UnsatisfiableStep { step: String },
}

/// Failure while talking to the backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("query execution failed: {message}")]
    Backend { message: String, retryable: bool },

    #[error("request was cancelled")]
    Cancelled,

    #[error("result row has {found} columns, expected {expected}")]
    RowShape { expected: usize, found: usize },
}
