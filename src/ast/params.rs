//! Parameter handling for prepared statements
//!
//! Every client-supplied value reaches SQL through [`ParamCollector`]; the
//! renderer only ever emits a placeholder for it. Conversion to the
//! backend's native value type happens in the executor.

use super::expr::{Expr, ParamRef};
use super::types::SqlType;

/// A scalar value bound to a statement or read back from a result row
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// JSON document
    Json(serde_json::Value),
}

impl ParamValue {
    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to a JSON value for output and cursor encoding
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            // Non-finite floats have no JSON form
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A collected parameter with its index, value, and type
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// 1-indexed parameter number
    pub index: usize,
    /// The parameter value
    pub value: ParamValue,
    /// The SQL type for casting
    pub sql_type: SqlType,
}

impl Param {
    pub fn new(index: usize, value: ParamValue, sql_type: SqlType) -> Self {
        Self {
            index,
            value,
            sql_type,
        }
    }
}

/// Collects parameters during AST construction
///
/// This allows building parameterized queries without worrying about
/// parameter numbering. Each call to `add()` returns an expression
/// that references the parameter.
#[derive(Debug, Default)]
pub struct ParamCollector {
    params: Vec<Param>,
}

impl ParamCollector {
    /// Create a new empty parameter collector
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return an expression that references it
    ///
    /// Parameters are 1-indexed in SQL ($1, $2, etc.)
    pub fn add(&mut self, value: ParamValue, sql_type: SqlType) -> Expr {
        let index = self.params.len() + 1;
        self.params.push(Param {
            index,
            value,
            sql_type: sql_type.clone(),
        });
        Expr::Param(ParamRef {
            index,
            type_cast: sql_type,
        })
    }

    /// Get all collected parameters
    pub fn into_params(self) -> Vec<Param> {
        self.params
    }

    /// Get parameters as a slice
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Get the number of collected parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if no parameters have been collected
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
