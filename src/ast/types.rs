//! SQL type representations
//!
//! This module defines SQL types used for parameter and column casting.

/// A PostgreSQL type name. SQLite only sees it through [`SqlType::is_json`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlType {
    /// Type name (e.g., "text", "integer", "jsonb")
    pub name: String,
}

impl SqlType {
    /// Create a new SQL type
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn text() -> Self {
        Self::new("text")
    }

    pub fn integer() -> Self {
        Self::new("integer")
    }

    pub fn bigint() -> Self {
        Self::new("bigint")
    }

    pub fn boolean() -> Self {
        Self::new("boolean")
    }

    pub fn double_precision() -> Self {
        Self::new("double precision")
    }

    pub fn uuid() -> Self {
        Self::new("uuid")
    }

    pub fn timestamptz() -> Self {
        Self::new("timestamptz")
    }

    pub fn jsonb() -> Self {
        Self::new("jsonb")
    }

    /// JSON values have no native comparison form in SQLite; the renderer
    /// wraps them in `json(...)` there
    pub fn is_json(&self) -> bool {
        matches!(self.name.as_str(), "json" | "jsonb")
    }

    /// Get the full type name for SQL rendering
    pub fn to_sql_string(&self) -> String {
        self.name.clone()
    }
}

impl Default for SqlType {
    fn default() -> Self {
        Self::text()
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_types() {
        assert_eq!(SqlType::text().to_sql_string(), "text");
        assert_eq!(SqlType::integer().to_sql_string(), "integer");
        assert_eq!(SqlType::jsonb().to_sql_string(), "jsonb");
        assert_eq!(
            SqlType::double_precision().to_sql_string(),
            "double precision"
        );
    }

    #[test]
    fn test_is_json() {
        assert!(SqlType::jsonb().is_json());
        assert!(SqlType::new("json").is_json());
        assert!(!SqlType::text().is_json());
    }
}
