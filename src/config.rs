//! Engine configuration
//!
//! [`EngineConfig`] is built once at startup and shared by reference. Every
//! field has a default, so an empty JSON object is a valid configuration.

use crate::ast::Dialect;
use crate::executor::{get_log_level, LogLevel};
use serde::{Deserialize, Deserializer};

/// Environment variable overriding [`EngineConfig::max_rows`]
pub const MAX_ROWS_ENV: &str = "TRACKER_GRAPHQL_MAX_ROWS";

pub const DEFAULT_MAX_ROWS: u64 = 30;

/// Largest accepted `max_rows`. The records statement fetches one extra row
/// and SQL limits are signed 64-bit.
pub const MAX_ROWS_LIMIT: u64 = i64::MAX as u64 - 1;

/// What to do with an ordering that does not identify rows uniquely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderTieBreak {
    /// Append the primary key attributes not already present, ascending
    #[default]
    AppendPrimaryKey,
    /// Fail the request with `NonUniqueOrder`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on page size, and the page size when neither `first` nor
    /// `last` is given. Within `1..=MAX_ROWS_LIMIT`.
    #[serde(deserialize_with = "deserialize_max_rows")]
    pub max_rows: u64,
    pub order_tie_break: OrderTieBreak,
    pub dialect: Dialect,
    pub log_level: LogLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            order_tie_break: OrderTieBreak::default(),
            dialect: Dialect::default(),
            log_level: LogLevel::Off,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Defaults overridden by `TRACKER_GRAPHQL_MAX_ROWS` and
    /// `TRACKER_GRAPHQL_LOG_LEVEL`. A max rows value that does not parse, or
    /// is out of range, is ignored.
    pub fn from_env() -> Self {
        let max_rows = std::env::var(MAX_ROWS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|n| (1..=MAX_ROWS_LIMIT).contains(n))
            .unwrap_or(DEFAULT_MAX_ROWS);
        Self {
            max_rows,
            log_level: get_log_level(),
            ..Self::default()
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Clamped into `1..=MAX_ROWS_LIMIT`
    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = max_rows.clamp(1, MAX_ROWS_LIMIT);
        self
    }

    pub fn with_order_tie_break(mut self, tie_break: OrderTieBreak) -> Self {
        self.order_tie_break = tie_break;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

fn deserialize_max_rows<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = u64::deserialize(deserializer)?;
    if (1..=MAX_ROWS_LIMIT).contains(&n) {
        Ok(n)
    } else {
        Err(serde::de::Error::custom(format!(
            "maxRows must be between 1 and {}, got {}",
            MAX_ROWS_LIMIT, n
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_rows, 30);
        assert_eq!(config.order_tie_break, OrderTieBreak::AppendPrimaryKey);
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), config);
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json_str(
            r#"{"maxRows": 100, "orderTieBreak": "reject", "dialect": "sqlite", "logLevel": "basic"}"#,
        )
        .unwrap();
        assert_eq!(config.max_rows, 100);
        assert_eq!(config.order_tie_break, OrderTieBreak::Reject);
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.log_level, LogLevel::Basic);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(EngineConfig::from_json_str(r#"{"maxRow": 1}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"orderTieBreak": "shrug"}"#).is_err());
    }

    #[test]
    fn test_max_rows_range() {
        assert!(EngineConfig::from_json_str(r#"{"maxRows": 0}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"maxRows": 18446744073709551615}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"maxRows": 9223372036854775807}"#).is_err());

        let largest = EngineConfig::from_json_str(r#"{"maxRows": 9223372036854775806}"#).unwrap();
        assert_eq!(largest.max_rows, MAX_ROWS_LIMIT);

        assert_eq!(EngineConfig::default().with_max_rows(u64::MAX).max_rows, MAX_ROWS_LIMIT);
        assert_eq!(EngineConfig::default().with_max_rows(0).max_rows, 1);
    }
}
