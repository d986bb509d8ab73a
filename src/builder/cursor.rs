//! Opaque pagination cursors
//!
//! A cursor is the base64 of a JSON array: the fingerprint of the ordering
//! that produced it followed by the row's value for each sort key. Decoding
//! checks the fingerprint, the arity and each value's type, so a cursor is
//! never silently reinterpreted under a different ordering.

use super::order_by::OrderSpec;
use crate::ast::ParamValue;
use crate::error::{GraphQLResult, UsageError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Encode the sort key values of one row.
    ///
    /// `values` must hold one entry per element of `spec`, in order.
    pub fn encode(spec: &OrderSpec, values: &[ParamValue]) -> Cursor {
        let mut items = Vec::with_capacity(values.len() + 1);
        items.push(Value::String(spec.fingerprint()));
        items.extend(values.iter().map(ParamValue::to_json));
        Cursor(STANDARD.encode(Value::Array(items).to_string()))
    }

    /// Decode a client supplied cursor back into sort key values
    pub fn decode(spec: &OrderSpec, raw: &str) -> GraphQLResult<Vec<ParamValue>> {
        let malformed = |reason: &str| UsageError::MalformedCursor {
            reason: reason.to_string(),
        };

        let bytes = STANDARD
            .decode(raw.as_bytes())
            .map_err(|_| malformed("not valid base64"))?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|_| malformed("not valid JSON"))?;
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(malformed("expected an array").into()),
        };

        let (fingerprint, values) = items
            .split_first()
            .ok_or_else(|| malformed("missing fingerprint"))?;
        let fingerprint = fingerprint
            .as_str()
            .ok_or_else(|| malformed("fingerprint must be a string"))?;
        let expected = spec.fingerprint();
        if fingerprint != expected {
            return Err(UsageError::CursorMismatch {
                expected,
                found: fingerprint.to_string(),
            }
            .into());
        }

        if values.len() != spec.len() {
            return Err(UsageError::MalformedCursor {
                reason: format!("expected {} values, found {}", spec.len(), values.len()),
            }
            .into());
        }

        let mut decoded = Vec::with_capacity(values.len());
        for (elem, value) in spec.elems().iter().zip(values) {
            let v = elem.codec.decode_json(value).ok_or_else(|| {
                malformed(&format!("bad value for `{}`", elem.attribute))
            })?;
            if v.is_null() && !elem.nullable {
                return Err(malformed(&format!("`{}` cannot be null", elem.attribute)).into());
            }
            decoded.push(v);
        }
        Ok(decoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrderTieBreak;
    use crate::error::GraphQLError;
    use crate::sql_types::{Attribute, SchemaBuilder, Table, ValueCodec};
    use proptest::prelude::*;

    fn table() -> Table {
        let schema = SchemaBuilder::new()
            .table(
                Table::new("task")
                    .attribute(Attribute::new("id", "id", ValueCodec::BigInt))
                    .attribute(Attribute::new("title", "title", ValueCodec::Text).nullable())
                    .attribute(Attribute::new("score", "score", ValueCodec::Float).nullable())
                    .attribute(Attribute::new("done", "done", ValueCodec::Boolean))
                    .primary_key(&["id"]),
            )
            .build()
            .unwrap();
        schema.table("task").unwrap().clone()
    }

    fn spec(directives: &[&str]) -> OrderSpec {
        let directives: Vec<String> = directives.iter().map(|s| s.to_string()).collect();
        OrderSpec::compile(&table(), &directives, OrderTieBreak::AppendPrimaryKey).unwrap()
    }

    fn usage(result: GraphQLResult<Vec<ParamValue>>) -> UsageError {
        match result {
            Err(GraphQLError::Usage(e)) => e,
            other => panic!("expected usage error, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip() {
        let spec = spec(&["TITLE_ASC", "DONE_DESC"]);
        let values = vec![
            ParamValue::String("a \"quoted\" title".into()),
            ParamValue::Bool(true),
            ParamValue::Integer(42),
        ];
        let cursor = Cursor::encode(&spec, &values);
        assert_eq!(Cursor::decode(&spec, cursor.as_str()).unwrap(), values);
    }

    #[test]
    fn test_nullable_values() {
        let spec = spec(&["TITLE_ASC"]);
        let values = vec![ParamValue::Null, ParamValue::Integer(1)];
        let cursor = Cursor::encode(&spec, &values);
        assert_eq!(Cursor::decode(&spec, cursor.as_str()).unwrap(), values);

        let values = vec![ParamValue::String("x".into()), ParamValue::Null];
        let cursor = Cursor::encode(&spec, &values);
        assert!(matches!(
            usage(Cursor::decode(&spec, cursor.as_str())),
            UsageError::MalformedCursor { .. }
        ));
    }

    #[test]
    fn test_mismatched_order() {
        let cursor = Cursor::encode(&spec(&["TITLE_ASC"]), &[ParamValue::Null, ParamValue::Integer(1)]);
        assert!(matches!(
            usage(Cursor::decode(&spec(&["TITLE_DESC"]), cursor.as_str())),
            UsageError::CursorMismatch { .. }
        ));
    }

    #[test]
    fn test_malformed() {
        let spec = spec(&[]);
        for raw in ["", "!!!", "bm90IGpzb24=", "e30="] {
            assert!(matches!(
                usage(Cursor::decode(&spec, raw)),
                UsageError::MalformedCursor { .. }
            ));
        }

        let wrong_arity = STANDARD.encode(format!("[\"{}\",1,2]", spec.fingerprint()));
        assert!(matches!(
            usage(Cursor::decode(&spec, &wrong_arity)),
            UsageError::MalformedCursor { .. }
        ));

        let wrong_type = STANDARD.encode(format!("[\"{}\",\"1\"]", spec.fingerprint()));
        assert!(matches!(
            usage(Cursor::decode(&spec, &wrong_type)),
            UsageError::MalformedCursor { .. }
        ));
    }

    fn arb_title() -> impl Strategy<Value = ParamValue> {
        prop_oneof![
            Just(ParamValue::Null),
            any::<String>().prop_map(ParamValue::String),
        ]
    }

    fn arb_score() -> impl Strategy<Value = ParamValue> {
        prop_oneof![
            Just(ParamValue::Null),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(ParamValue::Float),
        ]
    }

    proptest! {
        #[test]
        fn prop_cursor_round_trip(
            title in arb_title(),
            score in arb_score(),
            done in any::<bool>(),
            id in any::<i64>(),
        ) {
            let spec = spec(&["TITLE_ASC_NULLS_FIRST", "SCORE_DESC", "DONE_ASC"]);
            let values = vec![title, score, ParamValue::Bool(done), ParamValue::Integer(id)];
            let cursor = Cursor::encode(&spec, &values);
            prop_assert_eq!(Cursor::decode(&spec, cursor.as_str()).unwrap(), values);
        }
    }
}
