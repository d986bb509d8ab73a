//! Table descriptors and value codecs
//!
//! A [`Schema`] is assembled once at startup with [`SchemaBuilder`] and is
//! immutable afterwards. Building it validates every table and relation and
//! precomputes the per-table filter field dispatch table, so request handling
//! never has to look anything up by string more than once.

use crate::ast::{Expr, ParamValue, SqlType};
use crate::builder::ComparisonOperator;
use crate::error::{PlanningError, UsageError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How values of an attribute are bound, compared and read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueCodec {
    Integer,
    BigInt,
    Float,
    Text,
    /// Case-insensitive text, compared in its canonical text form
    CiText,
    Boolean,
    Uuid,
    Timestamp,
    Json,
}

impl ValueCodec {
    /// Type used for placeholders bound through this codec
    pub fn sql_type(&self) -> SqlType {
        match self {
            Self::Integer => SqlType::integer(),
            Self::BigInt => SqlType::bigint(),
            Self::Float => SqlType::double_precision(),
            Self::Text | Self::CiText => SqlType::text(),
            Self::Boolean => SqlType::boolean(),
            Self::Uuid => SqlType::uuid(),
            Self::Timestamp => SqlType::timestamptz(),
            Self::Json => SqlType::jsonb(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer => "Int",
            Self::BigInt => "BigInt",
            Self::Float => "Float",
            Self::Text => "String",
            Self::CiText => "CiText",
            Self::Boolean => "Boolean",
            Self::Uuid => "UUID",
            Self::Timestamp => "Datetime",
            Self::Json => "JSON",
        }
    }

    /// Wrap a physical column so it compares in the codec's canonical form
    pub fn column_expr(&self, column: Expr) -> Expr {
        match self {
            Self::CiText => Expr::cast(column, SqlType::text()),
            Self::Json => Expr::cast(column, SqlType::jsonb()),
            _ => column,
        }
    }

    /// Whether a filter operator applies to values of this codec
    pub fn supports(&self, op: ComparisonOperator) -> bool {
        use ComparisonOperator::*;
        match self {
            Self::Json => matches!(
                op,
                IsNull | EqualTo | NotEqualTo | DistinctFrom | NotDistinctFrom
            ),
            Self::Boolean => !matches!(op, Like | NotLike),
            Self::Text | Self::CiText => true,
            Self::Integer | Self::BigInt | Self::Float | Self::Uuid | Self::Timestamp => {
                !matches!(op, Like | NotLike)
            }
        }
    }

    /// Convert a client operand into a bindable value.
    ///
    /// `null` is never accepted here; callers decide what a null means.
    pub fn bind(&self, value: &Value, path: &str) -> Result<ParamValue, UsageError> {
        if value.is_null() {
            return Err(UsageError::NullLeaf {
                path: path.to_string(),
            });
        }
        let invalid = |expected: &str| UsageError::InvalidOperand {
            path: path.to_string(),
            reason: format!("expected {}, got {}", expected, value),
        };
        match self {
            Self::Integer => {
                let n = value.as_i64().ok_or_else(|| invalid("an integer"))?;
                if i32::try_from(n).is_err() {
                    return Err(invalid("a 32-bit integer"));
                }
                Ok(ParamValue::Integer(n))
            }
            Self::BigInt => value
                .as_i64()
                .map(ParamValue::Integer)
                .ok_or_else(|| invalid("an integer")),
            Self::Float => value
                .as_f64()
                .map(ParamValue::Float)
                .ok_or_else(|| invalid("a number")),
            Self::Text | Self::CiText | Self::Uuid | Self::Timestamp => value
                .as_str()
                .map(|s| ParamValue::String(s.to_string()))
                .ok_or_else(|| invalid("a string")),
            Self::Boolean => value
                .as_bool()
                .map(ParamValue::Bool)
                .ok_or_else(|| invalid("a boolean")),
            Self::Json => Ok(ParamValue::Json(value.clone())),
        }
    }

    /// Decode a value previously produced by [`ParamValue::to_json`].
    ///
    /// Returns `None` when the JSON shape does not belong to this codec.
    pub fn decode_json(&self, value: &Value) -> Option<ParamValue> {
        if value.is_null() {
            return Some(ParamValue::Null);
        }
        match self {
            Self::Integer | Self::BigInt => value.as_i64().map(ParamValue::Integer),
            Self::Float => value.as_f64().map(ParamValue::Float),
            Self::Text | Self::CiText | Self::Uuid | Self::Timestamp => {
                value.as_str().map(|s| ParamValue::String(s.to_string()))
            }
            Self::Boolean => value.as_bool().map(ParamValue::Bool),
            Self::Json => Some(ParamValue::Json(value.clone())),
        }
    }

    /// Normalize a value read from the backend into this codec's shape.
    ///
    /// Backends without native booleans or json hand back integers and text.
    pub fn normalize(&self, value: ParamValue) -> Option<ParamValue> {
        match (self, value) {
            (_, ParamValue::Null) => Some(ParamValue::Null),
            (Self::Boolean, ParamValue::Integer(n)) => Some(ParamValue::Bool(n != 0)),
            (Self::Boolean, v @ ParamValue::Bool(_)) => Some(v),
            (Self::Float, ParamValue::Integer(n)) => Some(ParamValue::Float(n as f64)),
            (Self::Float, v @ ParamValue::Float(_)) => Some(v),
            (Self::Integer | Self::BigInt, v @ ParamValue::Integer(_)) => Some(v),
            (
                Self::Text | Self::CiText | Self::Uuid | Self::Timestamp,
                v @ ParamValue::String(_),
            ) => Some(v),
            // key order survives parsing, so the value binds back to the
            // same text SQLite's json() produces for the stored document
            (Self::Json, ParamValue::String(s)) => {
                serde_json::from_str(&s).ok().map(ParamValue::Json)
            }
            (Self::Json, v @ ParamValue::Json(_)) => Some(v),
            _ => None,
        }
    }
}

/// A scalar attribute of a table
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Name exposed to clients (camelCase)
    pub name: String,
    /// Physical column name
    pub column: String,
    pub codec: ValueCodec,
    pub nullable: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, column: impl Into<String>, codec: ValueCodec) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            codec,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// The attribute name in CONSTANT_CASE, as used by order directives
    pub fn constant_name(&self) -> String {
        to_constant_case(&self.name)
    }
}

/// How a parent row correlates with rows of another table.
///
/// `local_attributes[i]` pairs with `remote_attributes[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub remote_table: String,
    pub local_attributes: Vec<String>,
    pub remote_attributes: Vec<String>,
    pub is_unique: bool,
}

impl Relation {
    pub fn new(name: impl Into<String>, remote_table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_table: remote_table.into(),
            local_attributes: vec![],
            remote_attributes: vec![],
            is_unique: false,
        }
    }

    /// Add a join pair
    pub fn join(mut self, local: impl Into<String>, remote: impl Into<String>) -> Self {
        self.local_attributes.push(local.into());
        self.remote_attributes.push(remote.into());
        self
    }

    /// Mark the relation as pointing at no more than one remote row
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Filter key testing for the presence of related rows
    pub fn exists_key(&self) -> String {
        format!("{}Exists", self.name)
    }
}

/// What a key in a filter object refers to on a given table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    And,
    Or,
    Not,
    Attribute(usize),
    Relation(usize),
    RelationExists(usize),
}

/// A table descriptor
#[derive(Debug, Clone)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
    pub relations: Vec<Relation>,
    filter_fields: HashMap<String, FilterField>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            attributes: vec![],
            primary_key: vec![],
            unique_keys: vec![],
            relations: vec![],
            filter_fields: HashMap::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn primary_key(mut self, attributes: &[&str]) -> Self {
        self.primary_key = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn unique_key(mut self, attributes: &[&str]) -> Self {
        self.unique_keys
            .push(attributes.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn require_attribute(&self, name: &str) -> Result<&Attribute, PlanningError> {
        self.get_attribute(name)
            .ok_or_else(|| PlanningError::UnknownAttribute {
                table: self.name.clone(),
                attribute: name.to_string(),
            })
    }

    /// Look up a relation by name
    pub fn get_relation(&self, name: &str) -> Result<&Relation, PlanningError> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| PlanningError::UnknownRelation {
                table: self.name.clone(),
                relation: name.to_string(),
            })
    }

    /// Resolve an attribute to its comparison expression under `block_name`
    pub fn resolve(
        &self,
        block_name: &str,
        attribute: &str,
    ) -> Result<(Expr, &ValueCodec), PlanningError> {
        let attr = self.require_attribute(attribute)?;
        let column = Expr::qualified_column(block_name, attr.column.as_str());
        Ok((attr.codec.column_expr(column), &attr.codec))
    }

    /// Dispatch a filter object key
    pub fn filter_field(&self, key: &str) -> Option<FilterField> {
        self.filter_fields.get(key).copied()
    }

    pub fn primary_key_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.primary_key
            .iter()
            .filter_map(move |name| self.get_attribute(name))
    }

    /// Keys that identify a row: the primary key plus every unique key whose
    /// attributes are all non-nullable
    pub fn total_keys(&self) -> Vec<&[String]> {
        let mut keys: Vec<&[String]> = vec![self.primary_key.as_slice()];
        for key in &self.unique_keys {
            let all_required = key
                .iter()
                .all(|name| self.get_attribute(name).map_or(false, |a| !a.nullable));
            if all_required {
                keys.push(key.as_slice());
            }
        }
        keys
    }

    fn validate_local(&self) -> Result<(), PlanningError> {
        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(PlanningError::DuplicateName {
                    table: self.name.clone(),
                    name: attr.name.clone(),
                });
            }
        }

        if self.primary_key.is_empty() {
            return Err(PlanningError::MissingPrimaryKey {
                table: self.name.clone(),
            });
        }
        for name in self.primary_key.iter().chain(self.unique_keys.iter().flatten()) {
            self.require_attribute(name)?;
        }

        for relation in &self.relations {
            if relation.local_attributes.is_empty()
                || relation.local_attributes.len() != relation.remote_attributes.len()
            {
                return Err(PlanningError::RelationArity {
                    table: self.name.clone(),
                    relation: relation.name.clone(),
                });
            }
            for name in &relation.local_attributes {
                self.require_attribute(name)?;
            }
        }
        Ok(())
    }

    fn build_filter_fields(&mut self) -> Result<(), PlanningError> {
        let mut fields = HashMap::new();
        fields.insert("and".to_string(), FilterField::And);
        fields.insert("or".to_string(), FilterField::Or);
        fields.insert("not".to_string(), FilterField::Not);

        let mut entries = vec![];
        for (i, attr) in self.attributes.iter().enumerate() {
            entries.push((attr.name.clone(), FilterField::Attribute(i)));
        }
        for (i, relation) in self.relations.iter().enumerate() {
            entries.push((relation.name.clone(), FilterField::Relation(i)));
            entries.push((relation.exists_key(), FilterField::RelationExists(i)));
        }

        for (key, field) in entries {
            if fields.insert(key.clone(), field).is_some() {
                return Err(PlanningError::DuplicateName {
                    table: self.name.clone(),
                    name: key,
                });
            }
        }
        self.filter_fields = fields;
        Ok(())
    }
}

/// Immutable registry of every table the engine can serve
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: HashMap<String, Arc<Table>>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).map(|t| t.as_ref())
    }

    /// Look up a table a client asked for
    pub fn require_table(&self, name: &str) -> Result<&Table, UsageError> {
        self.table(name).ok_or_else(|| UsageError::UnknownTable {
            name: name.to_string(),
        })
    }

    /// Look up the target of a relation
    pub fn remote_table(&self, table: &Table, relation: &Relation) -> Result<&Table, PlanningError> {
        self.table(&relation.remote_table)
            .ok_or_else(|| PlanningError::UnknownRemoteTable {
                table: table.name.clone(),
                relation: relation.name.clone(),
                remote: relation.remote_table.clone(),
            })
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }
}

/// Assembles and validates a [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<Table>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Validate every table and relation and freeze the result
    pub fn build(self) -> Result<Schema, PlanningError> {
        let mut tables: HashMap<String, Table> = HashMap::new();
        for mut table in self.tables {
            table.validate_local()?;
            table.build_filter_fields()?;
            if tables.contains_key(&table.name) {
                return Err(PlanningError::DuplicateName {
                    table: table.name.clone(),
                    name: table.name,
                });
            }
            tables.insert(table.name.clone(), table);
        }

        for table in tables.values() {
            for relation in &table.relations {
                let remote = tables.get(&relation.remote_table).ok_or_else(|| {
                    PlanningError::UnknownRemoteTable {
                        table: table.name.clone(),
                        relation: relation.name.clone(),
                        remote: relation.remote_table.clone(),
                    }
                })?;
                for name in &relation.remote_attributes {
                    remote.require_attribute(name)?;
                }
            }
        }

        tracing::debug!(tables = tables.len(), "schema built");
        Ok(Schema {
            tables: tables
                .into_iter()
                .map(|(name, table)| (name, Arc::new(table)))
                .collect(),
        })
    }
}

/// `createdAt` -> `CREATED_AT`
pub fn to_constant_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_uppercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{render_expr, render_expr_with, Dialect};
    use serde_json::json;

    fn task_table() -> Table {
        Table::new("task")
            .attribute(Attribute::new("id", "id", ValueCodec::Integer))
            .attribute(Attribute::new("title", "title", ValueCodec::Text))
            .attribute(Attribute::new("email", "email", ValueCodec::CiText).nullable())
            .attribute(Attribute::new("projectId", "project_id", ValueCodec::Integer))
            .primary_key(&["id"])
            .unique_key(&["email"])
            .relation(Relation::new("project", "project").join("projectId", "id").unique())
    }

    fn project_table() -> Table {
        Table::new("project")
            .attribute(Attribute::new("id", "id", ValueCodec::Integer))
            .primary_key(&["id"])
    }

    #[test]
    fn test_build_schema() {
        let schema = SchemaBuilder::new()
            .table(task_table())
            .table(project_table())
            .build()
            .unwrap();

        let task = schema.table("task").unwrap();
        assert_eq!(task.filter_field("title"), Some(FilterField::Attribute(1)));
        assert_eq!(task.filter_field("project"), Some(FilterField::Relation(0)));
        assert_eq!(
            task.filter_field("projectExists"),
            Some(FilterField::RelationExists(0))
        );
        assert_eq!(task.filter_field("or"), Some(FilterField::Or));
        assert_eq!(task.filter_field("nope"), None);
        assert!(schema.require_table("nope").is_err());
    }

    #[test]
    fn test_unknown_remote_table() {
        let err = SchemaBuilder::new().table(task_table()).build().unwrap_err();
        assert!(matches!(err, PlanningError::UnknownRemoteTable { .. }));
    }

    #[test]
    fn test_missing_primary_key() {
        let table = Table::new("t").attribute(Attribute::new("id", "id", ValueCodec::Integer));
        let err = SchemaBuilder::new().table(table).build().unwrap_err();
        assert_eq!(
            err,
            PlanningError::MissingPrimaryKey {
                table: "t".to_string()
            }
        );
    }

    #[test]
    fn test_relation_arity() {
        let mut relation = Relation::new("project", "project").join("projectId", "id");
        relation.remote_attributes.push("id".to_string());
        let table = task_table();
        let table = Table {
            relations: vec![relation],
            ..table
        };
        let err = SchemaBuilder::new()
            .table(table)
            .table(project_table())
            .build()
            .unwrap_err();
        assert!(matches!(err, PlanningError::RelationArity { .. }));
    }

    #[test]
    fn test_duplicate_filter_key() {
        let table = Table::new("t")
            .attribute(Attribute::new("id", "id", ValueCodec::Integer))
            .attribute(Attribute::new("and", "and_col", ValueCodec::Text))
            .primary_key(&["id"]);
        let err = SchemaBuilder::new().table(table).build().unwrap_err();
        assert!(matches!(err, PlanningError::DuplicateName { .. }));
    }

    #[test]
    fn test_resolve_json_compares_canonically() {
        let table = Table::new("doc")
            .attribute(Attribute::new("id", "id", ValueCodec::Integer))
            .attribute(Attribute::new("meta", "meta", ValueCodec::Json).nullable())
            .primary_key(&["id"]);
        let (expr, codec) = table.resolve("d", "meta").unwrap();
        assert_eq!(*codec, ValueCodec::Json);
        assert_eq!(render_expr(&expr), "\"d\".\"meta\"::jsonb");
        assert_eq!(
            render_expr_with(&expr, Dialect::Sqlite),
            "json(\"d\".\"meta\")"
        );
    }

    #[test]
    fn test_resolve_citext_casts() {
        let table = task_table();
        let (expr, codec) = table.resolve("t", "email").unwrap();
        assert_eq!(*codec, ValueCodec::CiText);
        assert_eq!(render_expr(&expr), "\"t\".\"email\"::text");

        let (expr, _) = table.resolve("t", "projectId").unwrap();
        assert_eq!(render_expr(&expr), "\"t\".\"project_id\"");

        assert!(matches!(
            table.resolve("t", "missing"),
            Err(PlanningError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_total_keys_skip_nullable_unique() {
        let table = task_table();
        let keys = table.total_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0], ["id".to_string()]);
    }

    #[test]
    fn test_bind() {
        let codec = ValueCodec::Integer;
        assert_eq!(codec.bind(&json!(5), "f").unwrap(), ParamValue::Integer(5));
        assert!(matches!(
            codec.bind(&json!("5"), "f"),
            Err(UsageError::InvalidOperand { .. })
        ));
        assert!(matches!(
            codec.bind(&json!(null), "f"),
            Err(UsageError::NullLeaf { .. })
        ));
        assert!(codec.bind(&json!(1i64 << 40), "f").is_err());
        assert_eq!(
            ValueCodec::BigInt.bind(&json!(1i64 << 40), "f").unwrap(),
            ParamValue::Integer(1 << 40)
        );
        assert_eq!(
            ValueCodec::Json.bind(&json!({"a": 1}), "f").unwrap(),
            ParamValue::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            ValueCodec::Boolean.normalize(ParamValue::Integer(1)),
            Some(ParamValue::Bool(true))
        );
        assert_eq!(
            ValueCodec::Json.normalize(ParamValue::String("[1,2]".into())),
            Some(ParamValue::Json(json!([1, 2])))
        );
        assert_eq!(ValueCodec::Integer.normalize(ParamValue::String("x".into())), None);

        let stored = ParamValue::String("{\"b\": 2, \"a\": 1}".into());
        match ValueCodec::Json.normalize(stored) {
            Some(ParamValue::Json(v)) => assert_eq!(v.to_string(), "{\"b\":2,\"a\":1}"),
            other => panic!("expected json, got {:?}", other),
        }
    }

    #[test]
    fn test_supports() {
        assert!(!ValueCodec::Json.supports(ComparisonOperator::LessThan));
        assert!(!ValueCodec::Boolean.supports(ComparisonOperator::Like));
        assert!(ValueCodec::CiText.supports(ComparisonOperator::Like));
        assert!(ValueCodec::Integer.supports(ComparisonOperator::In));
    }

    #[test]
    fn test_constant_case() {
        assert_eq!(to_constant_case("createdAt"), "CREATED_AT");
        assert_eq!(to_constant_case("id"), "ID");
        assert_eq!(to_constant_case("projectId"), "PROJECT_ID");
        assert_eq!(to_constant_case("col2Name"), "COL2_NAME");
    }
}
