//! Filter descriptors
//!
//! Client filter JSON is parsed into a [`FilterNode`] tree against a table's
//! precomputed filter field table. All structural validation happens here so
//! nothing malformed ever reaches the SQL builder.

use crate::error::{GraphQLResult, UsageError};
use crate::sql_types::{FilterField, Schema, Table};
use serde_json::{Map, Value};

/// Comparison operators available on attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    IsNull,
    EqualTo,
    NotEqualTo,
    DistinctFrom,
    NotDistinctFrom,
    In,
    NotIn,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
    NotLike,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 13] = [
        Self::IsNull,
        Self::EqualTo,
        Self::NotEqualTo,
        Self::DistinctFrom,
        Self::NotDistinctFrom,
        Self::In,
        Self::NotIn,
        Self::LessThan,
        Self::LessThanOrEqualTo,
        Self::GreaterThan,
        Self::GreaterThanOrEqualTo,
        Self::Like,
        Self::NotLike,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_key() == key)
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::IsNull => "isNull",
            Self::EqualTo => "equalTo",
            Self::NotEqualTo => "notEqualTo",
            Self::DistinctFrom => "distinctFrom",
            Self::NotDistinctFrom => "notDistinctFrom",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqualTo => "lessThanOrEqualTo",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqualTo => "greaterThanOrEqualTo",
            Self::Like => "like",
            Self::NotLike => "notLike",
        }
    }
}

/// Quantifier over the rows of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Every,
    Some,
    None,
}

impl Quantifier {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "every" => Some(Self::Every),
            "some" => Some(Self::Some),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// A validated boolean predicate over a table's attributes and relations
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `operand` is still raw client JSON; it is bound through the
    /// attribute's codec when the node is compiled
    AttributeComparison {
        attribute: String,
        operator: ComparisonOperator,
        operand: Value,
    },
    RelationFilter {
        relation: String,
        quantifier: Quantifier,
        filter: Box<FilterNode>,
    },
    RelationExists {
        relation: String,
        expected: bool,
    },
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
}

impl FilterNode {
    pub fn comparison(
        attribute: impl Into<String>,
        operator: ComparisonOperator,
        operand: Value,
    ) -> Self {
        Self::AttributeComparison {
            attribute: attribute.into(),
            operator,
            operand,
        }
    }

    /// Parse a client `filter` object
    pub fn parse(schema: &Schema, table: &Table, value: &Value) -> GraphQLResult<FilterNode> {
        FilterParser { schema }.parse_object(table, value, "filter")
    }

    /// Parse a flat `condition` map.
    ///
    /// Every entry is an equality test on an attribute; `null` tests for
    /// `IS NULL`.
    pub fn from_condition(table: &Table, value: &Value) -> GraphQLResult<FilterNode> {
        let path = "condition";
        let map = expect_object(value, path)?;
        let mut children = Vec::with_capacity(map.len());
        for (key, operand) in map {
            let field_path = format!("{}.{}", path, key);
            match table.filter_field(key) {
                Some(FilterField::Attribute(_)) => {}
                _ => {
                    return Err(UsageError::UnknownFilterField {
                        path: path.to_string(),
                        field: key.clone(),
                    }
                    .into())
                }
            }
            let node = if operand.is_null() {
                FilterNode::comparison(key.as_str(), ComparisonOperator::IsNull, Value::Bool(true))
            } else {
                if operand.is_object() || operand.is_array() {
                    let codec_accepts = table
                        .get_attribute(key)
                        .map_or(false, |a| a.codec == crate::sql_types::ValueCodec::Json);
                    if !codec_accepts {
                        return Err(UsageError::InvalidOperand {
                            path: field_path,
                            reason: "condition values must be scalars".to_string(),
                        }
                        .into());
                    }
                }
                FilterNode::comparison(key.as_str(), ComparisonOperator::EqualTo, operand.clone())
            };
            children.push(node);
        }
        Ok(collapse_and(children))
    }
}

fn collapse_and(mut children: Vec<FilterNode>) -> FilterNode {
    if children.len() == 1 {
        children.remove(0)
    } else {
        FilterNode::And(children)
    }
}

fn expect_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, UsageError> {
    match value {
        Value::Null => Err(UsageError::NullLeaf {
            path: path.to_string(),
        }),
        Value::Object(map) if map.is_empty() => Err(UsageError::EmptyFilter {
            path: path.to_string(),
        }),
        Value::Object(map) => Ok(map),
        other => Err(UsageError::InvalidOperand {
            path: path.to_string(),
            reason: format!("expected an object, got {}", other),
        }),
    }
}

struct FilterParser<'a> {
    schema: &'a Schema,
}

impl<'a> FilterParser<'a> {
    fn parse_object(&self, table: &Table, value: &Value, path: &str) -> GraphQLResult<FilterNode> {
        let map = expect_object(value, path)?;
        let mut children = Vec::with_capacity(map.len());
        for (key, field_value) in map {
            let field_path = format!("{}.{}", path, key);
            let field = table
                .filter_field(key)
                .ok_or_else(|| UsageError::UnknownFilterField {
                    path: path.to_string(),
                    field: key.clone(),
                })?;
            let node = match field {
                FilterField::And => FilterNode::And(self.parse_list(table, field_value, &field_path)?),
                FilterField::Or => FilterNode::Or(self.parse_list(table, field_value, &field_path)?),
                FilterField::Not => {
                    FilterNode::Not(Box::new(self.parse_object(table, field_value, &field_path)?))
                }
                FilterField::Attribute(i) => {
                    self.parse_comparisons(table, i, field_value, &field_path)?
                }
                FilterField::Relation(i) => {
                    self.parse_relation(table, i, field_value, &field_path)?
                }
                FilterField::RelationExists(i) => {
                    let expected = match field_value {
                        Value::Null => {
                            return Err(UsageError::NullLeaf { path: field_path }.into())
                        }
                        Value::Bool(b) => *b,
                        other => {
                            return Err(UsageError::InvalidOperand {
                                path: field_path,
                                reason: format!("expected a boolean, got {}", other),
                            }
                            .into())
                        }
                    };
                    FilterNode::RelationExists {
                        relation: table.relations[i].name.clone(),
                        expected,
                    }
                }
            };
            children.push(node);
        }
        Ok(collapse_and(children))
    }

    fn parse_list(&self, table: &Table, value: &Value, path: &str) -> GraphQLResult<Vec<FilterNode>> {
        let items = match value {
            Value::Null => return Err(UsageError::NullLeaf { path: path.to_string() }.into()),
            Value::Array(items) => items,
            other => {
                return Err(UsageError::InvalidOperand {
                    path: path.to_string(),
                    reason: format!("expected a list of filters, got {}", other),
                }
                .into())
            }
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.parse_object(table, item, &format!("{}[{}]", path, i)))
            .collect()
    }

    fn parse_comparisons(
        &self,
        table: &Table,
        index: usize,
        value: &Value,
        path: &str,
    ) -> GraphQLResult<FilterNode> {
        let attribute = &table.attributes[index];
        let map = expect_object(value, path)?;
        let mut children = Vec::with_capacity(map.len());
        for (key, operand) in map {
            let op_path = format!("{}.{}", path, key);
            let operator =
                ComparisonOperator::from_key(key).ok_or_else(|| UsageError::UnknownFilterField {
                    path: path.to_string(),
                    field: key.clone(),
                })?;
            if !attribute.codec.supports(operator) {
                return Err(UsageError::UnsupportedOperator {
                    path: op_path,
                    operator: key.clone(),
                    codec: attribute.codec.name().to_string(),
                }
                .into());
            }
            validate_operand(operator, operand, &op_path)?;
            children.push(FilterNode::comparison(
                attribute.name.as_str(),
                operator,
                operand.clone(),
            ));
        }
        Ok(collapse_and(children))
    }

    fn parse_relation(
        &self,
        table: &Table,
        index: usize,
        value: &Value,
        path: &str,
    ) -> GraphQLResult<FilterNode> {
        let relation = &table.relations[index];
        let remote = self.schema.remote_table(table, relation)?;
        let map = expect_object(value, path)?;
        let mut children = Vec::with_capacity(map.len());
        for (key, sub_value) in map {
            let quantifier =
                Quantifier::from_key(key).ok_or_else(|| UsageError::UnknownFilterField {
                    path: path.to_string(),
                    field: key.clone(),
                })?;
            let sub = self.parse_object(remote, sub_value, &format!("{}.{}", path, key))?;
            children.push(FilterNode::RelationFilter {
                relation: relation.name.clone(),
                quantifier,
                filter: Box::new(sub),
            });
        }
        Ok(collapse_and(children))
    }
}

/// Structural checks on an operand. Type checks happen when it is bound.
pub fn validate_operand(
    operator: ComparisonOperator,
    operand: &Value,
    path: &str,
) -> Result<(), UsageError> {
    match (operator, operand) {
        (_, Value::Null) => Err(UsageError::NullLeaf {
            path: path.to_string(),
        }),
        (ComparisonOperator::IsNull, Value::Bool(_)) => Ok(()),
        (ComparisonOperator::IsNull, other) => Err(UsageError::InvalidOperand {
            path: path.to_string(),
            reason: format!("expected a boolean, got {}", other),
        }),
        (ComparisonOperator::In | ComparisonOperator::NotIn, Value::Array(items)) => {
            match items.iter().position(|v| v.is_null()) {
                Some(i) => Err(UsageError::NullLeaf {
                    path: format!("{}[{}]", path, i),
                }),
                None => Ok(()),
            }
        }
        (ComparisonOperator::In | ComparisonOperator::NotIn, other) => {
            Err(UsageError::InvalidOperand {
                path: path.to_string(),
                reason: format!("expected a list, got {}", other),
            })
        }
        _ => Ok(()),
    }
}
