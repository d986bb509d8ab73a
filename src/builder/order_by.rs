//! Order-by compilation
//!
//! Directives such as `CREATED_AT_DESC` or `PRIMARY_KEY_ASC` are expanded into
//! an [`OrderSpec`]: the ordered attribute list plus whether it identifies
//! rows uniquely. Keyset pagination is only stable over a unique order, so
//! a non-unique one is either completed with the primary key or rejected,
//! depending on [`OrderTieBreak`].

use crate::ast::{Expr, NullsOrder, OrderByExpr, OrderDirection};
use crate::config::OrderTieBreak;
use crate::error::{GraphQLResult, UsageError};
use crate::sql_types::{Attribute, Table, ValueCodec};
use std::collections::HashSet;
use xxhash_rust::xxh64::xxh64;

const PRIMARY_KEY_ASC: &str = "PRIMARY_KEY_ASC";
const PRIMARY_KEY_DESC: &str = "PRIMARY_KEY_DESC";
const NATURAL: &str = "NATURAL";

/// Longest suffixes first so `_ASC` never shadows `_ASC_NULLS_FIRST`
const SUFFIXES: [(&str, OrderDirection, NullsOrder); 6] = [
    ("_ASC_NULLS_FIRST", OrderDirection::Asc, NullsOrder::First),
    ("_ASC_NULLS_LAST", OrderDirection::Asc, NullsOrder::Last),
    ("_DESC_NULLS_FIRST", OrderDirection::Desc, NullsOrder::First),
    ("_DESC_NULLS_LAST", OrderDirection::Desc, NullsOrder::Last),
    ("_ASC", OrderDirection::Asc, NullsOrder::Last),
    ("_DESC", OrderDirection::Desc, NullsOrder::First),
];

/// One sort key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderElem {
    pub attribute: String,
    pub column: String,
    pub codec: ValueCodec,
    pub nullable: bool,
    pub direction: OrderDirection,
    pub nulls: NullsOrder,
}

impl OrderElem {
    fn new(attribute: &Attribute, direction: OrderDirection, nulls: NullsOrder) -> Self {
        Self {
            attribute: attribute.name.clone(),
            column: attribute.column.clone(),
            codec: attribute.codec,
            nullable: attribute.nullable,
            direction,
            nulls,
        }
    }

    /// Same key, opposite direction and null placement
    pub fn reversed(&self) -> Self {
        Self {
            direction: match self.direction {
                OrderDirection::Asc => OrderDirection::Desc,
                OrderDirection::Desc => OrderDirection::Asc,
            },
            nulls: match self.nulls {
                NullsOrder::First => NullsOrder::Last,
                NullsOrder::Last => NullsOrder::First,
            },
            ..self.clone()
        }
    }

    /// Column expression under `block_name`, in the codec's comparison form
    pub fn column_expr(&self, block_name: &str) -> Expr {
        self.codec
            .column_expr(Expr::qualified_column(block_name, self.column.as_str()))
    }

    fn signature(&self) -> String {
        format!(
            "{}:{}:{}",
            self.attribute,
            self.direction.as_sql(),
            self.nulls.as_sql()
        )
    }
}

/// A compiled ordering over one table
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    table: String,
    elems: Vec<OrderElem>,
    is_unique: bool,
}

impl OrderSpec {
    /// Compile client order directives. An empty list means primary key
    /// ascending.
    pub fn compile(
        table: &Table,
        directives: &[String],
        tie_break: OrderTieBreak,
    ) -> GraphQLResult<OrderSpec> {
        let mut keys = vec![];
        if directives.is_empty() {
            push_primary_key(table, OrderDirection::Asc, NullsOrder::Last, &mut keys);
        }
        for directive in directives {
            match directive.as_str() {
                NATURAL => {}
                PRIMARY_KEY_ASC => {
                    push_primary_key(table, OrderDirection::Asc, NullsOrder::Last, &mut keys)
                }
                PRIMARY_KEY_DESC => {
                    push_primary_key(table, OrderDirection::Desc, NullsOrder::First, &mut keys)
                }
                other => keys.push(parse_directive(table, other)?),
            }
        }
        Ok(Self::accumulate(table, keys, tie_break)?)
    }

    /// Build an ordering from attribute names.
    ///
    /// Unlike [`OrderSpec::compile`] the names come from code rather than
    /// a client, so an unknown one is a planning error.
    pub fn from_attributes(
        table: &Table,
        keys: &[(&str, OrderDirection, NullsOrder)],
        tie_break: OrderTieBreak,
    ) -> GraphQLResult<OrderSpec> {
        let mut elems = Vec::with_capacity(keys.len());
        for (name, direction, nulls) in keys {
            let attribute = table.require_attribute(name)?;
            elems.push(OrderElem::new(attribute, *direction, *nulls));
        }
        Ok(Self::accumulate(table, elems, tie_break)?)
    }

    fn accumulate(
        table: &Table,
        keys: Vec<OrderElem>,
        tie_break: OrderTieBreak,
    ) -> Result<OrderSpec, UsageError> {
        let total_keys = table.total_keys();
        let mut seen: HashSet<String> = HashSet::new();
        let mut elems = Vec::with_capacity(keys.len());
        let mut is_unique = false;

        for key in keys {
            // A repeated attribute cannot change the order
            if !seen.insert(key.attribute.clone()) {
                continue;
            }
            elems.push(key);
            if !is_unique {
                is_unique = total_keys
                    .iter()
                    .any(|k| k.iter().all(|name| seen.contains(name)));
            }
        }

        if !is_unique {
            match tie_break {
                OrderTieBreak::Reject => {
                    return Err(UsageError::NonUniqueOrder {
                        table: table.name.clone(),
                    })
                }
                OrderTieBreak::AppendPrimaryKey => {
                    for attribute in table.primary_key_attributes() {
                        if seen.insert(attribute.name.clone()) {
                            elems.push(OrderElem::new(
                                attribute,
                                OrderDirection::Asc,
                                NullsOrder::Last,
                            ));
                        }
                    }
                    is_unique = true;
                }
            }
        }

        Ok(OrderSpec {
            table: table.name.clone(),
            elems,
            is_unique,
        })
    }

    pub fn elems(&self) -> &[OrderElem] {
        &self.elems
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The same ordering walked from the other end
    pub fn reversed(&self) -> OrderSpec {
        OrderSpec {
            table: self.table.clone(),
            elems: self.elems.iter().map(OrderElem::reversed).collect(),
            is_unique: self.is_unique,
        }
    }

    /// Canonical text form of the ordering, the input to [`Self::fingerprint`]
    pub fn signature(&self) -> String {
        let keys: Vec<String> = self.elems.iter().map(OrderElem::signature).collect();
        format!("{}|{}", self.table, keys.join(","))
    }

    /// Hex xxh64 of [`Self::signature`], embedded in every cursor
    pub fn fingerprint(&self) -> String {
        format!("{:016x}", xxh64(self.signature().as_bytes(), 0))
    }

    /// ORDER BY list under `block_name`
    pub fn to_order_by(&self, block_name: &str) -> Vec<OrderByExpr> {
        self.elems
            .iter()
            .map(|elem| {
                let expr = elem.column_expr(block_name);
                let order = match elem.direction {
                    OrderDirection::Asc => OrderByExpr::asc(expr),
                    OrderDirection::Desc => OrderByExpr::desc(expr),
                };
                order.with_nulls(elem.nulls)
            })
            .collect()
    }
}

fn push_primary_key(
    table: &Table,
    direction: OrderDirection,
    nulls: NullsOrder,
    keys: &mut Vec<OrderElem>,
) {
    for attribute in table.primary_key_attributes() {
        keys.push(OrderElem::new(attribute, direction, nulls));
    }
}

fn parse_directive(table: &Table, directive: &str) -> Result<OrderElem, UsageError> {
    let unknown = || UsageError::UnknownOrderDirective {
        directive: directive.to_string(),
    };
    let (name, direction, nulls) = SUFFIXES
        .iter()
        .find_map(|(suffix, direction, nulls)| {
            directive
                .strip_suffix(suffix)
                .map(|name| (name, *direction, *nulls))
        })
        .ok_or_else(unknown)?;
    let attribute = table
        .attributes
        .iter()
        .find(|a| a.constant_name() == name)
        .ok_or_else(unknown)?;
    Ok(OrderElem::new(attribute, direction, nulls))
}
