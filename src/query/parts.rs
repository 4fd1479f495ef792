//! Select, sorter, aggregation and value parts.

use serde_json::Value as JsonValue;

use crate::sql::SortDir;

use super::attribute::AttributeRef;

/// A selected column.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub attribute: AttributeRef,
    /// Key of the column in decoded rows.
    pub column_key: String,
    /// Selected for the compiler's own use and stripped from results.
    pub hidden: bool,
    /// Rendered with the attribute's ORDER BY SQL; only ever hidden.
    pub for_sorting: bool,
}

impl Select {
    pub fn new(attribute: AttributeRef) -> Self {
        Self {
            column_key: attribute.expression(),
            attribute,
            hidden: false,
            for_sorting: false,
        }
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.column_key = key.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Sorter {
    pub attribute: AttributeRef,
    pub direction: SortDir,
}

/// A GROUP BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub attribute: AttributeRef,
}

/// Values to write for one attribute, one entry per row.
///
/// `uids` pairs each value with the UID of the row it belongs to. A single
/// value is shared by every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub attribute: AttributeRef,
    pub values: Vec<JsonValue>,
    pub uids: Vec<JsonValue>,
}

impl Value {
    /// The value for row `row`, broadcasting a single value.
    pub fn value_for_row(&self, row: usize) -> &JsonValue {
        match self.values.len() {
            1 => &self.values[0],
            _ => self.values.get(row).unwrap_or(&JsonValue::Null),
        }
    }

    /// All rows get the same value.
    pub fn is_shared(&self) -> bool {
        self.values.windows(2).all(|w| w[0] == w[1])
    }
}

/// Any part a query holds in its arena.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPart {
    Select(Select),
    Sorter(Sorter),
    Aggregation(Aggregation),
    Value(Value),
}

/// Handle of a part in its query's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub usize);

impl QueryPart {
    pub fn attribute(&self) -> &AttributeRef {
        match self {
            QueryPart::Select(s) => &s.attribute,
            QueryPart::Sorter(s) => &s.attribute,
            QueryPart::Aggregation(a) => &a.attribute,
            QueryPart::Value(v) => &v.attribute,
        }
    }

    pub fn as_select(&self) -> Option<&Select> {
        match self {
            QueryPart::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sorter(&self) -> Option<&Sorter> {
        match self {
            QueryPart::Sorter(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_aggregation(&self) -> Option<&Aggregation> {
        match self {
            QueryPart::Aggregation(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            QueryPart::Value(v) => Some(v),
            _ => None,
        }
    }
}
