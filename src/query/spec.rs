//! JSON description of a query.
//!
//! ```json
//! {
//!   "object": "ORDER",
//!   "columns": ["ID", {"attribute": "CUSTOMER__NAME", "alias": "CUSTOMER"}],
//!   "filters": {
//!     "operator": "AND",
//!     "conditions": [{"attribute": "STATUS", "comparator": "==", "value": 1}],
//!     "groups": []
//!   },
//!   "sorters": [{"attribute": "DATE", "direction": "DESC"}],
//!   "limit": 20,
//!   "offset": 40
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::sql::SortDir;

use super::comparator::Comparator;
use super::filter::LogicalOperator;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub object: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub filters: Option<FilterGroupSpec>,
    #[serde(default)]
    pub sorters: Vec<SorterSpec>,
    /// Attribute paths to group by.
    #[serde(default)]
    pub aggregations: Vec<String>,
    #[serde(default)]
    pub values: Vec<ValueSpec>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub distinct: bool,
}

impl QuerySpec {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// A column: either a bare attribute path or a detailed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Attribute(String),
    Detailed {
        attribute: String,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        hidden: bool,
    },
}

impl ColumnSpec {
    pub fn attribute(&self) -> &str {
        match self {
            ColumnSpec::Attribute(a) => a,
            ColumnSpec::Detailed { attribute, .. } => attribute,
        }
    }

    /// Key of the column in results; defaults to the attribute expression.
    pub fn column_key(&self) -> &str {
        match self {
            ColumnSpec::Detailed {
                alias: Some(alias), ..
            } => alias,
            other => other.attribute(),
        }
    }

    pub fn hidden(&self) -> bool {
        matches!(self, ColumnSpec::Detailed { hidden: true, .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGroupSpec {
    #[serde(default)]
    pub operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    #[serde(default)]
    pub groups: Vec<FilterGroupSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub attribute: String,
    #[serde(default)]
    pub comparator: Comparator,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub apply_after_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorterSpec {
    pub attribute: String,
    #[serde(default)]
    pub direction: SortDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub attribute: String,
    #[serde(default)]
    pub values: Vec<JsonValue>,
    #[serde(default)]
    pub uids: Vec<JsonValue>,
}
