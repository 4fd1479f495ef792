//! Metamodel objects and attributes.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::relation::{Relation, RelationKind};
use super::types::DataType;
use crate::query::Aggregator;
use crate::sql::Dialect;

/// A business object backed by a table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaObject {
    #[serde(skip)]
    pub alias: String,
    /// Table name, emitted verbatim.
    pub data_address: String,
    /// Alias of the UID attribute.
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub uid_generator: UidGenerator,
    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,
    #[serde(default)]
    pub relations: IndexMap<String, Relation>,
}

impl MetaObject {
    pub fn attribute(&self, alias: &str) -> Option<&Attribute> {
        self.attributes.get(alias)
    }

    pub fn relation(&self, alias: &str) -> Option<&Relation> {
        self.relations.get(alias)
    }

    pub fn uid_attribute(&self) -> Option<&Attribute> {
        self.uid.as_deref().and_then(|uid| self.attributes.get(uid))
    }

    pub fn is_uid(&self, attribute: &str) -> bool {
        self.uid.as_deref() == Some(attribute)
    }

    /// The forward relation whose foreign key is `attribute`, if any.
    pub fn relation_by_key(&self, attribute: &str) -> Option<&Relation> {
        self.relations.values().find(|r| {
            r.key_attribute == attribute
                && matches!(r.kind, RelationKind::Forward | RelationKind::OneToOne)
        })
    }
}

/// How new UIDs are produced on INSERT.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UidGenerator {
    /// The database assigns the key (identity / auto-increment / sequence default).
    #[default]
    AutoIncrement,
    /// A v4 UUID generated client-side.
    Uuid,
    /// A SQL expression evaluated by the database.
    Custom(String),
}

/// Attribute-level SQL that replaces the generated fragment.
///
/// Templates may use `[#alias#]` (the quoted table alias) and, where a value
/// is involved, `[#value#]` (the escaped value).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomSql {
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub insert: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
}

/// An attribute of a metamodel object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(skip)]
    pub alias: String,
    /// Column name, emitted verbatim.
    pub data_address: String,
    #[serde(default)]
    pub data_type: DataType,
    /// NULL is rejected when writing.
    #[serde(default)]
    pub required: bool,
    /// Used when the attribute sits behind a reverse relation or in a grouped
    /// query and the caller did not name an aggregator.
    #[serde(default)]
    pub default_aggregator: Option<Aggregator>,
    #[serde(default)]
    pub custom: CustomSql,
    /// Per-dialect replacements for `custom`.
    #[serde(default)]
    pub overrides: HashMap<Dialect, CustomSql>,
}

impl Attribute {
    pub fn new(alias: &str, data_address: &str, data_type: DataType) -> Self {
        Self {
            alias: alias.to_string(),
            data_address: data_address.to_string(),
            data_type,
            required: false,
            default_aggregator: None,
            custom: CustomSql::default(),
            overrides: HashMap::new(),
        }
    }

    fn custom_for(&self, dialect: Dialect, pick: impl Fn(&CustomSql) -> Option<&String>) -> Option<&str> {
        self.overrides
            .get(&dialect)
            .and_then(&pick)
            .or_else(|| pick(&self.custom))
            .map(String::as_str)
    }

    pub fn select_sql(&self, dialect: Dialect) -> Option<&str> {
        self.custom_for(dialect, |c| c.select.as_ref())
    }

    pub fn where_sql(&self, dialect: Dialect) -> Option<&str> {
        self.custom_for(dialect, |c| c.where_clause.as_ref())
    }

    pub fn order_by_sql(&self, dialect: Dialect) -> Option<&str> {
        self.custom_for(dialect, |c| c.order_by.as_ref())
    }

    pub fn insert_sql(&self, dialect: Dialect) -> Option<&str> {
        self.custom_for(dialect, |c| c.insert.as_ref())
    }

    pub fn update_sql(&self, dialect: Dialect) -> Option<&str> {
        self.custom_for(dialect, |c| c.update.as_ref())
    }

    pub fn is_binary(&self) -> bool {
        self.data_type == DataType::Binary
    }
}
