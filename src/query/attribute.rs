//! Attribute references resolved against the schema.

use crate::error::CompileResult;
use crate::model::{Attribute, RelationPath, Schema, PATH_SEPARATOR};

use super::aggregator::Aggregator;

/// An attribute as a query part sees it: the relation path from the main
/// object, the attribute at its end, and an optional aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRef {
    /// `CUSTOMER__NAME` (relative to the object the reference was resolved from).
    pub alias_path: String,
    pub path: RelationPath,
    /// Alias of the object owning `attribute`.
    pub object: String,
    pub attribute: Attribute,
    pub aggregator: Option<Aggregator>,
    /// The attribute is the UID of its object.
    pub is_uid: bool,
    /// The attribute is the foreign key of a forward relation of its object.
    pub is_relation: bool,
}

impl AttributeRef {
    /// Resolve `CUSTOMER__COUNTRY__NAME` or `POSITION__QTY:SUM` starting at
    /// `object`.
    pub fn resolve(schema: &Schema, object: &str, expression: &str) -> CompileResult<Self> {
        let (alias_path, aggregator) = match expression.split_once(':') {
            Some((path, agg)) => (path.trim(), Some(agg.parse::<Aggregator>()?)),
            None => (expression.trim(), None),
        };

        let (path, attribute) = schema.resolve_attribute(object, alias_path)?;
        let owner_alias = path.target_object().unwrap_or(object).to_string();
        let owner = schema.object(&owner_alias)?;

        Ok(Self {
            alias_path: alias_path.to_string(),
            is_uid: owner.is_uid(&attribute.alias),
            is_relation: owner.relation_by_key(&attribute.alias).is_some(),
            path,
            object: owner_alias,
            attribute,
            aggregator,
        })
    }

    /// Same attribute, different aggregator.
    pub fn with_aggregator(&self, aggregator: Option<Aggregator>) -> Self {
        Self {
            aggregator,
            ..self.clone()
        }
    }

    /// The alias path plus aggregator suffix, e.g. `POSITION__QTY:SUM`.
    pub fn expression(&self) -> String {
        match &self.aggregator {
            Some(agg) => format!("{}:{}", self.alias_path, agg),
            None => self.alias_path.clone(),
        }
    }

    /// The attribute seen from the end of `anchor`, if its path starts there.
    pub fn rebase(&self, anchor: &RelationPath) -> Option<Self> {
        let rest = self.path.strip_prefix(anchor)?;
        let alias_path = if rest.is_empty() {
            self.attribute.alias.clone()
        } else {
            format!("{}{}{}", rest.alias_path(), PATH_SEPARATOR, self.attribute.alias)
        };
        Some(Self {
            alias_path,
            path: rest,
            ..self.clone()
        })
    }

    pub fn has_reverse(&self) -> bool {
        self.path.has_reverse()
    }

    /// The path up to and including the first reverse step.
    pub fn reverse_anchor(&self) -> Option<RelationPath> {
        self.path.first_reverse().map(|idx| self.path.prefix(idx + 1))
    }
}
