//! Schema loading and attribute resolution.
//!
//! A schema is the set of metamodel objects a query can reference. It loads
//! from JSON or TOML:
//!
//! ```toml
//! [objects.ORDER]
//! data_address = "orders"
//! uid = "ID"
//!
//! [objects.ORDER.attributes.ID]
//! data_address = "id"
//! data_type = "integer"
//!
//! [objects.ORDER.relations.CUSTOMER]
//! kind = "forward"
//! related_object = "CUSTOMER"
//! key_attribute = "CUSTOMER"
//! related_key_attribute = "ID"
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::object::{Attribute, MetaObject};
use super::relation::{RelationKind, RelationPath, RelationStep, PATH_SEPARATOR};
use crate::error::{CompileError, CompileResult};

/// Errors while loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid schema for object '{object}': {message}")]
    Invalid { object: String, message: String },
}

/// All metamodel objects, keyed by alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub objects: IndexMap<String, MetaObject>,
}

impl Schema {
    pub fn from_json(content: &str) -> Result<Self, SchemaError> {
        serde_json::from_str::<Schema>(content)?.finalize()
    }

    pub fn from_toml(content: &str) -> Result<Self, SchemaError> {
        toml::from_str::<Schema>(content)?.finalize()
    }

    /// Load a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Add an object built in code.
    pub fn insert(&mut self, object: MetaObject) {
        self.objects.insert(object.alias.clone(), object);
    }

    /// Copy map keys into the alias fields and check cross references.
    pub fn finalize(mut self) -> Result<Self, SchemaError> {
        for (alias, object) in self.objects.iter_mut() {
            object.alias = alias.clone();
            for (attr_alias, attr) in object.attributes.iter_mut() {
                attr.alias = attr_alias.clone();
            }
            for (rel_alias, rel) in object.relations.iter_mut() {
                rel.alias = rel_alias.clone();
            }
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for object in self.objects.values() {
            let invalid = |message: String| SchemaError::Invalid {
                object: object.alias.clone(),
                message,
            };

            if let Some(uid) = &object.uid {
                if object.attribute(uid).is_none() {
                    return Err(invalid(format!("UID attribute '{}' does not exist", uid)));
                }
            }

            for relation in object.relations.values() {
                let related = self.objects.get(&relation.related_object).ok_or_else(|| {
                    invalid(format!(
                        "relation '{}' points to unknown object '{}'",
                        relation.alias, relation.related_object
                    ))
                })?;
                if object.attribute(&relation.key_attribute).is_none() {
                    return Err(invalid(format!(
                        "relation '{}' uses unknown key attribute '{}'",
                        relation.alias, relation.key_attribute
                    )));
                }
                if related.attribute(&relation.related_key_attribute).is_none() {
                    return Err(invalid(format!(
                        "relation '{}' uses unknown attribute '{}' of '{}'",
                        relation.alias, relation.related_key_attribute, related.alias
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn object(&self, alias: &str) -> CompileResult<&MetaObject> {
        self.objects
            .get(alias)
            .ok_or_else(|| CompileError::UnknownObject(alias.to_string()))
    }

    /// Follow relation aliases from `object`.
    pub fn resolve_path(&self, object: &str, relations: &[&str]) -> CompileResult<RelationPath> {
        let mut path = RelationPath::new();
        let mut current = self.object(object)?;

        for relation_alias in relations {
            let relation =
                current
                    .relation(relation_alias)
                    .ok_or_else(|| CompileError::UnknownRelation {
                        object: current.alias.clone(),
                        relation: relation_alias.to_string(),
                    })?;
            path.push(RelationStep::new(&current.alias, relation))
                .map_err(|_| CompileError::BrokenRelationPath {
                    path: relations.join(PATH_SEPARATOR),
                    relation: relation_alias.to_string(),
                })?;
            current = self.object(&relation.related_object)?;
        }

        Ok(path)
    }

    /// Resolve `CUSTOMER__COUNTRY__NAME` from `object`.
    ///
    /// A trailing forward step whose target attribute is the related key is
    /// folded into the foreign key on the near side, so `CUSTOMER__ID` needs
    /// no join.
    pub fn resolve_attribute(
        &self,
        object: &str,
        alias_path: &str,
    ) -> CompileResult<(RelationPath, Attribute)> {
        let segments: Vec<&str> = alias_path.split(PATH_SEPARATOR).collect();
        let (attr_alias, relations) = match segments.split_last() {
            Some((last, rest)) => (*last, rest),
            None => (alias_path, &[][..]),
        };

        let mut path = self.resolve_path(object, relations)?;
        let owner_alias = path.target_object().unwrap_or(object).to_string();
        let owner = self.object(&owner_alias)?;
        let attribute = owner
            .attribute(attr_alias)
            .ok_or_else(|| CompileError::UnknownAttribute {
                object: owner_alias.clone(),
                attribute: attr_alias.to_string(),
            })?;

        if let Some(last) = path.last() {
            if last.kind != RelationKind::Reverse && last.related_key_attribute == attribute.alias {
                let near_key = last.key_attribute.clone();
                let near_path = path.prefix(path.len() - 1);
                let near_object = near_path.target_object().unwrap_or(object).to_string();
                if let Some(fk) = self.object(&near_object)?.attribute(&near_key) {
                    let fk = fk.clone();
                    path = near_path;
                    return Ok((path, fk));
                }
            }
        }

        Ok((path, attribute.clone()))
    }
}
