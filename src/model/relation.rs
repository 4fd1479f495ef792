//! Relations and relation paths.
//!
//! A relation path is the chain of relations leading from the main object of a
//! query to the object that owns an attribute. Forward steps can be joined;
//! the first reverse step is where a correlated subquery has to take over.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute path separator: `CUSTOMER__COUNTRY__NAME`.
pub const PATH_SEPARATOR: &str = "__";

/// Direction of a relation, seen from the object that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Many-to-one ("belongs to"): this object holds the foreign key.
    #[default]
    Forward,
    /// One-to-many ("has many"): the related object holds the foreign key.
    Reverse,
    /// One-to-one, joined like a forward relation.
    OneToOne,
}

/// A relation declared on a metamodel object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(skip)]
    pub alias: String,
    #[serde(default)]
    pub kind: RelationKind,
    /// Alias of the object on the other side.
    pub related_object: String,
    /// Attribute on this object used in the join condition.
    pub key_attribute: String,
    /// Attribute on the related object used in the join condition.
    pub related_key_attribute: String,
}

/// One hop of a relation path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationStep {
    pub relation: String,
    pub kind: RelationKind,
    pub source_object: String,
    pub target_object: String,
    pub key_attribute: String,
    pub related_key_attribute: String,
}

impl RelationStep {
    pub fn new(source_object: &str, relation: &Relation) -> Self {
        Self {
            relation: relation.alias.clone(),
            kind: relation.kind,
            source_object: source_object.to_string(),
            target_object: relation.related_object.clone(),
            key_attribute: relation.key_attribute.clone(),
            related_key_attribute: relation.related_key_attribute.clone(),
        }
    }

    pub fn is_reverse(&self) -> bool {
        self.kind == RelationKind::Reverse
    }
}

/// Ordered relation steps. Empty means "the main object itself".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelationPath {
    steps: Vec<RelationStep>,
}

/// Returned when a step does not start where the path ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectedStep {
    pub expected: String,
    pub found: String,
}

impl RelationPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Its source must be the current target.
    pub fn push(&mut self, step: RelationStep) -> Result<(), DisconnectedStep> {
        if let Some(last) = self.steps.last() {
            if last.target_object != step.source_object {
                return Err(DisconnectedStep {
                    expected: last.target_object.clone(),
                    found: step.source_object,
                });
            }
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn steps(&self) -> &[RelationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&RelationStep> {
        self.steps.last()
    }

    /// Alias of the object at the end of the path.
    pub fn target_object(&self) -> Option<&str> {
        self.steps.last().map(|s| s.target_object.as_str())
    }

    /// Index of the first step of the given kind.
    pub fn first_of(&self, kind: RelationKind) -> Option<usize> {
        self.steps.iter().position(|s| s.kind == kind)
    }

    pub fn first_reverse(&self) -> Option<usize> {
        self.first_of(RelationKind::Reverse)
    }

    pub fn has_reverse(&self) -> bool {
        self.first_reverse().is_some()
    }

    /// Copy of steps `[start, end)`.
    pub fn sub_path(&self, start: usize, end: usize) -> RelationPath {
        let end = end.min(self.steps.len());
        let start = start.min(end);
        RelationPath {
            steps: self.steps[start..end].to_vec(),
        }
    }

    /// The first `len` steps.
    pub fn prefix(&self, len: usize) -> RelationPath {
        self.sub_path(0, len)
    }

    pub fn starts_with(&self, prefix: &RelationPath) -> bool {
        self.steps.starts_with(&prefix.steps)
    }

    /// The remainder after `prefix`, if this path starts with it.
    pub fn strip_prefix(&self, prefix: &RelationPath) -> Option<RelationPath> {
        self.steps
            .strip_prefix(prefix.steps.as_slice())
            .map(|rest| RelationPath {
                steps: rest.to_vec(),
            })
    }

    /// This path followed by `other`.
    pub fn join(&self, other: &RelationPath) -> RelationPath {
        let mut steps = self.steps.clone();
        steps.extend(other.steps.iter().cloned());
        RelationPath { steps }
    }

    /// `CUSTOMER__COUNTRY`; empty for the empty path.
    pub fn alias_path(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.relation.as_str())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alias_path())
    }
}
