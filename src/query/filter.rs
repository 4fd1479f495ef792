//! Filters and filter groups.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::model::RelationPath;

use super::attribute::AttributeRef;
use super::comparator::Comparator;

/// Logical operator joining the members of a filter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
    Xor,
    /// Negated conjunction of the members.
    Not,
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Xor => "XOR",
            LogicalOperator::Not => "NOT",
        };
        write!(f, "{}", name)
    }
}

/// A single condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attribute: AttributeRef,
    pub comparator: Comparator,
    pub value: JsonValue,
    /// Evaluated in memory on decoded rows instead of in SQL.
    pub apply_after_read: bool,
}

impl Filter {
    pub fn new(attribute: AttributeRef, comparator: Comparator, value: JsonValue) -> Self {
        Self {
            attribute,
            comparator,
            value,
            apply_after_read: false,
        }
    }

    pub fn after_read(mut self) -> Self {
        self.apply_after_read = true;
        self
    }

    pub fn rebase(&self, anchor: &RelationPath) -> Option<Filter> {
        Some(Filter {
            attribute: self.attribute.rebase(anchor)?,
            ..self.clone()
        })
    }

    /// Compared through a reverse relation.
    pub fn is_reverse(&self) -> bool {
        self.attribute.has_reverse()
    }

    /// The compare value as text.
    pub fn value_text(&self) -> String {
        json_text(&self.value)
    }

    /// Members of an IN list: a JSON array, or a string joined by
    /// [`LIST_DELIMITER`].
    pub fn list_members(&self) -> Vec<String> {
        match &self.value {
            JsonValue::Array(items) => items.iter().map(json_text).collect(),
            JsonValue::String(s) => s
                .split(LIST_DELIMITER)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
            JsonValue::Null => Vec::new(),
            other => vec![json_text(other)],
        }
    }

    /// Bounds of a BETWEEN: `[low, high]` or `"low..high"`.
    pub fn range_bounds(&self) -> Option<(String, String)> {
        match &self.value {
            JsonValue::Array(items) if items.len() == 2 => {
                Some((json_text(&items[0]), json_text(&items[1])))
            }
            JsonValue::String(s) => s
                .split_once("..")
                .map(|(lo, hi)| (lo.trim().to_string(), hi.trim().to_string())),
            _ => None,
        }
    }
}

/// Separator of IN lists given as one string.
pub const LIST_DELIMITER: char = ',';

pub(crate) fn json_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// A tree of filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGroup {
    pub operator: LogicalOperator,
    pub filters: Vec<Filter>,
    pub groups: Vec<FilterGroup>,
}

impl FilterGroup {
    pub fn new(operator: LogicalOperator) -> Self {
        Self {
            operator,
            filters: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(LogicalOperator::And)
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn add_group(&mut self, group: FilterGroup) {
        if !group.is_empty() {
            self.groups.push(group);
        }
    }

    /// No conditions anywhere in the tree.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.groups.iter().all(FilterGroup::is_empty)
    }

    /// Every filter in the tree, depth first.
    pub fn all_filters(&self) -> Vec<&Filter> {
        let mut out: Vec<&Filter> = self.filters.iter().collect();
        for group in &self.groups {
            out.extend(group.all_filters());
        }
        out
    }

    pub fn any(&self, predicate: &impl Fn(&Filter) -> bool) -> bool {
        self.filters.iter().any(predicate) || self.groups.iter().any(|g| g.any(predicate))
    }

    pub fn all(&self, predicate: &impl Fn(&Filter) -> bool) -> bool {
        self.filters.iter().all(predicate) && self.groups.iter().all(|g| g.all(predicate))
    }

    /// Split into the conditions that live under `anchor` (rebased onto it)
    /// and the rest.
    ///
    /// Only AND groups can be split member by member; any other operator
    /// moves as a whole or not at all.
    pub fn rebase(&self, anchor: &RelationPath) -> (FilterGroup, FilterGroup) {
        let in_scope = |f: &Filter| f.attribute.path.starts_with(anchor);

        if self.operator != LogicalOperator::And {
            return if !self.is_empty() && self.all(&in_scope) {
                (self.rebase_all(anchor), FilterGroup::new(self.operator))
            } else {
                (FilterGroup::and(), self.clone())
            };
        }

        let mut inner = FilterGroup::and();
        let mut outer = FilterGroup::and();
        for filter in &self.filters {
            match filter.rebase(anchor) {
                Some(rebased) => inner.filters.push(rebased),
                None => outer.filters.push(filter.clone()),
            }
        }
        for group in &self.groups {
            let (group_inner, group_outer) = group.rebase(anchor);
            inner.add_group(group_inner);
            outer.add_group(group_outer);
        }
        (inner, outer)
    }

    fn rebase_all(&self, anchor: &RelationPath) -> FilterGroup {
        FilterGroup {
            operator: self.operator,
            filters: self
                .filters
                .iter()
                .filter_map(|f| f.rebase(anchor))
                .collect(),
            groups: self.groups.iter().map(|g| g.rebase_all(anchor)).collect(),
        }
    }

    /// Pull out the conditions evaluated after reading.
    ///
    /// At AND level single filters move out; a nested group containing any
    /// after-read filter moves out whole. Below any other operator the group
    /// cannot be split, so the whole tree moves.
    pub fn split_after_read(&self) -> (FilterGroup, FilterGroup) {
        let after_read = |f: &Filter| f.apply_after_read;
        if !self.any(&after_read) {
            return (self.clone(), FilterGroup::and());
        }
        if self.operator != LogicalOperator::And {
            return (FilterGroup::and(), self.clone());
        }

        let mut sql = FilterGroup::and();
        let mut memory = FilterGroup::and();
        for filter in &self.filters {
            if filter.apply_after_read {
                memory.filters.push(filter.clone());
            } else {
                sql.filters.push(filter.clone());
            }
        }
        for group in &self.groups {
            if group.any(&after_read) {
                memory.add_group(group.clone());
            } else {
                sql.add_group(group.clone());
            }
        }
        (sql, memory)
    }
}
