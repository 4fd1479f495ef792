//! Filter comparators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// How a filter compares an attribute with its value.
///
/// `IS` is the fuzzy comparator: on strings it matches substrings
/// case-insensitively, on other types it is equality. `EQUALS` is always
/// strict equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Comparator {
    #[default]
    Is,
    IsNot,
    Equals,
    EqualsNot,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    In,
    NotIn,
    Between,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Is => "=",
            Comparator::IsNot => "!=",
            Comparator::Equals => "==",
            Comparator::EqualsNot => "!==",
            Comparator::LessThan => "<",
            Comparator::LessThanOrEquals => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEquals => ">=",
            Comparator::In => "[",
            Comparator::NotIn => "![",
            Comparator::Between => "..",
        }
    }

    /// `<`, `<=`, `>`, `>=` and `BETWEEN`: the value must parse.
    pub fn is_range(self) -> bool {
        matches!(
            self,
            Comparator::LessThan
                | Comparator::LessThanOrEquals
                | Comparator::GreaterThan
                | Comparator::GreaterThanOrEquals
                | Comparator::Between
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, Comparator::In | Comparator::NotIn)
    }

    pub fn is_negative(self) -> bool {
        matches!(
            self,
            Comparator::IsNot | Comparator::EqualsNot | Comparator::NotIn
        )
    }

    /// The strict counterpart of a fuzzy comparator.
    pub fn strict(self) -> Comparator {
        match self {
            Comparator::Is => Comparator::Equals,
            Comparator::IsNot => Comparator::EqualsNot,
            other => other,
        }
    }
}

impl FromStr for Comparator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let comparator = match s.trim().to_ascii_uppercase().as_str() {
            "=" | "IS" => Comparator::Is,
            "!=" | "IS_NOT" => Comparator::IsNot,
            "==" | "EQUALS" => Comparator::Equals,
            "!==" | "EQUALS_NOT" => Comparator::EqualsNot,
            "<" | "LESS_THAN" => Comparator::LessThan,
            "<=" | "LESS_THAN_OR_EQUALS" => Comparator::LessThanOrEquals,
            ">" | "GREATER_THAN" => Comparator::GreaterThan,
            ">=" | "GREATER_THAN_OR_EQUALS" => Comparator::GreaterThanOrEquals,
            "[" | "IN" => Comparator::In,
            "![" | "NOT_IN" => Comparator::NotIn,
            ".." | "BETWEEN" => Comparator::Between,
            _ => return Err(CompileError::InvalidComparator(s.to_string())),
        };
        Ok(comparator)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<String> for Comparator {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Comparator> for String {
    fn from(value: Comparator) -> Self {
        value.symbol().to_string()
    }
}
