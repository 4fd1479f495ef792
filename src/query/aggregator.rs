//! Aggregate functions applied to attributes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::model::DataType;

/// Delimiter used by `LIST` when none is given.
pub const DEFAULT_LIST_DELIMITER: &str = ", ";

/// An aggregate function, written as an attribute suffix: `QTY:SUM`,
/// `NAME:LIST(;)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Aggregator {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    CountDistinct,
    List { delimiter: String },
    ListDistinct { delimiter: String },
}

impl Aggregator {
    pub fn is_list(&self) -> bool {
        matches!(self, Aggregator::List { .. } | Aggregator::ListDistinct { .. })
    }

    pub fn is_distinct(&self) -> bool {
        matches!(self, Aggregator::CountDistinct | Aggregator::ListDistinct { .. })
    }

    pub fn delimiter(&self) -> Option<&str> {
        match self {
            Aggregator::List { delimiter } | Aggregator::ListDistinct { delimiter } => {
                Some(delimiter)
            }
            _ => None,
        }
    }

    /// Type of the aggregated value for an attribute of `input` type.
    pub fn result_type(&self, input: DataType) -> DataType {
        match self {
            Aggregator::Count | Aggregator::CountDistinct => DataType::Integer,
            Aggregator::Sum | Aggregator::Avg => DataType::Number,
            Aggregator::Min | Aggregator::Max => input,
            Aggregator::List { .. } | Aggregator::ListDistinct { .. } => DataType::String,
        }
    }

    /// SQL function name for the plain aggregates.
    pub fn function_name(&self) -> &'static str {
        match self {
            Aggregator::Sum => "SUM",
            Aggregator::Avg => "AVG",
            Aggregator::Min => "MIN",
            Aggregator::Max => "MAX",
            Aggregator::Count | Aggregator::CountDistinct => "COUNT",
            Aggregator::List { .. } | Aggregator::ListDistinct { .. } => "LIST",
        }
    }
}

fn list_delimiter(args: Option<&str>) -> String {
    match args {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => DEFAULT_LIST_DELIMITER.to_string(),
    }
}

impl FromStr for Aggregator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (name, args) = match trimmed.split_once('(') {
            Some((name, rest)) => {
                let args = rest
                    .strip_suffix(')')
                    .ok_or_else(|| CompileError::InvalidAggregator(s.to_string()))?;
                (name, Some(args))
            }
            None => (trimmed, None),
        };

        let aggregator = match name.to_ascii_uppercase().as_str() {
            "SUM" => Aggregator::Sum,
            "AVG" => Aggregator::Avg,
            "MIN" => Aggregator::Min,
            "MAX" => Aggregator::Max,
            "COUNT" => Aggregator::Count,
            "COUNT_DISTINCT" => Aggregator::CountDistinct,
            "LIST" => Aggregator::List {
                delimiter: list_delimiter(args),
            },
            "LIST_DISTINCT" => Aggregator::ListDistinct {
                delimiter: list_delimiter(args),
            },
            _ => return Err(CompileError::InvalidAggregator(s.to_string())),
        };

        if args.is_some() && !aggregator.is_list() {
            return Err(CompileError::InvalidAggregator(s.to_string()));
        }
        Ok(aggregator)
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregator::List { delimiter } | Aggregator::ListDistinct { delimiter } => {
                let name = if matches!(self, Aggregator::List { .. }) {
                    "LIST"
                } else {
                    "LIST_DISTINCT"
                };
                if delimiter == DEFAULT_LIST_DELIMITER {
                    write!(f, "{}", name)
                } else {
                    write!(f, "{}({})", name, delimiter)
                }
            }
            Aggregator::CountDistinct => write!(f, "COUNT_DISTINCT"),
            other => write!(f, "{}", other.function_name()),
        }
    }
}

impl TryFrom<String> for Aggregator {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Aggregator> for String {
    fn from(value: Aggregator) -> Self {
        value.to_string()
    }
}
