//! Attribute data types and value parsing.
//!
//! Compare and write values arrive as JSON. Each data type parses them into a
//! typed [`Literal`], which the dialect then renders; nothing a caller sends
//! reaches the SQL text without going through here.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::sql::Literal;

/// Data type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Date,
    DateTime,
    Time,
    Binary,
}

/// A value that does not parse as its attribute's data type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {data_type} value")]
pub struct ValueError {
    pub value: String,
    pub data_type: DataType,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Number | DataType::Integer)
    }

    /// Types where a fuzzy `IS` compare degrades to plain equality.
    pub fn has_exact_equality(self) -> bool {
        !matches!(self, DataType::String)
    }

    /// Parse a JSON value. `time_zone` is the database zone RFC 3339
    /// timestamps are converted to.
    pub fn parse(self, value: &Value, time_zone: Option<FixedOffset>) -> Result<Literal, ValueError> {
        match value {
            Value::Null => Ok(Literal::Null),
            Value::String(s) => self.parse_str(s, time_zone),
            Value::Bool(b) => match self {
                DataType::Boolean => Ok(Literal::Bool(*b)),
                DataType::String => Ok(Literal::String(b.to_string())),
                _ => Err(self.error(value)),
            },
            Value::Number(n) => match self {
                DataType::Integer => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .map(Literal::Int)
                    .ok_or_else(|| self.error(value)),
                DataType::Number => match n.as_i64() {
                    Some(i) => Ok(Literal::Int(i)),
                    None => n
                        .as_f64()
                        .filter(|f| f.is_finite())
                        .map(Literal::Float)
                        .ok_or_else(|| self.error(value)),
                },
                DataType::Boolean => match n.as_i64() {
                    Some(0) => Ok(Literal::Bool(false)),
                    Some(1) => Ok(Literal::Bool(true)),
                    _ => Err(self.error(value)),
                },
                DataType::String => Ok(Literal::String(n.to_string())),
                _ => Err(self.error(value)),
            },
            Value::Array(_) | Value::Object(_) => Err(self.error(value)),
        }
    }

    /// Parse a textual value, e.g. one member of a delimited IN list.
    pub fn parse_str(self, s: &str, time_zone: Option<FixedOffset>) -> Result<Literal, ValueError> {
        let text = s.trim();
        let parsed = match self {
            DataType::String => Some(Literal::String(s.to_string())),
            DataType::Integer => text.parse::<i64>().ok().map(Literal::Int),
            DataType::Number => parse_number(text),
            DataType::Boolean => parse_bool(text).map(Literal::Bool),
            DataType::Date => parse_datetime(text, time_zone)
                .map(|dt| Literal::Date(dt.date()))
                .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(Literal::Date)),
            DataType::DateTime => parse_datetime(text, time_zone).map(Literal::DateTime),
            DataType::Time => NaiveTime::parse_from_str(text, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .ok()
                .map(Literal::Time),
            DataType::Binary => {
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text);
                hex::decode(digits).ok().map(Literal::Binary)
            }
        };

        parsed.ok_or_else(|| ValueError {
            value: s.to_string(),
            data_type: self,
        })
    }

    fn error(self, value: &Value) -> ValueError {
        ValueError {
            value: value.to_string(),
            data_type: self,
        }
    }
}

fn parse_number(text: &str) -> Option<Literal> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Literal::Int(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Literal::Float)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// RFC 3339 (converted to `time_zone` when one is configured), then the
/// plain formats, then a bare date at midnight.
fn parse_datetime(text: &str, time_zone: Option<FixedOffset>) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(match time_zone {
            Some(tz) => dt.with_timezone(&tz).naive_local(),
            None => dt.naive_local(),
        });
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Integer => "integer",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Time => "time",
            DataType::Binary => "binary",
        };
        write!(f, "{}", name)
    }
}
