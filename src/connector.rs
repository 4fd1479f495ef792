//! The boundary to the database.
//!
//! Connectors are supplied by the caller: they own connections and
//! transactions and run one statement at a time. Statements of one write
//! plan are expected to run on the same connection, in order.

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::compiler::Row;

/// Raw outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    /// Rows keyed by the column names the database reported.
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub last_insert_id: Option<JsonValue>,
}

impl ExecResult {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn affected(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            ..Default::default()
        }
    }

    pub fn with_last_insert_id(mut self, id: JsonValue) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// Error payload of a connector, surfaced unchanged unless the dialect
/// recognizes `code` as a constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ConnectorError {
    /// Vendor error number or SQLSTATE.
    pub code: Option<String>,
    pub message: String,
}

impl ConnectorError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Kinds of constraint violations reported uniformly across dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintKind::Unique => write!(f, "unique"),
            ConstraintKind::ForeignKey => write!(f, "foreign key"),
        }
    }
}

/// Runs SQL text.
pub trait Connector {
    fn execute(&mut self, sql: &str) -> Result<ExecResult, ConnectorError>;
}

impl<C: Connector + ?Sized> Connector for &mut C {
    fn execute(&mut self, sql: &str) -> Result<ExecResult, ConnectorError> {
        (**self).execute(sql)
    }
}
