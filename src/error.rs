//! Error taxonomy.
//!
//! [`CompileError`] is raised before any SQL reaches a connector.
//! [`Error`] adds the failures that happen while running statements: raw
//! connector errors and constraint violations classified per dialect.

use thiserror::Error;

use crate::connector::{ConnectorError, ConstraintKind};
use crate::model::DataType;
use crate::sql::template::TemplateError;
use crate::sql::Dialect;

/// Result type for compilation.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Errors raised while turning query parts into SQL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unknown object '{0}'")]
    UnknownObject(String),

    #[error("object '{object}' has no attribute '{attribute}'")]
    UnknownAttribute { object: String, attribute: String },

    #[error("object '{object}' has no relation '{relation}'")]
    UnknownRelation { object: String, relation: String },

    #[error("relation path '{path}' is broken at '{relation}'")]
    BrokenRelationPath { path: String, relation: String },

    #[error("'{value}' is not a valid {data_type} value for '{attribute}'")]
    InvalidValue {
        attribute: String,
        value: String,
        data_type: DataType,
    },

    #[error("invalid aggregator '{0}'")]
    InvalidAggregator(String),

    #[error("invalid comparator '{0}'")]
    InvalidComparator(String),

    #[error("'{attribute}' lies behind a reverse relation and needs an aggregator")]
    MissingAggregator { attribute: String },

    #[error("'{attribute}' is neither grouped, aggregated nor unique per group")]
    UngroupedAttribute { attribute: String },

    #[error("'{attribute}' mixes aggregated and row-level conditions in one {operator} group")]
    MixedAggregateGroup { attribute: String, operator: String },

    #[error("aggregator {aggregator} on '{attribute}' cannot be expressed in {dialect}")]
    UnsupportedAggregator {
        attribute: String,
        aggregator: String,
        dialect: Dialect,
    },

    #[error("{dialect} needs a sort order to page '{object}', but it has no UID to sort by")]
    MissingSortKey { object: String, dialect: Dialect },

    #[error("refusing to delete every row of '{object}': no filters given")]
    DeleteWithoutFilters { object: String },

    #[error("cannot delete from '{object}' with a filter across relation '{attribute}'")]
    DeleteAcrossRelation { object: String, attribute: String },

    #[error("refusing to update every row of '{object}': no filters or UIDs given")]
    UpdateWithoutFilters { object: String },

    #[error("nothing to write for '{object}'")]
    NothingToWrite { object: String },

    #[error("'{attribute}' belongs to a related object and cannot be inserted")]
    RelatedValueInInsert { attribute: String },

    #[error("UID generator of '{object}' is not supported by {dialect}")]
    UnsupportedGenerator { object: String, dialect: Dialect },

    #[error("object '{object}' has no UID attribute")]
    MissingUid { object: String },

    #[error("'{attribute}': {source}")]
    Template {
        attribute: String,
        #[source]
        source: TemplateError,
    },

    #[error("query parts did not settle after {passes} passes")]
    NotConverged { passes: usize },
}

/// Errors from running compiled statements.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("statement failed: {source}\n{sql}")]
    Connection {
        sql: String,
        #[source]
        source: ConnectorError,
    },

    #[error("{kind} constraint violated ({code}): {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        code: String,
        sql: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
