//! # relsql
//!
//! A relational query compiler: turns object-level read and write requests
//! against a metamodel into dialect-specific SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Metamodel (objects, attributes, relations)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [QueryBuilder]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Query parts: selects, filters, sorters, aggregations,  │
//! │   values, pagination                                     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner, repeated to a fixed point]
//! ┌─────────────────────────────────────────────────────────┐
//! │         SQL AST (Query / Insert / Update / Delete)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │       SQL text for MySQL, MSSQL, Postgres, Oracle,       │
//! │       HANA or ODBC                                       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [crud + Connector]
//!                    rows, counts, UIDs
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use relsql::prelude::*;
//!
//! let schema = Schema::from_file("schema.json")?;
//! let mut query = QueryBuilder::new(&schema, "ORDER", CompileOptions::new(Dialect::Postgres))?;
//! query.add_select("CUSTOMER__NAME")?;
//! query.set_limit(Some(10), 0);
//! println!("{}", query.compile_read()?.sql);
//! ```

pub mod compiler;
pub mod config;
pub mod connector;
pub mod crud;
pub mod error;
pub mod model;
pub mod query;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compiler::{
        AliasOptions, CompileOptions, CompiledCount, CompiledRead, QueryBuilder, ReadResult, Row,
        WritePlan,
    };
    pub use crate::connector::{Connector, ConnectorError, ConstraintKind, ExecResult};
    pub use crate::crud::{self, CreateResult};
    pub use crate::error::{CompileError, CompileResult, Error, Result};
    pub use crate::model::{Attribute, DataType, MetaObject, Relation, RelationKind, Schema};
    pub use crate::query::{
        Aggregator, Comparator, Filter, FilterGroup, LogicalOperator, QuerySpec,
    };
    pub use crate::sql::{Dialect, SqlDialect};
}

pub use compiler::{CompileOptions, QueryBuilder};
pub use error::{CompileError, CompileResult, Error, Result};
pub use model::Schema;
pub use sql::Dialect;
