//! Metamodel consumed by the compiler.
//!
//! Objects map to tables, attributes to columns (or custom SQL), relations to
//! foreign keys. Data addresses are schema configuration and are emitted into
//! SQL verbatim; caller input never is.

pub mod object;
pub mod relation;
pub mod schema;
pub mod types;

pub use object::{Attribute, CustomSql, MetaObject, UidGenerator};
pub use relation::{Relation, RelationKind, RelationPath, RelationStep, PATH_SEPARATOR};
pub use schema::{Schema, SchemaError};
pub use types::{DataType, ValueError};
