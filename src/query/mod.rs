//! Abstract query parts.
//!
//! A query is a main object plus parts: selects, filters, sorters,
//! aggregations (GROUP BY keys) and values to write. Every part points at an
//! attribute through an [`AttributeRef`], which carries the relation path
//! from the main object.

mod aggregator;
mod attribute;
mod comparator;
mod filter;
mod parts;
pub mod spec;

pub use aggregator::{Aggregator, DEFAULT_LIST_DELIMITER};
pub use attribute::AttributeRef;
pub use comparator::Comparator;
pub use filter::{Filter, FilterGroup, LogicalOperator, LIST_DELIMITER};
pub(crate) use filter::json_text;
pub use parts::{Aggregation, PartId, QueryPart, Select, Sorter, Value};
pub use spec::{ColumnSpec, ConditionSpec, FilterGroupSpec, QuerySpec, SorterSpec, ValueSpec};
