//! Query compiler.
//!
//! Turns a [`QueryBuilder`] (main object plus query parts) into dialect SQL.
//!
//! ```text
//! QueryBuilder ──▶ pass 1 ──▶ pass 2 ──▶ ... ──▶ CompiledRead / WritePlan
//!                   │           ▲
//!                   └─ hidden ──┘  additions (helper selects, group keys,
//!                      parts       sort keys) re-run the pass until stable
//! ```
//!
//! Every pass starts from a fresh [`Planner`](planner::Planner) so that the
//! resulting SQL depends only on the final set of parts, never on the order
//! additions were discovered in.

pub mod alias;
mod builder;
mod grouping;
mod pagination;
mod planner;
mod predicate;
mod read;
mod result;
mod select;
mod write;

use chrono::FixedOffset;

use crate::sql::Dialect;

pub use alias::{AliasManager, AliasOptions};
pub use builder::QueryBuilder;
pub use result::{CompiledCount, CompiledRead, ReadResult, ResultColumn, Row};
pub use write::{PlannedStatement, StatementRole, UidSource, WritePlan};

/// Derived table holding the grouped core of an enriched query.
pub const CORE_ALIAS: &str = "EXFCOREQ";
/// Row number column of wrapped pagination.
pub const ROW_NUMBER_ALIAS: &str = "EXFRN";
/// Derived table numbered by wrapped pagination.
pub const ROW_NUMBER_QUERY: &str = "EXFRNQ";
/// Outer derived table of wrapped pagination.
pub const PAGE_QUERY: &str = "EXFRNP";
/// Column of a count query.
pub const COUNT_ALIAS: &str = "EXFCNT";
/// Derived table of a count query.
pub const COUNT_QUERY: &str = "EXFCNTQ";
/// Derived table wrapping self-referencing DML subqueries.
pub const DERIVED_ALIAS: &str = "EXFDT";
/// Key column of [`DERIVED_ALIAS`].
pub const KEY_ALIAS: &str = "EXFKEY";
/// Column carrying generated UIDs back from an INSERT.
pub const UID_ALIAS: &str = "EXFUID";
/// Session variable holding a custom-generated UID.
pub const UID_VARIABLE: &str = "exf_uid";

pub(crate) const RESERVED_ALIASES: &[&str] = &[
    CORE_ALIAS,
    ROW_NUMBER_ALIAS,
    ROW_NUMBER_QUERY,
    PAGE_QUERY,
    COUNT_ALIAS,
    COUNT_QUERY,
    DERIVED_ALIAS,
    KEY_ALIAS,
    UID_ALIAS,
];

pub const DEFAULT_MAX_PASSES: usize = 5;

/// Knobs of one compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub dialect: Dialect,
    /// Upper bound of planning passes before giving up.
    pub max_passes: usize,
    /// Zone RFC 3339 timestamps are converted to before they reach SQL.
    pub time_zone: Option<FixedOffset>,
    pub aliases: AliasOptions,
}

impl CompileOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn with_time_zone(mut self, time_zone: FixedOffset) -> Self {
        self.time_zone = Some(time_zone);
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_passes: DEFAULT_MAX_PASSES,
            time_zone: None,
            aliases: AliasOptions::default(),
        }
    }
}
