//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PostgreSQL/Oracle/HANA), `` ` `` (MySQL), `[]` (SQL Server)
//! - Pagination: LIMIT/OFFSET vs OFFSET FETCH vs ROW_NUMBER()/ROWNUM wrapping
//! - Boolean literals: true/false vs 1/0
//! - Identifier length limits and reserved words (consumed by the alias manager)
//! - List aggregation, NULL-check function, binary-to-hex conversion
//! - Whether UPDATE/DELETE accept table aliases, and how generated keys come back
//!
//! # Usage
//!
//! ```ignore
//! use relsql::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("ORDER0");  // "ORDER0"
//! ```
//!
//! # Capability matrix
//!
//! | Feature | MySQL | SQL Server | PostgreSQL | Oracle | HANA | ODBC |
//! |---------|-------|------------|------------|--------|------|------|
//! | Pagination | LIMIT | OFFSET FETCH (2012+), ROW_NUMBER (2008) | LIMIT | OFFSET FETCH (12c+), ROWNUM (11g) | LIMIT | LIMIT |
//! | List aggregate | GROUP_CONCAT | STRING_AGG (2016), FOR XML PATH | STRING_AGG | LISTAGG | STRING_AGG | ❌ |
//! | Alias in UPDATE/DELETE | ❌ | ❌ | ✓ | ✓ | ✓ | ❌ |
//! | Multi-row INSERT | ✓ | ✓ | ✓ | ❌ | ❌ | ❌ |
//! | Generated keys | last insert id | OUTPUT | RETURNING | last insert id | follow-up query | last insert id |
//! | XOR | ✓ | ❌ | ❌ | ❌ | ❌ | ❌ |

pub mod helpers;
mod hana;
mod mysql;
mod odbc;
mod oracle;
mod postgres;
mod reserved;
mod tsql;

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub use hana::Hana;
pub use mysql::{MariaDb, MySql};
pub use odbc::Odbc;
pub use oracle::{Oracle, Oracle11};
pub use postgres::Postgres;
pub use tsql::{MsSql2008, MsSql2012, MsSql2016};

use super::expr::{func, Expr};
use super::token::TokenStream;
use crate::connector::ConstraintKind;

/// How a dialect restricts the number of returned rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
    /// Wrap with `ROW_NUMBER() OVER (ORDER BY ...)` and filter in an outer query.
    RowNumber,
    /// Wrap with the `ROWNUM` pseudo-column and filter in an outer query.
    RowNum,
}

/// How generated keys come back after an INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKeys {
    /// `INSERT ... RETURNING col`
    Returning,
    /// `INSERT ... OUTPUT INSERTED.col VALUES ...`
    Output,
    /// The connector reports the last insert id.
    LastInsertId,
    /// A follow-up statement on the same connection reads the key.
    FollowUpQuery(&'static str),
}

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column alias).
    ///
    /// - PostgreSQL/Oracle/HANA/ODBC: `"identifier"`
    /// - MySQL: `` `identifier` ``
    /// - SQL Server: `[identifier]`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All dialects use single quotes with `''` for escaping.
    /// Override for backslash escaping (MySQL) or Unicode prefix (T-SQL N'...').
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a date literal. Default: `DATE 'YYYY-MM-DD'`.
    fn format_date(&self, date: NaiveDate) -> String {
        helpers::typed_literal("DATE", date.format(helpers::DATE_FORMAT))
    }

    /// Format a timestamp literal. Default: `TIMESTAMP 'YYYY-MM-DD HH:MM:SS'`.
    fn format_datetime(&self, datetime: NaiveDateTime) -> String {
        helpers::typed_literal("TIMESTAMP", datetime.format(helpers::DATETIME_FORMAT))
    }

    /// Format a time literal. Default: `TIME 'HH:MM:SS'`.
    fn format_time(&self, time: NaiveTime) -> String {
        helpers::typed_literal("TIME", time.format(helpers::TIME_FORMAT))
    }

    /// Format a binary literal. Default: `X'ab01'`.
    fn format_binary(&self, bytes: &[u8]) -> String {
        helpers::binary_x_quoted(bytes)
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    /// Longest identifier the database accepts.
    fn max_identifier_length(&self) -> usize {
        30
    }

    /// Whether `word` must not be used as a bare alias.
    ///
    /// Aliases are always quoted, but some drivers still trip over keywords,
    /// so the alias manager renames them anyway.
    fn is_reserved_word(&self, word: &str) -> bool {
        reserved::is_common(word)
    }

    // =========================================================================
    // Operators and Functions
    // =========================================================================

    /// String concatenation operator.
    ///
    /// - ANSI/PostgreSQL/Oracle: `||`
    /// - T-SQL: `+`
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Whether this dialect supports a concat operator. MySQL treats `||` as OR.
    fn supports_concat_operator(&self) -> bool {
        true
    }

    /// Whether `a XOR b` is valid.
    fn supports_xor(&self) -> bool {
        false
    }

    /// Name of the two-argument NULL replacement function.
    fn null_check_function(&self) -> &'static str {
        "COALESCE"
    }

    /// `NULLCHECK(expr, default)`
    fn null_check(&self, expr: Expr, default: Expr) -> Expr {
        func(self.null_check_function(), vec![expr, default])
    }

    /// String concatenation over a group, or `None` if the dialect cannot
    /// express it as an aggregate function.
    fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
        let _ = (expr, distinct, delimiter);
        None
    }

    /// Whether a reverse-relation list can be built with `FOR XML PATH(''), TYPE`.
    fn supports_xml_path_concat(&self) -> bool {
        false
    }

    /// Character type used in `CAST(x AS ...)` to compare non-text columns
    /// as text.
    fn text_type(&self) -> &'static str {
        "VARCHAR(255)"
    }

    /// Expression rendering a binary column as `0x`-prefixed hex text.
    ///
    /// Default: the column unchanged; result decoding normalizes raw bytes.
    fn binary_to_hex(&self, expr: Expr) -> Expr {
        expr
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Pagination strategy.
    fn pagination(&self) -> Pagination {
        Pagination::LimitOffset
    }

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    ///
    /// Only used by `LimitOffset` and `OffsetFetch` strategies; wrapping
    /// strategies are built by the compiler.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    /// Whether this dialect requires ORDER BY for paged queries.
    fn requires_order_by_for_offset(&self) -> bool {
        false
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Whether table aliases are written `table AS alias`.
    fn table_alias_uses_as(&self) -> bool {
        true
    }

    /// Whether UPDATE and DELETE accept a table alias.
    fn supports_dml_table_alias(&self) -> bool {
        true
    }

    /// Whether a subquery reading the table being updated must be wrapped in
    /// a derived table (MySQL error 1093).
    fn requires_derived_table_for_self_subquery(&self) -> bool {
        false
    }

    // =========================================================================
    // INSERT
    // =========================================================================

    /// Whether `INSERT ... VALUES (...), (...)` is accepted.
    fn supports_multi_row_insert(&self) -> bool {
        true
    }

    /// How auto-generated keys are read back.
    fn generated_keys(&self) -> GeneratedKeys {
        GeneratedKeys::LastInsertId
    }

    /// Reference to a connection-scoped variable, if the dialect has them.
    fn session_variable(&self, name: &str) -> Option<String> {
        let _ = name;
        None
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Classify a connector error code as a constraint violation.
    ///
    /// Default: SQLSTATE 23505 / 23503.
    fn constraint_violation(&self, code: &str, message: &str) -> Option<ConstraintKind> {
        let _ = message;
        match code.trim() {
            "23505" => Some(ConstraintKind::Unique),
            "23503" => Some(ConstraintKind::ForeignKey),
            _ => None,
        }
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MySql,
    MariaDb,
    MsSql2008,
    MsSql2012,
    MsSql2016,
    Postgres,
    Oracle,
    Oracle11,
    Hana,
    Odbc,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::MySql => &MySql,
            Dialect::MariaDb => &MariaDb,
            Dialect::MsSql2008 => &MsSql2008,
            Dialect::MsSql2012 => &MsSql2012,
            Dialect::MsSql2016 => &MsSql2016,
            Dialect::Postgres => &Postgres,
            Dialect::Oracle => &Oracle,
            Dialect::Oracle11 => &Oracle11,
            Dialect::Hana => &Hana,
            Dialect::Odbc => &Odbc,
        }
    }

    /// Every supported dialect, in display order.
    pub fn all() -> &'static [Dialect] {
        &[
            Dialect::MySql,
            Dialect::MariaDb,
            Dialect::MsSql2008,
            Dialect::MsSql2012,
            Dialect::MsSql2016,
            Dialect::Postgres,
            Dialect::Oracle,
            Dialect::Oracle11,
            Dialect::Hana,
            Dialect::Odbc,
        ]
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_date(&self, date: NaiveDate) -> String {
        self.dialect().format_date(date)
    }

    fn format_datetime(&self, datetime: NaiveDateTime) -> String {
        self.dialect().format_datetime(datetime)
    }

    fn format_time(&self, time: NaiveTime) -> String {
        self.dialect().format_time(time)
    }

    fn format_binary(&self, bytes: &[u8]) -> String {
        self.dialect().format_binary(bytes)
    }

    fn max_identifier_length(&self) -> usize {
        self.dialect().max_identifier_length()
    }

    fn is_reserved_word(&self, word: &str) -> bool {
        self.dialect().is_reserved_word(word)
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn supports_concat_operator(&self) -> bool {
        self.dialect().supports_concat_operator()
    }

    fn supports_xor(&self) -> bool {
        self.dialect().supports_xor()
    }

    fn null_check_function(&self) -> &'static str {
        self.dialect().null_check_function()
    }

    fn null_check(&self, expr: Expr, default: Expr) -> Expr {
        self.dialect().null_check(expr, default)
    }

    fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
        self.dialect().list_aggregate(expr, distinct, delimiter)
    }

    fn supports_xml_path_concat(&self) -> bool {
        self.dialect().supports_xml_path_concat()
    }

    fn text_type(&self) -> &'static str {
        self.dialect().text_type()
    }

    fn binary_to_hex(&self, expr: Expr) -> Expr {
        self.dialect().binary_to_hex(expr)
    }

    fn pagination(&self) -> Pagination {
        self.dialect().pagination()
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn requires_order_by_for_offset(&self) -> bool {
        self.dialect().requires_order_by_for_offset()
    }

    fn table_alias_uses_as(&self) -> bool {
        self.dialect().table_alias_uses_as()
    }

    fn supports_dml_table_alias(&self) -> bool {
        self.dialect().supports_dml_table_alias()
    }

    fn requires_derived_table_for_self_subquery(&self) -> bool {
        self.dialect().requires_derived_table_for_self_subquery()
    }

    fn supports_multi_row_insert(&self) -> bool {
        self.dialect().supports_multi_row_insert()
    }

    fn generated_keys(&self) -> GeneratedKeys {
        self.dialect().generated_keys()
    }

    fn session_variable(&self, name: &str) -> Option<String> {
        self.dialect().session_variable(name)
    }

    fn constraint_violation(&self, code: &str, message: &str) -> Option<ConstraintKind> {
        self.dialect().constraint_violation(code, message)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Error for an unrecognized dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown SQL dialect '{0}'")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let dialect = match normalized.as_str() {
            "mysql" => Dialect::MySql,
            "mariadb" => Dialect::MariaDb,
            "mssql2008" => Dialect::MsSql2008,
            "mssql" | "mssql2012" | "tsql" | "sqlserver" => Dialect::MsSql2012,
            "mssql2016" => Dialect::MsSql2016,
            "postgres" | "postgresql" | "pgsql" => Dialect::Postgres,
            "oracle" | "oracle12" => Dialect::Oracle,
            "oracle11" => Dialect::Oracle11,
            "hana" | "saphana" => Dialect::Hana,
            "odbc" => Dialect::Odbc,
            _ => return Err(UnknownDialect(s.to_string())),
        };
        Ok(dialect)
    }
}
