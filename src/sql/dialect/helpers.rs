//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::super::expr::{func, lit_str, Expr, ExprExt};
use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: PostgreSQL, Oracle, HANA, ODBC
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL, MariaDB
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: SQL Server
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with N prefix for Unicode (T-SQL).
pub fn quote_string_unicode(s: &str) -> String {
    format!("N'{}'", s.replace('\'', "''"))
}

/// Quote string for MySQL, where backslash is an escape character
/// unless NO_BACKSLASH_ESCAPES is set.
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: PostgreSQL
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as uppercase TRUE/FALSE.
/// Used by: HANA
pub fn format_bool_keyword(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: SQL Server, MySQL, Oracle, ODBC
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Date/Time Literals
// =============================================================================

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// `'2024-01-31'`
pub fn date_plain(d: NaiveDate) -> String {
    format!("'{}'", d.format(DATE_FORMAT))
}

/// `'2024-01-31 10:00:00'`
pub fn datetime_plain(dt: NaiveDateTime) -> String {
    format!("'{}'", dt.format(DATETIME_FORMAT))
}

/// `'10:00:00'`
pub fn time_plain(t: NaiveTime) -> String {
    format!("'{}'", t.format(TIME_FORMAT))
}

/// Typed SQL-standard literal, e.g. `DATE '2024-01-31'`.
pub fn typed_literal(keyword: &str, body: impl std::fmt::Display) -> String {
    format!("{} '{}'", keyword, body)
}

/// ODBC escape sequence, e.g. `{d '2024-01-31'}`.
pub fn odbc_escape(tag: &str, body: impl std::fmt::Display) -> String {
    format!("{{{} '{}'}}", tag, body)
}

// =============================================================================
// Binary
// =============================================================================

/// `0xab01`
pub fn binary_0x(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// `X'ab01'`
pub fn binary_x_quoted(bytes: &[u8]) -> String {
    format!("X'{}'", hex::encode(bytes))
}

/// `'0x' || LOWER(FN(expr))` for dialects with a native hex function.
pub fn hex_prefixed(function: &str, expr: Expr, lower: bool) -> Expr {
    let hex = func(function, vec![expr]);
    let hex = if lower { func("LOWER", vec![hex]) } else { hex };
    lit_str("0x").concat(hex)
}

// =============================================================================
// Aggregation
// =============================================================================

/// `NAME([DISTINCT] expr, 'delim')` - GROUP_CONCAT style is separate because
/// MySQL puts the separator inside the argument list with a keyword.
pub fn string_agg(name: &str, expr: Expr, distinct: bool, delimiter: &str) -> Expr {
    Expr::Function {
        name: name.into(),
        args: vec![expr, lit_str(delimiter)],
        distinct,
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit LIMIT ... OFFSET ... (standard SQL).
/// Used by: MySQL, PostgreSQL, HANA, ODBC
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(lim as i64));
    }

    if let Some(off) = offset.filter(|o| *o > 0) {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(off as i64));
    }

    ts
}

/// Emit OFFSET ... ROWS FETCH NEXT ... ROWS ONLY.
/// Used by: SQL Server 2012+, Oracle 12c+
pub fn emit_offset_fetch(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    // OFFSET is mandatory before FETCH
    let off = offset.unwrap_or(0);
    ts.push(Token::Offset)
        .space()
        .push(Token::LitInt(off as i64))
        .space()
        .push(Token::Rows);

    if let Some(lim) = limit {
        ts.space()
            .push(Token::Fetch)
            .space()
            .push(Token::Next)
            .space()
            .push(Token::LitInt(lim as i64))
            .space()
            .push(Token::Rows)
            .space()
            .push(Token::Only);
    }

    ts
}

// =============================================================================
// Error classification
// =============================================================================

/// Numeric vendor code, tolerating prefixes like `ORA-` and leading zeros.
pub fn numeric_code(code: &str) -> Option<i64> {
    code.trim()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '-')
        .parse()
        .ok()
}
