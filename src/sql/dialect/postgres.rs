//! PostgreSQL SQL dialect.
//!
//! PostgreSQL is close to ANSI:
//! - Double-quote identifier quoting, case-sensitive when quoted
//! - `standard_conforming_strings`: only `'` needs escaping
//! - Native boolean `true`/`false`
//! - Typed literals: `DATE '...'`, `TIMESTAMP '...'`
//! - bytea literals via `DECODE('...', 'hex')`
//! - RETURNING for generated keys
//! - 63-byte identifier limit (NAMEDATALEN - 1)

use super::helpers;
use super::{reserved, GeneratedKeys, SqlDialect};
use crate::sql::expr::{cast, func, lit_str, Expr, ExprExt};

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn text_type(&self) -> &'static str {
        "VARCHAR"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn format_binary(&self, bytes: &[u8]) -> String {
        format!("DECODE('{}', 'hex')", hex::encode(bytes))
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn is_reserved_word(&self, word: &str) -> bool {
        reserved::is_postgres(word)
    }

    fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
        Some(helpers::string_agg(
            "STRING_AGG",
            cast(expr, "VARCHAR"),
            distinct,
            delimiter,
        ))
    }

    fn binary_to_hex(&self, expr: Expr) -> Expr {
        lit_str("0x").concat(func("ENCODE", vec![expr, lit_str("hex")]))
    }

    fn generated_keys(&self) -> GeneratedKeys {
        GeneratedKeys::Returning
    }
}
