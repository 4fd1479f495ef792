//! Oracle SQL dialects.
//!
//! Oracle differences from ANSI:
//! - No `AS` before table aliases
//! - Quoted identifiers are case-sensitive; 30 bytes before 12.2
//! - No boolean SQL type, 1/0 instead
//! - Dates through `TO_DATE` / `TO_TIMESTAMP` with explicit masks
//! - `NVL` for NULL replacement, `LISTAGG ... WITHIN GROUP` for lists
//! - OFFSET FETCH since 12c, ROWNUM wrapping before
//! - No multi-row VALUES list in INSERT

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::helpers;
use super::{reserved, Pagination, SqlDialect};
use crate::connector::ConstraintKind;
use crate::sql::expr::{lit_str, Expr};
use crate::sql::query::OrderByExpr;
use crate::sql::token::TokenStream;

/// Oracle 12c and later.
#[derive(Debug, Clone, Copy)]
pub struct Oracle;

/// Oracle 11g.
#[derive(Debug, Clone, Copy)]
pub struct Oracle11;

macro_rules! oracle_family {
    ($dialect:ident, $name:literal, { $($version_specific:tt)* }) => {
        impl SqlDialect for $dialect {
            fn name(&self) -> &'static str {
                $name
            }

            fn text_type(&self) -> &'static str {
                "VARCHAR2(4000)"
            }

            fn quote_identifier(&self, ident: &str) -> String {
                helpers::quote_double(ident)
            }

            fn format_bool(&self, b: bool) -> &'static str {
                helpers::format_bool_numeric(b)
            }

            fn format_date(&self, date: NaiveDate) -> String {
                format!("TO_DATE('{}', 'YYYY-MM-DD')", date.format(helpers::DATE_FORMAT))
            }

            fn format_datetime(&self, datetime: NaiveDateTime) -> String {
                format!(
                    "TO_TIMESTAMP('{}', 'YYYY-MM-DD HH24:MI:SS')",
                    datetime.format(helpers::DATETIME_FORMAT)
                )
            }

            fn format_time(&self, time: NaiveTime) -> String {
                helpers::time_plain(time)
            }

            fn format_binary(&self, bytes: &[u8]) -> String {
                format!("HEXTORAW('{}')", hex::encode(bytes))
            }

            fn max_identifier_length(&self) -> usize {
                28
            }

            fn is_reserved_word(&self, word: &str) -> bool {
                reserved::is_oracle(word)
            }

            fn null_check_function(&self) -> &'static str {
                "NVL"
            }

            fn binary_to_hex(&self, expr: Expr) -> Expr {
                helpers::hex_prefixed("RAWTOHEX", expr, true)
            }

            fn table_alias_uses_as(&self) -> bool {
                false
            }

            fn supports_multi_row_insert(&self) -> bool {
                false
            }

            fn constraint_violation(&self, code: &str, _message: &str) -> Option<ConstraintKind> {
                match helpers::numeric_code(code)? {
                    1 => Some(ConstraintKind::Unique),
                    2291 | 2292 => Some(ConstraintKind::ForeignKey),
                    _ => None,
                }
            }

            $($version_specific)*
        }
    };
}

oracle_family!(Oracle, "oracle", {
    fn pagination(&self) -> Pagination {
        Pagination::OffsetFetch
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_offset_fetch(limit, offset)
    }

    fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
        Some(listagg(expr, distinct, delimiter))
    }
});

oracle_family!(Oracle11, "oracle11", {
    fn pagination(&self) -> Pagination {
        Pagination::RowNum
    }

    fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
        // LISTAGG(DISTINCT ...) arrived in 19c.
        if distinct {
            return None;
        }
        Some(listagg(expr, false, delimiter))
    }
});

/// `LISTAGG([DISTINCT] expr, 'delim') WITHIN GROUP (ORDER BY expr)`
fn listagg(expr: Expr, distinct: bool, delimiter: &str) -> Expr {
    Expr::WithinGroup {
        function: Box::new(Expr::Function {
            name: "LISTAGG".into(),
            args: vec![expr.clone(), lit_str(delimiter)],
            distinct,
        }),
        order_by: vec![OrderByExpr::asc(expr)],
    }
}
