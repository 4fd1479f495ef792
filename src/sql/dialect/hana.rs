//! SAP HANA SQL dialect.
//!
//! - Double-quote identifier quoting
//! - Native BOOLEAN with `TRUE`/`FALSE`
//! - `TO_DATE` / `TO_TIMESTAMP` for date literals
//! - `STRING_AGG` without DISTINCT
//! - No multi-row VALUES list; identity read back from `CURRENT_IDENTITY_VALUE()`

use chrono::{NaiveDate, NaiveDateTime};

use super::helpers;
use super::{reserved, GeneratedKeys, SqlDialect};
use crate::connector::ConstraintKind;
use crate::sql::expr::Expr;

/// SAP HANA SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Hana;

impl SqlDialect for Hana {
    fn name(&self) -> &'static str {
        "hana"
    }

    fn text_type(&self) -> &'static str {
        "NVARCHAR(5000)"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_keyword(b)
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

    fn max_identifier_length(&self) -> usize {
        64
    }

    fn is_reserved_word(&self, word: &str) -> bool {
        reserved::is_hana(word)
    }

    fn null_check_function(&self) -> &'static str {
        "IFNULL"
    }

    fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
        if distinct {
            return None;
        }
        Some(helpers::string_agg("STRING_AGG", expr, false, delimiter))
    }

    fn binary_to_hex(&self, expr: Expr) -> Expr {
        helpers::hex_prefixed("BINTOHEX", expr, true)
    }

    fn supports_multi_row_insert(&self) -> bool {
        false
    }

    fn generated_keys(&self) -> GeneratedKeys {
        GeneratedKeys::FollowUpQuery("SELECT CURRENT_IDENTITY_VALUE() FROM DUMMY")
    }

    fn constraint_violation(&self, code: &str, _message: &str) -> Option<ConstraintKind> {
        match helpers::numeric_code(code)? {
            301 => Some(ConstraintKind::Unique),
            461 | 462 => Some(ConstraintKind::ForeignKey),
            _ => None,
        }
    }
}
