//! MySQL and MariaDB SQL dialects.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - Backslash is an escape character inside string literals
//! - Boolean is TINYINT(1), returns 1/0
//! - `||` is logical OR by default (use CONCAT())
//! - LIMIT ... OFFSET ... for pagination
//! - GROUP_CONCAT(... SEPARATOR ...) for list aggregation
//! - No RETURNING clause (use LAST_INSERT_ID()); session variables (`@name`)
//! - UPDATE/DELETE cannot reference the target table in a subquery directly
//!   (error 1093), and multi-table aliases in DELETE differ, so DML is unaliased
//!
//! MariaDB shares all of the above.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::helpers;
use super::{reserved, GeneratedKeys, SqlDialect};
use crate::connector::ConstraintKind;
use crate::sql::expr::Expr;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

/// MariaDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MariaDb;

macro_rules! mysql_family {
    ($dialect:ident, $name:literal) => {
        impl SqlDialect for $dialect {
            fn name(&self) -> &'static str {
                $name
            }

            fn text_type(&self) -> &'static str {
                "CHAR"
            }

            fn quote_identifier(&self, ident: &str) -> String {
                helpers::quote_backtick(ident)
            }

            fn quote_string(&self, s: &str) -> String {
                helpers::quote_string_backslash(s)
            }

            fn format_bool(&self, b: bool) -> &'static str {
                helpers::format_bool_numeric(b)
            }

            fn format_date(&self, date: NaiveDate) -> String {
                helpers::date_plain(date)
            }

            fn format_datetime(&self, datetime: NaiveDateTime) -> String {
                helpers::datetime_plain(datetime)
            }

            fn format_time(&self, time: NaiveTime) -> String {
                helpers::time_plain(time)
            }

            fn format_binary(&self, bytes: &[u8]) -> String {
                helpers::binary_0x(bytes)
            }

            fn max_identifier_length(&self) -> usize {
                64
            }

            fn is_reserved_word(&self, word: &str) -> bool {
                reserved::is_mysql(word)
            }

            fn supports_concat_operator(&self) -> bool {
                false
            }

            fn supports_xor(&self) -> bool {
                true
            }

            fn null_check_function(&self) -> &'static str {
                "IFNULL"
            }

            fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
                Some(group_concat(&expr.to_sql(crate::sql::Dialect::MySql), distinct, delimiter))
            }

            fn binary_to_hex(&self, expr: Expr) -> Expr {
                helpers::hex_prefixed("HEX", expr, true)
            }

            fn supports_dml_table_alias(&self) -> bool {
                false
            }

            fn requires_derived_table_for_self_subquery(&self) -> bool {
                true
            }

            fn generated_keys(&self) -> GeneratedKeys {
                GeneratedKeys::LastInsertId
            }

            fn session_variable(&self, name: &str) -> Option<String> {
                Some(format!("@{}", name))
            }

            fn constraint_violation(&self, code: &str, _message: &str) -> Option<ConstraintKind> {
                match helpers::numeric_code(code)? {
                    1062 | 1586 => Some(ConstraintKind::Unique),
                    1216 | 1217 | 1451 | 1452 => Some(ConstraintKind::ForeignKey),
                    _ => None,
                }
            }
        }
    };
}

mysql_family!(MySql, "mysql");
mysql_family!(MariaDb, "mariadb");

/// `GROUP_CONCAT([DISTINCT] expr SEPARATOR 'delim')`. The SEPARATOR keyword
/// sits inside the argument list, so the call is assembled as text.
fn group_concat(inner: &str, distinct: bool, delimiter: &str) -> Expr {
    Expr::Raw(format!(
        "GROUP_CONCAT({}{} SEPARATOR {})",
        if distinct { "DISTINCT " } else { "" },
        inner,
        helpers::quote_string_backslash(delimiter)
    ))
}
