//! T-SQL (SQL Server) dialects.
//!
//! T-SQL has significant differences from ANSI:
//! - Square bracket identifier quoting (`[name]`)
//! - N'...' prefix for Unicode strings
//! - No native boolean in SELECT, 1/0 instead
//! - OFFSET FETCH for pagination since 2012 (requires ORDER BY);
//!   2008 needs ROW_NUMBER() wrapping
//! - STRING_AGG only since 2016 (and without DISTINCT); older versions
//!   concatenate lists with `FOR XML PATH(''), TYPE`
//! - OUTPUT INSERTED.col instead of RETURNING
//! - String concatenation with `+`
//! - UPDATE/DELETE with an alias need a FROM clause, so DML is unaliased

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::helpers;
use super::{reserved, GeneratedKeys, Pagination, SqlDialect};
use crate::connector::ConstraintKind;
use crate::sql::expr::{cast, func, lit_int, raw_sql, Expr};
use crate::sql::token::TokenStream;

/// SQL Server 2008 / 2008 R2.
#[derive(Debug, Clone, Copy)]
pub struct MsSql2008;

/// SQL Server 2012 / 2014.
#[derive(Debug, Clone, Copy)]
pub struct MsSql2012;

/// SQL Server 2016 and later.
#[derive(Debug, Clone, Copy)]
pub struct MsSql2016;

macro_rules! tsql_family {
    ($dialect:ident, $name:literal, { $($version_specific:tt)* }) => {
        impl SqlDialect for $dialect {
            fn name(&self) -> &'static str {
                $name
            }

            fn text_type(&self) -> &'static str {
                "NVARCHAR(MAX)"
            }

            fn quote_identifier(&self, ident: &str) -> String {
                helpers::quote_bracket(ident)
            }

            fn quote_string(&self, s: &str) -> String {
                // For safety, always use N prefix for non-ASCII
                if !s.is_ascii() {
                    helpers::quote_string_unicode(s)
                } else {
                    helpers::quote_string_single(s)
                }
            }

            fn format_bool(&self, b: bool) -> &'static str {
                helpers::format_bool_numeric(b)
            }

            fn format_date(&self, date: NaiveDate) -> String {
                helpers::date_plain(date)
            }

            fn format_datetime(&self, datetime: NaiveDateTime) -> String {
                // ISO 8601 with 'T' is read the same way under every DATEFORMAT.
                format!("'{}'", datetime.format("%Y-%m-%dT%H:%M:%S"))
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
                reserved::is_mssql(word)
            }

            fn concat_operator(&self) -> &'static str {
                "+"
            }

            fn null_check_function(&self) -> &'static str {
                "ISNULL"
            }

            fn supports_xml_path_concat(&self) -> bool {
                true
            }

            fn binary_to_hex(&self, expr: Expr) -> Expr {
                // Style 1 keeps the 0x prefix.
                func("CONVERT", vec![raw_sql("VARCHAR(MAX)"), expr, lit_int(1)])
            }

            fn requires_order_by_for_offset(&self) -> bool {
                true
            }

            fn supports_dml_table_alias(&self) -> bool {
                false
            }

            fn generated_keys(&self) -> GeneratedKeys {
                GeneratedKeys::Output
            }

            fn constraint_violation(&self, code: &str, _message: &str) -> Option<ConstraintKind> {
                match helpers::numeric_code(code)? {
                    2627 | 2601 => Some(ConstraintKind::Unique),
                    547 => Some(ConstraintKind::ForeignKey),
                    _ => None,
                }
            }

            $($version_specific)*
        }
    };
}

tsql_family!(MsSql2008, "mssql2008", {
    fn pagination(&self) -> Pagination {
        Pagination::RowNumber
    }
});

tsql_family!(MsSql2012, "mssql2012", {
    fn pagination(&self) -> Pagination {
        Pagination::OffsetFetch
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_offset_fetch(limit, offset)
    }
});

tsql_family!(MsSql2016, "mssql2016", {
    fn pagination(&self) -> Pagination {
        Pagination::OffsetFetch
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_offset_fetch(limit, offset)
    }

    fn list_aggregate(&self, expr: Expr, distinct: bool, delimiter: &str) -> Option<Expr> {
        if distinct {
            return None;
        }
        Some(helpers::string_agg(
            "STRING_AGG",
            cast(expr, "NVARCHAR(MAX)"),
            false,
            delimiter,
        ))
    }
});
