//! Generic ODBC dialect.
//!
//! Lowest common denominator for drivers where the backend is unknown:
//! ODBC escape sequences for dates, no list aggregation, no aliases in DML
//! and one INSERT per row.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::helpers;
use super::SqlDialect;
use crate::connector::ConstraintKind;

/// Generic ODBC SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Odbc;

impl SqlDialect for Odbc {
    fn name(&self) -> &'static str {
        "odbc"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn format_date(&self, date: NaiveDate) -> String {
        helpers::odbc_escape("d", date.format(helpers::DATE_FORMAT))
    }

    fn format_datetime(&self, datetime: NaiveDateTime) -> String {
        helpers::odbc_escape("ts", datetime.format(helpers::DATETIME_FORMAT))
    }

    fn format_time(&self, time: NaiveTime) -> String {
        helpers::odbc_escape("t", time.format(helpers::TIME_FORMAT))
    }

    fn supports_dml_table_alias(&self) -> bool {
        false
    }

    fn supports_multi_row_insert(&self) -> bool {
        false
    }

    fn constraint_violation(&self, code: &str, message: &str) -> Option<ConstraintKind> {
        // SQLSTATE 23000 covers every integrity violation; only the driver
        // message tells them apart.
        if code.trim() != "23000" {
            return None;
        }
        let message = message.to_ascii_lowercase();
        if message.contains("unique") || message.contains("duplicate") {
            Some(ConstraintKind::Unique)
        } else if message.contains("foreign key") {
            Some(ConstraintKind::ForeignKey)
        } else {
            None
        }
    }
}
