//! Compiled reads and decoding of their result rows.

use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};

use crate::model::DataType;
use crate::query::{json_text, Comparator, Filter, FilterGroup, LogicalOperator, Select};

use super::alias::AliasManager;

/// One result row, keyed by column.
pub type Row = Map<String, JsonValue>;

/// A column of a compiled read.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    /// Alias in the SQL.
    pub alias: String,
    /// Key in decoded rows.
    pub key: String,
    pub hidden: bool,
    /// Raw bytes are normalized to `0x` hex text.
    pub binary: bool,
}

impl ResultColumn {
    pub(crate) fn for_select(select: &Select, alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            key: select.column_key.clone(),
            hidden: select.hidden,
            binary: select.attribute.attribute.is_binary()
                && select.attribute.aggregator.is_none()
                && !select.for_sorting,
        }
    }
}

/// A SELECT ready to run, plus what is needed to decode its rows.
#[derive(Debug, Clone)]
pub struct CompiledRead {
    pub sql: String,
    pub columns: Vec<ResultColumn>,
    /// Page size requested by the caller.
    pub limit: Option<u64>,
    pub offset: u64,
    /// The SQL already skips `offset` rows and fetches `limit + 1`.
    pub paged_in_sql: bool,
    /// Conditions evaluated on decoded rows.
    pub after_read: FilterGroup,
    /// Planning passes it took to settle.
    pub passes: usize,
    pub(crate) aliases: AliasManager,
    /// Attribute expression to column key, for after-read conditions.
    pub(crate) keys: HashMap<String, String>,
}

/// Decoded rows of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadResult {
    pub rows: Vec<Row>,
    /// More rows exist past this page.
    pub has_more: bool,
}

/// A COUNT query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCount {
    pub sql: String,
    pub passes: usize,
}

impl CompiledRead {
    /// Turn raw connector rows into result rows: column keys restored,
    /// after-read conditions applied, helper columns dropped and the page cut.
    pub fn decode(&self, rows: Vec<Row>) -> ReadResult {
        let by_alias: HashMap<&str, &ResultColumn> =
            self.columns.iter().map(|c| (c.alias.as_str(), c)).collect();

        let mut decoded: Vec<Row> = rows
            .into_iter()
            .map(|row| {
                let mut out = Row::new();
                for (name, value) in row {
                    let full = self.aliases.full(&name);
                    let column = by_alias
                        .get(name.as_str())
                        .or_else(|| by_alias.get(full));
                    if let Some(column) = column {
                        let value = if column.binary {
                            normalize_binary(value)
                        } else {
                            value
                        };
                        out.insert(column.key.clone(), value);
                    }
                }
                out
            })
            .collect();

        if !self.after_read.is_empty() {
            decoded.retain(|row| group_matches(&self.after_read, row, &self.keys));
        }

        let mut has_more = false;
        if let Some(limit) = self.limit {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            if !self.paged_in_sql {
                let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
                decoded = decoded.into_iter().skip(offset).collect();
            }
            has_more = decoded.len() > limit;
            decoded.truncate(limit);
        }

        for row in &mut decoded {
            for column in self.columns.iter().filter(|c| c.hidden) {
                row.remove(&column.key);
            }
        }

        ReadResult {
            rows: decoded,
            has_more,
        }
    }
}

/// Binary columns as lowercase `0x` hex: byte arrays are encoded, hex text
/// is normalized.
fn normalize_binary(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|b| b.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            match bytes {
                Some(bytes) => JsonValue::String(format!("0x{}", hex::encode(bytes))),
                None => JsonValue::Array(items),
            }
        }
        JsonValue::String(s) => {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(&s);
            JsonValue::String(format!("0x{}", digits.to_lowercase()))
        }
        other => other,
    }
}

fn group_matches(group: &FilterGroup, row: &Row, keys: &HashMap<String, String>) -> bool {
    let mut results = group
        .filters
        .iter()
        .map(|f| filter_matches(f, row, keys))
        .chain(group.groups.iter().map(|g| group_matches(g, row, keys)));

    match group.operator {
        LogicalOperator::And => results.all(|r| r),
        LogicalOperator::Or => results.any(|r| r),
        LogicalOperator::Xor => results.filter(|r| *r).count() % 2 == 1,
        LogicalOperator::Not => !results.all(|r| r),
    }
}

fn filter_matches(filter: &Filter, row: &Row, keys: &HashMap<String, String>) -> bool {
    let expression = filter.attribute.expression();
    let key = keys.get(&expression).unwrap_or(&expression);
    let value = row.get(key).unwrap_or(&JsonValue::Null);
    let data_type = match &filter.attribute.aggregator {
        Some(aggregator) => aggregator.result_type(filter.attribute.attribute.data_type),
        None => filter.attribute.attribute.data_type,
    };

    if filter.value.is_null() && !filter.comparator.is_list() && !filter.comparator.is_range() {
        return value.is_null() != filter.comparator.is_negative();
    }

    let actual = json_text(value);
    match filter.comparator {
        Comparator::Is | Comparator::IsNot => {
            let expected = filter.value_text();
            let matched = if data_type.has_exact_equality() {
                loose_eq(&actual, &expected)
            } else {
                actual.to_lowercase().contains(&expected.to_lowercase())
            };
            matched == (filter.comparator == Comparator::Is)
        }
        Comparator::Equals => loose_eq(&actual, &filter.value_text()),
        Comparator::EqualsNot => !loose_eq(&actual, &filter.value_text()),
        Comparator::In => filter.list_members().iter().any(|m| loose_eq(&actual, m)),
        Comparator::NotIn => !filter.list_members().iter().any(|m| loose_eq(&actual, m)),
        Comparator::Between => match filter.range_bounds() {
            Some((low, high)) => {
                !value.is_null()
                    && order(&actual, &low, data_type).is_ge()
                    && order(&actual, &high, data_type).is_le()
            }
            None => false,
        },
        Comparator::LessThan => !value.is_null() && order(&actual, &filter.value_text(), data_type).is_lt(),
        Comparator::LessThanOrEquals => !value.is_null() && order(&actual, &filter.value_text(), data_type).is_le(),
        Comparator::GreaterThan => !value.is_null() && order(&actual, &filter.value_text(), data_type).is_gt(),
        Comparator::GreaterThanOrEquals => !value.is_null() && order(&actual, &filter.value_text(), data_type).is_ge(),
    }
}

fn loose_eq(a: &str, b: &str) -> bool {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

/// Numbers compare numerically, everything else (ISO dates included) as text.
fn order(a: &str, b: &str, data_type: DataType) -> std::cmp::Ordering {
    if data_type.is_numeric() {
        if let (Ok(x), Ok(y)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
            return x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal);
        }
    }
    a.cmp(b)
}
