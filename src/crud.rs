//! Runs compiled queries through a [`Connector`].
//!
//! ```ignore
//! let mut query = QueryBuilder::new(&schema, "ORDER", CompileOptions::new(Dialect::Postgres))?;
//! query.add_select("NO")?;
//! query.set_limit(Some(20), 0);
//! let page = crud::read(&mut connector, &query)?;
//! ```

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::compiler::{
    QueryBuilder, ReadResult, Row, StatementRole, UidSource, WritePlan, COUNT_ALIAS,
};
use crate::connector::{Connector, ConnectorError, ExecResult};
use crate::error::{Error, Result};
use crate::sql::{Dialect, SqlDialect};

/// Outcome of a create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateResult {
    /// UID of every inserted row, in input order. `Null` where the database
    /// did not report one.
    pub uids: Vec<JsonValue>,
    pub affected_rows: u64,
}

/// One page of rows.
pub fn read(connector: &mut impl Connector, query: &QueryBuilder<'_>) -> Result<ReadResult> {
    let compiled = query.compile_read()?;
    let dialect = query.options().dialect;
    let result = run(connector, dialect, &compiled.sql)?;
    let decoded = compiled.decode(result.rows);
    debug!(object = %query.main_object(), rows = decoded.rows.len(), has_more = decoded.has_more, "read");
    Ok(decoded)
}

/// Number of rows the query matches, ignoring limit and offset.
pub fn count(connector: &mut impl Connector, query: &QueryBuilder<'_>) -> Result<u64> {
    let compiled = query.compile_count()?;
    let dialect = query.options().dialect;
    let result = run(connector, dialect, &compiled.sql)?;

    let value = result.rows.first().and_then(|row| column(row, COUNT_ALIAS));
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_u64().unwrap_or(0),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Insert the query's values; returns the UIDs of the new rows.
pub fn create(connector: &mut impl Connector, query: &QueryBuilder<'_>) -> Result<CreateResult> {
    let plan = query.compile_create()?;
    execute_create(connector, query.options().dialect, &plan)
}

/// Update rows; returns the total affected row count of all statements.
pub fn update(connector: &mut impl Connector, query: &QueryBuilder<'_>) -> Result<u64> {
    let plan = query.compile_update()?;
    execute_writes(connector, query.options().dialect, &plan)
}

/// Delete the filtered rows; returns the affected row count.
pub fn delete(connector: &mut impl Connector, query: &QueryBuilder<'_>) -> Result<u64> {
    let plan = query.compile_delete()?;
    execute_writes(connector, query.options().dialect, &plan)
}

/// Run an INSERT plan and collect generated UIDs.
pub fn execute_create(
    connector: &mut impl Connector,
    dialect: Dialect,
    plan: &WritePlan,
) -> Result<CreateResult> {
    let mut uids = vec![JsonValue::Null; plan.rows];
    let mut affected_rows = 0;

    for statement in &plan.statements {
        let result = run(connector, dialect, &statement.sql)?;
        let StatementRole::Insert { rows, uids: source } = &statement.role else {
            continue;
        };
        affected_rows += result.affected_rows;

        let reported = match source {
            UidSource::Known(values) => values.clone(),
            UidSource::Returned { alias } => result
                .rows
                .iter()
                .map(|row| column(row, alias).cloned().unwrap_or(JsonValue::Null))
                .collect(),
            UidSource::LastInsertId => vec![result.last_insert_id.clone().unwrap_or(JsonValue::Null)],
            UidSource::Query(sql) => {
                let follow_up = run(connector, dialect, sql)?;
                vec![first_value(&follow_up)]
            }
            UidSource::None => Vec::new(),
        };

        if !reported.is_empty() && reported.len() != rows.len() {
            warn!(
                object = %plan.object,
                expected = rows.len(),
                reported = reported.len(),
                "generated UIDs do not match inserted rows"
            );
        }
        for (row, uid) in rows.iter().zip(reported) {
            if let Some(slot) = uids.get_mut(*row) {
                *slot = uid;
            }
        }
    }

    debug!(object = %plan.object, rows = plan.rows, affected_rows, "created");
    Ok(CreateResult {
        uids,
        affected_rows,
    })
}

/// Run UPDATE or DELETE statements in order and sum their affected rows.
pub fn execute_writes(
    connector: &mut impl Connector,
    dialect: Dialect,
    plan: &WritePlan,
) -> Result<u64> {
    let mut affected = 0;
    for statement in &plan.statements {
        let result = run(connector, dialect, &statement.sql)?;
        if statement.role == StatementRole::Write {
            affected += result.affected_rows;
        }
    }
    debug!(object = %plan.object, affected, "written");
    Ok(affected)
}

fn run(connector: &mut impl Connector, dialect: Dialect, sql: &str) -> Result<ExecResult> {
    debug!(%dialect, "executing:\n{}", sql);
    connector
        .execute(sql)
        .map_err(|source| classify(dialect, sql, source))
}

/// Constraint violations are recognized per dialect; everything else is
/// passed through.
pub fn classify(dialect: Dialect, sql: &str, source: ConnectorError) -> Error {
    if let Some(code) = &source.code {
        if let Some(kind) = dialect.constraint_violation(code, &source.message) {
            return Error::ConstraintViolation {
                kind,
                code: code.clone(),
                sql: sql.to_string(),
                message: source.message,
            };
        }
    }
    Error::Connection {
        sql: sql.to_string(),
        source,
    }
}

/// A column by name; drivers that fold case still match.
fn column<'r>(row: &'r Row, name: &str) -> Option<&'r JsonValue> {
    row.get(name).or_else(|| {
        row.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn first_value(result: &ExecResult) -> JsonValue {
    result
        .rows
        .first()
        .and_then(|row| row.values().next().cloned())
        .unwrap_or(JsonValue::Null)
}
