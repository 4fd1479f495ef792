//! INSERT, UPDATE and DELETE planning.
//!
//! A write compiles to an ordered list of statements. The orchestrator runs
//! them in order on one connection; statement roles tell it which results
//! to collect (generated UIDs, affected rows).

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::model::{Attribute, DataType, MetaObject, RelationPath, UidGenerator, ValueError};
use crate::query::{FilterGroup, QueryPart, Value};
use crate::sql::template::SqlFragment;
use crate::sql::{
    alias_ref, col, raw_sql, Delete, Expr, ExprExt, GeneratedKeys, Insert, Literal, Query,
    SetVariable, SqlDialect, TableRef, Update,
};

use super::planner::Planner;
use super::{DERIVED_ALIAS, KEY_ALIAS, UID_ALIAS, UID_VARIABLE};

/// Where the UIDs of inserted rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum UidSource {
    /// Supplied by the caller or generated client-side.
    Known(Vec<JsonValue>),
    /// A column of the INSERT's own result set.
    Returned { alias: String },
    /// The connector's last insert id.
    LastInsertId,
    /// A follow-up SELECT on the same connection.
    Query(String),
    /// The object has no UID.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementRole {
    /// UPDATE or DELETE; contributes affected rows.
    Write,
    /// Runs before the next INSERT; its result is ignored.
    Prepare,
    /// INSERT of the given input rows.
    Insert { rows: Vec<usize>, uids: UidSource },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStatement {
    pub sql: String,
    pub role: StatementRole,
}

impl PlannedStatement {
    fn write(sql: String) -> Self {
        Self {
            sql,
            role: StatementRole::Write,
        }
    }
}

/// Statements of one create, update or delete.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    pub object: String,
    pub statements: Vec<PlannedStatement>,
    /// Input rows the plan covers.
    pub rows: usize,
}

fn value_parts(parts: &[QueryPart]) -> Vec<&Value> {
    let mut values: Vec<&Value> = Vec::new();
    for value in parts.iter().filter_map(QueryPart::as_value) {
        let expression = value.attribute.expression();
        if !values.iter().any(|v| v.attribute.expression() == expression) {
            values.push(value);
        }
    }
    values
}

fn parse_value(
    planner: &Planner<'_>,
    attribute: &Attribute,
    expression: &str,
    value: &JsonValue,
) -> CompileResult<Literal> {
    let invalid = |e: ValueError| CompileError::InvalidValue {
        attribute: expression.to_string(),
        value: e.value,
        data_type: e.data_type,
    };
    if value.is_null() && attribute.required {
        return Err(CompileError::InvalidValue {
            attribute: expression.to_string(),
            value: "null".to_string(),
            data_type: attribute.data_type,
        });
    }
    attribute
        .data_type
        .parse(value, planner.options.time_zone)
        .map_err(invalid)
}

/// The value expression, passed through the attribute's INSERT or UPDATE
/// template if it has one.
fn value_expr(
    planner: &Planner<'_>,
    part: &Value,
    template: Option<&str>,
    value: &JsonValue,
) -> CompileResult<Expr> {
    let expression = part.attribute.expression();
    let literal = parse_value(planner, &part.attribute.attribute, &expression, value)?;
    match template {
        Some(sql) => {
            let fragment = SqlFragment::literal(&literal, planner.dialect);
            planner.render(sql, &part.attribute, &planner.main_alias, Some(fragment))
        }
        None => Ok(Expr::Literal(literal)),
    }
}

fn uid_attribute<'m>(object: &'m MetaObject) -> CompileResult<&'m Attribute> {
    object.uid_attribute().ok_or_else(|| CompileError::MissingUid {
        object: object.alias.clone(),
    })
}

// =============================================================================
// INSERT
// =============================================================================

/// How UIDs of new rows are produced, decided once per plan.
enum UidPlan {
    /// The UID column is among the values, or the object has none.
    Given,
    /// Client-side UUIDs.
    Uuid,
    /// Generated inline, handed back by RETURNING/OUTPUT.
    Returning(Option<String>),
    /// A session variable set before each row.
    Variable { variable: String, sql: String },
    /// Read back per row after the INSERT.
    PerRow(UidSource),
}

pub(super) fn plan_insert(planner: &mut Planner<'_>, parts: &[QueryPart]) -> CompileResult<WritePlan> {
    let main = planner.main;
    let dialect = planner.dialect;
    planner.unqualified = true;

    let values = value_parts(parts);
    if values.is_empty() {
        return Err(CompileError::NothingToWrite {
            object: main.alias.clone(),
        });
    }
    if let Some(related) = values.iter().find(|v| !v.attribute.path.is_empty()) {
        return Err(CompileError::RelatedValueInInsert {
            attribute: related.attribute.expression(),
        });
    }

    let rows = values.iter().map(|v| v.values.len()).max().unwrap_or(0).max(1);
    let uid = main.uid_attribute();

    // A UID column without a single value is left to the generator.
    let given_uid = values
        .iter()
        .find(|v| v.attribute.is_uid && v.attribute.object == main.alias)
        .copied()
        .filter(|v| v.values.iter().any(|value| !value.is_null()));
    let values: Vec<&Value> = values
        .into_iter()
        .filter(|v| !(v.attribute.is_uid && given_uid.is_none()))
        .collect();

    let uid_plan = match uid {
        None => UidPlan::Given,
        Some(_) if given_uid.is_some() => UidPlan::Given,
        Some(_) => match &main.uid_generator {
            UidGenerator::Uuid => UidPlan::Uuid,
            UidGenerator::Custom(sql) => match dialect.generated_keys() {
                GeneratedKeys::Returning | GeneratedKeys::Output => {
                    UidPlan::Returning(Some(sql.clone()))
                }
                _ => match dialect.session_variable(UID_VARIABLE) {
                    Some(variable) => UidPlan::Variable {
                        variable,
                        sql: sql.clone(),
                    },
                    None => {
                        return Err(CompileError::UnsupportedGenerator {
                            object: main.alias.clone(),
                            dialect,
                        })
                    }
                },
            },
            UidGenerator::AutoIncrement => match dialect.generated_keys() {
                GeneratedKeys::Returning | GeneratedKeys::Output => UidPlan::Returning(None),
                GeneratedKeys::LastInsertId => UidPlan::PerRow(UidSource::LastInsertId),
                GeneratedKeys::FollowUpQuery(sql) => {
                    UidPlan::PerRow(UidSource::Query(sql.to_string()))
                }
            },
        },
    };

    let mut columns: Vec<String> = values
        .iter()
        .map(|v| v.attribute.attribute.data_address.clone())
        .collect();
    let generated_column = match (&uid_plan, uid) {
        (UidPlan::Uuid | UidPlan::Returning(Some(_)) | UidPlan::Variable { .. }, Some(uid)) => {
            columns.push(uid.data_address.clone());
            true
        }
        _ => false,
    };

    let mut row_exprs = Vec::with_capacity(rows);
    let mut known_uids = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut exprs = Vec::with_capacity(columns.len());
        for part in &values {
            let template = part.attribute.attribute.insert_sql(dialect);
            exprs.push(value_expr(planner, part, template, part.value_for_row(row))?);
        }
        if let Some(part) = given_uid {
            known_uids.push(part.value_for_row(row).clone());
        }
        if generated_column {
            match &uid_plan {
                UidPlan::Uuid => {
                    let (expr, uid_value) = new_uuid(uid.map(|u| u.data_type));
                    exprs.push(expr);
                    known_uids.push(uid_value);
                }
                UidPlan::Returning(Some(sql)) => exprs.push(raw_sql(sql)),
                UidPlan::Variable { variable, .. } => exprs.push(raw_sql(variable)),
                _ => {}
            }
        }
        row_exprs.push(exprs);
    }

    let insert = |rows: Vec<Vec<Expr>>| {
        let statement = Insert::into(main.data_address.clone())
            .columns(columns.clone())
            .values_many(rows);
        match (&uid_plan, uid) {
            (UidPlan::Returning(_), Some(uid)) => statement.returning(&uid.data_address, UID_ALIAS),
            _ => statement,
        }
    };

    let per_row = matches!(uid_plan, UidPlan::Variable { .. } | UidPlan::PerRow(_))
        || !dialect.supports_multi_row_insert();

    let mut statements = Vec::new();
    if per_row {
        for (row, exprs) in row_exprs.into_iter().enumerate() {
            let uids = match &uid_plan {
                UidPlan::Given if uid.is_some() => UidSource::Known(vec![known_uids[row].clone()]),
                UidPlan::Given => UidSource::None,
                UidPlan::Uuid => UidSource::Known(vec![known_uids[row].clone()]),
                UidPlan::Returning(_) => UidSource::Returned {
                    alias: UID_ALIAS.to_string(),
                },
                UidPlan::Variable { variable, sql } => {
                    let set = SetVariable::new(variable.clone(), raw_sql(sql));
                    statements.push(PlannedStatement {
                        sql: set.to_sql(dialect),
                        role: StatementRole::Prepare,
                    });
                    UidSource::Query(format!("SELECT {}", variable))
                }
                UidPlan::PerRow(source) => source.clone(),
            };
            statements.push(PlannedStatement {
                sql: insert(vec![exprs]).to_sql(dialect),
                role: StatementRole::Insert {
                    rows: vec![row],
                    uids,
                },
            });
        }
    } else {
        let uids = match &uid_plan {
            UidPlan::Returning(_) => UidSource::Returned {
                alias: UID_ALIAS.to_string(),
            },
            _ if uid.is_some() => UidSource::Known(known_uids),
            _ => UidSource::None,
        };
        statements.push(PlannedStatement {
            sql: insert(row_exprs).to_sql(dialect),
            role: StatementRole::Insert {
                rows: (0..rows).collect(),
                uids,
            },
        });
    }

    debug!(object = %main.alias, rows, statements = statements.len(), "planned insert");
    Ok(WritePlan {
        object: main.alias.clone(),
        statements,
        rows,
    })
}

/// A v4 UUID as SQL value and as reported UID. Binary UIDs get the raw bytes.
fn new_uuid(data_type: Option<DataType>) -> (Expr, JsonValue) {
    let uuid = uuid::Uuid::new_v4();
    match data_type {
        Some(DataType::Binary) => {
            let bytes = uuid.as_bytes().to_vec();
            let text = format!("0x{}", hex::encode(&bytes));
            (Expr::Literal(Literal::Binary(bytes)), JsonValue::String(text))
        }
        _ => {
            let text = uuid.to_string();
            (Expr::Literal(Literal::String(text.clone())), JsonValue::String(text))
        }
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// Which rows of the main object an UPDATE touches.
#[derive(Debug, Clone)]
enum Scope<'v> {
    /// Rows matching the caller's filters.
    Filters,
    /// Rows with one of these UIDs (and matching the filters, if any).
    Uids(Vec<&'v JsonValue>),
}

pub(super) fn plan_update(
    planner: &mut Planner<'_>,
    parts: &[QueryPart],
    filters: &FilterGroup,
) -> CompileResult<WritePlan> {
    let main = planner.main;
    planner.unqualified = !planner.dialect.supports_dml_table_alias();

    let values = value_parts(parts);
    if values.is_empty() {
        return Err(CompileError::NothingToWrite {
            object: main.alias.clone(),
        });
    }

    let mut shared: Vec<&Value> = Vec::new();
    let mut varying: Vec<&Value> = Vec::new();
    for value in &values {
        if value.values.len() <= 1 || value.is_shared() {
            shared.push(value);
        } else if value.uids.len() == value.values.len() {
            varying.push(value);
        } else {
            return Err(CompileError::MissingUid {
                object: main.alias.clone(),
            });
        }
    }

    let all_uids: Vec<&JsonValue> = {
        let mut uids: Vec<&JsonValue> = Vec::new();
        for uid in values.iter().flat_map(|v| v.uids.iter()) {
            if !uids.contains(&uid) {
                uids.push(uid);
            }
        }
        uids
    };

    let mut statements = Vec::new();

    if !shared.is_empty() {
        let scope = if !filters.is_empty() {
            Scope::Filters
        } else if !all_uids.is_empty() {
            Scope::Uids(all_uids.clone())
        } else {
            return Err(CompileError::UpdateWithoutFilters {
                object: main.alias.clone(),
            });
        };
        statements.extend(update_statements(planner, &shared, None, &scope, filters)?);
    }

    if !varying.is_empty() {
        uid_attribute(main)?;
        // One statement per UID, in the order UIDs first appear.
        let mut by_uid: IndexMap<String, &JsonValue> = IndexMap::new();
        for value in &varying {
            for uid in &value.uids {
                by_uid.entry(uid.to_string()).or_insert(uid);
            }
        }
        for uid in by_uid.into_values() {
            let parts: Vec<&Value> = varying
                .iter()
                .copied()
                .filter(|v| v.uids.contains(uid))
                .collect();
            let scope = Scope::Uids(vec![uid]);
            statements.extend(update_statements(planner, &parts, Some(uid), &scope, filters)?);
        }
    }

    let rows = values.iter().map(|v| v.values.len()).max().unwrap_or(1).max(1);
    debug!(object = %main.alias, statements = statements.len(), "planned update");
    Ok(WritePlan {
        object: main.alias.clone(),
        statements,
        rows,
    })
}

/// The UPDATE of the main object for `values`, followed by one UPDATE per
/// related object, in the order their values were added.
fn update_statements(
    planner: &mut Planner<'_>,
    values: &[&Value],
    uid: Option<&JsonValue>,
    scope: &Scope<'_>,
    filters: &FilterGroup,
) -> CompileResult<Vec<PlannedStatement>> {
    let dialect = planner.dialect;
    let value_at = |part: &Value| match uid {
        Some(uid) => part
            .uids
            .iter()
            .position(|u| u == uid)
            .and_then(|row| part.values.get(row))
            .cloned()
            .unwrap_or(JsonValue::Null),
        None => part.value_for_row(0).clone(),
    };

    let mut statements = Vec::new();

    let own: Vec<&Value> = values
        .iter()
        .copied()
        .filter(|v| v.attribute.path.is_empty())
        .collect();
    if !own.is_empty() {
        let mut update = Update::table(planner.main_table());
        for part in own {
            let template = part.attribute.attribute.update_sql(dialect);
            let expr = value_expr(planner, part, template, &value_at(part))?;
            update = update.set(part.attribute.attribute.data_address.clone(), expr);
        }
        if let Some(restriction) = main_restriction(planner, scope, filters)? {
            update = update.filter(restriction);
        }
        statements.push(PlannedStatement::write(update.to_sql(dialect)));
    }

    let mut related: IndexMap<String, (RelationPath, Vec<&Value>)> = IndexMap::new();
    for part in values.iter().copied().filter(|v| !v.attribute.path.is_empty()) {
        related
            .entry(part.attribute.path.alias_path())
            .or_insert_with(|| (part.attribute.path.clone(), Vec::new()))
            .1
            .push(part);
    }
    for (path, parts) in related.into_values() {
        let sql = related_update(planner, &path, &parts, &value_at, scope, filters)?;
        statements.push(PlannedStatement::write(sql));
    }

    Ok(statements)
}

/// WHERE of an UPDATE on the main table.
fn main_restriction(
    planner: &mut Planner<'_>,
    scope: &Scope<'_>,
    filters: &FilterGroup,
) -> CompileResult<Option<Expr>> {
    let mut restriction = match scope {
        Scope::Uids(uids) => Some(uid_condition(planner, uids)?),
        Scope::Filters => None,
    };
    if filters.is_empty() {
        return Ok(restriction);
    }

    let across = filters.any(&|f| !f.attribute.path.is_empty() || f.attribute.aggregator.is_some());
    let condition = if across {
        // Joins are not allowed in UPDATE: restrict by UID instead.
        let main = planner.main;
        let uid = uid_attribute(main)?;
        let keys = key_select(planner, &uid.alias, &Scope::Filters, filters)?;
        let keys = derived_for_self_reference(planner, keys);
        planner
            .qualified(&planner.main_alias, &uid.data_address)
            .in_subquery(keys)
    } else {
        let (where_clause, _) = planner.filter_clauses(filters)?;
        match where_clause {
            Some(where_clause) => where_clause,
            None => return Ok(restriction),
        }
    };

    restriction = Some(match restriction {
        Some(existing) => existing.and(condition),
        None => condition,
    });
    Ok(restriction)
}

/// `uid = u` or `uid IN (u1, u2, ...)` on the main table.
fn uid_condition(planner: &Planner<'_>, uids: &[&JsonValue]) -> CompileResult<Expr> {
    let main = planner.main;
    let uid = uid_attribute(main)?;
    let literals = uids
        .iter()
        .map(|value| parse_value(planner, uid, &uid.alias, value).map(Expr::Literal))
        .collect::<CompileResult<Vec<_>>>()?;
    let column = planner.qualified(&planner.main_alias, &uid.data_address);
    let mut literals = literals;
    Ok(if literals.len() == 1 {
        column.eq(literals.remove(0))
    } else {
        column.in_list(literals)
    })
}

/// `SELECT key FROM main ... WHERE scope AND filters`, planned in its own
/// scope so the main statement stays join-free.
fn key_select(
    planner: &mut Planner<'_>,
    key_attribute: &str,
    scope: &Scope<'_>,
    filters: &FilterGroup,
) -> CompileResult<Query> {
    let main = planner.main;
    let mut child = planner.child(&main.alias)?;
    child.join_reverse = false;
    let key = child.key_column(&main.alias, key_attribute)?;
    let key = child.qualified(&child.main_alias, &key);
    let (where_clause, having) = child.filter_clauses(filters)?;

    let mut query = Query::new().select(vec![key.clone()]).from(child.main_table());
    if let Scope::Uids(uids) = scope {
        query = query.filter(uid_condition(&child, uids)?);
    }
    if let Some(where_clause) = where_clause {
        query = query.filter(where_clause);
    }
    query.joins = child.take_joins();
    if having.is_some() {
        query.group_by = vec![key];
        query.having = having;
    }
    Ok(query)
}

/// MySQL refuses subqueries on the table being updated unless they go
/// through a derived table.
fn derived_for_self_reference(planner: &Planner<'_>, mut keys: Query) -> Query {
    if !planner.dialect.requires_derived_table_for_self_subquery() {
        return keys;
    }
    if let Some(first) = keys.select.first_mut() {
        first.alias = Some(KEY_ALIAS.to_string());
    }
    Query::new()
        .select(vec![alias_ref(Some(DERIVED_ALIAS), KEY_ALIAS)])
        .from(TableRef::subquery(keys).with_alias(DERIVED_ALIAS))
}

/// UPDATE of the object at the end of `path`, restricted to the rows related
/// to the main rows in `scope`:
///
/// ```sql
/// UPDATE country SET name = 'X'
/// WHERE id IN (SELECT country_id FROM customer
///              WHERE id IN (SELECT customer_id FROM orders WHERE ...))
/// ```
fn related_update(
    planner: &mut Planner<'_>,
    path: &RelationPath,
    parts: &[&Value],
    value_at: &impl Fn(&Value) -> JsonValue,
    scope: &Scope<'_>,
    filters: &FilterGroup,
) -> CompileResult<String> {
    let dialect = planner.dialect;
    let steps = path.steps();
    let Some(first) = steps.first() else {
        return Err(CompileError::NothingToWrite {
            object: planner.main.alias.clone(),
        });
    };
    let Some(target_alias) = path.target_object() else {
        return Err(CompileError::NothingToWrite {
            object: planner.main.alias.clone(),
        });
    };
    let target = planner.schema.object(target_alias)?;

    // Keys of the first related object, read from the main object.
    let mut keys = key_select(planner, &first.key_attribute, scope, filters)?;
    let mut tables = vec![planner.main.data_address.clone()];

    // Walk the remaining steps.
    for pair in steps.windows(2) {
        let (previous, step) = (&pair[0], &pair[1]);
        let source = planner.schema.object(&step.source_object)?;
        let source_key = planner.key_column(&step.source_object, &step.key_attribute)?;
        let related = planner.key_column(&previous.target_object, &previous.related_key_attribute)?;
        tables.push(source.data_address.clone());
        keys = Query::new()
            .select(vec![col(&source_key)])
            .from(TableRef::new(&source.data_address))
            .filter(col(&related).in_subquery(keys));
    }

    let last = &steps[steps.len() - 1];
    if tables.contains(&target.data_address) {
        keys = derived_for_self_reference(planner, keys);
    }

    let mut target_planner = planner.child(target_alias)?;
    target_planner.unqualified = true;
    let mut update = Update::table(TableRef::new(&target.data_address));
    for part in parts {
        let template = part.attribute.attribute.update_sql(dialect);
        let literal = parse_value(
            &target_planner,
            &part.attribute.attribute,
            &part.attribute.expression(),
            &value_at(*part),
        )?;
        let expr = match template {
            Some(sql) => {
                let fragment = SqlFragment::literal(&literal, dialect);
                target_planner.render(sql, &part.attribute, &target_planner.main_alias, Some(fragment))?
            }
            None => Expr::Literal(literal),
        };
        update = update.set(part.attribute.attribute.data_address.clone(), expr);
    }
    let related_key = planner.key_column(target_alias, &last.related_key_attribute)?;
    update = update.filter(col(&related_key).in_subquery(keys));

    Ok(update.to_sql(dialect))
}

// =============================================================================
// DELETE
// =============================================================================

pub(super) fn plan_delete(planner: &mut Planner<'_>, filters: &FilterGroup) -> CompileResult<WritePlan> {
    let main = planner.main;
    planner.unqualified = !planner.dialect.supports_dml_table_alias();

    if filters.is_empty() {
        return Err(CompileError::DeleteWithoutFilters {
            object: main.alias.clone(),
        });
    }
    if let Some(filter) = filters
        .all_filters()
        .into_iter()
        .find(|f| !f.attribute.path.is_empty())
    {
        return Err(CompileError::DeleteAcrossRelation {
            object: main.alias.clone(),
            attribute: filter.attribute.expression(),
        });
    }
    if let Some(filter) = filters
        .all_filters()
        .into_iter()
        .find(|f| f.attribute.aggregator.is_some())
    {
        return Err(CompileError::UngroupedAttribute {
            attribute: filter.attribute.expression(),
        });
    }

    let mut delete = Delete::from(planner.main_table());
    let (where_clause, _) = planner.filter_clauses(filters)?;
    match where_clause {
        Some(where_clause) => delete = delete.filter(where_clause),
        None => {
            return Err(CompileError::DeleteWithoutFilters {
                object: main.alias.clone(),
            })
        }
    }

    let sql = delete.to_sql(planner.dialect);
    debug!(object = %main.alias, "planned delete");
    Ok(WritePlan {
        object: main.alias.clone(),
        statements: vec![PlannedStatement::write(sql)],
        rows: 0,
    })
}
