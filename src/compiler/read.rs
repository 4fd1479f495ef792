//! SELECT planning: one pass over the parts of a read or count.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{CompileError, CompileResult};
use crate::query::{Aggregation, AttributeRef, FilterGroup, QueryPart, Select};
use crate::sql::{
    alias_ref, count_star, lit_int, ExprExt, OrderByExpr, Pagination, Query, SqlDialect, TableRef,
};

use super::grouping;
use super::pagination::paginate;
use super::planner::Planner;
use super::result::ResultColumn;
use super::{COUNT_ALIAS, COUNT_QUERY, KEY_ALIAS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ReadMode {
    Rows,
    Count,
}

/// Inputs of a read besides its parts.
pub(super) struct ReadRequest<'b> {
    pub filters: &'b FilterGroup,
    pub limit: Option<u64>,
    pub offset: u64,
    pub distinct: bool,
    pub mode: ReadMode,
}

/// A SELECT before ordering and pagination.
#[derive(Debug, Default)]
pub(super) struct Body {
    pub query: Query,
    pub columns: Vec<ResultColumn>,
    /// Column aliases of the GROUP BY keys.
    pub group_aliases: Vec<String>,
}

/// Output of one read pass.
pub(super) struct ReadPlan {
    pub query: Query,
    pub columns: Vec<ResultColumn>,
    pub after_read: FilterGroup,
    pub paged_in_sql: bool,
    pub keys: HashMap<String, String>,
}

pub(super) fn plan(
    planner: &mut Planner<'_>,
    parts: &[QueryPart],
    request: &ReadRequest<'_>,
) -> CompileResult<ReadPlan> {
    let (filters, after_read) = request.filters.split_after_read();
    let selects: Vec<&Select> = parts.iter().filter_map(QueryPart::as_select).collect();

    if request.mode == ReadMode::Rows && selects.iter().all(|s| s.hidden) {
        // Nothing asked for: read every attribute of the main object.
        let main = planner.main;
        for attribute in main.attributes.values() {
            let attr = AttributeRef::resolve(planner.schema, &main.alias, &attribute.alias)?;
            planner.queue(QueryPart::Select(Select::new(attr)));
        }
    }

    for filter in after_read.all_filters() {
        planner.request_select(parts, &filter.attribute, false);
    }

    let grouped = parts.iter().any(|p| p.as_aggregation().is_some());
    if !grouped {
        group_list_by_uid(planner, &selects)?;
    }

    let mut order_by = Vec::new();
    if request.mode == ReadMode::Rows {
        for sorter in parts.iter().filter_map(QueryPart::as_sorter) {
            if let Some(key) = planner.request_select(parts, &sorter.attribute, true) {
                let alias = planner.aliases.short(&key);
                order_by.push(OrderByExpr::new(alias_ref(None, &alias), sorter.direction));
            }
        }
    }

    let mut body = if grouped {
        grouping::plan(planner, parts, &filters)?
    } else {
        plain(planner, parts, &filters, request.distinct)?
    };

    let paged_in_sql =
        request.mode == ReadMode::Rows && request.limit.is_some() && after_read.is_empty();

    if paged_in_sql && order_by.is_empty() && needs_sort_key(planner) {
        if grouped {
            order_by = body
                .group_aliases
                .iter()
                .map(|alias| OrderByExpr::asc(alias_ref(None, alias)))
                .collect();
        } else {
            let main = planner.main;
            let uid = main
                .uid_attribute()
                .ok_or_else(|| CompileError::MissingSortKey {
                    object: main.alias.clone(),
                    dialect: planner.dialect,
                })?;
            let attr = AttributeRef::resolve(planner.schema, &main.alias, &uid.alias)?;
            if let Some(key) = planner.request_select(parts, &attr, false) {
                let alias = planner.aliases.short(&key);
                order_by.push(OrderByExpr::desc(alias_ref(None, &alias)));
            }
        }
    }

    let mut keys = HashMap::new();
    for select in selects.iter().filter(|s| !s.for_sorting) {
        keys.entry(select.attribute.expression())
            .or_insert_with(|| select.column_key.clone());
    }

    let query = match request.mode {
        ReadMode::Count => Query::new()
            .select(vec![count_star().alias(COUNT_ALIAS)])
            .from(TableRef::subquery(body.query).with_alias(COUNT_QUERY)),
        ReadMode::Rows => {
            body.query.order_by = order_by;
            match request.limit {
                Some(limit) if paged_in_sql => paginate(
                    body.query,
                    planner.dialect,
                    limit.saturating_add(1),
                    request.offset,
                ),
                _ => body.query,
            }
        }
    };

    Ok(ReadPlan {
        query,
        columns: body.columns,
        after_read,
        paged_in_sql,
        keys,
    })
}

/// Paging on this dialect needs an ORDER BY.
fn needs_sort_key(planner: &Planner<'_>) -> bool {
    planner.dialect.requires_order_by_for_offset()
        || planner.dialect.pagination() == Pagination::RowNumber
}

/// A LIST over forward relations collapses an ungrouped query into one row;
/// grouping by the main UID keeps one row per object.
fn group_list_by_uid(planner: &mut Planner<'_>, selects: &[&Select]) -> CompileResult<()> {
    let listed = selects.iter().find(|s| {
        !s.attribute.has_reverse()
            && s.attribute.aggregator.as_ref().is_some_and(|a| a.is_list())
    });
    let main = planner.main;
    let (Some(listed), Some(uid)) = (listed, main.uid_attribute()) else {
        return Ok(());
    };

    warn!(
        attribute = %listed.attribute.expression(),
        object = %main.alias,
        "LIST in an ungrouped read, grouping by the UID"
    );
    let attr = AttributeRef::resolve(planner.schema, &main.alias, &uid.alias)?;
    planner.queue(QueryPart::Aggregation(Aggregation { attribute: attr }));
    Ok(())
}

/// SELECT without GROUP BY.
fn plain(
    planner: &mut Planner<'_>,
    parts: &[QueryPart],
    filters: &FilterGroup,
    distinct: bool,
) -> CompileResult<Body> {
    let mut select_list = Vec::new();
    let mut columns = Vec::new();
    for select in parts.iter().filter_map(QueryPart::as_select) {
        let value = planner.select_value(select, filters)?;
        let alias = planner.aliases.short(&select.column_key);
        select_list.push(value.alias(&alias));
        columns.push(ResultColumn::for_select(select, &alias));
    }
    if select_list.is_empty() {
        select_list.push(lit_int(1).alias(KEY_ALIAS));
    }

    let (where_clause, having) = planner.filter_clauses(filters)?;

    let mut query = Query::new().select(select_list).from(planner.main_table());
    query.joins = planner.take_joins();
    query.where_clause = where_clause;
    query.having = having;
    query.distinct = distinct;

    Ok(Body {
        query,
        columns,
        group_aliases: Vec::new(),
    })
}
