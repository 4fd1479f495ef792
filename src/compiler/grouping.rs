//! Grouped reads.
//!
//! A grouped read has a core query with the GROUP BY keys and aggregates.
//! Columns that are unique per group but cannot be grouped by directly
//! (everything reachable from a UID or foreign key among the group keys)
//! are joined onto the core afterwards:
//!
//! ```sql
//! SELECT "EXFCOREQ".*, "CUSTOMER".name AS "CUSTOMER__NAME"
//! FROM (SELECT ... GROUP BY ...) "EXFCOREQ"
//! LEFT JOIN customer "CUSTOMER" ON "CUSTOMER".id = "EXFCOREQ"."CUSTOMER"
//! ```

use crate::error::{CompileError, CompileResult};
use crate::model::{RelationPath, RelationStep};
use crate::query::{Aggregation, AttributeRef, FilterGroup, LogicalOperator, QueryPart, Select};
use crate::sql::{alias_ref, table_col, table_star, Expr, ExprExt, Join, JoinType, Query, SelectExpr, SqlDialect, TableRef};

use super::planner::Planner;
use super::predicate::pinned_key;
use super::read::Body;
use super::result::ResultColumn;
use super::CORE_ALIAS;

/// Where an enriched column joins onto the core query.
#[derive(Debug, Clone)]
struct Anchor {
    /// Index of the group key the anchor hangs off.
    key: usize,
    /// Object joined onto the core.
    object: String,
    /// Attribute of `object` equal to the group key.
    join_key: String,
    /// Path from the main object to `object`.
    base: RelationPath,
}

enum Placement {
    Key,
    Core,
    Enrich(Anchor),
}

/// Plan a read with at least one aggregation part.
pub(super) fn plan(
    planner: &mut Planner<'_>,
    parts: &[QueryPart],
    filters: &FilterGroup,
) -> CompileResult<Body> {
    let mut keys: Vec<&AttributeRef> = Vec::new();
    for aggregation in parts.iter().filter_map(QueryPart::as_aggregation) {
        let attr = &aggregation.attribute;
        if attr.has_reverse() || attr.aggregator.is_some() {
            return Err(CompileError::UngroupedAttribute {
                attribute: attr.expression(),
            });
        }
        if !keys.iter().any(|k| k.expression() == attr.expression()) {
            keys.push(attr);
        }
    }

    let mut key_aliases = Vec::new();
    let mut pending = false;
    for key in &keys {
        match planner.request_select(parts, key, false) {
            Some(column_key) => key_aliases.push(planner.aliases.short(&column_key)),
            None => pending = true,
        }
    }

    let pinned: Vec<&AttributeRef> = if filters.operator == LogicalOperator::And {
        filters.filters.iter().filter_map(pinned_key).collect()
    } else {
        Vec::new()
    };

    let mut placed = Vec::new();
    for select in parts.iter().filter_map(QueryPart::as_select) {
        match place(planner, select, &keys)? {
            Some(placement) => placed.push((select, placement)),
            None => match reachable(planner, &select.attribute.path, &pinned) {
                Some(anchor) => {
                    planner.queue(QueryPart::Aggregation(Aggregation {
                        attribute: pinned[anchor.key].clone(),
                    }));
                    pending = true;
                }
                None => {
                    return Err(CompileError::UngroupedAttribute {
                        attribute: select.attribute.expression(),
                    })
                }
            },
        }
    }

    if pending {
        // Discarded: the next pass sees the queued parts.
        return Ok(Body::default());
    }

    let mut select_list = Vec::new();
    let mut columns = Vec::new();
    for (select, placement) in &placed {
        let attr = &select.attribute;
        let value = match placement {
            Placement::Key => planner.select_value(select, filters)?,
            Placement::Core if planner.needs_subquery(attr) => {
                let aggregator = planner.reverse_aggregator(attr)?;
                planner.reverse_select(attr, &aggregator, filters)?
            }
            Placement::Core => {
                let aggregator = attr
                    .aggregator
                    .clone()
                    .or_else(|| attr.attribute.default_aggregator.clone());
                let aggregated = Select {
                    attribute: attr.with_aggregator(aggregator),
                    ..(*select).clone()
                };
                planner.select_value(&aggregated, filters)?
            }
            Placement::Enrich(_) => continue,
        };
        let alias = planner.aliases.short(&select.column_key);
        select_list.push(value.alias(&alias));
        columns.push(ResultColumn::for_select(select, &alias));
    }

    let mut group_by = Vec::new();
    for key in &keys {
        group_by.push(planner.column(key)?);
    }
    let (where_clause, having) = planner.filter_clauses(filters)?;

    let mut core = Query::new().select(select_list).from(planner.main_table());
    core.joins = planner.take_joins();
    core.where_clause = where_clause;
    core.group_by = group_by;
    core.having = having;

    let enriched: Vec<(&Select, &Anchor)> = placed
        .iter()
        .filter_map(|(select, placement)| match placement {
            Placement::Enrich(anchor) => Some((*select, anchor)),
            _ => None,
        })
        .collect();

    if enriched.is_empty() {
        return Ok(Body {
            query: core,
            columns,
            group_aliases: key_aliases,
        });
    }

    let mut outer_select = vec![SelectExpr::new(table_star(CORE_ALIAS))];
    for (select, anchor) in enriched {
        let value = enrich_value(planner, select, anchor, &key_aliases, filters)?;
        let alias = planner.aliases.short(&select.column_key);
        outer_select.push(value.alias(&alias));
        columns.push(ResultColumn::for_select(select, &alias));
    }

    let mut query = Query::new()
        .select(outer_select)
        .from(TableRef::subquery(core).with_alias(CORE_ALIAS));
    query.joins = planner.take_joins();

    Ok(Body {
        query,
        columns,
        group_aliases: key_aliases,
    })
}

/// Where `select` goes; `None` if it is not unique per group.
fn place(
    planner: &Planner<'_>,
    select: &Select,
    keys: &[&AttributeRef],
) -> CompileResult<Option<Placement>> {
    let attr = &select.attribute;

    if attr.aggregator.is_none() && keys.iter().any(|k| k.expression() == attr.expression()) {
        return Ok(Some(Placement::Key));
    }

    if attr.has_reverse() {
        let Some(idx) = attr.path.first_reverse() else {
            return Ok(None);
        };
        let prefix = attr.path.prefix(idx);
        let step = &attr.path.steps()[idx];
        let keyed = keys
            .iter()
            .any(|k| k.path == prefix && k.attribute.alias == step.key_attribute);
        if keyed {
            return Ok(Some(Placement::Core));
        }
        return Ok(reachable(planner, &prefix, keys).map(Placement::Enrich));
    }

    if attr.aggregator.is_some() || attr.attribute.default_aggregator.is_some() {
        return Ok(Some(Placement::Core));
    }

    Ok(reachable(planner, &attr.path, keys).map(Placement::Enrich))
}

/// The group key everything at the end of `path` is functionally dependent
/// on, if any.
fn reachable(planner: &Planner<'_>, path: &RelationPath, keys: &[&AttributeRef]) -> Option<Anchor> {
    for (idx, key) in keys.iter().enumerate() {
        if key.is_uid && path.starts_with(&key.path) {
            return Some(Anchor {
                key: idx,
                object: key.object.clone(),
                join_key: key.attribute.alias.clone(),
                base: key.path.clone(),
            });
        }
        if key.is_relation {
            let Ok(owner) = planner.schema.object(&key.object) else {
                continue;
            };
            let Some(relation) = owner.relation_by_key(&key.attribute.alias) else {
                continue;
            };
            let mut base = key.path.clone();
            if base.push(RelationStep::new(&key.object, relation)).is_err() {
                continue;
            }
            if path.starts_with(&base) {
                return Some(Anchor {
                    key: idx,
                    object: relation.related_object.clone(),
                    join_key: relation.related_key_attribute.clone(),
                    base,
                });
            }
        }
    }
    None
}

/// Value of an enriched column, joined from its anchor.
fn enrich_value(
    planner: &mut Planner<'_>,
    select: &Select,
    anchor: &Anchor,
    key_aliases: &[String],
    filters: &FilterGroup,
) -> CompileResult<Expr> {
    let attr = &select.attribute;
    let key_alias = &key_aliases[anchor.key];
    let seed = format!("{}{}", CORE_ALIAS, key_alias);
    let anchor_alias = planner.aliases.short(&seed);

    let target = planner.schema.object(&anchor.object)?;
    let join_column = planner.key_column(&anchor.object, &anchor.join_key)?;
    planner.add_join(
        &anchor_alias,
        Join {
            join_type: JoinType::Left,
            table: TableRef::new(&target.data_address).with_alias(&anchor_alias),
            on: table_col(&anchor_alias, &join_column).eq(alias_ref(Some(CORE_ALIAS), key_alias)),
        },
    );

    let broken = || CompileError::UngroupedAttribute {
        attribute: attr.expression(),
    };

    if planner.needs_subquery(attr) {
        let reverse_anchor = attr.reverse_anchor().ok_or_else(broken)?;
        let idx = reverse_anchor.len() - 1;
        let rest = reverse_anchor
            .prefix(idx)
            .strip_prefix(&anchor.base)
            .ok_or_else(broken)?;
        let outer_alias = planner.join_from(&anchor_alias, &seed, &rest)?;
        let step = reverse_anchor.steps()[idx].clone();
        let inner_attr = attr.rebase(&reverse_anchor).ok_or_else(broken)?;
        let (inner_filters, _) = filters.rebase(&reverse_anchor);
        let aggregator = planner.reverse_aggregator(attr)?;
        return planner.reverse_select_from(
            &outer_alias,
            &step,
            &inner_attr,
            &inner_filters,
            &aggregator,
            attr,
        );
    }

    let rest = attr.path.strip_prefix(&anchor.base).ok_or_else(broken)?;
    let alias = planner.join_from(&anchor_alias, &seed, &rest)?;
    let value = if select.for_sorting {
        planner.sort_column_at(&alias, attr)?
    } else {
        planner.column_at(&alias, attr)?
    };
    if attr.attribute.is_binary() {
        Ok(planner.dialect.binary_to_hex(value))
    } else {
        Ok(value)
    }
}
