//! WHERE and HAVING predicates.

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{CompileError, CompileResult};
use crate::model::{DataType, RelationPath, ValueError};
use crate::query::{AttributeRef, Comparator, Filter, FilterGroup, LogicalOperator};
use crate::sql::expr::fold_logical;
use crate::sql::template::SqlFragment;
use crate::sql::{
    always, cast, func, lit_str, table_col, BinaryOperator, Expr, ExprExt, Literal, Query, SqlDialect,
};

use super::planner::Planner;

impl<'a> Planner<'a> {
    /// WHERE and HAVING conditions for `filters`.
    pub fn filter_clauses(
        &mut self,
        filters: &FilterGroup,
    ) -> CompileResult<(Option<Expr>, Option<Expr>)> {
        let (where_group, having_group) = self.split_having(filters)?;
        let where_clause = self.group_predicate(&where_group, false)?;
        let having = self.group_predicate(&having_group, true)?;
        Ok((where_clause, having))
    }

    fn is_having(&self, filter: &Filter) -> bool {
        filter.attribute.aggregator.is_some() && !self.needs_subquery(&filter.attribute)
    }

    /// Separate aggregated conditions (HAVING) from row conditions (WHERE).
    ///
    /// Only AND groups can be split; any other group must be all one or all
    /// the other.
    fn split_having(&self, group: &FilterGroup) -> CompileResult<(FilterGroup, FilterGroup)> {
        let having = |f: &Filter| self.is_having(f);
        if !group.any(&having) {
            return Ok((group.clone(), FilterGroup::and()));
        }
        if group.all(&having) {
            return Ok((FilterGroup::and(), group.clone()));
        }
        if group.operator != LogicalOperator::And {
            let attribute = group
                .all_filters()
                .into_iter()
                .find(|f| self.is_having(f))
                .map(|f| f.attribute.expression())
                .unwrap_or_default();
            return Err(CompileError::MixedAggregateGroup {
                attribute,
                operator: group.operator.to_string(),
            });
        }

        let mut rows = FilterGroup::and();
        let mut aggregated = FilterGroup::and();
        for filter in &group.filters {
            if self.is_having(filter) {
                aggregated.add_filter(filter.clone());
            } else {
                rows.add_filter(filter.clone());
            }
        }
        for nested in &group.groups {
            let (nested_rows, nested_aggregated) = self.split_having(nested)?;
            rows.add_group(nested_rows);
            aggregated.add_group(nested_aggregated);
        }
        Ok((rows, aggregated))
    }

    /// One group as an expression; `None` if it holds no conditions.
    pub fn group_predicate(
        &mut self,
        group: &FilterGroup,
        having: bool,
    ) -> CompileResult<Option<Expr>> {
        let mut parts = Vec::new();
        let mut remaining = group.clone();

        // At AND level, conditions behind the same reverse relation share one
        // IN subquery.
        if group.operator == LogicalOperator::And && !having {
            let mut anchors: IndexMap<String, RelationPath> = IndexMap::new();
            for filter in &group.filters {
                if self.needs_subquery(&filter.attribute) {
                    if let Some(anchor) = filter.attribute.reverse_anchor() {
                        anchors.entry(anchor.alias_path()).or_insert(anchor);
                    }
                }
            }
            for nested in &group.groups {
                if let Some(anchor) = self.single_anchor(nested) {
                    anchors.entry(anchor.alias_path()).or_insert(anchor);
                }
            }

            for anchor in anchors.values() {
                let (inner, outer) = remaining.rebase(anchor);
                parts.push(self.reverse_filter(anchor, &inner)?);
                remaining = outer;
            }
        }

        for filter in &remaining.filters {
            parts.push(self.filter_predicate(filter, having)?);
        }
        for nested in &remaining.groups {
            if let Some(expr) = self.group_predicate(nested, having)? {
                parts.push(expr);
            }
        }

        Ok(self.combine(remaining.operator, parts))
    }

    /// The reverse anchor every filter of `group` shares, if any.
    fn single_anchor(&self, group: &FilterGroup) -> Option<RelationPath> {
        let filters = group.all_filters();
        let first = filters.first()?;
        if !self.needs_subquery(&first.attribute) {
            return None;
        }
        let anchor = first.attribute.reverse_anchor()?;
        filters
            .iter()
            .all(|f| {
                self.needs_subquery(&f.attribute)
                    && f.attribute.reverse_anchor().as_ref() == Some(&anchor)
            })
            .then_some(anchor)
    }

    fn combine(&self, operator: LogicalOperator, parts: Vec<Expr>) -> Option<Expr> {
        match operator {
            LogicalOperator::And => fold_logical(BinaryOperator::And, parts),
            LogicalOperator::Or => fold_logical(BinaryOperator::Or, parts),
            LogicalOperator::Not => fold_logical(BinaryOperator::And, parts).map(ExprExt::not),
            LogicalOperator::Xor if self.dialect.supports_xor() => {
                fold_logical(BinaryOperator::Xor, parts)
            }
            LogicalOperator::Xor => parts.into_iter().reduce(|left, right| {
                left.clone()
                    .and(right.clone().not())
                    .or(left.not().and(right))
            }),
        }
    }

    /// `outer.key IN (SELECT related_key FROM target ... )` for conditions
    /// rebased onto the end of `anchor`.
    pub fn reverse_filter(
        &mut self,
        anchor: &RelationPath,
        inner: &FilterGroup,
    ) -> CompileResult<Expr> {
        let idx = anchor.len() - 1;
        let step = anchor.steps()[idx].clone();
        let outer_alias = self.table_alias(&anchor.prefix(idx))?;
        let key = self.key_column(&step.source_object, &step.key_attribute)?;
        let outer_key = self.qualified(&outer_alias, &key);

        let mut child = self.child(&step.target_object)?;
        let related_key = child.key_column(&step.target_object, &step.related_key_attribute)?;
        let fk = table_col(&child.main_alias, &related_key);
        let (where_clause, having) = child.filter_clauses(inner)?;

        let mut query = Query::new()
            .select(vec![fk.clone()])
            .from(child.main_table());
        query.joins = child.take_joins();
        query.where_clause = where_clause;
        if having.is_some() {
            query.group_by = vec![fk];
            query.having = having;
        }

        Ok(outer_key.in_subquery(query))
    }

    /// A single condition.
    fn filter_predicate(&mut self, filter: &Filter, having: bool) -> CompileResult<Expr> {
        let attr = &filter.attribute;
        if self.needs_subquery(attr) {
            let anchor = attr
                .reverse_anchor()
                .ok_or_else(|| CompileError::MissingAggregator {
                    attribute: attr.alias_path.clone(),
                })?;
            let (inner, _) = FilterGroup::and()
                .with_filter(filter.clone())
                .rebase(&anchor);
            return self.reverse_filter(&anchor, &inner);
        }

        let alias = self.table_alias(&attr.path)?;

        if !having {
            if let Some(sql) = attr.attribute.where_sql(self.dialect) {
                let value = self.value_fragment(filter)?;
                return self.render(sql, attr, &alias, Some(value));
            }
        }

        let subject = self.column_at(&alias, attr)?;
        let (subject, data_type) = match (&attr.aggregator, having) {
            (Some(aggregator), true) => (
                self.aggregate(subject, aggregator, attr)?,
                aggregator.result_type(attr.attribute.data_type),
            ),
            _ => (subject, attr.attribute.data_type),
        };
        self.compare(subject, filter, data_type)
    }

    /// `subject <comparator> value` with the value parsed as `data_type`.
    pub fn compare(
        &self,
        subject: Expr,
        filter: &Filter,
        data_type: DataType,
    ) -> CompileResult<Expr> {
        let attr = &filter.attribute;
        let strict_keys = attr.is_relation || (attr.is_uid && attr.aggregator.is_none());
        let comparator = if strict_keys {
            filter.comparator.strict()
        } else {
            filter.comparator
        };
        let tz = self.options.time_zone;
        let invalid = |e: ValueError| CompileError::InvalidValue {
            attribute: attr.expression(),
            value: e.value,
            data_type: e.data_type,
        };

        if filter.value.is_null() && !comparator.is_list() && !comparator.is_range() {
            return Ok(if comparator.is_negative() {
                subject.is_not_null()
            } else {
                subject.is_null()
            });
        }

        match comparator {
            Comparator::In | Comparator::NotIn => {
                let members: Result<Vec<Literal>, ValueError> = filter
                    .list_members()
                    .iter()
                    .map(|m| data_type.parse_str(m, tz))
                    .collect();
                match members {
                    Ok(members) if !members.is_empty() => {
                        let members = members.into_iter().map(Expr::Literal).collect();
                        Ok(if comparator == Comparator::In {
                            subject.in_list(members)
                        } else {
                            subject.not_in_list(members)
                        })
                    }
                    Ok(_) => {
                        warn!(attribute = %attr.expression(), "empty IN list matches nothing");
                        Ok(always(false))
                    }
                    Err(e) => {
                        warn!(attribute = %attr.expression(), value = %e.value, "IN list member does not parse, condition matches nothing");
                        Ok(always(false))
                    }
                }
            }
            Comparator::Between => {
                let (low, high) = filter.range_bounds().ok_or_else(|| {
                    CompileError::InvalidValue {
                        attribute: attr.expression(),
                        value: filter.value_text(),
                        data_type,
                    }
                })?;
                let low = data_type.parse_str(&low, tz).map_err(invalid)?;
                let high = data_type.parse_str(&high, tz).map_err(invalid)?;
                Ok(subject.between(low, high))
            }
            Comparator::Is | Comparator::IsNot => {
                let parsed = if data_type.has_exact_equality() {
                    data_type.parse(&filter.value, tz).ok()
                } else {
                    None
                };
                Ok(match (parsed, comparator == Comparator::Is) {
                    (Some(value), true) => subject.eq(value),
                    (Some(value), false) => subject.ne(value),
                    (None, positive) => {
                        let pattern = format!("%{}%", filter.value_text().to_lowercase());
                        let text = if data_type == DataType::String {
                            subject
                        } else {
                            cast(subject, self.dialect.text_type())
                        };
                        let lowered = func("LOWER", vec![text]);
                        if positive {
                            lowered.like(lit_str(&pattern))
                        } else {
                            lowered.not_like(lit_str(&pattern))
                        }
                    }
                })
            }
            _ => {
                let value = data_type.parse(&filter.value, tz).map_err(invalid)?;
                Ok(match comparator {
                    Comparator::Equals => subject.eq(value),
                    Comparator::EqualsNot => subject.ne(value),
                    Comparator::LessThan => subject.lt(value),
                    Comparator::LessThanOrEquals => subject.lte(value),
                    Comparator::GreaterThan => subject.gt(value),
                    _ => subject.gte(value),
                })
            }
        }
    }

    /// `[#value#]` for a WHERE template.
    fn value_fragment(&self, filter: &Filter) -> CompileResult<SqlFragment> {
        let attr = &filter.attribute;
        let data_type = attr.attribute.data_type;
        let tz = self.options.time_zone;
        let invalid = |e: ValueError| CompileError::InvalidValue {
            attribute: attr.expression(),
            value: e.value,
            data_type: e.data_type,
        };

        if filter.comparator.is_list() {
            let members = filter
                .list_members()
                .iter()
                .map(|m| {
                    data_type
                        .parse_str(m, tz)
                        .map(|lit| SqlFragment::literal(&lit, self.dialect))
                        .map_err(invalid)
                })
                .collect::<CompileResult<Vec<_>>>()?;
            return Ok(SqlFragment::join(&members, ", "));
        }

        let literal = data_type.parse(&filter.value, tz).map_err(invalid)?;
        Ok(SqlFragment::literal(&literal, self.dialect))
    }
}

/// Attribute key of a strict comparison, used by grouping to spot
/// conditions that pin a key to a single value.
pub(crate) fn pinned_key(filter: &Filter) -> Option<&AttributeRef> {
    let attr = &filter.attribute;
    let pins = matches!(filter.comparator, Comparator::Is | Comparator::Equals)
        && !filter.apply_after_read
        && (attr.is_uid || attr.is_relation)
        && attr.aggregator.is_none()
        && !attr.has_reverse()
        && !filter.value.is_null()
        && !filter.value.is_array()
        && !filter.value.is_object();
    pins.then_some(attr)
}
