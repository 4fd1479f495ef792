//! Select expressions: plain columns, aggregates and reverse-relation
//! subqueries.

use crate::error::{CompileError, CompileResult};
use crate::model::RelationStep;
use crate::query::{Aggregator, AttributeRef, FilterGroup, Select};
use crate::sql::{
    cast, func, func_distinct, lit_int, lit_str, table_col, Expr, ExprExt, Query, SqlDialect,
};

use super::planner::Planner;

impl<'a> Planner<'a> {
    /// `expr` aggregated with `aggregator`.
    pub fn aggregate(
        &self,
        expr: Expr,
        aggregator: &Aggregator,
        attr: &AttributeRef,
    ) -> CompileResult<Expr> {
        match aggregator {
            Aggregator::CountDistinct => Ok(func_distinct("COUNT", vec![expr])),
            Aggregator::List { delimiter } | Aggregator::ListDistinct { delimiter } => self
                .dialect
                .list_aggregate(expr, aggregator.is_distinct(), delimiter)
                .ok_or_else(|| self.unsupported(aggregator, attr)),
            other => Ok(func(other.function_name(), vec![expr])),
        }
    }

    fn unsupported(&self, aggregator: &Aggregator, attr: &AttributeRef) -> CompileError {
        CompileError::UnsupportedAggregator {
            attribute: attr.alias_path.clone(),
            aggregator: aggregator.to_string(),
            dialect: self.dialect,
        }
    }

    /// Aggregator of a reverse attribute: explicit, else its default.
    pub fn reverse_aggregator(&self, attr: &AttributeRef) -> CompileResult<Aggregator> {
        attr.aggregator
            .clone()
            .or_else(|| attr.attribute.default_aggregator.clone())
            .ok_or_else(|| CompileError::MissingAggregator {
                attribute: attr.alias_path.clone(),
            })
    }

    /// Value of a select in a query where the main object is not grouped.
    pub fn select_value(&mut self, select: &Select, filters: &FilterGroup) -> CompileResult<Expr> {
        let attr = &select.attribute;
        if self.needs_subquery(attr) {
            let aggregator = self.reverse_aggregator(attr)?;
            return self.reverse_select(attr, &aggregator, filters);
        }

        let alias = self.table_alias(&attr.path)?;
        let value = if select.for_sorting {
            self.sort_column_at(&alias, attr)?
        } else {
            self.column_at(&alias, attr)?
        };
        match &attr.aggregator {
            Some(aggregator) => self.aggregate(value, aggregator, attr),
            None if attr.attribute.is_binary() => Ok(self.dialect.binary_to_hex(value)),
            None => Ok(value),
        }
    }

    /// Correlated subquery aggregating `attr` over its first reverse
    /// relation, seen from the main table.
    pub fn reverse_select(
        &mut self,
        attr: &AttributeRef,
        aggregator: &Aggregator,
        filters: &FilterGroup,
    ) -> CompileResult<Expr> {
        let anchor = attr
            .reverse_anchor()
            .ok_or_else(|| CompileError::MissingAggregator {
                attribute: attr.alias_path.clone(),
            })?;
        let idx = anchor.len() - 1;
        let outer_alias = self.table_alias(&anchor.prefix(idx))?;
        let step = anchor.steps()[idx].clone();
        let inner_attr = attr.rebase(&anchor).ok_or_else(|| CompileError::MissingAggregator {
            attribute: attr.alias_path.clone(),
        })?;
        let (inner_filters, _) = filters.rebase(&anchor);

        self.reverse_select_from(&outer_alias, &step, &inner_attr, &inner_filters, aggregator, attr)
    }

    /// Correlated subquery over `step`, keyed on the table aliased
    /// `outer_alias`.
    ///
    /// The subquery copies every condition on the same reverse relation, so
    /// the aggregate only covers the related rows that pass the outer filters.
    pub fn reverse_select_from(
        &mut self,
        outer_alias: &str,
        step: &RelationStep,
        inner_attr: &AttributeRef,
        inner_filters: &FilterGroup,
        aggregator: &Aggregator,
        attr: &AttributeRef,
    ) -> CompileResult<Expr> {
        let key = self.key_column(&step.source_object, &step.key_attribute)?;
        let outer_key = self.qualified(outer_alias, &key);

        let mut child = self.child(&step.target_object)?;
        let related_key = child.key_column(&step.target_object, &step.related_key_attribute)?;
        let fk = table_col(&child.main_alias, &related_key);
        let value = child.column(inner_attr)?;
        let (where_clause, having) = child.filter_clauses(inner_filters)?;

        let mut query = Query::new().from(child.main_table());
        query.where_clause = Some(match where_clause {
            Some(condition) => fk.clone().eq(outer_key).and(condition),
            None => fk.clone().eq(outer_key),
        });

        let xml_list = aggregator.is_list()
            && self.dialect.supports_xml_path_concat()
            && self
                .dialect
                .list_aggregate(value.clone(), aggregator.is_distinct(), "")
                .is_none();

        if xml_list {
            // STUFF((SELECT ', ' + CAST(x AS NVARCHAR(MAX)) ... FOR XML PATH(''), TYPE).value('.', 'NVARCHAR(MAX)'), 1, 2, '')
            let delimiter = aggregator.delimiter().unwrap_or_default();
            let item = lit_str(delimiter).concat(cast(value, "NVARCHAR(MAX)"));
            query.select = vec![item.into()];
            query.distinct = aggregator.is_distinct();
            query.joins = child.take_joins();
            query.having = having;
            query.for_xml_path = true;
            return Ok(func(
                "STUFF",
                vec![
                    Expr::XmlText(Box::new(query)),
                    lit_int(1),
                    lit_int(delimiter.chars().count() as i64),
                    lit_str(""),
                ],
            ));
        }

        let aggregated = child
            .aggregate(value, aggregator, inner_attr)
            .map_err(|_| self.unsupported(aggregator, attr))?;
        query.select = vec![aggregated.into()];
        query.joins = child.take_joins();
        query.group_by = vec![fk];
        query.having = having;

        let subquery = Expr::Subquery(Box::new(query));
        if aggregator.result_type(attr.attribute.data_type).is_numeric() {
            Ok(self.dialect.null_check(subquery, lit_int(0)))
        } else {
            Ok(subquery)
        }
    }
}
