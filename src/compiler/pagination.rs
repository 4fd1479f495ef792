//! Row limits per dialect.

use crate::sql::expr::row_number;
use crate::sql::{
    alias_ref, lit_int, raw_sql, star, table_star, Dialect, Expr, ExprExt, OrderByExpr,
    Pagination, Query, SelectExpr, SqlDialect, TableRef,
};

use super::{PAGE_QUERY, ROW_NUMBER_ALIAS, ROW_NUMBER_QUERY};

/// Restrict `query` to `fetch` rows after skipping `offset`.
///
/// Wrapping strategies move the ORDER BY into the numbering and sort the
/// outer query by the row number instead.
pub(crate) fn paginate(query: Query, dialect: Dialect, fetch: u64, offset: u64) -> Query {
    match dialect.pagination() {
        Pagination::LimitOffset | Pagination::OffsetFetch => {
            query.limit_offset(Some(fetch), Some(offset))
        }
        Pagination::RowNumber => {
            let mut query = query;
            let order_by = std::mem::take(&mut query.order_by)
                .into_iter()
                .map(|o| OrderByExpr::new(requalify(o.expr), o.dir))
                .collect();
            let numbered = Query::new()
                .select(vec![
                    SelectExpr::new(table_star(ROW_NUMBER_QUERY)),
                    row_number(order_by).alias(ROW_NUMBER_ALIAS),
                ])
                .from(TableRef::subquery(query).with_alias(ROW_NUMBER_QUERY));
            outer(numbered, fetch, offset)
        }
        Pagination::RowNum => {
            let numbered = Query::new()
                .select(vec![
                    SelectExpr::new(table_star(ROW_NUMBER_QUERY)),
                    raw_sql("ROWNUM").alias(ROW_NUMBER_ALIAS),
                ])
                .from(TableRef::subquery(query).with_alias(ROW_NUMBER_QUERY))
                .filter(raw_sql("ROWNUM").lte(bound(offset.saturating_add(fetch))));
            outer(numbered, fetch, offset)
        }
    }
}

fn outer(numbered: Query, fetch: u64, offset: u64) -> Query {
    Query::new()
        .select(vec![star()])
        .from(TableRef::subquery(numbered).with_alias(PAGE_QUERY))
        .filter(alias_ref(None, ROW_NUMBER_ALIAS).between(
            bound(offset.saturating_add(1)),
            bound(offset.saturating_add(fetch)),
        ))
        .order_by(vec![OrderByExpr::asc(alias_ref(None, ROW_NUMBER_ALIAS))])
}

fn bound(n: u64) -> Expr {
    lit_int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Sort keys are output aliases; inside the numbering they belong to the
/// wrapped query.
fn requalify(expr: Expr) -> Expr {
    match expr {
        Expr::Alias { table: None, name } => alias_ref(Some(ROW_NUMBER_QUERY), &name),
        other => other,
    }
}
