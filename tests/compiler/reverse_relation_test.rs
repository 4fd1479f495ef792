#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, builder, flat, shop};
use relsql::query::Comparator;
use relsql::sql::Dialect;
use relsql::CompileError;
use serde_json::json;

#[test]
fn test_reverse_aggregate_is_a_correlated_subquery() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("NO").unwrap();
    query.add_select("POSITION__QTY:SUM").unwrap();

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT \"ORDER0\".order_no AS \"NO\", \
         COALESCE((SELECT SUM(\"POSITION0_1\".qty) FROM order_pos AS \"POSITION0_1\" \
         WHERE \"POSITION0_1\".order_id = \"ORDER0\".id GROUP BY \"POSITION0_1\".order_id), 0) \
         AS \"S001_POSITION__QTY_SUM\" \
         FROM orders AS \"ORDER0\""
    );
    assert_parses(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_default_aggregator_applies_behind_reverse_relation() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("POSITION__QTY").unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(sql.contains("SUM(\"POSITION0_1\".qty)"), "{}", sql);
    assert!(sql.contains("AS \"POSITION__QTY\""), "{}", sql);
}

#[test]
fn test_reverse_attribute_without_aggregator_is_rejected() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("POSITION__NOTE").unwrap();

    let err = query.compile_read().unwrap_err();

    assert_eq!(
        err,
        CompileError::MissingAggregator {
            attribute: "POSITION__NOTE".into()
        }
    );
}

#[test]
fn test_reverse_filter_becomes_in_subquery() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("NO").unwrap();
    query
        .add_filter("POSITION__PRODUCT__NAME", Comparator::Is, json!("bolt"))
        .unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(
        sql.ends_with(
            "WHERE \"ORDER0\".id IN (SELECT \"POSITION0_1\".order_id FROM order_pos AS \"POSITION0_1\" \
             LEFT JOIN product AS \"POSITIONPRODUCT0_1\" ON \"POSITION0_1\".product_id = \"POSITIONPRODUCT0_1\".id \
             WHERE LOWER(\"POSITIONPRODUCT0_1\".name) LIKE '%bolt%')"
        ),
        "{}",
        sql
    );
    assert_parses(&sql, Dialect::Postgres);
}

#[test]
fn test_conditions_on_one_reverse_relation_share_a_subquery() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("NO").unwrap();
    query.add_filter("POSITION__QTY", Comparator::GreaterThan, json!(5)).unwrap();
    query.add_filter("POSITION__NOTE", Comparator::Equals, json!("gift")).unwrap();
    query.add_filter("STATUS", Comparator::Equals, json!(1)).unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert_eq!(sql.matches("IN (SELECT").count(), 1, "{}", sql);
    assert!(
        sql.contains("`POSITION0_1`.qty > 5 AND `POSITION0_1`.note = 'gift'"),
        "{}",
        sql
    );
    assert!(sql.ends_with("AND `ORDER0`.status = 1"), "{}", sql);
    assert_parses(&sql, Dialect::MySql);
}

#[test]
fn test_aggregated_reverse_filter_groups_the_subquery() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("NO").unwrap();
    query
        .add_filter("POSITION__QTY:SUM", Comparator::GreaterThan, json!(10))
        .unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(
        sql.ends_with(
            "WHERE \"ORDER0\".id IN (SELECT \"POSITION0_1\".order_id FROM order_pos AS \"POSITION0_1\" \
             GROUP BY \"POSITION0_1\".order_id HAVING SUM(\"POSITION0_1\".qty) > 10)"
        ),
        "{}",
        sql
    );
}

#[test]
fn test_reverse_subquery_respects_filters_on_the_same_relation() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("POSITION__QTY:SUM").unwrap();
    query
        .add_filter("POSITION__PRODUCT__NAME", Comparator::Is, json!("bolt"))
        .unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    // Once inside the aggregate, once in the IN restriction.
    assert_eq!(sql.matches("LIKE '%bolt%'").count(), 2, "{}", sql);
    assert_parses(&sql, Dialect::Postgres);
}

#[test]
fn test_reverse_relation_behind_forward_relation() {
    let schema = shop();
    let mut query = builder(&schema, "POSITION", Dialect::Postgres);
    query.add_select("ID").unwrap();
    query.add_select("ORDER__POSITION__ID:COUNT").unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(
        sql.contains("WHERE \"POSITION0_1\".order_id = \"POSITIONORDER0\".id"),
        "{}",
        sql
    );
    assert!(
        sql.contains("LEFT JOIN orders AS \"POSITIONORDER0\" ON \"POSITION0\".order_id = \"POSITIONORDER0\".id"),
        "{}",
        sql
    );
    assert_parses(&sql, Dialect::Postgres);
}

#[test]
fn test_reverse_list_per_dialect() {
    let schema = shop();

    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("POSITION__NOTE:LIST").unwrap();
    let sql = flat(&query.compile_read().unwrap().sql);
    assert!(sql.contains("GROUP_CONCAT("), "{}", sql);

    let mut query = builder(&schema, "ORDER", Dialect::MsSql2012);
    query.add_select("POSITION__NOTE:LIST").unwrap();
    let sql = flat(&query.compile_read().unwrap().sql);
    assert!(sql.contains("FOR XML PATH(''), TYPE).value('.', 'NVARCHAR(MAX)')"), "{}", sql);

    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("POSITION__NOTE:LIST_DISTINCT").unwrap();
    let sql = flat(&query.compile_read().unwrap().sql);
    assert!(sql.contains("STRING_AGG(DISTINCT"), "{}", sql);
}
