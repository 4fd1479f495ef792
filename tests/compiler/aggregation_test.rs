#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, builder, flat, shop};
use relsql::query::{Comparator, Filter, FilterGroup, LogicalOperator};
use relsql::sql::Dialect;
use relsql::CompileError;
use serde_json::json;

#[test]
fn test_group_by_foreign_key() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("CUSTOMER").unwrap();
    query.add_select("TOTAL:SUM").unwrap();
    query.add_aggregation("CUSTOMER").unwrap();

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT \"ORDER0\".customer_id AS \"CUSTOMER\", SUM(\"ORDER0\".total) AS \"S001_TOTAL_SUM\" \
         FROM orders AS \"ORDER0\" GROUP BY \"ORDER0\".customer_id"
    );
    assert_parses(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_related_columns_are_joined_onto_the_grouped_core() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("CUSTOMER").unwrap();
    query.add_select("CUSTOMER__NAME").unwrap();
    query.add_select("TOTAL:SUM").unwrap();
    query.add_aggregation("CUSTOMER").unwrap();

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT \"EXFCOREQ\".*, \"EXFCOREQCUSTOMER\".name AS \"CUSTOMER__NAME\" \
         FROM (SELECT \"ORDER0\".customer_id AS \"CUSTOMER\", SUM(\"ORDER0\".total) AS \"S001_TOTAL_SUM\" \
         FROM orders AS \"ORDER0\" GROUP BY \"ORDER0\".customer_id) AS \"EXFCOREQ\" \
         LEFT JOIN customer AS \"EXFCOREQCUSTOMER\" ON \"EXFCOREQCUSTOMER\".id = \"EXFCOREQ\".\"CUSTOMER\""
    );
    assert_parses(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_ungrouped_attribute_is_rejected() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("NO").unwrap();
    query.add_aggregation("CUSTOMER").unwrap();

    let err = query.compile_read().unwrap_err();

    assert_eq!(
        err,
        CompileError::UngroupedAttribute {
            attribute: "NO".into()
        }
    );
}

#[test]
fn test_uid_pinned_by_filter_becomes_a_group_key() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("STATUS").unwrap();
    query.add_select("NO").unwrap();
    query.add_aggregation("STATUS").unwrap();
    query.add_filter("ID", Comparator::Equals, json!(5)).unwrap();

    let compiled = query.compile_read().unwrap();
    let sql = flat(&compiled.sql);

    assert!(sql.contains("GROUP BY \"ORDER0\".status, \"ORDER0\".id"), "{}", sql);
    assert!(sql.contains("WHERE \"ORDER0\".id = 5"), "{}", sql);
    assert!(compiled.passes > 1);
    assert_parses(&sql, Dialect::Postgres);
}

#[test]
fn test_reverse_aggregate_keyed_by_group_uid() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("ID").unwrap();
    query.add_select("POSITION__QTY:SUM").unwrap();
    query.add_aggregation("ID").unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(sql.contains("(SELECT SUM(\"POSITION0_1\".qty) FROM order_pos AS \"POSITION0_1\""), "{}", sql);
    assert!(sql.ends_with("GROUP BY \"ORDER0\".id"), "{}", sql);
    assert_parses(&sql, Dialect::Postgres);
}

#[test]
fn test_having_for_aggregated_condition() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("CUSTOMER").unwrap();
    query.add_aggregation("CUSTOMER").unwrap();
    query.add_filter("STATUS", Comparator::Equals, json!(2)).unwrap();
    query
        .add_filter("TOTAL:SUM", Comparator::GreaterThan, json!(100))
        .unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(
        sql.ends_with(
            "WHERE `ORDER0`.status = 2 GROUP BY `ORDER0`.customer_id HAVING SUM(`ORDER0`.total) > 100"
        ),
        "{}",
        sql
    );
}

#[test]
fn test_or_group_mixing_having_and_where_is_rejected() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("CUSTOMER").unwrap();
    query.add_aggregation("CUSTOMER").unwrap();
    query.set_filters(
        FilterGroup::new(LogicalOperator::Or)
            .with_filter(Filter::new(
                query.resolve("TOTAL:SUM").unwrap(),
                Comparator::GreaterThan,
                json!(100),
            ))
            .with_filter(Filter::new(
                query.resolve("STATUS").unwrap(),
                Comparator::Equals,
                json!(2),
            )),
    );

    let err = query.compile_read().unwrap_err();

    assert!(matches!(err, CompileError::MixedAggregateGroup { .. }), "{:?}", err);
}

#[test]
fn test_list_over_forward_relation_groups_by_uid() {
    let schema = shop();
    let mut query = builder(&schema, "POSITION", Dialect::MySql);
    query.add_select("ORDER__NO:LIST").unwrap();

    let compiled = query.compile_read().unwrap();
    let sql = flat(&compiled.sql);

    assert!(sql.contains("GROUP_CONCAT("), "{}", sql);
    assert!(sql.ends_with("GROUP BY `POSITION0`.id"), "{}", sql);
    assert!(compiled.columns.iter().any(|c| c.key == "ID" && c.hidden));
}

#[test]
fn test_unsupported_aggregator_names_the_dialect() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Hana);
    query.add_select("POSITION__NOTE:LIST_DISTINCT").unwrap();

    let err = query.compile_read().unwrap_err();

    match err {
        CompileError::UnsupportedAggregator { dialect, .. } => assert_eq!(dialect, Dialect::Hana),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_count_wraps_the_grouped_query() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("CUSTOMER").unwrap();
    query.add_aggregation("CUSTOMER").unwrap();
    query.set_limit(Some(10), 30);

    let sql = flat(&query.compile_count().unwrap().sql);

    assert_eq!(
        sql,
        "SELECT COUNT(*) AS \"EXFCNT\" FROM (SELECT \"ORDER0\".customer_id AS \"CUSTOMER\" \
         FROM orders AS \"ORDER0\" GROUP BY \"ORDER0\".customer_id) AS \"EXFCNTQ\""
    );
}
