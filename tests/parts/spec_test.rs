#[path = "../common/mod.rs"]
mod common;

use common::{flat, row, shop};
use relsql::query::{ColumnSpec, Comparator, LogicalOperator, QuerySpec};
use relsql::sql::{Dialect, SortDir};
use relsql::{CompileError, CompileOptions, QueryBuilder};
use serde_json::json;

#[test]
fn test_parse_full_query() {
    let spec = QuerySpec::from_json(
        r#"{
        "object": "ORDER",
        "columns": ["NO", {"attribute": "CUSTOMER__NAME", "alias": "CUSTOMER_NAME"}],
        "filters": {
            "operator": "AND",
            "conditions": [{"attribute": "STATUS", "comparator": "==", "value": 1}],
            "groups": [{
                "operator": "OR",
                "conditions": [
                    {"attribute": "TOTAL", "comparator": ">", "value": 100},
                    {"attribute": "NO", "value": "rush", "apply_after_read": true}
                ]
            }]
        },
        "sorters": [{"attribute": "TOTAL", "direction": "desc"}],
        "limit": 20,
        "offset": 40
    }"#,
    )
    .unwrap();

    assert_eq!(spec.columns.len(), 2);
    assert_eq!(spec.columns[0], ColumnSpec::Attribute("NO".into()));
    assert_eq!(spec.columns[1].column_key(), "CUSTOMER_NAME");
    assert!(!spec.columns[1].hidden());

    let filters = spec.filters.as_ref().unwrap();
    assert_eq!(filters.conditions[0].comparator, Comparator::Equals);
    assert_eq!(filters.groups[0].operator, LogicalOperator::Or);
    // Comparator defaults to IS.
    assert_eq!(filters.groups[0].conditions[1].comparator, Comparator::Is);
    assert!(filters.groups[0].conditions[1].apply_after_read);

    assert_eq!(spec.sorters[0].direction, SortDir::Desc);
    assert_eq!((spec.limit, spec.offset), (Some(20), Some(40)));
}

#[test]
fn test_unknown_comparator_is_a_parse_error() {
    let result = QuerySpec::from_json(
        r#"{"object": "ORDER", "filters": {"conditions": [{"attribute": "NO", "comparator": "~~"}]}}"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_spec_compiles_like_the_builder() {
    let schema = shop();
    let spec = QuerySpec::from_json(
        r#"{
        "object": "ORDER",
        "columns": [
            "NO",
            {"attribute": "CUSTOMER__NAME", "alias": "CUSTOMER_NAME"}
        ],
        "filters": {
            "operator": "OR",
            "conditions": [
                {"attribute": "STATUS", "comparator": "==", "value": 1},
                {"attribute": "STATUS", "comparator": "[", "value": [3, 4]}
            ]
        },
        "sorters": [{"attribute": "TOTAL", "direction": "DESC"}],
        "limit": 20,
        "offset": 40
    }"#,
    )
    .unwrap();

    let query = QueryBuilder::from_spec(&schema, &spec, CompileOptions::new(Dialect::Postgres)).unwrap();
    let compiled = query.compile_read().unwrap();
    let sql = flat(&compiled.sql);

    assert!(sql.contains("\"ORDERCUSTOMER0\".name AS \"CUSTOMER_NAME\""), "{}", sql);
    assert!(
        sql.contains("WHERE \"ORDER0\".status = 1 OR \"ORDER0\".status IN (3, 4)"),
        "{}",
        sql
    );
    assert!(sql.ends_with("ORDER BY \"TOTAL\" DESC LIMIT 21 OFFSET 40"), "{}", sql);

    let page = compiled.decode(vec![row(json!({"NO": "A1", "CUSTOMER_NAME": "Acme", "TOTAL": 3}))]);
    assert_eq!(page.rows, vec![row(json!({"NO": "A1", "CUSTOMER_NAME": "Acme"}))]);
}

#[test]
fn test_hidden_columns_are_read_but_not_returned() {
    let schema = shop();
    let spec = QuerySpec::from_json(
        r#"{"object": "ORDER", "columns": ["NO", {"attribute": "ID", "hidden": true}]}"#,
    )
    .unwrap();

    let query = QueryBuilder::from_spec(&schema, &spec, CompileOptions::new(Dialect::MySql)).unwrap();
    let compiled = query.compile_read().unwrap();

    assert!(flat(&compiled.sql).contains("`ORDER0`.id AS `ID`"));
    let page = compiled.decode(vec![row(json!({"NO": "A1", "ID": 1}))]);
    assert_eq!(page.rows, vec![row(json!({"NO": "A1"}))]);
}

#[test]
fn test_aggregations_from_spec() {
    let schema = shop();
    let spec = QuerySpec::from_json(
        r#"{"object": "ORDER", "columns": ["CUSTOMER", "TOTAL:SUM"], "aggregations": ["CUSTOMER"]}"#,
    )
    .unwrap();

    let query = QueryBuilder::from_spec(&schema, &spec, CompileOptions::new(Dialect::Postgres)).unwrap();

    assert_eq!(
        flat(&query.compile_read().unwrap().sql),
        "SELECT \"ORDER0\".customer_id AS \"CUSTOMER\", SUM(\"ORDER0\".total) AS \"S001_TOTAL_SUM\" \
         FROM orders AS \"ORDER0\" GROUP BY \"ORDER0\".customer_id"
    );
}

#[test]
fn test_values_with_uids_from_spec() {
    let schema = shop();
    let spec = QuerySpec::from_json(
        r#"{
        "object": "ORDER",
        "values": [{"attribute": "TOTAL", "values": [5, 6], "uids": [1, 2]}]
    }"#,
    )
    .unwrap();

    let query = QueryBuilder::from_spec(&schema, &spec, CompileOptions::new(Dialect::MySql)).unwrap();
    let plan = query.compile_update().unwrap();

    let sqls: Vec<String> = plan.statements.iter().map(|s| flat(&s.sql)).collect();
    assert_eq!(
        sqls,
        vec![
            "UPDATE orders SET total = 5 WHERE id = 1",
            "UPDATE orders SET total = 6 WHERE id = 2",
        ]
    );
}

#[test]
fn test_distinct_from_spec() {
    let schema = shop();
    let spec = QuerySpec::from_json(r#"{"object": "ORDER", "columns": ["STATUS"], "distinct": true}"#).unwrap();

    let query = QueryBuilder::from_spec(&schema, &spec, CompileOptions::new(Dialect::Postgres)).unwrap();

    assert!(flat(&query.compile_read().unwrap().sql).starts_with("SELECT DISTINCT"));
}

#[test]
fn test_unknown_names_fail_when_building() {
    let schema = shop();

    let spec = QuerySpec::from_json(r#"{"object": "INVOICE"}"#).unwrap();
    assert_eq!(
        QueryBuilder::from_spec(&schema, &spec, CompileOptions::new(Dialect::MySql)).unwrap_err(),
        CompileError::UnknownObject("INVOICE".into())
    );

    let spec = QuerySpec::from_json(r#"{"object": "ORDER", "columns": ["CUSTOMER__PHONE"]}"#).unwrap();
    assert!(matches!(
        QueryBuilder::from_spec(&schema, &spec, CompileOptions::new(Dialect::MySql)),
        Err(CompileError::UnknownAttribute { .. })
    ));
}
