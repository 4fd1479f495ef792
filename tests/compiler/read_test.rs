#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, builder, flat, row, shop, RecordingConnector};
use relsql::connector::ExecResult;
use relsql::crud;
use relsql::query::Comparator;
use relsql::sql::{Dialect, SortDir};
use relsql::{CompileError, Schema};
use serde_json::json;

#[test]
fn test_forward_relation_is_joined() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("NO").unwrap();
    query.add_select("CUSTOMER__NAME").unwrap();

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT \"ORDER0\".order_no AS \"NO\", \"ORDERCUSTOMER0\".name AS \"CUSTOMER__NAME\" \
         FROM orders AS \"ORDER0\" \
         LEFT JOIN customer AS \"ORDERCUSTOMER0\" ON \"ORDER0\".customer_id = \"ORDERCUSTOMER0\".id"
    );
    assert_eq!(compiled.passes, 1);
    assert_parses(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_shared_path_prefix_is_joined_once() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("CUSTOMER__NAME").unwrap();
    query.add_select("CUSTOMER__COUNTRY__NAME").unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert_eq!(sql.matches("LEFT JOIN customer").count(), 1, "{}", sql);
    assert_eq!(sql.matches("LEFT JOIN country").count(), 1, "{}", sql);
    assert!(sql.contains("AS `CUSTOMER__COUNTRY__NAME`"), "{}", sql);
    assert_parses(&sql, Dialect::MySql);
}

#[test]
fn test_read_without_columns_selects_every_attribute() {
    let schema = shop();
    let query = builder(&schema, "COUNTRY", Dialect::MySql);

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT `COUNTRY0`.id AS `ID`, `COUNTRY0`.name AS `NAME` FROM country AS `COUNTRY0`"
    );
    assert_eq!(compiled.passes, 2);
}

#[test]
fn test_sorted_page_on_postgres() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("NO").unwrap();
    query.add_sorter("TOTAL", SortDir::Desc).unwrap();
    query.set_limit(Some(10), 20);

    let sql = flat(&query.compile_read().unwrap().sql);

    assert_eq!(
        sql,
        "SELECT \"ORDER0\".order_no AS \"NO\", \"ORDER0\".total AS \"TOTAL\" \
         FROM orders AS \"ORDER0\" ORDER BY \"TOTAL\" DESC LIMIT 11 OFFSET 20"
    );
}

#[test]
fn test_page_decoding_drops_sort_helpers_and_reports_more_rows() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select("NO").unwrap();
    query.add_sorter("TOTAL", SortDir::Desc).unwrap();
    query.set_limit(Some(2), 0);

    let rows = (1..=3)
        .map(|n| row(json!({"NO": format!("A{}", n), "TOTAL": 10 - n})))
        .collect();
    let mut connector = RecordingConnector::new().respond(ExecResult::rows(rows));

    let page = crud::read(&mut connector, &query).unwrap();

    assert!(page.has_more);
    assert_eq!(page.rows, vec![row(json!({"NO": "A1"})), row(json!({"NO": "A2"}))]);
    assert_eq!(connector.statements.len(), 1);
}

#[test]
fn test_custom_select_template_with_dialect_override() {
    let schema = Schema::from_json(
        r#"{
        "objects": {
            "CUSTOMER": {
                "data_address": "customer",
                "uid": "ID",
                "attributes": {
                    "ID": {"data_address": "id", "data_type": "integer"},
                    "LABEL": {
                        "data_address": "name",
                        "custom": {"select": "UPPER([#alias#].name)"},
                        "overrides": {"mssql2012": {"select": "UPPER([#alias#].name) COLLATE Latin1_General_CI_AS"}}
                    }
                }
            }
        }
    }"#,
    )
    .unwrap();

    let mut query = builder(&schema, "CUSTOMER", Dialect::Postgres);
    query.add_select("LABEL").unwrap();
    let sql = flat(&query.compile_read().unwrap().sql);
    assert!(sql.starts_with("SELECT UPPER(\"CUSTOMER0\".name) AS \"LABEL\""), "{}", sql);

    let mut query = builder(&schema, "CUSTOMER", Dialect::MsSql2012);
    query.add_select("LABEL").unwrap();
    let sql = flat(&query.compile_read().unwrap().sql);
    assert!(sql.contains("UPPER([CUSTOMER0].name) COLLATE Latin1_General_CI_AS AS [LABEL]"), "{}", sql);
}

#[test]
fn test_unknown_attribute_is_rejected() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    let err = query.add_select("CUSTOMER__EMAIL").unwrap_err();
    assert!(matches!(err, CompileError::UnknownAttribute { .. }), "{:?}", err);
}

#[test]
fn test_after_read_filter_is_applied_to_decoded_rows() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("NO").unwrap();
    query
        .add_filter_after_read("CUSTOMER__NAME", Comparator::Is, json!("acme"))
        .unwrap();
    query.set_limit(Some(1), 0);

    let compiled = query.compile_read().unwrap();
    assert!(!compiled.paged_in_sql);
    assert!(!flat(&compiled.sql).contains("WHERE"), "{}", compiled.sql);

    let page = compiled.decode(vec![
        row(json!({"NO": "A1", "CUSTOMER__NAME": "Other GmbH"})),
        row(json!({"NO": "A2", "CUSTOMER__NAME": "ACME Corp"})),
        row(json!({"NO": "A3", "CUSTOMER__NAME": "acme inc"})),
    ]);
    assert_eq!(page.rows, vec![row(json!({"NO": "A2"}))]);
    assert!(page.has_more);
}

#[test]
fn test_every_dialect_renders_parseable_joins() {
    let schema = shop();
    for dialect in [Dialect::MySql, Dialect::MariaDb, Dialect::MsSql2012, Dialect::Postgres] {
        let mut query = builder(&schema, "POSITION", dialect);
        query.add_select("ORDER__NO").unwrap();
        query.add_select("PRODUCT__NAME").unwrap();
        query.add_select("ORDER__CUSTOMER__COUNTRY__NAME").unwrap();
        assert_parses(&query.compile_read().unwrap().sql, dialect);
    }
}
