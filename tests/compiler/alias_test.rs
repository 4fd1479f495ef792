#[path = "../common/mod.rs"]
mod common;

use common::{builder, flat, row, shop};
use relsql::compiler::{AliasOptions, COUNT_ALIAS};
use relsql::sql::Dialect;
use relsql::{CompileOptions, QueryBuilder};
use serde_json::json;

/// Every double-quoted identifier in `sql`.
fn quoted(sql: &str) -> Vec<&str> {
    sql.split('"').skip(1).step_by(2).collect()
}

#[test]
fn test_long_column_keys_fit_oracle11() {
    let schema = shop();
    let mut query = builder(&schema, "POSITION", Dialect::Oracle11);
    query.add_select("ORDER__CUSTOMER__COUNTRY__NAME").unwrap();

    let compiled = query.compile_read().unwrap();

    for ident in quoted(&compiled.sql) {
        assert!(ident.chars().count() <= 28, "{} is too long", ident);
    }
    let alias = compiled.columns[0].alias.clone();
    assert_ne!(alias, "ORDER__CUSTOMER__COUNTRY__NAME");

    let page = compiled.decode(vec![row(json!({ alias: "Germany" }))]);
    assert_eq!(
        page.rows,
        vec![row(json!({"ORDER__CUSTOMER__COUNTRY__NAME": "Germany"}))]
    );
}

#[test]
fn test_reserved_column_key_is_renamed_and_restored() {
    let schema = shop();
    let mut query = builder(&schema, "POSITION", Dialect::Postgres);
    query.add_select("ORDER").unwrap();

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT \"POSITION0\".order_id AS \"S001_ORDER\" FROM order_pos AS \"POSITION0\""
    );
    let page = compiled.decode(vec![row(json!({"S001_ORDER": 4}))]);
    assert_eq!(page.rows, vec![row(json!({"ORDER": 4}))]);
}

#[test]
fn test_generated_aliases_decode_in_grouped_reads() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Oracle);
    query.add_select("TOTAL:SUM").unwrap();
    query.add_aggregation("STATUS").unwrap();
    query.add_select("STATUS").unwrap();

    let compiled = query.compile_read().unwrap();
    let total = compiled
        .columns
        .iter()
        .find(|c| c.key == "TOTAL:SUM")
        .unwrap()
        .alias
        .clone();

    let page = compiled.decode(vec![row(json!({ total: 12, "STATUS": 1 }))]);
    assert_eq!(page.rows, vec![row(json!({"TOTAL:SUM": 12, "STATUS": 1}))]);
}

#[test]
fn test_custom_alias_options() {
    let schema = shop();
    let options = CompileOptions {
        aliases: AliasOptions {
            prefix: "X".into(),
            max_length: Some(16),
            ..Default::default()
        },
        ..CompileOptions::new(Dialect::MySql)
    };
    let mut query = QueryBuilder::new(&schema, "ORDER", options).unwrap();
    query.add_select("POSITION__QTY:SUM").unwrap();

    let compiled = query.compile_read().unwrap();
    let alias = &compiled.columns[0].alias;

    assert!(alias.starts_with("X001_"), "{}", alias);
    assert!(alias.chars().count() <= 16, "{}", alias);
    assert!(alias.ends_with("QTY_SUM"), "{}", alias);
}

#[test]
fn test_column_key_cannot_shadow_internal_aliases() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_select_as("NO", COUNT_ALIAS, false).unwrap();

    let compiled = query.compile_count().unwrap();
    let sql = flat(&compiled.sql);

    assert_eq!(sql.matches("\"EXFCNT\"").count(), 1, "{}", sql);
}
