#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, builder, flat, row, shop};
use relsql::sql::{Dialect, SortDir};
use relsql::{CompileError, Schema};
use serde_json::json;

#[test]
fn test_limit_offset_fetches_one_extra_row() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_select("NO").unwrap();
    query.set_limit(Some(10), 20);

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT `ORDER0`.order_no AS `NO` FROM orders AS `ORDER0` LIMIT 11 OFFSET 20"
    );
    assert!(compiled.paged_in_sql);
}

#[test]
fn test_offset_fetch_sorts_by_uid_when_unsorted() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MsSql2012);
    query.add_select("NO").unwrap();
    query.set_limit(Some(10), 20);

    let compiled = query.compile_read().unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT [ORDER0].order_no AS [NO], [ORDER0].id AS [ID] FROM orders AS [ORDER0] \
         ORDER BY [ID] DESC OFFSET 20 ROWS FETCH NEXT 11 ROWS ONLY"
    );
    assert_eq!(compiled.passes, 2);
    assert_parses(&compiled.sql, Dialect::MsSql2012);

    // The UID column was only added for sorting.
    let page = compiled.decode(vec![row(json!({"NO": "A1", "ID": 7}))]);
    assert_eq!(page.rows, vec![row(json!({"NO": "A1"}))]);
    assert!(!page.has_more);
}

#[test]
fn test_row_number_wrap_on_mssql2008() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MsSql2008);
    query.add_select("NO").unwrap();
    query.add_sorter("TOTAL", SortDir::Asc).unwrap();
    query.set_limit(Some(5), 10);

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(sql.starts_with("SELECT * FROM (SELECT [EXFRNQ].*, ROW_NUMBER() OVER (ORDER BY [EXFRNQ].[TOTAL] ASC) AS [EXFRN]"), "{}", sql);
    assert!(sql.ends_with("WHERE [EXFRN] BETWEEN 11 AND 16 ORDER BY [EXFRN] ASC"), "{}", sql);
    assert!(!sql.contains("OFFSET"), "{}", sql);
}

#[test]
fn test_rownum_wrap_on_oracle11() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Oracle11);
    query.add_select("NO").unwrap();
    query.add_sorter("TOTAL", SortDir::Desc).unwrap();
    query.set_limit(Some(10), 0);

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(sql.contains("ORDER BY \"TOTAL\" DESC) \"EXFRNQ\" WHERE ROWNUM <= 11"), "{}", sql);
    assert!(sql.ends_with("BETWEEN 1 AND 11 ORDER BY \"EXFRN\" ASC"), "{}", sql);
    // Oracle takes no AS before table aliases.
    assert!(sql.contains("FROM orders \"ORDER0\""), "{}", sql);
}

#[test]
fn test_offset_fetch_on_oracle() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Oracle);
    query.add_select("NO").unwrap();
    query.add_sorter("NO", SortDir::Asc).unwrap();
    query.set_limit(Some(25), 50);

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(sql.ends_with("ORDER BY \"NO\" ASC OFFSET 50 ROWS FETCH NEXT 26 ROWS ONLY"), "{}", sql);
}

#[test]
fn test_paging_without_sort_key_is_rejected() {
    let schema = Schema::from_json(
        r#"{
        "objects": {
            "LOG": {
                "data_address": "event_log",
                "attributes": {
                    "MESSAGE": {"data_address": "message"}
                }
            }
        }
    }"#,
    )
    .unwrap();

    let mut query = builder(&schema, "LOG", Dialect::MsSql2012);
    query.add_select("MESSAGE").unwrap();
    query.set_limit(Some(10), 0);

    let err = query.compile_read().unwrap_err();

    assert_eq!(
        err,
        CompileError::MissingSortKey {
            object: "LOG".into(),
            dialect: Dialect::MsSql2012,
        }
    );

    // Dialects that page without ORDER BY do not need one.
    let mut query = builder(&schema, "LOG", Dialect::Postgres);
    query.add_select("MESSAGE").unwrap();
    query.set_limit(Some(10), 0);
    assert!(query.compile_read().is_ok());
}

#[test]
fn test_grouped_page_sorts_by_group_keys() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MsSql2012);
    query.add_select("STATUS").unwrap();
    query.add_select("TOTAL:SUM").unwrap();
    query.add_aggregation("STATUS").unwrap();
    query.set_limit(Some(10), 0);

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(
        sql.ends_with("GROUP BY [ORDER0].status ORDER BY [STATUS] ASC OFFSET 0 ROWS FETCH NEXT 11 ROWS ONLY"),
        "{}",
        sql
    );
}

#[test]
fn test_no_limit_reads_everything() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MsSql2012);
    query.add_select("NO").unwrap();

    let compiled = query.compile_read().unwrap();

    assert!(!compiled.paged_in_sql);
    assert!(!flat(&compiled.sql).contains("FETCH"));
    let rows: Vec<_> = (0..50).map(|n| row(json!({"NO": n}))).collect();
    let page = compiled.decode(rows);
    assert_eq!(page.rows.len(), 50);
    assert!(!page.has_more);
}
