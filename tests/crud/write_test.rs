#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, builder, flat, shop};
use relsql::compiler::{StatementRole, UidSource, WritePlan};
use relsql::query::Comparator;
use relsql::sql::Dialect;
use relsql::{CompileError, Schema};
use serde_json::json;

fn sqls(plan: &WritePlan) -> Vec<String> {
    plan.statements.iter().map(|s| flat(&s.sql)).collect()
}

#[test]
fn test_insert_batches_rows_where_supported() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_values("NO", vec![json!("A1"), json!("A2")]).unwrap();
    query.add_values("STATUS", vec![json!(1)]).unwrap();

    let plan = query.compile_create().unwrap();

    assert_eq!(
        sqls(&plan),
        vec!["INSERT INTO orders (order_no, status) VALUES ('A1', 1), ('A2', 1) RETURNING id AS \"EXFUID\""]
    );
    assert_eq!(plan.rows, 2);
    assert_parses(&plan.statements[0].sql, Dialect::Postgres);
}

#[test]
fn test_insert_one_statement_per_row_on_oracle() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Oracle);
    query.add_values("NO", vec![json!("A1"), json!("A2")]).unwrap();

    let plan = query.compile_create().unwrap();

    assert_eq!(
        sqls(&plan),
        vec![
            "INSERT INTO orders (order_no) VALUES ('A1')",
            "INSERT INTO orders (order_no) VALUES ('A2')",
        ]
    );
    assert_eq!(
        plan.statements[1].role,
        StatementRole::Insert {
            rows: vec![1],
            uids: UidSource::LastInsertId
        }
    );
}

#[test]
fn test_insert_output_clause_on_mssql() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MsSql2012);
    query.add_values("NO", vec![json!("A1")]).unwrap();

    let plan = query.compile_create().unwrap();
    let sql = flat(&plan.statements[0].sql);

    assert_eq!(sql, "INSERT INTO orders (order_no) OUTPUT INSERTED.id AS [EXFUID] VALUES ('A1')");
}

#[test]
fn test_insert_follow_up_identity_query_on_hana() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Hana);
    query.add_values("NO", vec![json!("A1"), json!("A2")]).unwrap();

    let plan = query.compile_create().unwrap();

    assert_eq!(plan.statements.len(), 2);
    for statement in &plan.statements {
        match &statement.role {
            StatementRole::Insert {
                uids: UidSource::Query(sql),
                ..
            } => assert_eq!(sql, "SELECT CURRENT_IDENTITY_VALUE() FROM DUMMY"),
            other => panic!("unexpected role {:?}", other),
        }
    }
}

#[test]
fn test_insert_generates_uuids_client_side() {
    let schema = shop();
    let mut query = builder(&schema, "TAG", Dialect::Postgres);
    query.add_values("LABEL", vec![json!("red"), json!("blue")]).unwrap();

    let plan = query.compile_create().unwrap();

    assert_eq!(plan.statements.len(), 1);
    let sql = flat(&plan.statements[0].sql);
    assert!(sql.starts_with("INSERT INTO tag (label, id) VALUES ('red', '"), "{}", sql);
    assert!(!sql.contains("RETURNING"), "{}", sql);
    match &plan.statements[0].role {
        StatementRole::Insert {
            uids: UidSource::Known(uids),
            ..
        } => {
            assert_eq!(uids.len(), 2);
            for uid in uids {
                let uid = uid.as_str().unwrap();
                assert!(sql.contains(uid), "{} not in {}", uid, sql);
            }
        }
        other => panic!("unexpected role {:?}", other),
    }
}

#[test]
fn test_insert_template_wraps_the_value() {
    let schema = Schema::from_json(
        r#"{
        "objects": {
            "CUSTOMER": {
                "data_address": "customer",
                "uid": "ID",
                "attributes": {
                    "ID": {"data_address": "id", "data_type": "integer"},
                    "NAME": {"data_address": "name", "custom": {"insert": "UPPER([#value#])"}}
                }
            }
        }
    }"#,
    )
    .unwrap();
    let mut query = builder(&schema, "CUSTOMER", Dialect::Postgres);
    query.add_values("NAME", vec![json!("acme")]).unwrap();

    let sql = flat(&query.compile_create().unwrap().statements[0].sql);

    assert!(sql.contains("VALUES (UPPER('acme'))"), "{}", sql);
}

#[test]
fn test_insert_refuses_related_values() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_values("NO", vec![json!("A1")]).unwrap();
    query.add_values("CUSTOMER__NAME", vec![json!("Acme")]).unwrap();

    assert_eq!(
        query.compile_create().unwrap_err(),
        CompileError::RelatedValueInInsert {
            attribute: "CUSTOMER__NAME".into()
        }
    );
}

#[test]
fn test_update_by_filter() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_values("TOTAL", vec![json!(5)]).unwrap();
    query.add_filter("NO", Comparator::Equals, json!("A1")).unwrap();

    let plan = query.compile_update().unwrap();

    assert_eq!(
        sqls(&plan),
        vec!["UPDATE orders AS \"ORDER0\" SET total = 5 WHERE \"ORDER0\".order_no = 'A1'"]
    );
    assert_eq!(plan.statements[0].role, StatementRole::Write);
}

#[test]
fn test_update_shared_and_per_uid_values() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_values("STATUS", vec![json!(2)]).unwrap();
    query
        .add_values_with_uids("TOTAL", vec![json!(5), json!(6)], vec![json!(1), json!(2)])
        .unwrap();

    let plan = query.compile_update().unwrap();

    assert_eq!(
        sqls(&plan),
        vec![
            "UPDATE orders SET status = 2 WHERE id IN (1, 2)",
            "UPDATE orders SET total = 5 WHERE id = 1",
            "UPDATE orders SET total = 6 WHERE id = 2",
        ]
    );
}

#[test]
fn test_update_across_relation_goes_through_a_derived_table_on_mysql() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_values("STATUS", vec![json!(0)]).unwrap();
    query
        .add_filter("CUSTOMER__COUNTRY__NAME", Comparator::Equals, json!("Germany"))
        .unwrap();

    let plan = query.compile_update().unwrap();
    let sql = &sqls(&plan)[0];

    assert!(sql.starts_with("UPDATE orders SET status = 0 WHERE id IN (SELECT `EXFDT`.`EXFKEY` FROM ("), "{}", sql);
    assert!(sql.ends_with(") AS `EXFDT`)"), "{}", sql);
    assert_parses(sql, Dialect::MySql);
}

#[test]
fn test_update_with_aggregated_reverse_filter() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query.add_values("STATUS", vec![json!(9)]).unwrap();
    query
        .add_filter("POSITION__QTY:SUM", Comparator::GreaterThan, json!(10))
        .unwrap();

    let sql = &sqls(&query.compile_update().unwrap())[0];

    assert!(
        sql.starts_with("UPDATE orders AS \"ORDER0\" SET status = 9 WHERE \"ORDER0\".id IN (SELECT"),
        "{}",
        sql
    );
    assert!(sql.contains("qty) > 10"), "{}", sql);
    assert!(!sql.contains("JOIN order_pos"), "{}", sql);
}

#[test]
fn test_update_of_a_related_object() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query
        .add_values("CUSTOMER__COUNTRY__NAME", vec![json!("Germany")])
        .unwrap();
    query.add_filter("ID", Comparator::Equals, json!(3)).unwrap();

    let plan = query.compile_update().unwrap();

    assert_eq!(
        sqls(&plan),
        vec![
            "UPDATE country SET name = 'Germany' WHERE id IN (SELECT country_id FROM customer \
             WHERE id IN (SELECT \"ORDER0_1\".customer_id FROM orders AS \"ORDER0_1\" WHERE \"ORDER0_1\".id = 3))"
        ]
    );
}

#[test]
fn test_update_refusals() {
    let schema = shop();

    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_values("STATUS", vec![json!(1)]).unwrap();
    assert_eq!(
        query.compile_update().unwrap_err(),
        CompileError::UpdateWithoutFilters {
            object: "ORDER".into()
        }
    );

    let mut query = builder(&schema, "ORDER", Dialect::MySql);
    query.add_filter("ID", Comparator::Equals, json!(1)).unwrap();
    assert!(matches!(
        query.compile_update(),
        Err(CompileError::NothingToWrite { .. })
    ));
}

#[test]
fn test_delete() {
    let schema = shop();
    let mut query = builder(&schema, "ORDER", Dialect::MsSql2012);
    query.add_filter("STATUS", Comparator::In, json!([3, 4])).unwrap();

    let plan = query.compile_delete().unwrap();

    assert_eq!(sqls(&plan), vec!["DELETE FROM orders WHERE status IN (3, 4)"]);
    assert_parses(&plan.statements[0].sql, Dialect::MsSql2012);
}

#[test]
fn test_delete_refusals() {
    let schema = shop();

    let query = builder(&schema, "ORDER", Dialect::Postgres);
    assert_eq!(
        query.compile_delete().unwrap_err(),
        CompileError::DeleteWithoutFilters {
            object: "ORDER".into()
        }
    );

    let mut query = builder(&schema, "ORDER", Dialect::Postgres);
    query
        .add_filter("POSITION__NOTE", Comparator::Equals, json!("gift"))
        .unwrap();
    assert_eq!(
        query.compile_delete().unwrap_err(),
        CompileError::DeleteAcrossRelation {
            object: "ORDER".into(),
            attribute: "POSITION__NOTE".into()
        }
    );
}
