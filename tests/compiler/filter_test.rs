#[path = "../common/mod.rs"]
mod common;

use chrono::FixedOffset;
use common::{assert_parses, builder, flat, shop};
use relsql::query::{Comparator, Filter, FilterGroup, LogicalOperator};
use relsql::sql::Dialect;
use relsql::{CompileError, CompileOptions, QueryBuilder, Schema};
use serde_json::{json, Value};

const BASE: &str = "SELECT \"ORDER0\".order_no AS \"NO\" FROM orders AS \"ORDER0\"";

fn where_clause(query: &QueryBuilder<'_>) -> String {
    let sql = flat(&query.compile_read().unwrap().sql);
    assert!(sql.starts_with(BASE), "{}", sql);
    sql[BASE.len()..].trim().to_string()
}

fn order_query<'s>(schema: &'s Schema) -> QueryBuilder<'s> {
    let mut query = builder(schema, "ORDER", Dialect::Postgres);
    query.add_select("NO").unwrap();
    query
}

fn single(schema: &Schema, attribute: &str, comparator: Comparator, value: Value) -> String {
    let mut query = order_query(schema);
    query.add_filter(attribute, comparator, value).unwrap();
    where_clause(&query)
}

#[test]
fn test_is_on_text_is_a_case_insensitive_contains() {
    let schema = shop();
    assert_eq!(
        single(&schema, "NO", Comparator::Is, json!("O'Brien")),
        "WHERE LOWER(\"ORDER0\".order_no) LIKE '%o''brien%'"
    );
    assert_eq!(
        single(&schema, "NO", Comparator::IsNot, json!("x")),
        "WHERE LOWER(\"ORDER0\".order_no) NOT LIKE '%x%'"
    );
}

#[test]
fn test_is_on_numbers_is_equality() {
    let schema = shop();
    assert_eq!(
        single(&schema, "TOTAL", Comparator::Is, json!("12.5")),
        "WHERE \"ORDER0\".total = 12.5"
    );
}

#[test]
fn test_foreign_keys_compare_strictly() {
    let schema = shop();
    assert_eq!(
        single(&schema, "CUSTOMER", Comparator::Is, json!("12")),
        "WHERE \"ORDER0\".customer_id = 12"
    );
    // CUSTOMER__ID folds into the foreign key, no join.
    assert_eq!(
        single(&schema, "CUSTOMER__ID", Comparator::IsNot, json!(12)),
        "WHERE \"ORDER0\".customer_id <> 12"
    );
}

#[test]
fn test_null_values() {
    let schema = shop();
    assert_eq!(
        single(&schema, "STATUS", Comparator::Equals, Value::Null),
        "WHERE \"ORDER0\".status IS NULL"
    );
    assert_eq!(
        single(&schema, "STATUS", Comparator::EqualsNot, Value::Null),
        "WHERE \"ORDER0\".status IS NOT NULL"
    );
}

#[test]
fn test_in_lists() {
    let schema = shop();
    assert_eq!(
        single(&schema, "STATUS", Comparator::In, json!("1, 2,3")),
        "WHERE \"ORDER0\".status IN (1, 2, 3)"
    );
    assert_eq!(
        single(&schema, "NO", Comparator::NotIn, json!(["A", "B"])),
        "WHERE \"ORDER0\".order_no NOT IN ('A', 'B')"
    );
}

#[test]
fn test_in_list_that_cannot_match() {
    let schema = shop();
    assert_eq!(
        single(&schema, "STATUS", Comparator::In, json!([])),
        "WHERE 1 = 0"
    );
    assert_eq!(
        single(&schema, "STATUS", Comparator::In, json!("1,x")),
        "WHERE 1 = 0"
    );
}

#[test]
fn test_between_and_ranges() {
    let schema = shop();
    assert_eq!(
        single(&schema, "CREATED", Comparator::Between, json!("2024-01-01..2024-03-31")),
        "WHERE \"ORDER0\".created_on BETWEEN DATE '2024-01-01' AND DATE '2024-03-31'"
    );
    assert_eq!(
        single(&schema, "TOTAL", Comparator::GreaterThanOrEquals, json!(100)),
        "WHERE \"ORDER0\".total >= 100"
    );
    assert_eq!(
        single(&schema, "TOTAL", Comparator::LessThan, json!(0.5)),
        "WHERE \"ORDER0\".total < 0.5"
    );
}

#[test]
fn test_rfc3339_values_convert_to_the_database_zone() {
    let schema = shop();
    let options = CompileOptions::new(Dialect::Postgres)
        .with_time_zone(FixedOffset::east_opt(2 * 3600).unwrap());
    let mut query = QueryBuilder::new(&schema, "ORDER", options).unwrap();
    query.add_select("NO").unwrap();
    query
        .add_filter("CREATED", Comparator::Equals, json!("2024-03-01T23:30:00Z"))
        .unwrap();

    assert_eq!(where_clause(&query), "WHERE \"ORDER0\".created_on = DATE '2024-03-02'");
}

#[test]
fn test_invalid_value_is_rejected() {
    let schema = shop();
    let mut query = order_query(&schema);
    query.add_filter("STATUS", Comparator::Equals, json!("open")).unwrap();

    let err = query.compile_read().unwrap_err();

    assert!(
        matches!(err, CompileError::InvalidValue { ref attribute, .. } if attribute == "STATUS"),
        "{:?}",
        err
    );
}

#[test]
fn test_nested_or_group_is_parenthesized() {
    let schema = shop();
    let mut query = order_query(&schema);
    let or = FilterGroup::new(LogicalOperator::Or)
        .with_filter(Filter::new(query.resolve("NO").unwrap(), Comparator::Equals, json!("A")))
        .with_filter(Filter::new(query.resolve("NO").unwrap(), Comparator::Equals, json!("B")));
    query.set_filters(
        FilterGroup::and()
            .with_filter(Filter::new(query.resolve("STATUS").unwrap(), Comparator::Equals, json!(1)))
            .with_group(or),
    );

    assert_eq!(
        where_clause(&query),
        "WHERE \"ORDER0\".status = 1 AND (\"ORDER0\".order_no = 'A' OR \"ORDER0\".order_no = 'B')"
    );
}

#[test]
fn test_xor_is_expanded_where_unsupported() {
    let schema = shop();
    let mut query = order_query(&schema);
    query.set_filters(
        FilterGroup::new(LogicalOperator::Xor)
            .with_filter(Filter::new(query.resolve("STATUS").unwrap(), Comparator::Equals, json!(1)))
            .with_filter(Filter::new(query.resolve("TOTAL").unwrap(), Comparator::Equals, json!(5))),
    );

    assert_eq!(
        where_clause(&query),
        "WHERE (\"ORDER0\".status = 1 AND NOT \"ORDER0\".total = 5) \
         OR (NOT \"ORDER0\".status = 1 AND \"ORDER0\".total = 5)"
    );
}

#[test]
fn test_not_group_negates_the_conjunction() {
    let schema = shop();
    let mut query = order_query(&schema);
    query.set_filters(
        FilterGroup::new(LogicalOperator::Not)
            .with_filter(Filter::new(query.resolve("STATUS").unwrap(), Comparator::Equals, json!(1)))
            .with_filter(Filter::new(query.resolve("TOTAL").unwrap(), Comparator::Equals, json!(5))),
    );

    assert_eq!(
        where_clause(&query),
        "WHERE NOT (\"ORDER0\".status = 1 AND \"ORDER0\".total = 5)"
    );
}

#[test]
fn test_where_template_receives_escaped_value() {
    let schema = Schema::from_json(
        r#"{
        "objects": {
            "CUSTOMER": {
                "data_address": "customer",
                "uid": "ID",
                "attributes": {
                    "ID": {"data_address": "id", "data_type": "integer"},
                    "NAME": {
                        "data_address": "name",
                        "custom": {"where": "SOUNDEX([#alias#].name) = SOUNDEX([#value#])"}
                    }
                }
            }
        }
    }"#,
    )
    .unwrap();

    let mut query = builder(&schema, "CUSTOMER", Dialect::Postgres);
    query.add_select("ID").unwrap();
    query
        .add_filter("NAME", Comparator::Is, json!("Smith'); DROP TABLE customer; --"))
        .unwrap();

    let sql = flat(&query.compile_read().unwrap().sql);

    assert!(
        sql.ends_with("WHERE SOUNDEX(\"CUSTOMER0\".name) = SOUNDEX('Smith''); DROP TABLE customer; --')"),
        "{}",
        sql
    );
}

#[test]
fn test_filters_render_parseable_sql_everywhere() {
    let schema = shop();
    for dialect in [Dialect::MySql, Dialect::MsSql2016, Dialect::Postgres] {
        let mut query = builder(&schema, "ORDER", dialect);
        query.add_select("NO").unwrap();
        query.add_filter("CUSTOMER__COUNTRY__NAME", Comparator::Is, json!("de")).unwrap();
        query.add_filter("CREATED", Comparator::Between, json!(["2024-01-01", "2024-12-31"])).unwrap();
        query.add_filter("STATUS", Comparator::NotIn, json!([3, 4])).unwrap();
        assert_parses(&query.compile_read().unwrap().sql, dialect);
    }
}
