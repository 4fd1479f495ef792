//! Shared fixtures for integration tests.
//!
//! The shop schema:
//!
//! ```text
//! COUNTRY <- CUSTOMER <- ORDER -> POSITION (reverse) -> PRODUCT
//! ```

#![allow(dead_code)]

use std::collections::VecDeque;

use relsql::connector::{Connector, ConnectorError, ExecResult};
use relsql::sql::Dialect;
use relsql::{CompileOptions, QueryBuilder, Schema};
use serde_json::Value as JsonValue;

pub const SHOP_SCHEMA: &str = r#"{
    "objects": {
        "ORDER": {
            "data_address": "orders",
            "uid": "ID",
            "attributes": {
                "ID": {"data_address": "id", "data_type": "integer"},
                "NO": {"data_address": "order_no", "required": true},
                "TOTAL": {"data_address": "total", "data_type": "number"},
                "STATUS": {"data_address": "status", "data_type": "integer"},
                "CREATED": {"data_address": "created_on", "data_type": "date"},
                "CUSTOMER": {"data_address": "customer_id", "data_type": "integer"}
            },
            "relations": {
                "CUSTOMER": {"related_object": "CUSTOMER", "key_attribute": "CUSTOMER", "related_key_attribute": "ID"},
                "POSITION": {"kind": "reverse", "related_object": "POSITION", "key_attribute": "ID", "related_key_attribute": "ORDER"}
            }
        },
        "CUSTOMER": {
            "data_address": "customer",
            "uid": "ID",
            "attributes": {
                "ID": {"data_address": "id", "data_type": "integer"},
                "NAME": {"data_address": "name"},
                "COUNTRY": {"data_address": "country_id", "data_type": "integer"}
            },
            "relations": {
                "COUNTRY": {"related_object": "COUNTRY", "key_attribute": "COUNTRY", "related_key_attribute": "ID"}
            }
        },
        "COUNTRY": {
            "data_address": "country",
            "uid": "ID",
            "attributes": {
                "ID": {"data_address": "id", "data_type": "integer"},
                "NAME": {"data_address": "name"}
            }
        },
        "POSITION": {
            "data_address": "order_pos",
            "uid": "ID",
            "attributes": {
                "ID": {"data_address": "id", "data_type": "integer"},
                "ORDER": {"data_address": "order_id", "data_type": "integer"},
                "PRODUCT": {"data_address": "product_id", "data_type": "integer"},
                "QTY": {"data_address": "qty", "data_type": "number", "default_aggregator": "SUM"},
                "NOTE": {"data_address": "note"}
            },
            "relations": {
                "ORDER": {"related_object": "ORDER", "key_attribute": "ORDER", "related_key_attribute": "ID"},
                "PRODUCT": {"related_object": "PRODUCT", "key_attribute": "PRODUCT", "related_key_attribute": "ID"}
            }
        },
        "PRODUCT": {
            "data_address": "product",
            "uid": "ID",
            "attributes": {
                "ID": {"data_address": "id", "data_type": "integer"},
                "NAME": {"data_address": "name"},
                "PRICE": {"data_address": "price", "data_type": "number"}
            }
        },
        "TAG": {
            "data_address": "tag",
            "uid": "ID",
            "uid_generator": "uuid",
            "attributes": {
                "ID": {"data_address": "id"},
                "LABEL": {"data_address": "label"}
            }
        }
    }
}"#;

pub fn shop() -> Schema {
    Schema::from_json(SHOP_SCHEMA).unwrap()
}

pub fn builder<'s>(schema: &'s Schema, object: &str, dialect: Dialect) -> QueryBuilder<'s> {
    QueryBuilder::new(schema, object, CompileOptions::new(dialect)).unwrap()
}

/// Collapse line breaks and indentation into single spaces.
pub fn flat(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse with sqlparser; dialects it has no grammar for use the generic one.
pub fn assert_parses(sql: &str, dialect: Dialect) {
    use sqlparser::dialect::{GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
    use sqlparser::parser::Parser;

    let parser: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::MySql | Dialect::MariaDb => Box::new(MySqlDialect {}),
        Dialect::MsSql2008 | Dialect::MsSql2012 | Dialect::MsSql2016 => Box::new(MsSqlDialect {}),
        _ => Box::new(GenericDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser, sql) {
        panic!("invalid SQL for {}: {}\n{}", dialect, e, sql);
    }
}

/// One result row from a JSON object literal.
pub fn row(value: JsonValue) -> relsql::compiler::Row {
    value.as_object().cloned().unwrap()
}

/// Records every statement and answers with queued responses.
#[derive(Debug, Default)]
pub struct RecordingConnector {
    pub statements: Vec<String>,
    responses: VecDeque<Result<ExecResult, ConnectorError>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, result: ExecResult) -> Self {
        self.responses.push_back(Ok(result));
        self
    }

    pub fn fail(mut self, error: ConnectorError) -> Self {
        self.responses.push_back(Err(error));
        self
    }
}

impl Connector for RecordingConnector {
    fn execute(&mut self, sql: &str) -> Result<ExecResult, ConnectorError> {
        self.statements.push(flat(sql));
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(ExecResult::default()))
    }
}
