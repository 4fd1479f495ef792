//! DML (Data Manipulation Language) support.
//!
//! This module provides types and builders for generating DML statements
//! (INSERT, UPDATE, DELETE) across different SQL dialects.
//!
//! # Examples
//!
//! ```ignore
//! use relsql::sql::dml::{Insert, Update, Delete};
//! use relsql::sql::expr::{col, lit_str, lit_int, ExprExt};
//! use relsql::sql::query::TableRef;
//!
//! // INSERT
//! let insert = Insert::into("users")
//!     .columns(["name", "email"])
//!     .values([lit_str("Alice"), lit_str("alice@example.com")]);
//!
//! // UPDATE
//! let update = Update::table(TableRef::new("users"))
//!     .set("status", lit_str("active"))
//!     .filter(col("id").eq(lit_int(1)));
//!
//! // DELETE
//! let delete = Delete::from(TableRef::new("users"))
//!     .filter(col("status").eq(lit_str("inactive")));
//! ```
//!
//! Table and column names are metamodel data addresses and are emitted
//! verbatim; only generated aliases are quoted.

use super::dialect::{Dialect, GeneratedKeys, SqlDialect};
use super::expr::{Expr, ExprExt};
use super::query::TableRef;
use super::token::{Token, TokenStream};

// ============================================================================
// INSERT
// ============================================================================

/// Column whose generated value the INSERT hands back in its own result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnedKey {
    pub column: String,
    pub alias: String,
}

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expr>>,
    pub returning: Option<ReturnedKey>,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            returning: None,
        }
    }

    /// Set the columns to insert.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, vals: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.rows.push(vals.into_iter().map(|v| v.into()).collect());
        self
    }

    /// Add multiple rows of values.
    pub fn values_many(mut self, rows: impl IntoIterator<Item = Vec<Expr>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Hand back the generated key, if the dialect can do so inline.
    pub fn returning(mut self, column: &str, alias: &str) -> Self {
        self.returning = Some(ReturnedKey {
            column: column.into(),
            alias: alias.into(),
        });
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Insert).space().push(Token::Into).space();
        ts.push(Token::Name(self.table.clone()));

        if !self.columns.is_empty() {
            ts.space().lparen();
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Name(col.clone()));
            }
            ts.rparen();
        }

        // T-SQL: OUTPUT goes before VALUES
        if let (Some(key), GeneratedKeys::Output) = (&self.returning, dialect.generated_keys()) {
            ts.space()
                .push(Token::Output)
                .space()
                .push(Token::Inserted)
                .push(Token::Dot)
                .push(Token::Name(key.column.clone()))
                .space()
                .push(Token::As)
                .space()
                .push(Token::Ident(key.alias.clone()));
        }

        ts.space().push(Token::Values);
        for (row_idx, row) in self.rows.iter().enumerate() {
            if row_idx > 0 {
                ts.comma();
            }
            ts.space().lparen();
            for (i, val) in row.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&val.to_tokens(dialect));
            }
            ts.rparen();
        }

        if let (Some(key), GeneratedKeys::Returning) = (&self.returning, dialect.generated_keys())
        {
            ts.space()
                .push(Token::Returning)
                .space()
                .push(Token::Name(key.column.clone()))
                .space()
                .push(Token::As)
                .space()
                .push(Token::Ident(key.alias.clone()));
        }

        ts
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Update {
    pub table: TableRef,
    pub set: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

impl Update {
    /// Create a new UPDATE statement.
    pub fn table(table: TableRef) -> Self {
        Self {
            table,
            set: Vec::new(),
            where_clause: None,
        }
    }

    /// Add a SET assignment. Target columns are never qualified.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    /// Add a WHERE condition (ANDed with existing).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Update).space();
        ts.append(&self.table.to_tokens(dialect));

        ts.space().push(Token::Set).space();
        for (i, (col, val)) in self.set.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Name(col.clone()))
                .space()
                .push(Token::Eq)
                .space()
                .append(&val.to_tokens(dialect));
        }

        if let Some(ref where_expr) = self.where_clause {
            ts.space().push(Token::Where).space();
            ts.append(&where_expr.to_tokens(dialect));
        }

        ts
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Delete {
    pub table: TableRef,
    pub where_clause: Option<Expr>,
}

impl Delete {
    /// Create a new DELETE statement.
    pub fn from(table: TableRef) -> Self {
        Self {
            table,
            where_clause: None,
        }
    }

    /// Add a WHERE condition (ANDed with existing).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Delete).space().push(Token::From).space();
        ts.append(&self.table.to_tokens(dialect));

        if let Some(ref where_expr) = self.where_clause {
            ts.space().push(Token::Where).space();
            ts.append(&where_expr.to_tokens(dialect));
        }

        ts
    }
}

// ============================================================================
// SET @variable
// ============================================================================

/// Assignment to a connection-scoped variable (`SET @name = expr`).
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct SetVariable {
    pub variable: String,
    pub value: Expr,
}

impl SetVariable {
    pub fn new(variable: impl Into<String>, value: Expr) -> Self {
        Self {
            variable: variable.into(),
            value,
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Set)
            .space()
            .push(Token::Raw(self.variable.clone()))
            .space()
            .push(Token::Eq)
            .space()
            .append(&self.value.to_tokens(dialect));
        ts.serialize(dialect)
    }
}

// ============================================================================
// Tests
// ============================================================================
