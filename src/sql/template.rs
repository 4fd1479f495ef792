//! Placeholder substitution for metamodel SQL fragments.
//!
//! Custom data addresses may contain `[#alias#]` and `[#value#]`
//! placeholders. Substitution only accepts [`SqlFragment`]s, which can only
//! be built from already-quoted identifiers or dialect-escaped literals, so a
//! caller value can never reach the template unescaped.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::dialect::{Dialect, SqlDialect};
use super::expr::{Expr, Literal};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[#([A-Za-z_][A-Za-z0-9_]*)#\]").expect("placeholder regex"));

/// Placeholder errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder [#{name}#] in SQL template '{template}'")]
    UnknownPlaceholder { name: String, template: String },
}

/// A piece of SQL text that is safe to splice into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFragment(String);

impl SqlFragment {
    /// A generated alias, quoted for the dialect.
    pub fn identifier(ident: &str, dialect: Dialect) -> Self {
        Self(dialect.quote_identifier(ident))
    }

    /// A metamodel table name, emitted verbatim like every data address.
    pub fn name(data_address: &str) -> Self {
        Self(data_address.to_string())
    }

    /// A literal, escaped for the dialect.
    pub fn literal(literal: &Literal, dialect: Dialect) -> Self {
        Self(literal.to_sql(dialect))
    }

    /// A rendered expression tree.
    pub fn expr(expr: &Expr, dialect: Dialect) -> Self {
        Self(expr.to_sql(dialect))
    }

    /// Join fragments with a separator, e.g. the members of an IN list.
    pub fn join(fragments: &[SqlFragment], separator: &str) -> Self {
        Self(
            fragments
                .iter()
                .map(|f| f.0.as_str())
                .collect::<Vec<_>>()
                .join(separator),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether the template references `[#name#]`.
pub fn uses_placeholder(template: &str, name: &str) -> bool {
    PLACEHOLDER
        .captures_iter(template)
        .any(|cap| &cap[1] == name)
}

/// Substitute every placeholder in `template`.
///
/// Unknown placeholders are an error rather than being left in the SQL.
pub fn render(template: &str, bindings: &[(&str, SqlFragment)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for cap in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        let name = &cap[1];
        let fragment = bindings
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, fragment)| fragment)
            .ok_or_else(|| TemplateError::UnknownPlaceholder {
                name: name.to_string(),
                template: template.to_string(),
            })?;

        out.push_str(&template[last..whole.start()]);
        out.push_str(fragment.as_str());
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}
