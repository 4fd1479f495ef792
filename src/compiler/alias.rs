//! Short, dialect-safe aliases for long names.
//!
//! Column keys and table aliases are built from relation paths
//! (`CUSTOMER__COUNTRY__NAME:LIST(;)`) and easily exceed identifier limits or
//! contain characters no database accepts. The alias manager hands out a
//! stable short alias per full name and maps result columns back.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::sql::{Dialect, SqlDialect};

const FORBIDDEN: &[char] = &['.', '>', '<', '-', '(', ')', ':'];

/// How generated aliases look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasOptions {
    pub prefix: String,
    pub separator: String,
    /// Stands in for every forbidden character.
    pub replacer: char,
    /// Cap below the dialect's identifier limit.
    pub max_length: Option<usize>,
}

impl Default for AliasOptions {
    fn default() -> Self {
        Self {
            prefix: "S".into(),
            separator: "_".into(),
            replacer: '_',
            max_length: None,
        }
    }
}

/// Bidirectional full name / short alias table for one compilation.
#[derive(Debug, Clone)]
pub struct AliasManager {
    dialect: Dialect,
    options: AliasOptions,
    short_by_full: HashMap<String, String>,
    full_by_short: HashMap<String, String>,
    used: HashSet<String>,
    counter: usize,
}

impl AliasManager {
    pub fn new(dialect: Dialect, options: AliasOptions) -> Self {
        Self {
            dialect,
            options,
            short_by_full: HashMap::new(),
            full_by_short: HashMap::new(),
            used: HashSet::new(),
            counter: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        let limit = self.dialect.max_identifier_length();
        self.options
            .max_length
            .map_or(limit, |max| max.min(limit))
    }

    /// Mark a fixed identifier as taken, e.g. a derived-table alias.
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_lowercase());
    }

    /// The short alias for `full`; the same name always gets the same alias.
    pub fn short(&mut self, full: &str) -> String {
        if let Some(short) = self.short_by_full.get(full) {
            return short.clone();
        }

        let short = if self.is_usable(full) {
            full.to_string()
        } else {
            self.generate(full)
        };

        self.used.insert(short.to_lowercase());
        self.short_by_full.insert(full.to_string(), short.clone());
        self.full_by_short.insert(short.clone(), full.to_string());
        short
    }

    /// The full name behind `short`, or `short` itself if it is unknown.
    pub fn full<'a>(&'a self, short: &'a str) -> &'a str {
        self.full_by_short
            .get(short)
            .map(String::as_str)
            .unwrap_or(short)
    }

    pub fn is_known(&self, short: &str) -> bool {
        self.full_by_short.contains_key(short)
    }

    fn is_usable(&self, name: &str) -> bool {
        !name.is_empty()
            && !name.contains(FORBIDDEN)
            && name.chars().count() <= self.max_length()
            && !self.dialect.is_reserved_word(name)
            && !self.used.contains(&name.to_lowercase())
    }

    fn generate(&mut self, full: &str) -> String {
        let max = self.max_length();
        let cleaned: Vec<char> = full
            .chars()
            .map(|c| {
                if FORBIDDEN.contains(&c) {
                    self.options.replacer
                } else {
                    c
                }
            })
            .collect();

        loop {
            self.counter += 1;
            let head: String = format!(
                "{}{:03}{}",
                self.options.prefix, self.counter, self.options.separator
            )
            .chars()
            .take(max)
            .collect();
            let room = max.saturating_sub(head.chars().count());
            let tail: String = cleaned[cleaned.len().saturating_sub(room)..]
                .iter()
                .collect();
            let candidate = format!("{}{}", head, tail);

            if !self.used.contains(&candidate.to_lowercase()) {
                return candidate;
            }
        }
    }
}
