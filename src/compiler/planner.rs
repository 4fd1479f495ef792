//! Per-pass planning state: table aliases, joins and queued additions.

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{CompileError, CompileResult};
use crate::model::{MetaObject, RelationPath, Schema};
use crate::query::{AttributeRef, QueryPart, Select};
use crate::sql::template::{self, SqlFragment};
use crate::sql::{raw_sql, table_col, col, Dialect, Expr, ExprExt, Join, JoinType, TableRef};

use super::alias::AliasManager;
use super::{CompileOptions, RESERVED_ALIASES};

/// Planning state of one query (or subquery) during one pass.
pub(crate) struct Planner<'a> {
    pub schema: &'a Schema,
    pub options: &'a CompileOptions,
    pub dialect: Dialect,
    pub main: &'a MetaObject,
    /// `0` for the main query, `0_1`, `0_2`, ... for its subqueries.
    pub query_id: String,
    pub main_alias: String,
    pub aliases: AliasManager,
    joins: IndexMap<String, Join>,
    subqueries: usize,
    additions: Vec<QueryPart>,
    /// Reverse steps are joined instead of becoming subqueries. Set inside
    /// subqueries that already group by the reverse key.
    pub join_reverse: bool,
    /// Columns of the main table are written without a table alias
    /// (UPDATE and DELETE on dialects without DML aliases).
    pub unqualified: bool,
}

impl<'a> Planner<'a> {
    pub fn new(
        schema: &'a Schema,
        options: &'a CompileOptions,
        object: &str,
        query_id: &str,
    ) -> CompileResult<Self> {
        let main = schema.object(object)?;
        let mut aliases = AliasManager::new(options.dialect, options.aliases.clone());
        for name in RESERVED_ALIASES {
            aliases.reserve(name);
        }
        let main_alias = aliases.short(&format!("{}{}", main.alias, query_id));

        Ok(Self {
            schema,
            options,
            dialect: options.dialect,
            main,
            query_id: query_id.to_string(),
            main_alias,
            aliases,
            joins: IndexMap::new(),
            subqueries: 0,
            additions: Vec::new(),
            join_reverse: false,
            unqualified: false,
        })
    }

    /// Planner for a correlated or IN subquery on `object`.
    pub fn child(&mut self, object: &str) -> CompileResult<Planner<'a>> {
        self.subqueries += 1;
        let id = format!("{}_{}", self.query_id, self.subqueries);
        let mut child = Planner::new(self.schema, self.options, object, &id)?;
        child.join_reverse = true;
        Ok(child)
    }

    /// The main table, aliased unless columns are unqualified.
    pub fn main_table(&self) -> TableRef {
        let table = TableRef::new(&self.main.data_address);
        if self.unqualified {
            table
        } else {
            table.with_alias(&self.main_alias)
        }
    }

    /// The attribute needs a subquery because it lies behind a reverse relation.
    pub fn needs_subquery(&self, attr: &AttributeRef) -> bool {
        attr.has_reverse() && !self.join_reverse
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// Alias of the table at the end of `path`, joining as needed.
    pub fn table_alias(&mut self, path: &RelationPath) -> CompileResult<String> {
        let base_alias = self.main_alias.clone();
        let base_name = self.main.alias.clone();
        self.join_from(&base_alias, &base_name, path)
    }

    /// Join `path` starting at the table aliased `base_alias`.
    ///
    /// `base_name` seeds the full names of the joined aliases, so the same
    /// path from the same base always lands on the same alias.
    pub fn join_from(
        &mut self,
        base_alias: &str,
        base_name: &str,
        path: &RelationPath,
    ) -> CompileResult<String> {
        let mut left = base_alias.to_string();

        for (idx, step) in path.steps().iter().enumerate() {
            if step.is_reverse() && !self.join_reverse {
                return Err(CompileError::MissingAggregator {
                    attribute: path.alias_path(),
                });
            }

            let name = format!(
                "{}{}{}",
                base_name,
                path.prefix(idx + 1).alias_path(),
                self.query_id
            );
            let mut alias = self.aliases.short(&name);
            if alias == self.main_alias {
                alias = self.aliases.short(&format!(
                    "{}{}_R{}",
                    base_name,
                    path.prefix(idx + 1).alias_path(),
                    self.query_id
                ));
            }

            if !self.joins.contains_key(&alias) {
                let key = self.key_column(&step.source_object, &step.key_attribute)?;
                let target = self.schema.object(&step.target_object)?;
                let related_key =
                    self.key_column(&step.target_object, &step.related_key_attribute)?;
                let on = self
                    .qualified(&left, &key)
                    .eq(table_col(&alias, &related_key));
                trace!(alias = %alias, table = %target.data_address, "join");
                self.joins.insert(
                    alias.clone(),
                    Join {
                        join_type: JoinType::Left,
                        table: TableRef::new(&target.data_address).with_alias(&alias),
                        on,
                    },
                );
            }
            left = alias;
        }

        Ok(left)
    }

    /// Add a join built by the caller, keyed by its alias.
    pub fn add_join(&mut self, alias: &str, join: Join) {
        self.joins.entry(alias.to_string()).or_insert(join);
    }

    pub fn take_joins(&mut self) -> Vec<Join> {
        std::mem::take(&mut self.joins).into_values().collect()
    }

    /// Data address of `attribute` on `object`.
    pub fn key_column(&self, object: &str, attribute: &str) -> CompileResult<String> {
        let owner = self.schema.object(object)?;
        owner
            .attribute(attribute)
            .map(|a| a.data_address.clone())
            .ok_or_else(|| CompileError::UnknownAttribute {
                object: object.to_string(),
                attribute: attribute.to_string(),
            })
    }

    /// `alias.column`, or a bare column on the unqualified main table.
    pub fn qualified(&self, alias: &str, column: &str) -> Expr {
        if self.unqualified && alias == self.main_alias {
            col(column)
        } else {
            table_col(alias, column)
        }
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Row-level value of `attr`, joining its path.
    pub fn column(&mut self, attr: &AttributeRef) -> CompileResult<Expr> {
        let alias = self.table_alias(&attr.path)?;
        self.column_at(&alias, attr)
    }

    /// Row-level value of `attr` on the table aliased `alias`.
    pub fn column_at(&self, alias: &str, attr: &AttributeRef) -> CompileResult<Expr> {
        match attr.attribute.select_sql(self.dialect) {
            Some(sql) => self.render(sql, attr, alias, None),
            None => Ok(self.qualified(alias, &attr.attribute.data_address)),
        }
    }

    /// Sort value of `attr`: its ORDER BY SQL if it has one.
    pub fn sort_column_at(&self, alias: &str, attr: &AttributeRef) -> CompileResult<Expr> {
        match attr.attribute.order_by_sql(self.dialect) {
            Some(sql) => self.render(sql, attr, alias, None),
            None => self.column_at(alias, attr),
        }
    }

    /// Fill `[#alias#]` (and `[#value#]` if given) in a metamodel template.
    pub fn render(
        &self,
        sql: &str,
        attr: &AttributeRef,
        alias: &str,
        value: Option<SqlFragment>,
    ) -> CompileResult<Expr> {
        let alias_fragment = if self.unqualified && alias == self.main_alias {
            SqlFragment::name(&self.main.data_address)
        } else {
            SqlFragment::identifier(alias, self.dialect)
        };
        let mut bindings = vec![("alias", alias_fragment)];
        if let Some(value) = value {
            bindings.push(("value", value));
        }

        template::render(sql, &bindings)
            .map(|rendered| raw_sql(&rendered))
            .map_err(|source| CompileError::Template {
                attribute: attr.alias_path.clone(),
                source,
            })
    }

    // =========================================================================
    // Additions
    // =========================================================================

    /// Queue a part for the next pass.
    pub fn queue(&mut self, part: QueryPart) {
        if !self.additions.contains(&part) {
            trace!(query = %self.query_id, attribute = %part.attribute().expression(), "queued addition");
            self.additions.push(part);
        }
    }

    pub fn take_additions(&mut self) -> Vec<QueryPart> {
        std::mem::take(&mut self.additions)
    }

    /// Column key of a select computing `attr`, queueing a hidden one if the
    /// query has none yet.
    pub fn request_select(
        &mut self,
        parts: &[QueryPart],
        attr: &AttributeRef,
        for_sorting: bool,
    ) -> Option<String> {
        let for_sorting = for_sorting && attr.attribute.order_by_sql(self.dialect).is_some();
        let expression = attr.expression();
        let found = parts.iter().filter_map(QueryPart::as_select).find(|s| {
            s.attribute.expression() == expression && s.for_sorting == for_sorting
        });
        if let Some(select) = found {
            return Some(select.column_key.clone());
        }

        let mut select = Select::new(attr.clone()).hidden();
        if for_sorting {
            select.column_key = format!("{}#SORT", expression);
            select.for_sorting = true;
        }
        self.queue(QueryPart::Select(select));
        None
    }
}
