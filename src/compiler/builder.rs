//! The query builder: parts in, SQL out.

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::error::{CompileError, CompileResult};
use crate::model::Schema;
use crate::query::{
    Aggregation, AttributeRef, Comparator, Filter, FilterGroup, FilterGroupSpec, PartId,
    QueryPart, QuerySpec, Select, Sorter, Value,
};
use crate::sql::SortDir;

use super::planner::Planner;
use super::read::{self, ReadMode, ReadRequest};
use super::result::{CompiledCount, CompiledRead};
use super::write::{self, WritePlan};
use super::CompileOptions;

/// Collects the parts of one query against one main object and compiles
/// them for the configured dialect.
///
/// ```ignore
/// let mut query = QueryBuilder::new(&schema, "ORDER", CompileOptions::new(Dialect::Postgres))?;
/// query.add_select("CUSTOMER__NAME")?;
/// query.add_filter("POSITION__QTY:SUM", Comparator::GreaterThan, json!(10))?;
/// query.set_limit(Some(20), 0);
/// let read = query.compile_read()?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder<'s> {
    schema: &'s Schema,
    options: CompileOptions,
    main_object: String,
    query_id: String,
    parts: Vec<QueryPart>,
    filters: FilterGroup,
    limit: Option<u64>,
    offset: u64,
    distinct: bool,
}

impl<'s> QueryBuilder<'s> {
    pub fn new(schema: &'s Schema, object: &str, options: CompileOptions) -> CompileResult<Self> {
        schema.object(object)?;
        Ok(Self {
            schema,
            options,
            main_object: object.to_string(),
            query_id: "0".to_string(),
            parts: Vec::new(),
            filters: FilterGroup::and(),
            limit: None,
            offset: 0,
            distinct: false,
        })
    }

    /// Build from a JSON query description.
    pub fn from_spec(
        schema: &'s Schema,
        spec: &QuerySpec,
        options: CompileOptions,
    ) -> CompileResult<Self> {
        let mut builder = Self::new(schema, &spec.object, options)?;

        for column in &spec.columns {
            builder.add_select_as(column.attribute(), column.column_key(), column.hidden())?;
        }
        if let Some(filters) = &spec.filters {
            builder.filters = builder.filter_group(filters)?;
        }
        for sorter in &spec.sorters {
            builder.add_sorter(&sorter.attribute, sorter.direction)?;
        }
        for aggregation in &spec.aggregations {
            builder.add_aggregation(aggregation)?;
        }
        for value in &spec.values {
            builder.add_values_with_uids(&value.attribute, value.values.clone(), value.uids.clone())?;
        }
        builder.set_limit(spec.limit, spec.offset.unwrap_or(0));
        builder.distinct = spec.distinct;

        Ok(builder)
    }

    fn filter_group(&self, spec: &FilterGroupSpec) -> CompileResult<FilterGroup> {
        let mut group = FilterGroup::new(spec.operator);
        for condition in &spec.conditions {
            let mut filter = Filter::new(
                self.resolve(&condition.attribute)?,
                condition.comparator,
                condition.value.clone(),
            );
            filter.apply_after_read = condition.apply_after_read;
            group.add_filter(filter);
        }
        for nested in &spec.groups {
            group.add_group(self.filter_group(nested)?);
        }
        Ok(group)
    }

    pub fn main_object(&self) -> &str {
        &self.main_object
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }

    pub fn part(&self, id: PartId) -> Option<&QueryPart> {
        self.parts.get(id.0)
    }

    pub fn filters(&self) -> &FilterGroup {
        &self.filters
    }

    /// Resolve an attribute expression against the main object.
    pub fn resolve(&self, expression: &str) -> CompileResult<AttributeRef> {
        AttributeRef::resolve(self.schema, &self.main_object, expression)
    }

    fn push(&mut self, part: QueryPart) -> PartId {
        self.parts.push(part);
        PartId(self.parts.len() - 1)
    }

    // =========================================================================
    // Parts
    // =========================================================================

    pub fn add_select(&mut self, expression: &str) -> CompileResult<PartId> {
        let attr = self.resolve(expression)?;
        let key = attr.expression();
        self.add_select_as(expression, &key, false)
    }

    /// Select under a custom column key; a second select with the same key
    /// returns the first.
    pub fn add_select_as(
        &mut self,
        expression: &str,
        column_key: &str,
        hidden: bool,
    ) -> CompileResult<PartId> {
        let existing = self.parts.iter().position(|p| {
            p.as_select().is_some_and(|s| s.column_key == column_key)
        });
        if let Some(idx) = existing {
            return Ok(PartId(idx));
        }

        let mut select = Select::new(self.resolve(expression)?).with_key(column_key);
        select.hidden = hidden;
        Ok(self.push(QueryPart::Select(select)))
    }

    /// AND a condition into the root filter group.
    pub fn add_filter(
        &mut self,
        expression: &str,
        comparator: Comparator,
        value: JsonValue,
    ) -> CompileResult<()> {
        let filter = Filter::new(self.resolve(expression)?, comparator, value);
        self.add_filter_part(filter);
        Ok(())
    }

    /// AND a condition evaluated on decoded rows.
    pub fn add_filter_after_read(
        &mut self,
        expression: &str,
        comparator: Comparator,
        value: JsonValue,
    ) -> CompileResult<()> {
        let filter = Filter::new(self.resolve(expression)?, comparator, value).after_read();
        self.add_filter_part(filter);
        Ok(())
    }

    fn add_filter_part(&mut self, filter: Filter) {
        if self.filters.operator == crate::query::LogicalOperator::And {
            self.filters.add_filter(filter);
        } else {
            let previous = std::mem::replace(&mut self.filters, FilterGroup::and());
            self.filters = FilterGroup::and().with_group(previous).with_filter(filter);
        }
    }

    /// Replace all conditions.
    pub fn set_filters(&mut self, filters: FilterGroup) {
        self.filters = filters;
    }

    pub fn add_sorter(&mut self, expression: &str, direction: SortDir) -> CompileResult<PartId> {
        let attribute = self.resolve(expression)?;
        Ok(self.push(QueryPart::Sorter(Sorter {
            attribute,
            direction,
        })))
    }

    /// GROUP BY `expression`.
    pub fn add_aggregation(&mut self, expression: &str) -> CompileResult<PartId> {
        let attribute = self.resolve(expression)?;
        Ok(self.push(QueryPart::Aggregation(Aggregation { attribute })))
    }

    /// Values to write; one value is shared by every row.
    pub fn add_values(&mut self, expression: &str, values: Vec<JsonValue>) -> CompileResult<PartId> {
        self.add_values_with_uids(expression, values, Vec::new())
    }

    /// Values to write, each paired with the UID of the row it belongs to.
    pub fn add_values_with_uids(
        &mut self,
        expression: &str,
        values: Vec<JsonValue>,
        uids: Vec<JsonValue>,
    ) -> CompileResult<PartId> {
        let attribute = self.resolve(expression)?;
        Ok(self.push(QueryPart::Value(Value {
            attribute,
            values,
            uids,
        })))
    }

    /// Page size and start; `None` reads everything.
    pub fn set_limit(&mut self, limit: Option<u64>, offset: u64) {
        self.limit = limit;
        self.offset = offset;
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    /// Run planning passes until no pass adds parts.
    ///
    /// Works on a copy of the parts, so compiling twice gives the same SQL.
    fn plan_passes<T>(
        &self,
        mut plan: impl FnMut(&mut Planner<'_>, &[QueryPart]) -> CompileResult<T>,
    ) -> CompileResult<(T, usize)> {
        let mut parts = self.parts.clone();

        for pass in 1..=self.options.max_passes {
            let mut planner = Planner::new(self.schema, &self.options, &self.main_object, &self.query_id)?;
            let output = plan(&mut planner, &parts)?;

            let mut fresh = Vec::new();
            for addition in planner.take_additions() {
                if !parts.contains(&addition) && !fresh.contains(&addition) {
                    fresh.push(addition);
                }
            }
            if fresh.is_empty() {
                return Ok((output, pass));
            }

            trace!(object = %self.main_object, pass, added = fresh.len(), "pass added parts");
            parts.extend(fresh);
        }

        Err(CompileError::NotConverged {
            passes: self.options.max_passes,
        })
    }

    fn read_request(&self, mode: ReadMode) -> ReadRequest<'_> {
        ReadRequest {
            filters: &self.filters,
            limit: self.limit,
            offset: self.offset,
            distinct: self.distinct,
            mode,
        }
    }

    /// SELECT for one page of rows.
    pub fn compile_read(&self) -> CompileResult<CompiledRead> {
        let request = self.read_request(ReadMode::Rows);
        let mut aliases = None;
        let (plan, passes) = self.plan_passes(|planner, parts| {
            let plan = read::plan(planner, parts, &request)?;
            aliases = Some(planner.aliases.clone());
            Ok(plan)
        })?;
        let aliases = aliases.ok_or(CompileError::NotConverged { passes })?;

        let sql = plan.query.to_sql(self.options.dialect);
        debug!(object = %self.main_object, dialect = %self.options.dialect, passes, "compiled read:\n{}", sql);

        Ok(CompiledRead {
            sql,
            columns: plan.columns,
            limit: self.limit,
            offset: self.offset,
            paged_in_sql: plan.paged_in_sql,
            after_read: plan.after_read,
            passes,
            aliases,
            keys: plan.keys,
        })
    }

    /// `SELECT COUNT(*)` over the filtered (and grouped) rows, ignoring the page.
    pub fn compile_count(&self) -> CompileResult<CompiledCount> {
        let request = self.read_request(ReadMode::Count);
        let (plan, passes) = self.plan_passes(|planner, parts| read::plan(planner, parts, &request))?;

        let sql = plan.query.to_sql(self.options.dialect);
        debug!(object = %self.main_object, dialect = %self.options.dialect, passes, "compiled count:\n{}", sql);
        Ok(CompiledCount { sql, passes })
    }

    /// INSERT statements for the value parts.
    pub fn compile_create(&self) -> CompileResult<WritePlan> {
        let plan = self.compile_write(write::plan_insert)?;
        debug!(object = %self.main_object, statements = plan.statements.len(), "compiled create");
        Ok(plan)
    }

    /// UPDATE statements for the value parts, restricted by the filters or UIDs.
    pub fn compile_update(&self) -> CompileResult<WritePlan> {
        let filters = self.filters.clone();
        let plan = self.compile_write(|planner, parts| write::plan_update(planner, parts, &filters))?;
        debug!(object = %self.main_object, statements = plan.statements.len(), "compiled update");
        Ok(plan)
    }

    /// DELETE restricted by the filters.
    pub fn compile_delete(&self) -> CompileResult<WritePlan> {
        let filters = self.filters.clone();
        let plan = self.compile_write(|planner, _| write::plan_delete(planner, &filters))?;
        debug!(object = %self.main_object, statements = plan.statements.len(), "compiled delete");
        Ok(plan)
    }

    fn compile_write(
        &self,
        plan: impl FnOnce(&mut Planner<'_>, &[QueryPart]) -> CompileResult<WritePlan>,
    ) -> CompileResult<WritePlan> {
        let mut planner =
            Planner::new(self.schema, &self.options, &self.main_object, &self.query_id)?;
        let plan = plan(&mut planner, &self.parts)?;
        for statement in &plan.statements {
            debug!(object = %self.main_object, "{}", statement.sql);
        }
        Ok(plan)
    }
}
