//! Query builder: the recursive orchestrator.
//!
//! One [`CompileContext`] lives for exactly one compile call. It owns that
//! call's alias allocator and relation cache, and borrows everything else
//! (schema, registries, options) read-only. Each scope is compiled into a
//! sealed [`CompiledQuery`] that its parent embeds as a column.

use serde_json::Value;
use tracing::debug;

use super::aggregators::{AggregateTarget, AggregatorRegistry};
use super::alias::{AliasAllocator, TableAlias};
use super::error::{CompileError, CompileResult, FieldPath};
use super::operators::{json_type, OperatorRegistry};
use super::projection::{CompiledQuery, Embedding, ProjectionItem, ScopeJoin};
use super::{CompileOptions, RootProjection};
use crate::schema::naming::{aggregate_target, is_valid_identifier};
use crate::schema::{FieldDef, RelationDescriptor, RelationResolver, Schema, TypeDef};
use crate::selection::SelectionField;
use crate::sql::{and_all, count_star, json_object, lit_int, param, table_col, Expr, ExprExt, OrderByExpr};

const TYPENAME_FIELD: &str = "__typename";

/// Arguments accepted by list scopes.
const LIST_ARGUMENTS: &[&str] = &["filter", "limit", "offset", "orderBy"];
/// Arguments accepted by single-row scopes.
const SINGLE_ARGUMENTS: &[&str] = &["filter"];
/// Arguments accepted by aggregate fields.
const AGGREGATE_ARGUMENTS: &[&str] = &["filter", "groupBy"];

/// Where a scope's rows come from and how they tie to the parent row.
pub(super) struct ScopeSource<'f> {
    pub type_name: &'f str,
    pub table: TableAlias,
    pub joins: Vec<ScopeJoin>,
    pub correlation: Option<Expr>,
    /// Whether the scope returns many rows.
    pub list: bool,
    /// Limit applied to list scopes without a `limit` argument.
    pub default_limit: Option<u64>,
}

/// State of one compile call.
pub(crate) struct CompileContext<'c> {
    pub(super) schema: &'c Schema,
    pub(super) operators: &'c OperatorRegistry,
    pub(super) aggregators: &'c AggregatorRegistry,
    pub(super) options: &'c CompileOptions,
    pub(super) aliases: &'c mut dyn AliasAllocator,
    pub(super) relations: RelationResolver<'c>,
}

impl<'c> CompileContext<'c> {
    pub(crate) fn new(
        schema: &'c Schema,
        operators: &'c OperatorRegistry,
        aggregators: &'c AggregatorRegistry,
        options: &'c CompileOptions,
        aliases: &'c mut dyn AliasAllocator,
    ) -> Self {
        Self {
            schema,
            operators,
            aggregators,
            options,
            aliases,
            relations: RelationResolver::new(schema),
        }
    }

    // =========================================================================
    // Entry point
    // =========================================================================

    /// Compile a top-level query field.
    pub(crate) fn compile_root(&mut self, field: &SelectionField) -> CompileResult<CompiledQuery> {
        let schema = self.schema;
        let path = FieldPath::root(field.output_name());
        check_alias(field, &path)?;

        if let Some(target) = aggregate_target(&field.name) {
            let def = self.root_list_field(target, &path)?;
            let table = self.aliases.allocate(&schema.table_for(&def.type_name));
            let source = ScopeSource {
                type_name: &def.type_name,
                table,
                joins: Vec::new(),
                correlation: None,
                list: true,
                default_limit: Some(self.options.default_limit),
            };
            return self.compile_aggregate(source, field, false, &path);
        }

        let def = schema
            .root_field(&field.name)
            .ok_or_else(|| CompileError::schema(&path, format!("unknown query field '{}'", field.name)))?;
        if !schema.is_object_type(&def.type_name) {
            return Err(CompileError::schema(
                &path,
                format!("query field '{}' does not return an object type", field.name),
            ));
        }

        let embedding = match (self.options.root_projection, def.list) {
            (RootProjection::Rows, _) => Embedding::Row,
            (RootProjection::Json, true) => Embedding::Array,
            (RootProjection::Json, false) => Embedding::Object,
        };
        let table = self.aliases.allocate(&schema.table_for(&def.type_name));
        debug!(field = %field.name, table = %table.table, alias = %table.alias, "root scope");

        let source = ScopeSource {
            type_name: &def.type_name,
            table,
            joins: Vec::new(),
            correlation: None,
            list: def.list,
            default_limit: Some(self.options.default_limit),
        };
        self.compile_scope(source, field, embedding, &path)
    }

    fn root_list_field(&self, name: &str, path: &FieldPath) -> CompileResult<FieldDef> {
        match self.schema.root_field(name) {
            Some(def) if def.list && self.schema.is_object_type(&def.type_name) => Ok(def.into_owned()),
            _ => Err(CompileError::schema(
                path,
                format!("aggregate target '{}' is not a list query field", name),
            )),
        }
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    /// Compile one row-returning scope: projection, children, filter, order,
    /// pagination, then the wrapper alias when the scope is embedded.
    pub(super) fn compile_scope(
        &mut self,
        source: ScopeSource<'_>,
        field: &SelectionField,
        embedding: Embedding,
        path: &FieldPath,
    ) -> CompileResult<CompiledQuery> {
        let allowed = if source.list { LIST_ARGUMENTS } else { SINGLE_ARGUMENTS };
        check_arguments(field, allowed, path)?;
        if !field.has_selections() {
            return Err(CompileError::argument(path, "a selection set is required"));
        }

        let schema = self.schema;
        let type_def = schema.type_def(source.type_name).ok_or_else(|| {
            CompileError::schema(path, format!("unknown type '{}'", source.type_name))
        })?;

        let mut scope = CompiledQuery::new(source.table, embedding);
        scope.joins = source.joins;
        scope.correlation = source.correlation;

        let selections = merge_selections(&field.selections, path)?;
        let alias = scope.table.alias.clone();

        if let Some(typename) = &type_def.typename {
            let explicit = selections.iter().any(|s| s.name == typename.field);
            if type_def.is_interface() && !explicit {
                scope
                    .projection
                    .push(ProjectionItem::column(&typename.field, &alias, &typename.field));
            }
        }

        for child in &selections {
            if child.name == TYPENAME_FIELD {
                continue;
            }
            let child_path = path.child(child.output_name());
            check_alias(child, &child_path)?;
            let item = self.compile_selection(source.type_name, type_def, &scope.table, child, &child_path)?;
            scope.projection.push(item);
        }

        if let Some(filter) = field.argument("filter") {
            scope.filter = self.build_filter(source.type_name, &alias, filter, &path.child("filter"))?;
            debug!(alias = %alias, "applied filter");
        }

        if source.list {
            scope.order_by = self.order_by(type_def, &alias, field, path)?;
            scope.limit = self.limit(field, source.default_limit, path)?.map(param);
            scope.offset = self.offset(field, path)?.map(param);
        } else {
            scope.limit = Some(lit_int(1));
        }

        if embedding != Embedding::Row {
            scope.wrapper_alias = Some(self.aliases.next_alias());
        }
        Ok(scope)
    }

    fn compile_selection(
        &mut self,
        type_name: &str,
        type_def: &TypeDef,
        table: &TableAlias,
        child: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<ProjectionItem> {
        let output = child.output_name();

        let Some(def) = type_def.field(&child.name) else {
            if let Some(target) = aggregate_target(&child.name) {
                return self.compile_relation_aggregate(type_name, type_def, table, target, child, path);
            }
            return Err(CompileError::schema(
                path,
                format!("unknown field '{}' on type '{}'", child.name, type_name),
            ));
        };

        if !self.schema.is_object_type(&def.type_name) {
            if child.has_selections() {
                return Err(CompileError::schema(
                    path,
                    format!("field '{}' has sub-selections but no relation metadata", child.name),
                ));
            }
            check_arguments(child, &[], path)?;
            let column = self.column_name(type_def, &child.name);
            return Ok(ProjectionItem::column(output, &table.alias, &column));
        }

        let relation = self.relations.resolve(type_name, def).ok_or_else(|| {
            CompileError::schema(
                path,
                format!("field '{}' is used as a relation but has no relation metadata", child.name),
            )
        })?;
        let nested = self.compile_relation(&table.alias, &relation, child, path)?;
        Ok(ProjectionItem::relation(output, nested))
    }

    /// Nested scope for a relation field, embedded by relation kind.
    fn compile_relation(
        &mut self,
        parent_alias: &str,
        relation: &RelationDescriptor,
        child: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<CompiledQuery> {
        let table = self.aliases.allocate(&relation.reference_table);
        let (joins, correlation) = self.correlate(parent_alias, &table, relation);
        let many = relation.kind.is_many();
        debug!(
            field = %child.name,
            table = %table.table,
            alias = %table.alias,
            kind = %relation.kind,
            "relation scope"
        );

        let source = ScopeSource {
            type_name: &relation.reference_type,
            table,
            joins,
            correlation,
            list: many,
            default_limit: Some(self.options.default_limit),
        };
        let embedding = if many { Embedding::Array } else { Embedding::Object };
        self.compile_scope(source, child, embedding, path)
    }

    /// Key-pair equalities tying `target` to the parent row. Many-to-many
    /// relations join the join table onto the target and correlate through it.
    pub(super) fn correlate(
        &mut self,
        parent_alias: &str,
        target: &TableAlias,
        relation: &RelationDescriptor,
    ) -> (Vec<ScopeJoin>, Option<Expr>) {
        match &relation.join {
            Some(join) => {
                let join_alias = self.aliases.allocate(&join.table);
                let on = key_pairs(&target.alias, &relation.foreign_keys, &join_alias.alias, &join.foreign_keys);
                let correlation = key_pairs(parent_alias, &relation.local_keys, &join_alias.alias, &join.local_keys);
                let joins = on
                    .map(|on| ScopeJoin { table: join_alias, on })
                    .into_iter()
                    .collect();
                (joins, correlation)
            }
            None => (
                Vec::new(),
                key_pairs(parent_alias, &relation.local_keys, &target.alias, &relation.foreign_keys),
            ),
        }
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    fn compile_relation_aggregate(
        &mut self,
        type_name: &str,
        type_def: &TypeDef,
        table: &TableAlias,
        target: &str,
        child: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<ProjectionItem> {
        let relation = type_def
            .field(target)
            .filter(|f| self.schema.is_object_type(&f.type_name))
            .and_then(|f| self.relations.resolve(type_name, f))
            .filter(|r| r.kind.is_many())
            .ok_or_else(|| {
                CompileError::schema(
                    path,
                    format!("'{}' aggregates '{}', which is not a list relation", child.name, target),
                )
            })?;

        let reference = self.aliases.allocate(&relation.reference_table);
        let (joins, correlation) = self.correlate(&table.alias, &reference, &relation);
        let source = ScopeSource {
            type_name: &relation.reference_type,
            table: reference,
            joins,
            correlation,
            list: true,
            default_limit: Some(self.options.default_limit),
        };
        let nested = self.compile_aggregate(source, child, true, path)?;
        Ok(ProjectionItem::relation(child.output_name(), nested))
    }

    /// One row per group: `count`, `group` and registry aggregators.
    ///
    /// An embedded aggregate without `groupBy` yields exactly one row and is
    /// embedded as an object. Grouped aggregates embed as an array and are
    /// capped by the source's default limit.
    fn compile_aggregate(
        &mut self,
        source: ScopeSource<'_>,
        field: &SelectionField,
        embedded: bool,
        path: &FieldPath,
    ) -> CompileResult<CompiledQuery> {
        check_arguments(field, AGGREGATE_ARGUMENTS, path)?;
        if !field.has_selections() {
            return Err(CompileError::argument(path, "a selection set is required"));
        }
        let schema = self.schema;
        let type_def = schema.type_def(source.type_name).ok_or_else(|| {
            CompileError::schema(path, format!("unknown type '{}'", source.type_name))
        })?;

        let group_columns = self.group_by(type_def, field, path)?;
        let grouped = !group_columns.is_empty();
        let embedding = match (embedded, grouped) {
            (false, _) => Embedding::Row,
            (true, false) => Embedding::Object,
            (true, true) => Embedding::Array,
        };

        let mut scope = CompiledQuery::new(source.table, embedding);
        scope.joins = source.joins;
        scope.correlation = source.correlation;
        let alias = scope.table.alias.clone();
        debug!(field = %field.name, alias = %alias, groups = group_columns.len(), "aggregate scope");

        for child in merge_selections(&field.selections, path)? {
            if child.name == TYPENAME_FIELD {
                continue;
            }
            let child_path = path.child(child.output_name());
            check_alias(&child, &child_path)?;
            check_arguments(&child, &[], &child_path)?;

            let expr = match child.name.as_str() {
                "count" => count_star(),
                "group" => {
                    if group_columns.is_empty() {
                        return Err(CompileError::argument(&child_path, "group requires a groupBy argument"));
                    }
                    json_object(
                        group_columns
                            .iter()
                            .map(|(key, column)| (key.clone(), table_col(&alias, column)))
                            .collect(),
                    )
                }
                name => {
                    let aggregator = self
                        .aggregators
                        .get(name)
                        .ok_or_else(|| CompileError::unknown_aggregator(&child_path, name))?;
                    let targets = self.aggregate_targets(type_def, &child, &child_path)?;
                    aggregator(&alias, &targets)
                }
            };
            scope.projection.push(ProjectionItem::expr(child.output_name(), expr));
        }

        if let Some(filter) = field.argument("filter") {
            scope.filter = self.build_filter(source.type_name, &alias, filter, &path.child("filter"))?;
        }
        scope.group_by = group_columns
            .iter()
            .map(|(_, column)| table_col(&alias, column))
            .collect();
        if grouped {
            scope.limit = source.default_limit.map(param);
        }

        if embedding != Embedding::Row {
            scope.wrapper_alias = Some(self.aliases.next_alias());
        }
        Ok(scope)
    }

    /// `groupBy: ["category"]` as (key, column) pairs.
    fn group_by(
        &self,
        type_def: &TypeDef,
        field: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<Vec<(String, String)>> {
        let path = path.child("groupBy");
        let names: Vec<&str> = match field.argument("groupBy") {
            None => return Ok(Vec::new()),
            Some(Value::String(name)) => vec![name.as_str()],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| {
                        CompileError::argument(&path, format!("expected a field name, got {}", json_type(item)))
                    })
                })
                .collect::<CompileResult<_>>()?,
            Some(other) => {
                return Err(CompileError::argument(
                    &path,
                    format!("expected a list of field names, got {}", json_type(other)),
                ))
            }
        };

        names
            .into_iter()
            .map(|name| {
                let column = self.scalar_column(type_def, name, &path)?;
                Ok((name.to_string(), column))
            })
            .collect()
    }

    fn aggregate_targets(
        &self,
        type_def: &TypeDef,
        field: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<Vec<AggregateTarget>> {
        if !field.has_selections() {
            return Err(CompileError::argument(
                path,
                format!("aggregator '{}' requires a selection of fields", field.name),
            ));
        }
        merge_selections(&field.selections, path)?
            .iter()
            .map(|target| {
                let target_path = path.child(target.output_name());
                check_alias(target, &target_path)?;
                let column = self.scalar_column(type_def, &target.name, &target_path)?;
                Ok(AggregateTarget::new(target.output_name(), column))
            })
            .collect()
    }

    // =========================================================================
    // Ordering and pagination
    // =========================================================================

    fn order_by(
        &self,
        type_def: &TypeDef,
        alias: &str,
        field: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<Vec<OrderByExpr>> {
        let path = path.child("orderBy");
        let entries: Vec<&Value> = match field.argument("orderBy") {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value) => vec![value],
        };

        let mut order = Vec::new();
        for entry in entries {
            let object = entry.as_object().ok_or_else(|| {
                CompileError::argument(&path, format!("expected {{field: direction}}, got {}", json_type(entry)))
            })?;
            for (name, direction) in object {
                let column = self.scalar_column(type_def, name, &path)?;
                let expr = table_col(alias, &column);
                let directive = match direction.as_str() {
                    Some("ASC") => OrderByExpr::asc(expr).nulls_last(),
                    Some("ASC_NULL_FIRST") => OrderByExpr::asc(expr).nulls_first(),
                    Some("DESC") => OrderByExpr::desc(expr).nulls_last(),
                    Some("DESC_NULL_FIRST") => OrderByExpr::desc(expr).nulls_first(),
                    _ => {
                        return Err(CompileError::argument(
                            &path.child(name),
                            format!("invalid order direction {}", direction),
                        ))
                    }
                };
                order.push(directive);
            }
        }
        Ok(order)
    }

    fn limit(
        &self,
        field: &SelectionField,
        default: Option<u64>,
        path: &FieldPath,
    ) -> CompileResult<Option<u64>> {
        let Some(value) = field.argument("limit") else {
            return Ok(default);
        };
        let limit = non_negative(value, "limit", path)?;
        match self.options.max_limit {
            Some(max) if limit > max => Err(CompileError::argument(
                &path.child("limit"),
                format!("limit {} exceeds the maximum of {}", limit, max),
            )),
            _ => Ok(Some(limit)),
        }
    }

    fn offset(&self, field: &SelectionField, path: &FieldPath) -> CompileResult<Option<u64>> {
        field
            .argument("offset")
            .map(|value| non_negative(value, "offset", path))
            .transpose()
    }

    /// Storage column of a scalar field. The typename column is used verbatim.
    pub(super) fn column_name(&self, type_def: &TypeDef, name: &str) -> String {
        match &type_def.typename {
            Some(typename) if typename.field == name => name.to_string(),
            _ => self.options.column_case.column_name(name),
        }
    }

    /// Column for a scalar field of `type_def`.
    fn scalar_column(&self, type_def: &TypeDef, name: &str, path: &FieldPath) -> CompileResult<String> {
        match type_def.field(name) {
            Some(def) if !self.schema.is_object_type(&def.type_name) => Ok(self.column_name(type_def, name)),
            Some(_) => Err(CompileError::argument(
                path,
                format!("'{}' is a relation, not a column", name),
            )),
            None => Err(CompileError::schema(path, format!("unknown field '{}'", name))),
        }
    }
}

/// AND of `left.a[i] = right.b[i]`.
fn key_pairs(left: &str, left_keys: &[String], right: &str, right_keys: &[String]) -> Option<Expr> {
    and_all(
        left_keys
            .iter()
            .zip(right_keys)
            .map(|(l, r)| table_col(left, l).eq(table_col(right, r))),
    )
}

fn check_alias(field: &SelectionField, path: &FieldPath) -> CompileResult<()> {
    match &field.alias {
        Some(alias) if !is_valid_identifier(alias) => Err(CompileError::argument(
            path,
            format!("invalid alias '{}'", alias),
        )),
        _ => Ok(()),
    }
}

fn check_arguments(field: &SelectionField, allowed: &[&str], path: &FieldPath) -> CompileResult<()> {
    match field.arguments.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(CompileError::argument(
            path,
            format!("unknown argument '{}' on '{}'", key, field.name),
        )),
        None => Ok(()),
    }
}

fn non_negative(value: &Value, name: &str, path: &FieldPath) -> CompileResult<u64> {
    value.as_u64().ok_or_else(|| {
        CompileError::argument(
            &path.child(name),
            format!("{} must be a non-negative integer, got {}", name, value),
        )
    })
}

/// Fold repeated selections of one output name into a single field.
///
/// The same field under the same name (and arguments) merges its
/// sub-selections; two different fields claiming one name is an error.
fn merge_selections(selections: &[SelectionField], path: &FieldPath) -> CompileResult<Vec<SelectionField>> {
    let mut merged: Vec<SelectionField> = Vec::with_capacity(selections.len());
    for selection in selections {
        let existing = merged
            .iter_mut()
            .find(|m| m.output_name() == selection.output_name());
        match existing {
            None => merged.push(selection.clone()),
            Some(m) if m.name == selection.name && m.arguments == selection.arguments => {
                m.selections.extend(selection.selections.iter().cloned());
            }
            Some(m) => {
                return Err(CompileError::argument(
                    &path.child(selection.output_name()),
                    format!(
                        "output name '{}' is claimed by both '{}' and '{}'",
                        selection.output_name(),
                        m.name,
                        selection.name
                    ),
                ))
            }
        }
    }
    Ok(merged)
}
