//! Filter / logical expression builder.
//!
//! Turns a `filter` argument into one boolean expression over a scope's
//! alias. Keys are resolved in this order:
//!
//! 1. `AND` / `OR` (lists of filters) and `NOT` (one filter)
//! 2. scalar fields, mapped to `{operator: value}` objects
//! 3. relation fields, mapped to a nested filter checked with `EXISTS`
//! 4. on interface types, implementing type names, mapped to a nested filter
//!    on the same row restricted to that type
//!
//! Sibling keys are ANDed in request order. `None` means "no predicate".

use serde_json::{Map, Value};
use tracing::debug;

use super::builder::CompileContext;
use super::error::{CompileError, CompileResult, FieldPath};
use super::operators::json_type;
use super::projection::exists_probe;
use crate::schema::RelationDescriptor;
use crate::sql::{and_all, lit_bool, or_all, param, table_col, Expr, ExprExt};

impl CompileContext<'_> {
    /// Build the predicate for `filter` against rows of `type_name` aliased as `alias`.
    pub(super) fn build_filter(
        &mut self,
        type_name: &str,
        alias: &str,
        filter: &Value,
        path: &FieldPath,
    ) -> CompileResult<Option<Expr>> {
        let object = filter.as_object().ok_or_else(|| {
            CompileError::filter_shape(
                path,
                format!("filter must be an object, got {}", json_type(filter)),
            )
        })?;

        let mut predicates = Vec::with_capacity(object.len());
        for (key, value) in object {
            let key_path = path.child(key);
            let predicate = match key.as_str() {
                "AND" => self.build_and(type_name, alias, value, &key_path)?,
                "OR" => self.build_or(type_name, alias, value, &key_path)?,
                "NOT" => self.build_not(type_name, alias, value, &key_path)?,
                _ => self.build_key(type_name, alias, key, value, &key_path)?,
            };
            predicates.extend(predicate);
        }
        Ok(and_all(predicates))
    }

    fn build_and(
        &mut self,
        type_name: &str,
        alias: &str,
        value: &Value,
        path: &FieldPath,
    ) -> CompileResult<Option<Expr>> {
        let items = logical_list(value, path)?;
        let mut predicates = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            predicates.extend(self.build_filter(type_name, alias, item, &path.child(&i.to_string()))?);
        }
        Ok(and_all(predicates))
    }

    fn build_or(
        &mut self,
        type_name: &str,
        alias: &str,
        value: &Value,
        path: &FieldPath,
    ) -> CompileResult<Option<Expr>> {
        let items = logical_list(value, path)?;
        if items.is_empty() {
            return Ok(Some(lit_bool(false)));
        }

        let mut predicates = Vec::with_capacity(items.len());
        let mut tautology = false;
        for (i, item) in items.iter().enumerate() {
            match self.build_filter(type_name, alias, item, &path.child(&i.to_string()))? {
                Some(predicate) => predicates.push(predicate),
                None => tautology = true,
            }
        }
        // An unconstrained branch matches every row
        Ok(if tautology { None } else { or_all(predicates) })
    }

    fn build_not(
        &mut self,
        type_name: &str,
        alias: &str,
        value: &Value,
        path: &FieldPath,
    ) -> CompileResult<Option<Expr>> {
        if !value.is_object() {
            return Err(CompileError::filter_shape(
                path,
                format!("NOT expects a filter object, got {}", json_type(value)),
            ));
        }
        Ok(Some(match self.build_filter(type_name, alias, value, path)? {
            Some(predicate) => predicate.paren().not(),
            None => lit_bool(false),
        }))
    }

    fn build_key(
        &mut self,
        type_name: &str,
        alias: &str,
        key: &str,
        value: &Value,
        path: &FieldPath,
    ) -> CompileResult<Option<Expr>> {
        let schema = self.schema;
        let type_def = schema
            .type_def(type_name)
            .ok_or_else(|| CompileError::schema(path, format!("unknown type '{}'", type_name)))?;

        if let Some(field) = type_def.field(key) {
            if !schema.is_object_type(&field.type_name) {
                let column = self.column_name(type_def, key);
                return self.build_operators(alias, &column, value, path);
            }
            let relation = self.relations.resolve(type_name, field).ok_or_else(|| {
                CompileError::schema(
                    path,
                    format!("field '{}' has no relation metadata and cannot be filtered as a relation", key),
                )
            })?;
            return self.build_exists(alias, &relation, value, path).map(Some);
        }

        if type_def.is_interface() && schema.implementors(type_name).contains(&key) {
            return self.build_implementor(type_name, alias, key, value, path);
        }

        Err(CompileError::schema(
            path,
            format!("unknown field '{}' on type '{}'", key, type_name),
        ))
    }

    /// `{gt: 1, lt: 5}` against one column.
    fn build_operators(
        &self,
        alias: &str,
        column: &str,
        value: &Value,
        path: &FieldPath,
    ) -> CompileResult<Option<Expr>> {
        let operators = value.as_object().ok_or_else(|| {
            CompileError::filter_shape(
                path,
                format!("expected an operator object, got {}", json_type(value)),
            )
        })?;

        let mut predicates = Vec::with_capacity(operators.len());
        for (name, operand) in operators {
            let op = self
                .operators
                .get(name)
                .ok_or_else(|| CompileError::operator(path, name))?;
            let predicate = op(alias, column, operand)
                .map_err(|e| CompileError::filter_shape(&path.child(name), e.0))?;
            predicates.push(predicate);
        }
        Ok(and_all(predicates))
    }

    /// `EXISTS (SELECT 1 FROM <related> WHERE <correlation> AND <nested filter>)`
    fn build_exists(
        &mut self,
        parent_alias: &str,
        relation: &RelationDescriptor,
        value: &Value,
        path: &FieldPath,
    ) -> CompileResult<Expr> {
        let nested = value.as_object().ok_or_else(|| {
            CompileError::filter_shape(
                path,
                format!("relation filter must be an object, got {}", json_type(value)),
            )
        })?;
        self.reject_operator_keys(relation, nested, path)?;

        let table = self.aliases.allocate(&relation.reference_table);
        let (joins, correlation) = self.correlate(parent_alias, &table, relation);
        debug!(
            table = %table.table,
            alias = %table.alias,
            kind = %relation.kind,
            "relation filter"
        );

        let sub = self.build_filter(&relation.reference_type, &table.alias, value, path)?;
        let predicate = and_all(correlation.into_iter().chain(sub));
        Ok(Expr::Exists(Box::new(exists_probe(&table, &joins, predicate))))
    }

    fn reject_operator_keys(
        &self,
        relation: &RelationDescriptor,
        nested: &Map<String, Value>,
        path: &FieldPath,
    ) -> CompileResult<()> {
        let target = self.schema.type_def(&relation.reference_type);
        let misplaced = nested.keys().find(|key| {
            self.operators.contains(key) && target.is_none_or(|t| t.field(key).is_none())
        });
        match misplaced {
            Some(op) => Err(CompileError::argument(
                path,
                format!("operator '{}' cannot be applied to a relation field", op),
            )),
            None => Ok(()),
        }
    }

    /// Nested filter on the same row, restricted to one implementing type.
    fn build_implementor(
        &mut self,
        interface: &str,
        alias: &str,
        type_name: &str,
        value: &Value,
        path: &FieldPath,
    ) -> CompileResult<Option<Expr>> {
        let typename = self
            .schema
            .type_def(interface)
            .and_then(|t| t.typename.as_ref())
            .ok_or_else(|| {
                CompileError::schema(
                    path,
                    format!("interface '{}' has no typename column", interface),
                )
            })?;

        let discriminator =
            table_col(alias, &typename.field).eq(param(type_name.to_lowercase()));
        let sub = self.build_filter(type_name, alias, value, path)?;
        Ok(and_all(std::iter::once(discriminator).chain(sub)))
    }
}

fn logical_list<'v>(value: &'v Value, path: &FieldPath) -> CompileResult<&'v Vec<Value>> {
    value.as_array().ok_or_else(|| {
        CompileError::filter_shape(
            path,
            format!("expected a list of filters, got {}", json_type(value)),
        )
    })
}
