//! Mutation compiler.
//!
//! `createUsers`, `updateUsers` and `deleteUsers` compile to a data-modifying
//! CTE whose `RETURNING *` rows feed the payload selection:
//!
//! ```sql
//! WITH "create_users" AS (INSERT INTO ... RETURNING *)
//! SELECT (<json array over create_users>) AS "users",
//!        (SELECT COUNT(*) FROM "create_users") AS "rows_affected"
//! ```

use serde_json::{Map, Value};
use tracing::debug;

use super::builder::{CompileContext, ScopeSource};
use super::error::{CompileError, CompileResult, FieldPath};
use super::operators::json_type;
use super::projection::Embedding;
use crate::schema::naming::singularize;
use crate::schema::{TableName, TypeDef};
use crate::selection::SelectionField;
use crate::sql::{
    count_star, param, star, Cte, CteBody, Delete, Expr, ExprExt, Insert, Query, SelectExpr,
    SqlDialect, TableRef, Update,
};

const ROWS_AFFECTED: &str = "rows_affected";

/// Kind of data-modifying statement a mutation field maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Split `createUsers` into (`Create`, `Users`).
    pub fn parse(field: &str) -> Option<(Self, &str)> {
        [
            ("create", MutationKind::Create),
            ("update", MutationKind::Update),
            ("delete", MutationKind::Delete),
        ]
        .into_iter()
        .find_map(|(prefix, kind)| {
            field
                .strip_prefix(prefix)
                .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
                .map(|rest| (kind, rest))
        })
    }

    fn arguments(self) -> &'static [&'static str] {
        match self {
            MutationKind::Create => &["input"],
            MutationKind::Update => &["input", "filter"],
            MutationKind::Delete => &["filter"],
        }
    }
}

impl CompileContext<'_> {
    /// Compile a top-level mutation field into one statement.
    pub(crate) fn compile_mutation(&mut self, field: &SelectionField) -> CompileResult<Query> {
        let path = FieldPath::root(field.output_name());
        let dialect = self.options.dialect;
        if !dialect.supports_data_modifying_cte() {
            return Err(CompileError::unsupported(&path, dialect, "data-modifying mutations"));
        }

        let schema = self.schema;
        let (kind, plural) = MutationKind::parse(&field.name).ok_or_else(|| {
            CompileError::schema(&path, format!("unknown mutation field '{}'", field.name))
        })?;
        let (type_name, type_def) = schema.find_type(&singularize(plural)).ok_or_else(|| {
            CompileError::schema(&path, format!("no type matches mutation field '{}'", field.name))
        })?;
        if let Some(key) = field
            .arguments
            .keys()
            .find(|k| !kind.arguments().contains(&k.as_str()))
        {
            return Err(CompileError::argument(
                &path,
                format!("unknown argument '{}' on '{}'", key, field.name),
            ));
        }

        let table = schema.table_for(type_name);
        let cte_name = self.options.column_case.column_name(&field.name);
        debug!(field = %field.name, table = %table, cte = %cte_name, "mutation");

        let body = match kind {
            MutationKind::Create => CteBody::Insert(Box::new(self.insert(type_def, &table, field, &path)?)),
            MutationKind::Update => {
                CteBody::Update(Box::new(self.update(type_name, type_def, &table, field, &path)?))
            }
            MutationKind::Delete => CteBody::Delete(Box::new(self.delete(type_name, &table, field, &path)?)),
        };

        let payload = self.payload(type_name, &cte_name, field, &path)?;
        Ok(Query::new()
            .with_cte(Cte::modifying(&cte_name, body))
            .select(payload))
    }

    fn insert(
        &self,
        type_def: &TypeDef,
        table: &TableName,
        field: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<Insert> {
        let input_path = path.child("input");
        let rows: Vec<&Map<String, Value>> = match field.argument("input") {
            Some(Value::Object(row)) => vec![row],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        CompileError::argument(
                            &input_path,
                            format!("input rows must be objects, got {}", json_type(item)),
                        )
                    })
                })
                .collect::<CompileResult<_>>()?,
            Some(other) => {
                return Err(CompileError::argument(
                    &input_path,
                    format!("input must be an object or a list of objects, got {}", json_type(other)),
                ))
            }
            None => return Err(CompileError::argument(path, "missing input argument")),
        };
        if rows.is_empty() {
            return Err(CompileError::argument(&input_path, "input must contain at least one row"));
        }

        // Columns in first-seen order across all rows
        let mut keys: Vec<&str> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        let columns = keys
            .iter()
            .map(|key| self.input_column(type_def, key, &input_path))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut insert = Insert::into(&table.name).columns(columns);
        insert.schema = table.schema.clone();
        for row in rows {
            let cells = keys
                .iter()
                .map(|key| row.get(*key).map(|v| param(v.clone())))
                .collect();
            insert = insert.values_with_defaults(cells);
        }
        Ok(insert.returning([star()]))
    }

    fn update(
        &mut self,
        type_name: &str,
        type_def: &TypeDef,
        table: &TableName,
        field: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<Update> {
        let input_path = path.child("input");
        let input = match field.argument("input") {
            Some(Value::Object(input)) if !input.is_empty() => input,
            Some(Value::Object(_)) => {
                return Err(CompileError::argument(&input_path, "input must set at least one field"))
            }
            Some(other) => {
                return Err(CompileError::argument(
                    &input_path,
                    format!("input must be an object, got {}", json_type(other)),
                ))
            }
            None => return Err(CompileError::argument(path, "missing input argument")),
        };

        let target = self.aliases.allocate(table);
        let mut update = Update::table(&table.name).alias(&target.alias);
        update.schema = table.schema.clone();
        for (key, value) in input {
            let column = self.input_column(type_def, key, &input_path)?;
            update = update.set(column, param(value.clone()));
        }

        if let Some(filter) = field.argument("filter") {
            if let Some(predicate) = self.build_filter(type_name, &target.alias, filter, &path.child("filter"))? {
                update = update.filter(predicate);
            }
        }
        Ok(update.returning([star()]))
    }

    fn delete(
        &mut self,
        type_name: &str,
        table: &TableName,
        field: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<Delete> {
        let target = self.aliases.allocate(table);
        let mut delete = Delete::from(&table.name).alias(&target.alias);
        delete.schema = table.schema.clone();

        if let Some(filter) = field.argument("filter") {
            if let Some(predicate) = self.build_filter(type_name, &target.alias, filter, &path.child("filter"))? {
                delete = delete.filter(predicate);
            }
        }
        Ok(delete.returning([star()]))
    }

    /// Payload columns read from the CTE's returned rows.
    fn payload(
        &mut self,
        type_name: &str,
        cte_name: &str,
        field: &SelectionField,
        path: &FieldPath,
    ) -> CompileResult<Vec<SelectExpr>> {
        let mut columns = Vec::with_capacity(field.selections.len());
        for child in &field.selections {
            let output = child.output_name();
            if child.name == "__typename" {
                continue;
            }
            if columns.iter().any(|c: &SelectExpr| c.alias.as_deref() == Some(output)) {
                return Err(CompileError::argument(
                    &path.child(output),
                    format!("duplicate payload field '{}'", output),
                ));
            }

            if child.name == ROWS_AFFECTED {
                let count = Query::new()
                    .select(vec![count_star()])
                    .from(TableRef::new(cte_name));
                columns.push(Expr::from(count).alias(output));
                continue;
            }

            let source = ScopeSource {
                type_name,
                table: self.aliases.allocate(&TableName::new(cte_name)),
                joins: Vec::new(),
                correlation: None,
                list: true,
                default_limit: None,
            };
            let rows = self.compile_scope(source, child, Embedding::Array, &path.child(output))?;
            columns.push(rows.to_expr().alias(output));
        }

        if columns.is_empty() {
            return Err(CompileError::argument(path, "a payload selection is required"));
        }
        Ok(columns)
    }

    /// Column for an input key; only scalar fields can be written.
    fn input_column(&self, type_def: &TypeDef, key: &str, path: &FieldPath) -> CompileResult<String> {
        match type_def.field(key) {
            Some(def) if !self.schema.is_object_type(&def.type_name) => {
                Ok(self.options.column_case.column_name(key))
            }
            Some(_) => Err(CompileError::argument(
                &path.child(key),
                format!("relation field '{}' cannot be written", key),
            )),
            None => Err(CompileError::schema(
                &path.child(key),
                format!("unknown field '{}'", key),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(
            MutationKind::parse("createUsers"),
            Some((MutationKind::Create, "Users"))
        );
        assert_eq!(
            MutationKind::parse("deletePeople"),
            Some((MutationKind::Delete, "People"))
        );
        assert_eq!(MutationKind::parse("updated"), None);
        assert_eq!(MutationKind::parse("users"), None);
    }
}
