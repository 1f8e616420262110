//! Schema metadata: object types, their backing tables and relation directives.
//!
//! The schema is static data loaded once (TOML or JSON) and shared read-only
//! by every compile call. A field whose type is declared under `types` is an
//! object field; anything else is a scalar column.
//!
//! ```toml
//! [types.User]
//! table = { name = "users", schema = "app" }
//! fields = [
//!     { name = "id", type = "Int" },
//!     { name = "name", type = "String" },
//!     { name = "posts", type = "Post", list = true, relation = { kind = "one_to_many", fields = ["id"], references = ["user_id"] } },
//! ]
//! ```

pub mod naming;
mod relation;

pub use relation::{JoinTable, RelationDescriptor, RelationKind, RelationResolver};

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use naming::{is_valid_identifier, singularize};

/// Error type for schema loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid schema at {location}: {reason}")]
    Invalid { location: String, reason: String },
}

impl SchemaError {
    fn invalid(location: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Invalid {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

fn default_query_type() -> String {
    "Query".into()
}

fn default_mutation_type() -> String {
    "Mutation".into()
}

/// Root schema document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Schema {
    /// Type whose fields are the top-level query fields.
    #[serde(default = "default_query_type")]
    pub query_type: String,

    /// Type whose fields are the top-level mutation fields.
    #[serde(default = "default_mutation_type")]
    pub mutation_type: String,

    #[serde(default)]
    pub types: BTreeMap<String, TypeDef>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            query_type: default_query_type(),
            mutation_type: default_mutation_type(),
            types: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Object,
    Interface,
}

/// An object or interface type.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TypeDef {
    #[serde(default)]
    pub kind: TypeKind,

    /// Backing table. Defaults to the lower-cased type name.
    #[serde(default)]
    pub table: Option<TableDirective>,

    /// Discriminator column for interface types.
    #[serde(default)]
    pub typename: Option<TypenameDirective>,

    /// Interfaces this type implements.
    #[serde(default)]
    pub implements: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl TypeDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableDirective {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TypenameDirective {
    /// Column holding the lower-cased concrete type name.
    ///
    /// This is the storage column name, used as written: `column_case` is
    /// not applied to it, whether it is projected, selected or filtered on.
    pub field: String,
}

/// A field on an object type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    /// Whether the field returns a list.
    #[serde(default)]
    pub list: bool,

    #[serde(default)]
    pub relation: Option<RelationDirective>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            list: false,
            relation: None,
        }
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }
}

/// Relation metadata attached to an object field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelationDirective {
    pub kind: RelationKind,

    /// Keys on the parent table.
    pub fields: Vec<String>,

    /// Keys on the referenced table.
    pub references: Vec<String>,

    /// Overrides the parent type's table (`table` or `schema.table`).
    #[serde(default)]
    pub base_table: Option<String>,

    /// Overrides the referenced type's table (`table` or `schema.table`).
    #[serde(default)]
    pub ref_table: Option<String>,

    #[serde(default)]
    pub many_to_many_table: Option<String>,

    /// Join-table keys paired with `fields`.
    #[serde(default)]
    pub many_to_many_fields: Vec<String>,

    /// Join-table keys paired with `references`.
    #[serde(default)]
    pub many_to_many_references: Vec<String>,
}

/// A resolved table name, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Parse `table` or `schema.table`.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once('.') {
            Some((schema, name)) => Self {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            None => Self::new(qualified),
        }
    }

    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    fn is_valid(&self) -> bool {
        is_valid_identifier(&self.name) && self.schema.as_deref().is_none_or(is_valid_identifier)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Schema {
    /// Parse and validate a TOML schema.
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
        let schema: Schema = toml::from_str(source)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Parse and validate a JSON schema.
    pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(source)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema file; `.json` files are JSON, everything else TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Whether `name` is a declared object or interface type.
    pub fn is_object_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Look up a type by name ignoring case.
    pub fn find_type(&self, name: &str) -> Option<(&str, &TypeDef)> {
        self.types
            .iter()
            .find(|(type_name, _)| type_name.eq_ignore_ascii_case(name))
            .map(|(type_name, def)| (type_name.as_str(), def))
    }

    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldDef> {
        self.type_def(type_name).and_then(|t| t.field(field))
    }

    /// Table backing a type: the table directive, else the lower-cased type name.
    pub fn table_for(&self, type_name: &str) -> TableName {
        match self.type_def(type_name).and_then(|t| t.table.as_ref()) {
            Some(table) => TableName::new(&table.name).with_schema(table.schema.clone()),
            None => TableName::new(type_name.to_lowercase()),
        }
    }

    /// Types declaring that they implement `interface`.
    pub fn implementors(&self, interface: &str) -> Vec<&str> {
        self.types
            .iter()
            .filter(|(_, def)| def.implements.iter().any(|i| i == interface))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Resolve a top-level query field.
    ///
    /// Fields declared on the query type win. Without a declaration the field
    /// name is singularized and matched against type names, so `users`
    /// resolves to a list of `User`.
    pub fn root_field(&self, name: &str) -> Option<Cow<'_, FieldDef>> {
        if let Some(field) = self.field(&self.query_type, name) {
            return Some(Cow::Borrowed(field));
        }
        let singular = singularize(name);
        let (type_name, _) = self.find_type(&singular)?;
        let field = FieldDef::new(name, type_name);
        Some(Cow::Owned(if singular != name { field.list() } else { field }))
    }

    /// Check identifiers, key lists and type references.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (type_name, def) in &self.types {
            if !is_valid_identifier(type_name) {
                return Err(SchemaError::invalid(type_name, "invalid type name"));
            }
            if let Some(table) = &def.table {
                let name = TableName::new(&table.name).with_schema(table.schema.clone());
                if !name.is_valid() {
                    return Err(SchemaError::invalid(
                        type_name,
                        format!("invalid table name '{}'", name),
                    ));
                }
            }
            if let Some(typename) = &def.typename {
                if !is_valid_identifier(&typename.field) {
                    return Err(SchemaError::invalid(
                        type_name,
                        format!("invalid typename column '{}'", typename.field),
                    ));
                }
            }
            for interface in &def.implements {
                match self.type_def(interface) {
                    Some(i) if i.is_interface() => {}
                    _ => {
                        return Err(SchemaError::invalid(
                            type_name,
                            format!("implements unknown interface '{}'", interface),
                        ))
                    }
                }
            }
            for field in &def.fields {
                let location = format!("{}.{}", type_name, field.name);
                if !is_valid_identifier(&field.name) {
                    return Err(SchemaError::invalid(location, "invalid field name"));
                }
                if let Some(relation) = &field.relation {
                    if !self.is_object_type(&field.type_name) {
                        return Err(SchemaError::invalid(
                            location,
                            format!("relation targets undeclared type '{}'", field.type_name),
                        ));
                    }
                    validate_relation(relation).map_err(|r| SchemaError::invalid(location, r))?;
                }
            }
        }
        Ok(())
    }
}

fn validate_relation(relation: &RelationDirective) -> Result<(), String> {
    check_keys("fields", &relation.fields)?;
    check_keys("references", &relation.references)?;

    for (label, table) in [
        ("base_table", &relation.base_table),
        ("ref_table", &relation.ref_table),
        ("many_to_many_table", &relation.many_to_many_table),
    ] {
        if let Some(table) = table {
            if !TableName::parse(table).is_valid() {
                return Err(format!("invalid {} '{}'", label, table));
            }
        }
    }

    match relation.kind {
        RelationKind::ManyToMany => {
            if relation.many_to_many_table.is_none() {
                return Err("many_to_many relation requires many_to_many_table".into());
            }
            check_keys("many_to_many_fields", &relation.many_to_many_fields)?;
            check_keys("many_to_many_references", &relation.many_to_many_references)?;
            if relation.fields.len() != relation.many_to_many_fields.len() {
                return Err("fields and many_to_many_fields differ in length".into());
            }
            if relation.references.len() != relation.many_to_many_references.len() {
                return Err("references and many_to_many_references differ in length".into());
            }
        }
        RelationKind::OneToOne | RelationKind::OneToMany => {
            if relation.fields.len() != relation.references.len() {
                return Err("fields and references differ in length".into());
            }
        }
    }
    Ok(())
}

fn check_keys(label: &str, keys: &[String]) -> Result<(), String> {
    if keys.is_empty() {
        return Err(format!("{} must not be empty", label));
    }
    match keys.iter().find(|k| !is_valid_identifier(k)) {
        Some(bad) => Err(format!("invalid key '{}' in {}", bad, label)),
        None => Ok(()),
    }
}
