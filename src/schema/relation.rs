//! Relation Metadata Resolver.
//!
//! Turns a field's relation directive into a [`RelationDescriptor`] with
//! concrete tables and positional key pairs. Descriptors are cached per
//! (type, field) for the lifetime of one resolver, which the compiler creates
//! fresh for each compile call.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{FieldDef, Schema, TableName};

/// How two entities relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    #[serde(alias = "ONE_TO_ONE", alias = "oneToOne")]
    OneToOne,
    #[serde(alias = "ONE_TO_MANY", alias = "oneToMany")]
    OneToMany,
    #[serde(alias = "MANY_TO_MANY", alias = "manyToMany")]
    ManyToMany,
}

impl RelationKind {
    /// Whether the relation yields many rows per parent row.
    pub fn is_many(self) -> bool {
        !matches!(self, RelationKind::OneToOne)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RelationKind::OneToOne => "one_to_one",
            RelationKind::OneToMany => "one_to_many",
            RelationKind::ManyToMany => "many_to_many",
        })
    }
}

/// Join table of a many-to-many relation.
///
/// `local_keys[i]` pairs with the parent's `local_keys[i]`;
/// `foreign_keys[i]` pairs with the reference table's `foreign_keys[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    pub table: TableName,
    pub local_keys: Vec<String>,
    pub foreign_keys: Vec<String>,
}

/// Resolved relation between a parent type and a referenced type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub kind: RelationKind,
    pub base_table: TableName,
    pub reference_table: TableName,
    /// Schema type of the referenced rows.
    pub reference_type: String,
    /// Keys on the parent table.
    pub local_keys: Vec<String>,
    /// Keys on the referenced table.
    pub foreign_keys: Vec<String>,
    pub join: Option<JoinTable>,
}

impl RelationDescriptor {
    /// Build a descriptor from a field's directive. `None` when the field has none.
    pub fn from_field(schema: &Schema, parent_type: &str, field: &FieldDef) -> Option<Self> {
        let directive = field.relation.as_ref()?;

        let base_table = match &directive.base_table {
            Some(table) => TableName::parse(table),
            None => schema.table_for(parent_type),
        };
        let reference_table = match &directive.ref_table {
            Some(table) => TableName::parse(table),
            None => schema.table_for(&field.type_name),
        };

        let join = match (directive.kind, &directive.many_to_many_table) {
            (RelationKind::ManyToMany, Some(table)) => {
                let mut table = TableName::parse(table);
                if table.schema.is_none() {
                    table.schema = reference_table.schema.clone();
                }
                Some(JoinTable {
                    table,
                    local_keys: directive.many_to_many_fields.clone(),
                    foreign_keys: directive.many_to_many_references.clone(),
                })
            }
            _ => None,
        };

        Some(Self {
            kind: directive.kind,
            base_table,
            reference_table,
            reference_type: field.type_name.clone(),
            local_keys: directive.fields.clone(),
            foreign_keys: directive.references.clone(),
            join,
        })
    }
}

/// Per-compile cache of relation descriptors.
pub struct RelationResolver<'s> {
    schema: &'s Schema,
    cache: HashMap<(String, String), Rc<RelationDescriptor>>,
}

impl<'s> RelationResolver<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            cache: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Resolve the relation behind `field` on `parent_type`, or `None` for a
    /// field that carries no relation directive.
    pub fn resolve(
        &mut self,
        parent_type: &str,
        field: &FieldDef,
    ) -> Option<Rc<RelationDescriptor>> {
        let key = (parent_type.to_string(), field.name.clone());
        if let Some(hit) = self.cache.get(&key) {
            return Some(Rc::clone(hit));
        }

        let descriptor = Rc::new(RelationDescriptor::from_field(
            self.schema,
            parent_type,
            field,
        )?);
        trace!(
            parent = parent_type,
            field = %field.name,
            kind = %descriptor.kind,
            "resolved relation"
        );
        self.cache.insert(key, Rc::clone(&descriptor));
        Some(descriptor)
    }

    /// Number of cached descriptors.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_toml_str(
            r#"
[types.User]
table = { name = "users", schema = "app" }
fields = [
    { name = "id", type = "Int" },
    { name = "profile", type = "Profile", relation = { kind = "one_to_one", fields = ["id"], references = ["user_id"] } },
    { name = "groups", type = "Group", list = true, relation = { kind = "many_to_many", fields = ["id"], references = ["id"], many_to_many_table = "user_groups", many_to_many_fields = ["user_id"], many_to_many_references = ["group_id"] } },
    { name = "legacy", type = "Profile", relation = { kind = "ONE_TO_ONE", fields = ["id"], references = ["owner"], ref_table = "archive.profiles" } },
]

[types.Profile]
table = { name = "profiles", schema = "app" }

[types.Group]
table = { name = "groups", schema = "auth" }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_scalar_is_not_relation() {
        let schema = schema();
        let mut resolver = RelationResolver::new(&schema);
        let id = schema.field("User", "id").unwrap();
        assert!(resolver.resolve("User", id).is_none());
    }

    #[test]
    fn test_one_to_one() {
        let schema = schema();
        let mut resolver = RelationResolver::new(&schema);
        let profile = schema.field("User", "profile").unwrap();
        let rel = resolver.resolve("User", profile).unwrap();

        assert_eq!(rel.kind, RelationKind::OneToOne);
        assert_eq!(rel.base_table.to_string(), "app.users");
        assert_eq!(rel.reference_table.to_string(), "app.profiles");
        assert_eq!(rel.local_keys, vec!["id"]);
        assert_eq!(rel.foreign_keys, vec!["user_id"]);
        assert!(rel.join.is_none());
    }

    #[test]
    fn test_many_to_many_join_in_reference_schema() {
        let schema = schema();
        let mut resolver = RelationResolver::new(&schema);
        let groups = schema.field("User", "groups").unwrap();
        let rel = resolver.resolve("User", groups).unwrap();

        let join = rel.join.as_ref().unwrap();
        assert_eq!(join.table.to_string(), "auth.user_groups");
        assert_eq!(join.local_keys, vec!["user_id"]);
        assert_eq!(join.foreign_keys, vec!["group_id"]);
        assert!(rel.kind.is_many());
    }

    #[test]
    fn test_ref_table_override() {
        let schema = schema();
        let mut resolver = RelationResolver::new(&schema);
        let legacy = schema.field("User", "legacy").unwrap();
        let rel = resolver.resolve("User", legacy).unwrap();
        assert_eq!(rel.reference_table.to_string(), "archive.profiles");
        assert_eq!(rel.reference_type, "Profile");
    }

    #[test]
    fn test_descriptors_are_cached() {
        let schema = schema();
        let mut resolver = RelationResolver::new(&schema);
        let profile = schema.field("User", "profile").unwrap();

        let first = resolver.resolve("User", profile).unwrap();
        let second = resolver.resolve("User", profile).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached(), 1);
    }
}
