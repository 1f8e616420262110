//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use nestql::compile::{CompileOptions, CompileOutput, CompileResult, Compiler};
use nestql::{Dialect, Schema, SelectionField};
use sqlparser::dialect::{DuckDbDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

/// Users, posts, profiles, groups (many-to-many) and an `Animal` interface.
pub const SCHEMA: &str = r#"
[types.User]
table = { name = "users", schema = "app" }
fields = [
    { name = "id", type = "Int" },
    { name = "name", type = "String" },
    { name = "age", type = "Int" },
    { name = "email", type = "String" },
    { name = "createdAt", type = "String" },
    { name = "posts", type = "Post", list = true, relation = { kind = "one_to_many", fields = ["id"], references = ["user_id"] } },
    { name = "profile", type = "Profile", relation = { kind = "one_to_one", fields = ["id"], references = ["user_id"] } },
    { name = "groups", type = "Group", list = true, relation = { kind = "many_to_many", fields = ["id"], references = ["id"], many_to_many_table = "user_groups", many_to_many_fields = ["user_id"], many_to_many_references = ["group_id"] } },
]

[types.Post]
table = { name = "posts", schema = "app" }
fields = [
    { name = "id", type = "Int" },
    { name = "title", type = "String" },
    { name = "likes", type = "Int" },
    { name = "category", type = "String" },
    { name = "comments", type = "Comment", list = true, relation = { kind = "one_to_many", fields = ["id"], references = ["post_id"] } },
]

[types.Comment]
table = { name = "comments", schema = "app" }
fields = [
    { name = "body", type = "String" },
    { name = "score", type = "Int" },
]

[types.Profile]
table = { name = "profiles", schema = "app" }
fields = [{ name = "bio", type = "String" }]

[types.Group]
table = { name = "groups", schema = "app" }
fields = [{ name = "name", type = "String" }]

[types.Animal]
kind = "interface"
table = { name = "animals" }
typename = { field = "kind" }
fields = [
    { name = "name", type = "String" },
    { name = "kind", type = "String" },
]

[types.Dog]
implements = ["Animal"]
table = { name = "animals" }
fields = [
    { name = "name", type = "String" },
    { name = "barks", type = "Boolean" },
]

[types.Cat]
implements = ["Animal"]
table = { name = "animals" }
fields = [
    { name = "name", type = "String" },
    { name = "lives", type = "Int" },
]
"#;

pub fn schema() -> Schema {
    Schema::from_toml_str(SCHEMA).expect("fixture schema is valid")
}

/// Compiler over the fixture schema with sequential aliases.
pub fn compiler() -> Compiler {
    compiler_with(CompileOptions::default().sequential())
}

pub fn compiler_with(options: CompileOptions) -> Compiler {
    Compiler::new(schema()).with_options(options)
}

pub fn compile(field: &SelectionField) -> CompileResult<CompileOutput> {
    compiler().compile_query(field)
}

pub fn compile_for(field: &SelectionField, dialect: Dialect) -> CompileResult<CompileOutput> {
    compiler_with(CompileOptions::default().sequential().with_dialect(dialect)).compile_query(field)
}

pub fn users() -> SelectionField {
    SelectionField::new("users")
}

/// Parse `sql` with sqlparser to check it is syntactically valid.
pub fn validate_sql(sql: &str, dialect: Dialect) {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser_dialect, sql) {
        panic!("invalid SQL for {}: {}\nSQL: {}", dialect, e, sql);
    }
}

/// Number of placeholders in `sql` for `dialect`.
pub fn placeholder_count(sql: &str, dialect: Dialect) -> usize {
    match dialect {
        Dialect::Postgres => sql.matches('$').count(),
        _ => sql.matches('?').count(),
    }
}
