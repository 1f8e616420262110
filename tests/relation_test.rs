//! Relation embedding: one-to-one objects, one-to-many and many-to-many
//! arrays, nesting depth and table overrides.

mod common;

use common::{compile, compile_for, users, validate_sql};
use nestql::compile::{CompileOptions, Compiler, ErrorKind};
use nestql::schema::{RelationKind, RelationResolver};
use nestql::{Dialect, Schema, SelectionField};
use serde_json::json;

// ============================================================================
// Embedding by relation kind
// ============================================================================

#[test]
fn test_one_to_one_embeds_object() {
    let output = compile(
        &users()
            .fields(["name"])
            .select(SelectionField::new("profile").fields(["bio"])),
    )
    .unwrap();

    assert_eq!(
        output.sql,
        concat!(
            r#"SELECT "sq0"."name" AS "name", "#,
            r#"(SELECT jsonb_build_object('bio', "sq2"."bio") FROM (SELECT "sq1"."bio" AS "bio" "#,
            r#"FROM "app"."profiles" AS "sq1" WHERE "sq0"."id" = "sq1"."user_id" LIMIT 1) AS "sq2") AS "profile" "#,
            r#"FROM "app"."users" AS "sq0" LIMIT $1"#
        )
    );
    assert_eq!(output.args, vec![json!(100)]);
    validate_sql(&output.sql, Dialect::Postgres);
}

#[test]
fn test_one_to_many_never_null() {
    let output = compile(&users().select(SelectionField::new("posts").fields(["title"]))).unwrap();
    assert!(output.sql.contains("COALESCE(jsonb_agg("));
    assert!(output.sql.contains("'[]'::jsonb)"));
}

#[test]
fn test_many_to_many_embeds_array_through_join_table() {
    let output = compile(&users().select(SelectionField::new("groups").fields(["name"]))).unwrap();

    assert_eq!(
        output.sql,
        concat!(
            r#"SELECT (SELECT COALESCE(jsonb_agg(jsonb_build_object('name', "sq3"."name")), '[]'::jsonb) "#,
            r#"FROM (SELECT "sq1"."name" AS "name" FROM "app"."groups" AS "sq1" "#,
            r#"INNER JOIN "app"."user_groups" AS "sq2" ON "sq1"."id" = "sq2"."group_id" "#,
            r#"WHERE "sq0"."id" = "sq2"."user_id" LIMIT $1) AS "sq3") AS "groups" "#,
            r#"FROM "app"."users" AS "sq0" LIMIT $2"#
        )
    );
    validate_sql(&output.sql, Dialect::Postgres);
}

#[test]
fn test_grandchildren_allocate_depth_first() {
    let output = compile(
        &users().select(
            SelectionField::new("posts")
                .fields(["title"])
                .select(SelectionField::new("comments").fields(["body"])),
        ),
    )
    .unwrap();

    let sql = &output.sql;
    assert!(sql.contains(
        r#"jsonb_build_object('title', "sq4"."title", 'comments', "sq4"."comments")"#
    ));
    assert!(sql.contains(
        r#"FROM "app"."comments" AS "sq2" WHERE "sq1"."id" = "sq2"."post_id" LIMIT $1) AS "sq3") AS "comments""#
    ));
    assert!(sql.contains(
        r#"FROM "app"."posts" AS "sq1" WHERE "sq0"."id" = "sq1"."user_id" LIMIT $2) AS "sq4") AS "posts""#
    ));
    assert!(sql.ends_with(r#"FROM "app"."users" AS "sq0" LIMIT $3"#));
    assert_eq!(output.args, vec![json!(100), json!(100), json!(100)]);
    validate_sql(sql, Dialect::Postgres);
}

#[test]
fn test_sibling_relations_keep_selection_order() {
    let output = compile(
        &users()
            .select(SelectionField::new("profile").fields(["bio"]))
            .fields(["name"])
            .select(SelectionField::new("posts").fields(["title"])),
    )
    .unwrap();

    let profile = output.sql.find(r#"AS "profile""#).unwrap();
    let name = output.sql.find(r#"AS "name""#).unwrap();
    let posts = output.sql.find(r#"AS "posts""#).unwrap();
    assert!(profile < name && name < posts);
    // profile: sq1 + wrapper sq2, posts: sq3 + wrapper sq4
    assert!(output.sql.contains(r#""app"."posts" AS "sq3""#));
}

#[test]
fn test_nested_pagination_and_order() {
    let output = compile(
        &users().select(
            SelectionField::new("posts")
                .arg("orderBy", json!([{"likes": "DESC"}]))
                .arg("limit", json!(3))
                .arg("offset", json!(6))
                .fields(["title"]),
        ),
    )
    .unwrap();

    assert!(output.sql.contains(
        r#"WHERE "sq0"."id" = "sq1"."user_id" ORDER BY "sq1"."likes" DESC NULLS LAST LIMIT $1 OFFSET $2) AS "sq2""#
    ));
    assert_eq!(output.args, vec![json!(3), json!(6), json!(100)]);
}

#[test]
fn test_same_relation_twice_under_aliases() {
    let output = compile(
        &users()
            .select(
                SelectionField::new("posts")
                    .alias("popular")
                    .arg("filter", json!({"likes": {"gte": 100}}))
                    .fields(["title"]),
            )
            .select(SelectionField::new("posts").alias("recent").arg("limit", json!(2)).fields(["title"])),
    )
    .unwrap();

    assert!(output.sql.contains(r#") AS "popular", (SELECT"#));
    assert!(output.sql.contains(r#") AS "recent" FROM"#));
    assert_eq!(output.args, vec![json!(100), json!(100), json!(2), json!(100)]);
}

// ============================================================================
// Dialect rendering of embedded relations
// ============================================================================

#[test]
fn test_mysql_json_functions() {
    let output = compile_for(&users().select(SelectionField::new("posts").fields(["title"])), Dialect::MySql).unwrap();
    assert!(output.sql.contains(
        "COALESCE(JSON_ARRAYAGG(JSON_OBJECT('title', `sq2`.`title`)), JSON_ARRAY())"
    ));
    validate_sql(&output.sql, Dialect::MySql);
}

#[test]
fn test_duckdb_json_functions() {
    let output = compile_for(&users().select(SelectionField::new("profile").fields(["bio"])), Dialect::DuckDb).unwrap();
    assert!(output.sql.contains(r#"(SELECT json_object('bio', "sq2"."bio") FROM"#));
}

// ============================================================================
// Schema-driven tables
// ============================================================================

const OVERRIDES: &str = r#"
[types.Author]
table = { name = "authors", schema = "lit" }
fields = [
    { name = "id", type = "Int" },
    { name = "books", type = "Book", list = true, relation = { kind = "MANY_TO_MANY", fields = ["id"], references = ["id"], ref_table = "archive.books", many_to_many_table = "authorship", many_to_many_fields = ["author_id"], many_to_many_references = ["book_id"] } },
]

[types.Book]
fields = [{ name = "title", type = "String" }]
"#;

#[test]
fn test_ref_table_and_join_table_schema() {
    let schema = Schema::from_toml_str(OVERRIDES).unwrap();
    let mut resolver = RelationResolver::new(&schema);
    let books = schema.field("Author", "books").unwrap();
    let relation = resolver.resolve("Author", books).unwrap();
    assert_eq!(relation.kind, RelationKind::ManyToMany);
    assert_eq!(relation.reference_table.to_string(), "archive.books");
    assert_eq!(relation.join.as_ref().unwrap().table.to_string(), "archive.authorship");

    let output = Compiler::new(schema)
        .with_options(CompileOptions::default().sequential())
        .compile_query(&SelectionField::new("authors").select(SelectionField::new("books").fields(["title"])))
        .unwrap();
    assert!(output.sql.contains(
        r#"FROM "archive"."books" AS "sq1" INNER JOIN "archive"."authorship" AS "sq2" ON "sq1"."id" = "sq2"."book_id" WHERE "sq0"."id" = "sq2"."author_id""#
    ));
    assert!(output.sql.ends_with(r#"FROM "lit"."authors" AS "sq0" LIMIT $2"#));
}

#[test]
fn test_composite_keys() {
    let schema = Schema::from_toml_str(
        r#"
[types.Order]
fields = [
    { name = "region", type = "String" },
    { name = "number", type = "Int" },
    { name = "lines", type = "Line", list = true, relation = { kind = "one_to_many", fields = ["region", "number"], references = ["order_region", "order_number"] } },
]

[types.Line]
fields = [{ name = "sku", type = "String" }]
"#,
    )
    .unwrap();

    let output = Compiler::new(schema)
        .with_options(CompileOptions::default().sequential())
        .compile_query(&SelectionField::new("orders").select(SelectionField::new("lines").fields(["sku"])))
        .unwrap();
    assert!(output.sql.contains(
        r#"WHERE "sq0"."region" = "sq1"."order_region" AND "sq0"."number" = "sq1"."order_number""#
    ));
}

#[test]
fn test_json_schema_source() {
    let schema = Schema::from_json_str(
        r#"{
            "types": {
                "Team": {
                    "fields": [
                        {"name": "id", "type": "Int"},
                        {"name": "members", "type": "Member", "list": true,
                         "relation": {"kind": "oneToMany", "fields": ["id"], "references": ["team_id"]}}
                    ]
                },
                "Member": {"fields": [{"name": "handle", "type": "String"}]}
            }
        }"#,
    )
    .unwrap();

    let output = Compiler::new(schema)
        .with_options(CompileOptions::default().sequential())
        .compile_query(&SelectionField::new("teams").select(SelectionField::new("members").fields(["handle"])))
        .unwrap();
    assert!(output.sql.contains(r#"FROM "member" AS "sq1" WHERE "sq0"."id" = "sq1"."team_id""#));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_relation_requires_selection_set() {
    let err = compile(&users().fields(["profile"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert_eq!(err.path().to_string(), "users.profile");
}

#[test]
fn test_unknown_nested_field_path() {
    let err = compile(
        &users().select(
            SelectionField::new("posts").select(SelectionField::new("comments").fields(["author"])),
        ),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(err.path().to_string(), "users.posts.comments.author");
}

#[test]
fn test_one_to_one_rejects_order_by() {
    let err = compile(
        &users().select(
            SelectionField::new("profile")
                .arg("orderBy", json!({"bio": "ASC"}))
                .fields(["bio"]),
        ),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}
