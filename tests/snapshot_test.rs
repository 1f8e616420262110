//! Snapshots of the generated SQL for representative selections.

mod common;

use common::{compile, compile_for, compiler, users};
use insta::assert_snapshot;
use nestql::{Dialect, SelectionField};
use serde_json::json;

#[test]
fn snapshot_scalar_selection() {
    let output = compile(&users().fields(["name", "age"])).unwrap();
    assert_snapshot!(output.sql, @r#"SELECT "sq0"."name" AS "name", "sq0"."age" AS "age" FROM "app"."users" AS "sq0" LIMIT $1"#);
}

#[test]
fn snapshot_filtered_selection() {
    let output = compile(
        &users()
            .arg("filter", json!({"age": {"gt": 18}, "OR": [{"name": {"prefix": "A"}}, {"email": {"isNull": true}}]}))
            .arg("limit", json!(10))
            .fields(["name"]),
    )
    .unwrap();
    assert_snapshot!(output.sql, @r#"SELECT "sq0"."name" AS "name" FROM "app"."users" AS "sq0" WHERE "sq0"."age" > $1 AND ("sq0"."name" LIKE $2 ESCAPE '\' OR "sq0"."email" IS NULL) LIMIT $3"#);
    assert_eq!(output.args, vec![json!(18), json!("A%"), json!(10)]);
}

#[test]
fn snapshot_one_to_many() {
    let output = compile(
        &users()
            .fields(["name"])
            .select(SelectionField::new("posts").fields(["title"])),
    )
    .unwrap();
    assert_snapshot!(output.sql, @r#"SELECT "sq0"."name" AS "name", (SELECT COALESCE(jsonb_agg(jsonb_build_object('title', "sq2"."title")), '[]'::jsonb) FROM (SELECT "sq1"."title" AS "title" FROM "app"."posts" AS "sq1" WHERE "sq0"."id" = "sq1"."user_id" LIMIT $1) AS "sq2") AS "posts" FROM "app"."users" AS "sq0" LIMIT $2"#);
}

#[test]
fn snapshot_many_to_many() {
    let output = compile(&users().select(SelectionField::new("groups").fields(["name"]))).unwrap();
    assert_snapshot!(output.sql, @r#"SELECT (SELECT COALESCE(jsonb_agg(jsonb_build_object('name', "sq3"."name")), '[]'::jsonb) FROM (SELECT "sq1"."name" AS "name" FROM "app"."groups" AS "sq1" INNER JOIN "app"."user_groups" AS "sq2" ON "sq1"."id" = "sq2"."group_id" WHERE "sq0"."id" = "sq2"."user_id" LIMIT $1) AS "sq3") AS "groups" FROM "app"."users" AS "sq0" LIMIT $2"#);
}

#[test]
fn snapshot_one_to_one_mysql() {
    let output = compile_for(
        &users().select(SelectionField::new("profile").fields(["bio"])),
        Dialect::MySql,
    )
    .unwrap();
    assert_snapshot!(output.sql, @"SELECT (SELECT JSON_OBJECT('bio', `sq2`.`bio`) FROM (SELECT `sq1`.`bio` AS `bio` FROM `app`.`profiles` AS `sq1` WHERE `sq0`.`id` = `sq1`.`user_id` LIMIT 1) AS `sq2`) AS `profile` FROM `app`.`users` AS `sq0` LIMIT ?");
}

#[test]
fn snapshot_create_mutation() {
    let output = compiler()
        .compile_mutation(
            &SelectionField::new("createUsers")
                .arg("input", json!({"name": "Alice"}))
                .select(SelectionField::new("users").fields(["name"]))
                .fields(["rows_affected"]),
        )
        .unwrap();
    assert_snapshot!(output.sql, @r#"WITH "create_users" AS (INSERT INTO "app"."users" ("name") VALUES ($1) RETURNING *) SELECT (SELECT COALESCE(jsonb_agg(jsonb_build_object('name', "sq1"."name")), '[]'::jsonb) FROM (SELECT "sq0"."name" AS "name" FROM "create_users" AS "sq0") AS "sq1") AS "users", (SELECT COUNT(*) FROM "create_users") AS "rows_affected""#);
}
