//! `_<field>Aggregate` pseudo-relations: counts, groups and registry
//! aggregators.

mod common;

use common::{compile, users, validate_sql};
use nestql::compile::aggregators::per_column;
use nestql::compile::{CompileOptions, ErrorKind};
use nestql::sql::{func, json_object, table_col, Expr};
use nestql::{Dialect, SelectionField};
use serde_json::json;

fn aggregate(target: &str) -> SelectionField {
    SelectionField::new(format!("_{}Aggregate", target))
}

// ============================================================================
// Root aggregates
// ============================================================================

#[test]
fn test_root_count() {
    let output = compile(&aggregate("users").fields(["count"])).unwrap();
    assert_eq!(
        output.sql,
        r#"SELECT COUNT(*) AS "count" FROM "app"."users" AS "sq0""#
    );
    assert!(output.args.is_empty());
    validate_sql(&output.sql, Dialect::Postgres);
}

#[test]
fn test_root_aggregate_with_filter() {
    let output = compile(
        &aggregate("users")
            .arg("filter", json!({"age": {"gt": 30}}))
            .fields(["count"])
            .select(SelectionField::new("max").fields(["age"])),
    )
    .unwrap();

    assert_eq!(
        output.sql,
        concat!(
            r#"SELECT COUNT(*) AS "count", jsonb_build_object('age', MAX("sq0"."age")) AS "max" "#,
            r#"FROM "app"."users" AS "sq0" WHERE "sq0"."age" > $1"#
        )
    );
    assert_eq!(output.args, vec![json!(30)]);
    validate_sql(&output.sql, Dialect::Postgres);
}

#[test]
fn test_root_group_by() {
    let output = compile(
        &aggregate("posts")
            .arg("groupBy", json!(["category"]))
            .fields(["group", "count"]),
    )
    .unwrap();
    assert_eq!(
        output.sql,
        concat!(
            r#"SELECT jsonb_build_object('category', "sq0"."category") AS "group", COUNT(*) AS "count" "#,
            r#"FROM "app"."posts" AS "sq0" GROUP BY "sq0"."category" LIMIT $1"#
        )
    );
    assert_eq!(output.args, vec![json!(100)]);
    validate_sql(&output.sql, Dialect::Postgres);
}

#[test]
fn test_grouped_rows_use_configured_default_limit() {
    let compiler = common::compiler_with(CompileOptions::default().sequential().with_default_limit(25));
    let output = compiler
        .compile_query(&aggregate("users").arg("groupBy", json!(["name"])).fields(["count", "group"]))
        .unwrap();
    assert!(output.sql.ends_with(r#"GROUP BY "sq0"."name" LIMIT $1"#));
    assert_eq!(output.args, vec![json!(25)]);
}

// ============================================================================
// Nested aggregates
// ============================================================================

#[test]
fn test_nested_count_is_one_object() {
    let output = compile(
        &users()
            .fields(["name"])
            .select(aggregate("posts").fields(["count"])),
    )
    .unwrap();

    assert_eq!(
        output.sql,
        concat!(
            r#"SELECT "sq0"."name" AS "name", "#,
            r#"(SELECT jsonb_build_object('count', "sq2"."count") "#,
            r#"FROM (SELECT COUNT(*) AS "count" FROM "app"."posts" AS "sq1" WHERE "sq0"."id" = "sq1"."user_id") AS "sq2") "#,
            r#"AS "_postsAggregate" FROM "app"."users" AS "sq0" LIMIT $1"#
        )
    );
    validate_sql(&output.sql, Dialect::Postgres);
}

#[test]
fn test_registry_aggregators_per_field() {
    let output = compile(
        &users().select(
            aggregate("posts")
                .alias("stats")
                .select(SelectionField::new("avg").fields(["likes"]))
                .select(
                    SelectionField::new("sum")
                        .select(SelectionField::new("likes").alias("totalLikes")),
                ),
        ),
    )
    .unwrap();

    assert!(output.sql.contains(
        r#"jsonb_build_object('likes', AVG("sq1"."likes")) AS "avg", jsonb_build_object('totalLikes', SUM("sq1"."likes")) AS "sum""#
    ));
    assert!(output.sql.contains(r#") AS "stats" FROM"#));
}

#[test]
fn test_aggregate_filter_and_group() {
    let output = compile(
        &users().select(
            aggregate("posts")
                .arg("filter", json!({"likes": {"gte": 1}}))
                .arg("groupBy", json!("category"))
                .fields(["group", "count"]),
        ),
    )
    .unwrap();

    assert!(output.sql.contains(
        r#"(SELECT COALESCE(jsonb_agg(jsonb_build_object('group', "sq2"."group", 'count', "sq2"."count")), '[]'::jsonb) FROM "#
    ));
    assert!(output.sql.contains(
        r#"WHERE "sq0"."id" = "sq1"."user_id" AND "sq1"."likes" >= $1 GROUP BY "sq1"."category" LIMIT $2) AS "sq2""#
    ));
    assert_eq!(output.args, vec![json!(1), json!(100), json!(100)]);
}

#[test]
fn test_many_to_many_aggregate() {
    let output = compile(&users().select(aggregate("groups").fields(["count"]))).unwrap();
    assert!(output.sql.contains(
        r#"FROM "app"."groups" AS "sq1" INNER JOIN "app"."user_groups" AS "sq2" ON "sq1"."id" = "sq2"."group_id" WHERE "sq0"."id" = "sq2"."user_id") AS "sq3""#
    ));
}

#[test]
fn test_custom_aggregator() {
    let compiler = common::compiler()
        .with_aggregator("median", per_column(|e| func("MEDIAN", vec![e])))
        .with_aggregator("distinct", |alias, targets| {
            json_object(
                targets
                    .iter()
                    .map(|t| {
                        let distinct = Expr::Function {
                            name: "COUNT".into(),
                            args: vec![table_col(alias, &t.column)],
                            distinct: true,
                        };
                        (t.key.clone(), distinct)
                    })
                    .collect(),
            )
        });

    let output = compiler
        .compile_query(
            &aggregate("posts")
                .select(SelectionField::new("median").fields(["likes"]))
                .select(SelectionField::new("distinct").fields(["category"])),
        )
        .unwrap();
    assert!(output
        .sql
        .contains(r#"jsonb_build_object('likes', MEDIAN("sq0"."likes")) AS "median""#));
    assert!(output
        .sql
        .contains(r#"jsonb_build_object('category', COUNT(DISTINCT "sq0"."category")) AS "distinct""#));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_aggregator() {
    let err = compile(&aggregate("users").select(SelectionField::new("p99").fields(["age"]))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAggregator);
    assert_eq!(err.path().to_string(), "_usersAggregate.p99");
}

#[test]
fn test_group_requires_group_by() {
    let err = compile(&aggregate("users").fields(["group"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert_eq!(err.path().to_string(), "_usersAggregate.group");
}

#[test]
fn test_aggregator_requires_fields() {
    let err = compile(&aggregate("users").fields(["max"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_aggregator_rejects_relation_fields() {
    let err = compile(&aggregate("users").select(SelectionField::new("max").fields(["posts"]))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_single_row_relation_cannot_be_aggregated() {
    let err = compile(&users().select(aggregate("profile").fields(["count"]))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(err.path().to_string(), "users._profileAggregate");
}

#[test]
fn test_aggregate_rejects_pagination() {
    let err = compile(&aggregate("users").arg("offset", json!(1)).fields(["count"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_unknown_root_aggregate_target() {
    let err = compile(&aggregate("widgets").fields(["count"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
}
