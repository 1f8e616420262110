//! DuckDB SQL dialect.
//!
//! DuckDB is PostgreSQL-compatible with extensions:
//! - ANSI identifier quoting (`"`)
//! - `json_object` / `json_group_array` from the json extension
//! - RETURNING on plain statements, but not inside CTEs

use super::helpers;
use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn json_object_function(&self) -> &'static str {
        "json_object"
    }

    fn json_array_agg_function(&self) -> &'static str {
        "json_group_array"
    }

    fn empty_json_array(&self) -> &'static str {
        "'[]'::JSON"
    }
}
