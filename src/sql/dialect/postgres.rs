//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features:
//! - ANSI identifier quoting (`"`)
//! - Native boolean type (true/false)
//! - Numbered placeholders (`$1`, `$2`, ...)
//! - `jsonb_build_object` / `jsonb_agg`
//! - RETURNING clause, usable inside data-modifying CTEs

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn placeholder(&self, position: usize) -> String {
        helpers::placeholder_dollar(position)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn json_object_function(&self) -> &'static str {
        "jsonb_build_object"
    }

    fn json_array_agg_function(&self) -> &'static str {
        "jsonb_agg"
    }

    fn empty_json_array(&self) -> &'static str {
        "'[]'::jsonb"
    }

    fn supports_data_modifying_cte(&self) -> bool {
        true
    }
}
