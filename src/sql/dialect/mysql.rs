//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - Boolean is TINYINT(1), returns 1/0
//! - `?` placeholders
//! - Backslash escapes inside string literals
//! - No ILIKE (case-insensitive match goes through LOWER())
//! - No NULLS FIRST/LAST
//! - No RETURNING clause

use super::helpers;
use super::SqlDialect;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        // Backslash is an escape character inside MySQL strings
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn supports_ilike(&self) -> bool {
        false
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn json_object_function(&self) -> &'static str {
        "JSON_OBJECT"
    }

    fn json_array_agg_function(&self) -> &'static str {
        "JSON_ARRAYAGG"
    }

    fn empty_json_array(&self) -> &'static str {
        "JSON_ARRAY()"
    }

    fn supports_returning(&self) -> bool {
        // MySQL has no RETURNING, use LAST_INSERT_ID()
        false
    }
}
