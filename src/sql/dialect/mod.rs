//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PG/DuckDB), `` ` `` (MySQL)
//! - Bound-argument placeholders: `$n` vs `?`
//! - JSON construction: `jsonb_build_object`/`jsonb_agg` vs `JSON_OBJECT`/`JSON_ARRAYAGG`
//! - NULLS FIRST/LAST ordering
//! - Data-modifying CTEs (`WITH x AS (INSERT ... RETURNING *)`)
//!
//! # Usage
//!
//! ```
//! use nestql::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! assert_eq!(dialect.quote_identifier("user"), "\"user\"");
//! assert_eq!(dialect.placeholder(2), "$2");
//! ```
//!
//! # Feature Matrix
//!
//! | Feature | PostgreSQL | MySQL | DuckDB |
//! |---------|-----------|-------|--------|
//! | NULLS FIRST/LAST | ✓ | ❌ (emulated) | ✓ |
//! | ILIKE | ✓ | ❌ (LOWER ... LIKE) | ✓ |
//! | RETURNING | ✓ | ❌ | ✓ |
//! | Data-modifying CTE | ✓ | ❌ | ❌ |
//!
//! Check dialect feature flags before generating SQL that uses these features.

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;

use std::str::FromStr;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    ///
    /// - PostgreSQL/DuckDB: `"identifier"`
    /// - MySQL: `` `identifier` ``
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// Single quotes with `''` for escaping. MySQL also doubles backslashes.
    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Format a boolean literal.
    ///
    /// - PostgreSQL/DuckDB: `true`/`false`
    /// - MySQL: `1`/`0`
    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Bound Arguments
    // =========================================================================

    /// Placeholder for the bound argument at `position` (1-based).
    fn placeholder(&self, position: usize) -> String {
        helpers::placeholder_question(position)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(
        &self,
        limit: Option<TokenStream>,
        offset: Option<TokenStream>,
    ) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Operators
    // =========================================================================

    /// Whether this dialect has a native case-insensitive `ILIKE`.
    fn supports_ilike(&self) -> bool {
        true
    }

    // =========================================================================
    // NULLS Ordering
    // =========================================================================

    /// Whether this dialect supports NULLS FIRST/LAST in ORDER BY.
    ///
    /// When false, null placement is emulated with an `IS NULL` sort key.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    // =========================================================================
    // JSON Construction
    // =========================================================================

    /// Function building one JSON object from alternating key/value arguments.
    fn json_object_function(&self) -> &'static str;

    /// Aggregate collecting JSON values into a JSON array.
    fn json_array_agg_function(&self) -> &'static str;

    /// Literal for an empty JSON array, used when an aggregate sees no rows.
    fn empty_json_array(&self) -> &'static str;

    // =========================================================================
    // DML
    // =========================================================================

    /// Whether this dialect supports RETURNING clause.
    fn supports_returning(&self) -> bool {
        true
    }

    /// Whether INSERT/UPDATE/DELETE may appear as a CTE body.
    fn supports_data_modifying_cte(&self) -> bool {
        false
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    DuckDb,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::DuckDb => &DuckDb,
        }
    }

    /// All supported dialects.
    pub fn all() -> [Dialect; 3] {
        [Dialect::Postgres, Dialect::MySql, Dialect::DuckDb]
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn placeholder(&self, position: usize) -> String {
        self.dialect().placeholder(position)
    }

    fn emit_limit_offset(
        &self,
        limit: Option<TokenStream>,
        offset: Option<TokenStream>,
    ) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn supports_ilike(&self) -> bool {
        self.dialect().supports_ilike()
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn json_object_function(&self) -> &'static str {
        self.dialect().json_object_function()
    }

    fn json_array_agg_function(&self) -> &'static str {
        self.dialect().json_array_agg_function()
    }

    fn empty_json_array(&self) -> &'static str {
        self.dialect().empty_json_array()
    }

    fn supports_returning(&self) -> bool {
        self.dialect().supports_returning()
    }

    fn supports_data_modifying_cte(&self) -> bool {
        self.dialect().supports_data_modifying_cte()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Error returned when a dialect name is not recognized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown dialect '{0}' (expected postgres, mysql or duckdb)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "duckdb" => Ok(Dialect::DuckDb),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::DuckDb.to_string(), "duckdb");
        assert_eq!(Dialect::Postgres.to_string(), "postgres");
        assert_eq!(Dialect::MySql.to_string(), "mysql");
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgresql".parse::<Dialect>(), Ok(Dialect::Postgres));
        assert_eq!("MySQL".parse::<Dialect>(), Ok(Dialect::MySql));
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::DuckDb.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::Postgres.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::MySql.quote_identifier("users"), "`users`");
    }

    #[test]
    fn test_quote_identifier_escaping() {
        assert_eq!(
            Dialect::Postgres.quote_identifier("weird\"name"),
            "\"weird\"\"name\""
        );
        assert_eq!(
            Dialect::MySql.quote_identifier("weird`name"),
            "`weird``name`"
        );
    }

    #[test]
    fn test_format_bool() {
        assert_eq!(Dialect::DuckDb.format_bool(true), "true");
        assert_eq!(Dialect::Postgres.format_bool(false), "false");
        assert_eq!(Dialect::MySql.format_bool(false), "0");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(7), "$7");
        assert_eq!(Dialect::MySql.placeholder(7), "?");
        assert_eq!(Dialect::DuckDb.placeholder(7), "?");
    }

    #[test]
    fn test_feature_flags() {
        assert!(Dialect::Postgres.supports_data_modifying_cte());
        assert!(!Dialect::MySql.supports_data_modifying_cte());
        assert!(!Dialect::DuckDb.supports_data_modifying_cte());

        assert!(!Dialect::MySql.supports_nulls_ordering());
        assert!(!Dialect::MySql.supports_ilike());
        assert!(Dialect::DuckDb.supports_ilike());
    }

    #[test]
    fn test_json_functions() {
        assert_eq!(Dialect::Postgres.json_array_agg_function(), "jsonb_agg");
        assert_eq!(Dialect::MySql.json_object_function(), "JSON_OBJECT");
        assert_eq!(Dialect::DuckDb.json_array_agg_function(), "json_group_array");
        assert_eq!(Dialect::Postgres.empty_json_array(), "'[]'::jsonb");
    }
}
