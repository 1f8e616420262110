//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres, DuckDB
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: MySQL
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Placeholders
// =============================================================================

/// Numbered placeholder (`$1`, `$2`, ...).
/// Used by: Postgres
pub fn placeholder_dollar(position: usize) -> String {
    format!("${}", position)
}

/// Anonymous placeholder (`?`), bound strictly by position.
/// Used by: MySQL, DuckDB
pub fn placeholder_question(_position: usize) -> String {
    "?".into()
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit LIMIT ... OFFSET ... (standard SQL).
pub fn emit_limit_offset_standard(
    limit: Option<TokenStream>,
    offset: Option<TokenStream>,
) -> TokenStream {
    let mut ts = TokenStream::new();
    let has_limit = limit.is_some();

    if let Some(lim) = limit {
        ts.push(Token::Limit).space().append(&lim);
    }

    if let Some(off) = offset {
        if has_limit {
            ts.space();
        }
        ts.push(Token::Offset).space().append(&off);
    }

    ts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_quote_helpers() {
        assert_eq!(quote_double("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_backtick("a`b"), "`a``b`");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholder_dollar(3), "$3");
        assert_eq!(placeholder_question(3), "?");
    }

    #[test]
    fn test_limit_offset_standard() {
        let mut lim = TokenStream::new();
        lim.push(Token::LitInt(10));
        let mut off = TokenStream::new();
        off.push(Token::LitInt(5));

        let ts = emit_limit_offset_standard(Some(lim), Some(off.clone()));
        assert_eq!(ts.serialize(Dialect::Postgres), "LIMIT 10 OFFSET 5");

        let ts = emit_limit_offset_standard(None, Some(off));
        assert_eq!(ts.serialize(Dialect::Postgres), "OFFSET 5");
    }
}
