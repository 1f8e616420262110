//! DML (Data Manipulation Language) support.
//!
//! This module provides types and builders for generating DML statements
//! (INSERT, UPDATE, DELETE) across different SQL dialects.
//!
//! # Examples
//!
//! ```
//! use nestql::sql::{Delete, Dialect, Insert, Update};
//! use nestql::sql::expr::{param, table_col, ExprExt};
//! use serde_json::json;
//!
//! let insert = Insert::into("users")
//!     .columns(["name", "email"])
//!     .values([param(json!("Alice")), param(json!("alice@example.com"))]);
//! assert!(insert.to_sql(Dialect::Postgres).starts_with("INSERT INTO \"users\""));
//!
//! let update = Update::table("users")
//!     .alias("u")
//!     .set("status", param(json!("active")))
//!     .filter(table_col("u", "id").eq(param(json!(1))));
//! assert!(update.to_sql(Dialect::Postgres).contains("SET \"status\" = $1"));
//!
//! let delete = Delete::from("users").filter(table_col("users", "id").eq(param(json!(1))));
//! assert!(delete.to_sql(Dialect::Postgres).starts_with("DELETE FROM"));
//! ```

use serde_json::Value;

use super::dialect::{Dialect, SqlDialect};
use super::expr::{Expr, ExprExt};
use super::token::{Token, TokenStream};

// ============================================================================
// INSERT
// ============================================================================

/// INSERT statement.
///
/// A `None` cell in a row renders as `DEFAULT`.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<Expr>>>,
    pub returning: Vec<Expr>,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            returning: Vec::new(),
        }
    }

    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the columns to insert.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, vals: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.values
            .push(vals.into_iter().map(|v| Some(v.into())).collect());
        self
    }

    /// Add a row where missing cells take the column default.
    pub fn values_with_defaults(mut self, vals: Vec<Option<Expr>>) -> Self {
        self.values.push(vals);
        self
    }

    /// Add RETURNING clause.
    pub fn returning(mut self, exprs: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.returning = exprs.into_iter().map(|e| e.into()).collect();
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to SQL plus bound argument values.
    pub fn to_sql_with_args(&self, dialect: Dialect) -> (String, Vec<Value>) {
        self.to_tokens(dialect).serialize_with_args(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // INSERT INTO
        ts.push(Token::Insert).space().push(Token::Into).space();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });

        // Columns
        if !self.columns.is_empty() {
            ts.space().lparen();
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(col.clone()));
            }
            ts.rparen();
        }

        // VALUES
        if !self.values.is_empty() {
            ts.space().push(Token::Values);
            for (row_idx, row) in self.values.iter().enumerate() {
                if row_idx > 0 {
                    ts.comma();
                }
                ts.space().lparen();
                for (i, val) in row.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    match val {
                        Some(expr) => ts.append(&expr.to_tokens_for_dialect(dialect)),
                        None => ts.push(Token::Default),
                    };
                }
                ts.rparen();
            }
        }

        emit_returning(&mut ts, &self.returning, dialect);
        ts
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Update {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
    pub set: Vec<(String, Expr)>,
    pub filter: Option<Expr>,
    pub returning: Vec<Expr>,
}

impl Update {
    /// Create a new UPDATE statement.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            alias: None,
            set: Vec::new(),
            filter: None,
            returning: Vec::new(),
        }
    }

    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Alias the target table so the WHERE clause can reference it.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    /// Add WHERE clause (ANDed with existing conditions).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Add RETURNING clause.
    pub fn returning(mut self, exprs: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.returning = exprs.into_iter().map(|e| e.into()).collect();
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // UPDATE table
        ts.push(Token::Update).space();
        emit_target(&mut ts, &self.schema, &self.table, &self.alias);

        // SET clause
        ts.space().push(Token::Set).space();
        for (i, (col, expr)) in self.set.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(col.clone()))
                .space()
                .push(Token::Eq)
                .space()
                .append(&expr.to_tokens_for_dialect(dialect));
        }

        // WHERE clause
        if let Some(ref filter) = self.filter {
            ts.space()
                .push(Token::Where)
                .space()
                .append(&filter.to_tokens_for_dialect(dialect));
        }

        emit_returning(&mut ts, &self.returning, dialect);
        ts
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Delete {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
    pub filter: Option<Expr>,
    pub returning: Vec<Expr>,
}

impl Delete {
    /// Create a new DELETE statement.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            alias: None,
            filter: None,
            returning: Vec::new(),
        }
    }

    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Alias the target table so the WHERE clause can reference it.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add WHERE clause (ANDed with existing conditions).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Add RETURNING clause.
    pub fn returning(mut self, exprs: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.returning = exprs.into_iter().map(|e| e.into()).collect();
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // DELETE FROM table
        ts.push(Token::Delete).space().push(Token::From).space();
        emit_target(&mut ts, &self.schema, &self.table, &self.alias);

        // WHERE clause
        if let Some(ref filter) = self.filter {
            ts.space()
                .push(Token::Where)
                .space()
                .append(&filter.to_tokens_for_dialect(dialect));
        }

        emit_returning(&mut ts, &self.returning, dialect);
        ts
    }
}

// ============================================================================
// Shared emitters
// ============================================================================

fn emit_target(ts: &mut TokenStream, schema: &Option<String>, table: &str, alias: &Option<String>) {
    ts.push(Token::QualifiedIdent {
        schema: schema.clone(),
        name: table.to_string(),
    });
    if let Some(alias) = alias {
        ts.space()
            .push(Token::As)
            .space()
            .push(Token::Ident(alias.clone()));
    }
}

// RETURNING is dropped for dialects without it.
fn emit_returning(ts: &mut TokenStream, returning: &[Expr], dialect: Dialect) {
    if returning.is_empty() || !dialect.supports_returning() {
        return;
    }
    ts.space().push(Token::Returning).space();
    for (i, expr) in returning.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.append(&expr.to_tokens_for_dialect(dialect));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::expr::{col, param, star, table_col};
    use crate::sql::test_utils::validate_sql;
    use serde_json::json;

    #[test]
    fn test_insert_values() {
        let insert = Insert::into("users")
            .schema("app")
            .columns(["name", "email"])
            .values([param("Alice"), param("alice@example.com")]);

        let (sql, args) = insert.to_sql_with_args(Dialect::Postgres);
        assert_eq!(
            sql,
            "INSERT INTO \"app\".\"users\" (\"name\", \"email\") VALUES ($1, $2)"
        );
        assert_eq!(args, vec![json!("Alice"), json!("alice@example.com")]);
        validate_sql(&sql, Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_insert_multiple_rows_with_defaults() {
        let insert = Insert::into("users")
            .columns(["name", "age"])
            .values([param("Alice"), param(30)])
            .values_with_defaults(vec![Some(param("Bob")), None]);

        let sql = insert.to_sql(Dialect::Postgres);
        assert!(sql.ends_with("VALUES ($1, $2), ($3, DEFAULT)"));
    }

    #[test]
    fn test_insert_returning() {
        let insert = Insert::into("users")
            .columns(["name"])
            .values([param("Alice")])
            .returning([star()]);

        assert!(insert.to_sql(Dialect::Postgres).ends_with("RETURNING *"));
        // MySQL has no RETURNING
        assert!(!insert.to_sql(Dialect::MySql).contains("RETURNING"));
    }

    #[test]
    fn test_update_with_alias() {
        let update = Update::table("users")
            .schema("app")
            .alias("sq0")
            .set("status", param("active"))
            .filter(table_col("sq0", "id").eq(param(1)))
            .returning([star()]);

        let sql = update.to_sql(Dialect::Postgres);
        assert_eq!(
            sql,
            "UPDATE \"app\".\"users\" AS \"sq0\" SET \"status\" = $1 WHERE \"sq0\".\"id\" = $2 RETURNING *"
        );
        validate_sql(&sql, Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_update_filters_are_anded() {
        let update = Update::table("users")
            .set("name", param("Alice"))
            .filter(col("id").eq(param(1)))
            .filter(col("age").gt(param(2)));

        let sql = update.to_sql(Dialect::Postgres);
        assert!(sql.contains("WHERE \"id\" = $2 AND \"age\" > $3"));
    }

    #[test]
    fn test_delete_simple() {
        let delete = Delete::from("users")
            .alias("sq0")
            .filter(table_col("sq0", "status").eq(param("inactive")));

        let sql = delete.to_sql(Dialect::Postgres);
        assert_eq!(
            sql,
            "DELETE FROM \"users\" AS \"sq0\" WHERE \"sq0\".\"status\" = $1"
        );
    }

    #[test]
    fn test_delete_all() {
        let delete = Delete::from("temp_data");

        let sql = delete.to_sql(Dialect::Postgres);
        assert_eq!(sql, "DELETE FROM \"temp_data\"");
    }
}
