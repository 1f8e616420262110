//! Expression AST - the core of SQL expression building.
//!
//! This module provides a strongly-typed AST for SQL expressions
//! with exhaustive pattern matching enforced by the compiler.
//! Request values never become literals: they travel as [`Expr::Param`]
//! and are bound positionally when the statement is serialized.

use serde_json::Value;

use super::dialect::{Dialect, SqlDialect};
use super::query::{Query, SelectExpr};
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens()` - the compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Literal values
    Literal(Literal),

    /// Bound argument value.
    Param(Value),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Function call: name(args...)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// Subquery: (SELECT ...)
    Subquery(Box<Query>),

    /// EXISTS (SELECT ...)
    Exists(Box<Query>),

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// JSON object built from (key, value) pairs, keys in order.
    JsonObject(Vec<(String, Expr)>),

    /// JSON array aggregate over the rows of the enclosing query.
    JsonArrayAgg(Box<Expr>),

    /// Empty JSON array literal.
    EmptyJsonArray,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    String(String),
    Bool(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // String
    Like,
    ILike,
    /// `LIKE` with `\` as the escape character.
    LikeEscaped,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

// =============================================================================
// Token Generation
// =============================================================================

impl Expr {
    /// Convert this expression to a token stream (default dialect).
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert this expression to a token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::LitInt(*n),
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Bool(b) => Token::LitBool(*b),
                    Literal::Null => Token::LitNull,
                });
            }

            Expr::Param(value) => {
                ts.push(Token::Param(value.clone()));
            }

            Expr::BinaryOp { left, op, right } => {
                // No native ILIKE: compare lower-cased operands
                if *op == BinaryOperator::ILike && !dialect.supports_ilike() {
                    lower(&mut ts, left, dialect);
                    ts.space().push(Token::Like).space();
                    lower(&mut ts, right, dialect);
                } else {
                    ts.append(&left.to_tokens_for_dialect(dialect));
                    ts.space();
                    ts.push(binary_op_to_token(*op));
                    ts.space();
                    ts.append(&right.to_tokens_for_dialect(dialect));
                    if *op == BinaryOperator::LikeEscaped {
                        ts.space().push(Token::LikeEscape);
                    }
                }
            }

            Expr::UnaryOp { op, expr } => {
                ts.push(match op {
                    UnaryOperator::Not => Token::Not,
                });
                ts.space();
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }

            Expr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                comma_separated(&mut ts, args, dialect);
                ts.rparen();
            }

            Expr::Subquery(query) => {
                ts.lparen();
                ts.append(&query.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Exists(query) => {
                ts.push(Token::Exists).space().lparen();
                ts.append(&query.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // Empty IN list: "x IN ()" is invalid SQL
                // "x IN ()" should be FALSE, "x NOT IN ()" should be TRUE
                if values.is_empty() {
                    ts.push(if *negated { Token::True } else { Token::False });
                } else {
                    ts.append(&expr.to_tokens_for_dialect(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    comma_separated(&mut ts, values, dialect);
                    ts.rparen();
                }
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::JsonObject(pairs) => {
                ts.push(Token::JsonObjectFn).lparen();
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.push(Token::LitString(key.clone())).comma().space();
                    ts.append(&value.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
            }

            Expr::JsonArrayAgg(inner) => {
                ts.push(Token::JsonArrayAggFn).lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::EmptyJsonArray => {
                ts.push(Token::EmptyJsonArray);
            }
        }

        ts
    }
}

fn comma_separated(ts: &mut TokenStream, exprs: &[Expr], dialect: Dialect) {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.append(&expr.to_tokens_for_dialect(dialect));
    }
}

fn lower(ts: &mut TokenStream, expr: &Expr, dialect: Dialect) {
    ts.push(Token::FunctionName("LOWER".into())).lparen();
    ts.append(&expr.to_tokens_for_dialect(dialect));
    ts.rparen();
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
        BinaryOperator::Like | BinaryOperator::LikeEscaped => Token::Like,
        BinaryOperator::ILike => Token::ILike,
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

/// Create a string literal.
pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Create a boolean literal.
pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

/// Create a bound argument.
pub fn param(value: impl Into<Value>) -> Expr {
    Expr::Param(value.into())
}

/// Create a star (*) expression.
pub fn star() -> Expr {
    Expr::Star { table: None }
}

/// EXISTS (subquery)
pub fn exists(query: Query) -> Expr {
    Expr::Exists(Box::new(query))
}

// =============================================================================
// JSON Constructors
// =============================================================================

/// JSON object from ordered key/value pairs.
pub fn json_object(pairs: Vec<(String, Expr)>) -> Expr {
    Expr::JsonObject(pairs)
}

/// JSON array aggregate of `expr`, never NULL: falls back to an empty array.
pub fn json_array_agg_or_empty(expr: Expr) -> Expr {
    coalesce(vec![Expr::JsonArrayAgg(Box::new(expr)), Expr::EmptyJsonArray])
}

// =============================================================================
// Aggregate Functions
// =============================================================================

/// COUNT(*)
pub fn count_star() -> Expr {
    Expr::Function {
        name: "COUNT".into(),
        args: vec![star()],
        distinct: false,
    }
}

/// SUM(expr)
pub fn sum(expr: Expr) -> Expr {
    func("SUM", vec![expr])
}

/// AVG(expr)
pub fn avg(expr: Expr) -> Expr {
    func("AVG", vec![expr])
}

/// MIN(expr)
pub fn min(expr: Expr) -> Expr {
    func("MIN", vec![expr])
}

/// MAX(expr)
pub fn max(expr: Expr) -> Expr {
    func("MAX", vec![expr])
}

/// COALESCE(args...)
pub fn coalesce(args: Vec<Expr>) -> Expr {
    func("COALESCE", args)
}

/// Generic function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

// =============================================================================
// Boolean Folding
// =============================================================================

/// AND together a list of predicates. `None` for an empty list (no predicate).
pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(|acc, e| acc.and(e))
}

/// OR together a list of predicates, parenthesized. `None` for an empty list.
pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs
        .into_iter()
        .reduce(|acc, e| acc.or(e))
        .map(|e| Expr::Paren(Box::new(e)))
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    // Comparison operators
    fn eq(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Eq, other.into())
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Ne, other.into())
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gt, other.into())
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gte, other.into())
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lt, other.into())
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lte, other.into())
    }

    // Logical operators
    fn and(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::And, other.into())
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Or, other.into())
    }

    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(self.into_expr()),
        }
    }

    fn paren(self) -> Expr {
        Expr::Paren(Box::new(self.into_expr()))
    }

    // String operators
    fn like(self, pattern: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Like, pattern.into())
    }

    fn ilike(self, pattern: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::ILike, pattern.into())
    }

    /// `LIKE pattern ESCAPE '\'`: the pattern's `\%`, `\_` and `\\` match literally.
    fn like_escaped(self, pattern: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::LikeEscaped, pattern.into())
    }

    // NULL checks
    #[allow(clippy::wrong_self_convention)]
    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    // IN operator
    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    /// Alias this expression (for SELECT list).
    fn alias(self, name: &str) -> SelectExpr {
        SelectExpr {
            expr: self.into_expr(),
            alias: Some(name.into()),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit_int(n as i64)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Literal::String(s))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit_bool(b)
    }
}

impl From<Value> for Expr {
    /// JSON values always become bound arguments.
    fn from(value: Value) -> Self {
        Expr::Param(value)
    }
}

impl From<Query> for Expr {
    /// Convert a Query into a Subquery expression.
    fn from(query: Query) -> Self {
        Expr::Subquery(Box::new(query))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column() {
        let expr = col("name");
        let sql = expr.to_tokens().serialize(Dialect::Postgres);
        assert_eq!(sql, "\"name\"");
    }

    #[test]
    fn test_table_column() {
        let expr = table_col("u", "name");
        let sql = expr.to_tokens().serialize(Dialect::Postgres);
        assert_eq!(sql, "\"u\".\"name\"");
    }

    #[test]
    fn test_binary_op_with_param() {
        let expr = table_col("sq0", "age").gte(param(18));
        let (sql, args) = expr
            .to_tokens_for_dialect(Dialect::Postgres)
            .serialize_with_args(Dialect::Postgres);
        assert_eq!(sql, "\"sq0\".\"age\" >= $1");
        assert_eq!(args, vec![json!(18)]);
    }

    #[test]
    fn test_ilike_fallback() {
        let expr = col("name").ilike(param("%bo%"));
        assert_eq!(
            expr.to_tokens_for_dialect(Dialect::Postgres)
                .serialize(Dialect::Postgres),
            "\"name\" ILIKE $1"
        );
        assert_eq!(
            expr.to_tokens_for_dialect(Dialect::MySql)
                .serialize(Dialect::MySql),
            "LOWER(`name`) LIKE LOWER(?)"
        );
    }

    #[test]
    fn test_like_escape_clause_per_dialect() {
        let expr = col("name").like_escaped(param("a\\_%"));
        let (sql, args) = expr
            .to_tokens_for_dialect(Dialect::Postgres)
            .serialize_with_args(Dialect::Postgres);
        assert_eq!(sql, r#""name" LIKE $1 ESCAPE '\'"#);
        assert_eq!(args, vec![json!("a\\_%")]);
        assert_eq!(
            expr.to_tokens_for_dialect(Dialect::MySql)
                .serialize(Dialect::MySql),
            r"`name` LIKE ? ESCAPE '\\'"
        );
    }

    #[test]
    fn test_in_list_empty() {
        // Empty IN list should produce FALSE
        let expr = col("status").in_list(vec![]);
        let sql = expr.to_tokens().serialize(Dialect::Postgres);
        assert_eq!(sql, "FALSE");

        // Empty NOT IN list should produce TRUE
        let expr = col("status").not_in_list(vec![]);
        let sql = expr.to_tokens().serialize(Dialect::Postgres);
        assert_eq!(sql, "TRUE");
    }

    #[test]
    fn test_in_list_params() {
        let expr = col("id").not_in_list(vec![param(1), param(2)]);
        let sql = expr.to_tokens().serialize(Dialect::Postgres);
        assert_eq!(sql, "\"id\" NOT IN ($1, $2)");
    }

    #[test]
    fn test_json_object_per_dialect() {
        let expr = json_object(vec![
            ("name".into(), table_col("sq0", "name")),
            ("age".into(), table_col("sq0", "age")),
        ]);
        assert_eq!(
            expr.to_tokens_for_dialect(Dialect::Postgres)
                .serialize(Dialect::Postgres),
            "jsonb_build_object('name', \"sq0\".\"name\", 'age', \"sq0\".\"age\")"
        );
        assert_eq!(
            expr.to_tokens_for_dialect(Dialect::MySql)
                .serialize(Dialect::MySql),
            "JSON_OBJECT('name', `sq0`.`name`, 'age', `sq0`.`age`)"
        );
    }

    #[test]
    fn test_json_array_agg_never_null() {
        let expr = json_array_agg_or_empty(json_object(vec![(
            "id".into(),
            table_col("w", "id"),
        )]));
        assert_eq!(
            expr.to_tokens().serialize(Dialect::Postgres),
            "COALESCE(jsonb_agg(jsonb_build_object('id', \"w\".\"id\")), '[]'::jsonb)"
        );
    }

    #[test]
    fn test_and_or_folding() {
        assert_eq!(and_all(Vec::new()), None);
        assert_eq!(or_all(Vec::new()), None);

        let or = or_all(vec![col("a").eq(1), col("b").eq(2)]);
        let sql = or.map(|e| e.to_tokens().serialize(Dialect::Postgres));
        assert_eq!(sql.as_deref(), Some("(\"a\" = 1 OR \"b\" = 2)"));
    }

    #[test]
    fn test_not_wraps_operand() {
        let expr = col("a").eq(1).paren().not();
        assert_eq!(
            expr.to_tokens().serialize(Dialect::Postgres),
            "NOT (\"a\" = 1)"
        );
    }

    #[test]
    fn test_value_converts_to_param() {
        let expr: Expr = json!("x").into();
        assert_eq!(expr, Expr::Param(json!("x")));
    }
}
