//! SQL generation module.
//!
//! This module provides a type-safe SQL builder that generates multi-dialect SQL.
//! It includes:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`dml`] - Data Manipulation Language (INSERT, UPDATE, DELETE)
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod dml;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect, UnknownDialect};
pub use expr::{
    and_all, avg, coalesce, col, count_star, exists, func, json_array_agg_or_empty, json_object,
    lit_bool, lit_int, lit_str, max, min, or_all, param, star, sum, table_col,
    BinaryOperator, Expr, ExprExt, Literal, UnaryOperator,
};
pub use query::{
    Cte, CteBody, FromItem, Join, JoinType, LimitOffset, NullsOrder, OrderByExpr, Query,
    SelectExpr, SortDir, TableRef,
};
pub use token::{Token, TokenStream};

// Re-export DML types
pub use dml::{Delete, Insert, Update};
