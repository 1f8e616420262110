//! # nestql
//!
//! Compiles nested GraphQL-style selections into a single parameterized SQL
//! statement whose rows already carry the nested shape as JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │      Schema (types, tables, relation directives)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [relation resolver]
//! ┌─────────────────────────────────────────────────────────┐
//! │   SelectionField tree  →  CompiledQuery scopes          │
//! │   (aliases, filters, projection, aggregates)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [lowering]
//! ┌─────────────────────────────────────────────────────────┐
//! │           SQL AST (Query / Insert / Update)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [token stream + dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │             SQL text + ordered arguments                │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod compile;
pub mod config;
pub mod schema;
pub mod selection;
pub mod sql;

// Re-export SQL submodules at crate level
pub use sql::dialect;
pub use sql::dml;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{
        AliasAllocator, AliasStrategy, CompileError, CompileOptions, CompileOutput,
        CompileResult, Compiler, ErrorKind, RandomAliases, RootProjection, SequentialAliases,
    };
    pub use crate::config::Settings;
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::expr::{param, table_col, Expr, ExprExt};
    pub use crate::schema::naming::ColumnCase;
    pub use crate::schema::Schema;
    pub use crate::selection::SelectionField;
}

// Also export at crate root for convenience
pub use compile::{CompileError, CompileOptions, CompileOutput, Compiler};
pub use dialect::Dialect;
pub use schema::Schema;
pub use selection::SelectionField;
