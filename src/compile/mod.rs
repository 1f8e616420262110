//! Compilation from a selection tree to one parameterized SQL statement.
//!
//! ```text
//! SelectionField → scopes (CompiledQuery tree) → Query → SQL + arguments
//! ```
//!
//! # Example
//!
//! ```
//! use nestql::compile::{CompileOptions, Compiler};
//! use nestql::schema::Schema;
//! use nestql::selection::SelectionField;
//! use serde_json::json;
//!
//! let schema = Schema::from_toml_str(r#"
//!     [types.User]
//!     fields = [{ name = "name", type = "String" }]
//! "#).unwrap();
//!
//! let compiler = Compiler::new(schema).with_options(CompileOptions::default().sequential());
//! let output = compiler
//!     .compile_query(&SelectionField::new("users").arg("limit", json!(5)).fields(["name"]))
//!     .unwrap();
//!
//! assert_eq!(output.sql, r#"SELECT "sq0"."name" AS "name" FROM "user" AS "sq0" LIMIT $1"#);
//! assert_eq!(output.args, vec![json!(5)]);
//! ```

pub mod aggregators;
pub mod alias;
mod builder;
pub mod error;
mod filter;
mod mutation;
pub mod operators;
pub mod projection;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub use aggregators::{AggregateTarget, AggregatorFn, AggregatorRegistry};
pub use alias::{AliasAllocator, AliasStrategy, RandomAliases, SequentialAliases, TableAlias};
pub use error::{CompileError, CompileResult, ErrorKind, FieldPath};
pub use mutation::MutationKind;
pub use operators::{OperandError, OperatorFn, OperatorRegistry};
pub use projection::{CompiledQuery, Embedding, ProjectionItem, ProjectionValue};

use crate::schema::naming::ColumnCase;
use crate::schema::Schema;
use crate::selection::SelectionField;
use crate::sql::query::Query;
use crate::sql::{Dialect, Expr};
use builder::CompileContext;

// ============================================================================
// Options
// ============================================================================

/// How a top-level query field is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RootProjection {
    /// One SQL row per entity.
    #[default]
    Rows,
    /// A single JSON value (object or array) for the whole field.
    Json,
}

pub const DEFAULT_LIMIT: u64 = 100;

/// Options for compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,

    /// Limit bound to list fields that do not pass one.
    pub default_limit: u64,

    /// Largest `limit` a request may ask for.
    pub max_limit: Option<u64>,

    pub alias_strategy: AliasStrategy,

    /// Seed for random aliases, for reproducible output.
    pub alias_seed: Option<u64>,

    pub column_case: ColumnCase,

    pub root_projection: RootProjection,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            default_limit: DEFAULT_LIMIT,
            max_limit: None,
            alias_strategy: AliasStrategy::Random,
            alias_seed: None,
            column_case: ColumnCase::Snake,
            root_projection: RootProjection::Rows,
        }
    }
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_max_limit(mut self, limit: u64) -> Self {
        self.max_limit = Some(limit);
        self
    }

    pub fn with_alias_strategy(mut self, strategy: AliasStrategy) -> Self {
        self.alias_strategy = strategy;
        self
    }

    pub fn with_alias_seed(mut self, seed: u64) -> Self {
        self.alias_seed = Some(seed);
        self
    }

    pub fn with_column_case(mut self, case: ColumnCase) -> Self {
        self.column_case = case;
        self
    }

    pub fn with_root_projection(mut self, projection: RootProjection) -> Self {
        self.root_projection = projection;
        self
    }

    /// Shorthand for sequential `sq0, sq1, ...` aliases.
    pub fn sequential(self) -> Self {
        self.with_alias_strategy(AliasStrategy::Sequential)
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of compiling one field.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The generated SQL string.
    pub sql: String,

    /// Bound values, in placeholder order.
    pub args: Vec<Value>,

    /// The SQL query AST (for further manipulation if needed).
    pub query: Query,

    /// The dialect used for generation.
    pub dialect: Dialect,
}

impl CompileOutput {
    fn render(query: Query, dialect: Dialect) -> Self {
        let (sql, args) = query.to_sql_with_args(dialect);
        Self {
            sql,
            args,
            query,
            dialect,
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles selection trees against one schema.
///
/// Cheap to clone and safe to share across threads: the schema and
/// registries are read-only, and every compile call creates its own alias
/// allocator and relation cache.
#[derive(Debug, Clone)]
pub struct Compiler {
    schema: Arc<Schema>,
    operators: Arc<OperatorRegistry>,
    aggregators: Arc<AggregatorRegistry>,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            operators: Arc::new(OperatorRegistry::with_defaults()),
            aggregators: Arc::new(AggregatorRegistry::with_defaults()),
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Register (or replace) a filter operator.
    pub fn with_operator<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&str, &str, &Value) -> Result<Expr, OperandError> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.operators).register(name, f);
        self
    }

    /// Register (or replace) an aggregator.
    pub fn with_aggregator<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&str, &[AggregateTarget]) -> Expr + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.aggregators).register(name, f);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn aggregators(&self) -> &AggregatorRegistry {
        &self.aggregators
    }

    /// Compile a top-level query field with a fresh allocator from the options.
    pub fn compile_query(&self, field: &SelectionField) -> CompileResult<CompileOutput> {
        let mut aliases = self
            .options
            .alias_strategy
            .allocator(self.options.alias_seed);
        self.compile_query_with(field, aliases.as_mut())
    }

    /// Compile a top-level query field with a caller-supplied allocator.
    pub fn compile_query_with(
        &self,
        field: &SelectionField,
        aliases: &mut dyn AliasAllocator,
    ) -> CompileResult<CompileOutput> {
        let scope = self.context(aliases).compile_root(field)?;
        let output = CompileOutput::render(scope.to_query(), self.options.dialect);
        debug!(field = %field.name, args = output.args.len(), "compiled query");
        Ok(output)
    }

    /// Compile a top-level field into its sealed scope tree without rendering.
    pub fn compile_scope(
        &self,
        field: &SelectionField,
        aliases: &mut dyn AliasAllocator,
    ) -> CompileResult<CompiledQuery> {
        self.context(aliases).compile_root(field)
    }

    /// Compile a top-level mutation field (`createX`, `updateX`, `deleteX`).
    pub fn compile_mutation(&self, field: &SelectionField) -> CompileResult<CompileOutput> {
        let mut aliases = self
            .options
            .alias_strategy
            .allocator(self.options.alias_seed);
        self.compile_mutation_with(field, aliases.as_mut())
    }

    pub fn compile_mutation_with(
        &self,
        field: &SelectionField,
        aliases: &mut dyn AliasAllocator,
    ) -> CompileResult<CompileOutput> {
        let query = self.context(aliases).compile_mutation(field)?;
        let output = CompileOutput::render(query, self.options.dialect);
        debug!(field = %field.name, args = output.args.len(), "compiled mutation");
        Ok(output)
    }

    fn context<'c>(&'c self, aliases: &'c mut dyn AliasAllocator) -> CompileContext<'c> {
        CompileContext::new(
            &self.schema,
            &self.operators,
            &self.aggregators,
            &self.options,
            aliases,
        )
    }
}

/// Compile one query field with default registries.
pub fn compile_query(
    schema: &Schema,
    field: &SelectionField,
    options: CompileOptions,
) -> CompileResult<CompileOutput> {
    Compiler::new(schema.clone())
        .with_options(options)
        .compile_query(field)
}
