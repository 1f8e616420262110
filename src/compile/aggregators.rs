//! Aggregator Registry.
//!
//! An aggregator turns a set of requested fields into one JSON object whose
//! keys are the field names and whose values are the aggregate applied to
//! each column, e.g. `max { likes }` becomes
//! `json_object('likes', MAX(sq1.likes))`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::sql::{avg, json_object, max, min, sum, table_col, Expr};

/// A field requested under an aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateTarget {
    /// Key in the resulting JSON object.
    pub key: String,
    pub column: String,
}

impl AggregateTarget {
    pub fn new(key: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            column: column.into(),
        }
    }
}

/// `fn(table_alias, targets) -> aggregate expression`
pub type AggregatorFn = Arc<dyn Fn(&str, &[AggregateTarget]) -> Expr + Send + Sync>;

#[derive(Clone)]
pub struct AggregatorRegistry {
    aggregators: HashMap<String, AggregatorFn>,
}

impl AggregatorRegistry {
    pub fn new() -> Self {
        Self {
            aggregators: HashMap::new(),
        }
    }

    /// Registry with `max`, `min`, `avg` and `sum`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("max", per_column(max));
        registry.register("min", per_column(min));
        registry.register("avg", per_column(avg));
        registry.register("sum", per_column(sum));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str, &[AggregateTarget]) -> Expr + Send + Sync + 'static,
    {
        self.aggregators.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AggregatorFn> {
        self.aggregators.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.aggregators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AggregatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for AggregatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatorRegistry")
            .field("aggregators", &self.names())
            .finish()
    }
}

/// Aggregator applying `agg` to each target column, keyed by field name.
pub fn per_column(
    agg: fn(Expr) -> Expr,
) -> impl Fn(&str, &[AggregateTarget]) -> Expr + Send + Sync + 'static {
    move |alias, targets| {
        json_object(
            targets
                .iter()
                .map(|t| (t.key.clone(), agg(table_col(alias, &t.column))))
                .collect(),
        )
    }
}
