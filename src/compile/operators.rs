//! Expression Operator Registry.
//!
//! Maps an operator key from a filter object (`eq`, `in`, `isNull`, ...) to a
//! function producing a predicate against one aliased column. Values always
//! become bound parameters.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::sql::{param, table_col, Expr, ExprExt};

/// The operand does not fit the operator (wrong JSON shape).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct OperandError(pub String);

/// `fn(table_alias, column, value) -> predicate`
pub type OperatorFn = Arc<dyn Fn(&str, &str, &Value) -> Result<Expr, OperandError> + Send + Sync>;

/// Named predicate builders. Read-only once the compiler is constructed.
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Registry with the built-in operators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("eq", |t, c, v| Ok(table_col(t, c).eq(scalar("eq", v)?)));
        registry.register("neq", |t, c, v| Ok(table_col(t, c).ne(scalar("neq", v)?)));
        registry.register("gt", |t, c, v| Ok(table_col(t, c).gt(scalar("gt", v)?)));
        registry.register("gte", |t, c, v| Ok(table_col(t, c).gte(scalar("gte", v)?)));
        registry.register("lt", |t, c, v| Ok(table_col(t, c).lt(scalar("lt", v)?)));
        registry.register("lte", |t, c, v| Ok(table_col(t, c).lte(scalar("lte", v)?)));
        registry.register("like", |t, c, v| {
            Ok(table_col(t, c).like(param(string("like", v)?)))
        });
        registry.register("ilike", |t, c, v| {
            Ok(table_col(t, c).ilike(param(string("ilike", v)?)))
        });
        registry.register("prefix", |t, c, v| {
            let pattern = format!("{}%", escape_like(string("prefix", v)?));
            Ok(table_col(t, c).like_escaped(param(pattern)))
        });
        registry.register("suffix", |t, c, v| {
            let pattern = format!("%{}", escape_like(string("suffix", v)?));
            Ok(table_col(t, c).like_escaped(param(pattern)))
        });
        registry.register("in", |t, c, v| Ok(table_col(t, c).in_list(list("in", v)?)));
        registry.register("notIn", |t, c, v| {
            Ok(table_col(t, c).not_in_list(list("notIn", v)?))
        });
        registry.register("isNull", |t, c, v| match v {
            Value::Bool(true) => Ok(table_col(t, c).is_null()),
            Value::Bool(false) => Ok(table_col(t, c).is_not_null()),
            other => Err(OperandError(format!(
                "isNull expects a boolean, got {}",
                json_type(other)
            ))),
        });
        registry
    }

    /// Register an operator, replacing any existing one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str, &str, &Value) -> Result<Expr, OperandError> + Send + Sync + 'static,
    {
        self.operators.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&OperatorFn> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Registered operator names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// A bindable scalar. `null` is rejected: use `isNull`.
fn scalar(op: &str, value: &Value) -> Result<Expr, OperandError> {
    match value {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(param(value.clone())),
        other => Err(OperandError(format!(
            "{} expects a scalar value, got {}",
            op,
            json_type(other)
        ))),
    }
}

fn string<'v>(op: &str, value: &'v Value) -> Result<&'v str, OperandError> {
    value.as_str().ok_or_else(|| {
        OperandError(format!("{} expects a string, got {}", op, json_type(value)))
    })
}

/// Escape LIKE wildcards so the text matches literally under `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn list(op: &str, value: &Value) -> Result<Vec<Expr>, OperandError> {
    match value {
        Value::Array(items) => items.iter().map(|item| scalar(op, item)).collect(),
        other => Err(OperandError(format!(
            "{} expects a list, got {}",
            op,
            json_type(other)
        ))),
    }
}
