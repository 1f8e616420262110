//! Selection tree input.
//!
//! A [`SelectionField`] mirrors one field of a GraphQL-style request: its
//! name, an optional output alias, argument values and child selections.
//! Trees deserialize from JSON:
//!
//! ```json
//! { "name": "users", "arguments": { "limit": 5 }, "selections": [ { "name": "name" } ] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One field in the request tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[must_use = "builders have no effect until passed to the compiler"]
pub struct SelectionField {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Argument values in request order.
    #[serde(default, alias = "args", skip_serializing_if = "Map::is_empty")]
    pub arguments: Map<String, Value>,

    #[serde(default, alias = "fields", skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<SelectionField>,
}

impl SelectionField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    pub fn select(mut self, child: SelectionField) -> Self {
        self.selections.push(child);
        self
    }

    /// Add several scalar children by name.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .extend(names.into_iter().map(SelectionField::new));
        self
    }

    /// Key this field occupies in the result: the alias, else the name.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// An argument value; an explicit `null` counts as absent.
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key).filter(|v| !v.is_null())
    }

    pub fn has_selections(&self) -> bool {
        !self.selections.is_empty()
    }
}
