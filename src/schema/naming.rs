//! Naming rules shared by the schema loader and the compiler.
//!
//! Request-side names (GraphQL fields, camelCase) map to storage-side
//! columns through a fixed [`ColumnCase`] rule. Every identifier that reaches
//! SQL text is checked against [`is_valid_identifier`] first.

use std::sync::LazyLock;

use inflector::Inflector;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// Irregular plurals seen in type names that inflector gets wrong.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("analysis", "analyses"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

/// Whether `name` may be used as a SQL identifier or a GraphQL name.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// How request field names become storage column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnCase {
    /// `createdAt` → `created_at`
    #[default]
    Snake,
    /// Use the field name unchanged.
    Preserve,
}

impl ColumnCase {
    /// Convert a request-side field name to its column name.
    pub fn column_name(self, field: &str) -> String {
        match self {
            ColumnCase::Snake => field.to_snake_case(),
            ColumnCase::Preserve => field.to_string(),
        }
    }
}

/// Singularize a word, handling irregulars first then falling back to inflector.
///
/// Case of the first letter is preserved: `Users` → `User`.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return match_leading_case(word, singular);
        }
    }

    word.to_singular()
}

fn match_leading_case(original: &str, replacement: &str) -> String {
    if original.starts_with(|c: char| c.is_uppercase()) {
        replacement.to_pascal_case()
    } else {
        replacement.to_string()
    }
}

/// The list field an aggregate pseudo-field targets: `_postsAggregate` → `posts`.
pub fn aggregate_target(field: &str) -> Option<&str> {
    field
        .strip_prefix('_')
        .and_then(|rest| rest.strip_suffix("Aggregate"))
        .filter(|target| !target.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_allowlist() {
        assert!(is_valid_identifier("user_id"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("Users2"));
        assert!(!is_valid_identifier("2users"));
        assert!(!is_valid_identifier("users; DROP TABLE x"));
        assert!(!is_valid_identifier("a\"b"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_snake_case_columns() {
        assert_eq!(ColumnCase::Snake.column_name("createdAt"), "created_at");
        assert_eq!(ColumnCase::Snake.column_name("user_id"), "user_id");
        assert_eq!(ColumnCase::Snake.column_name("name"), "name");
        assert_eq!(ColumnCase::Preserve.column_name("createdAt"), "createdAt");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("Users"), "User");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("People"), "Person");
        assert_eq!(singularize("people"), "person");
    }

    #[test]
    fn test_aggregate_target() {
        assert_eq!(aggregate_target("_postsAggregate"), Some("posts"));
        assert_eq!(aggregate_target("_Aggregate"), None);
        assert_eq!(aggregate_target("postsAggregate"), None);
        assert_eq!(aggregate_target("_posts"), None);
    }
}
