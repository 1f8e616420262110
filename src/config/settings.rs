//! TOML-based configuration for nestql.
//!
//! Supports a config file (nestql.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! dialect = "postgres"
//! default_limit = 100
//! max_limit = 1000
//! alias_strategy = "random"   # or "sequential"
//! column_case = "snake"       # or "preserve"
//! root_projection = "rows"    # or "json"
//!
//! [schema]
//! path = "${APP_HOME}/schema.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::compile::{AliasStrategy, CompileOptions, RootProjection, DEFAULT_LIMIT};
use crate::schema::naming::ColumnCase;
use crate::sql::Dialect;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z0-9_]+)").expect("env var pattern")
});

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Compiler options.
    pub compiler: CompilerSettings,

    /// Schema file location.
    pub schema: SchemaSettings,
}

/// `[compiler]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// SQL dialect (postgres, mysql, duckdb).
    pub dialect: String,

    /// Limit applied when a list field passes none. Must be non-zero.
    pub default_limit: u64,

    /// Upper bound on requested limits.
    pub max_limit: Option<u64>,

    pub alias_strategy: AliasStrategy,

    pub alias_seed: Option<u64>,

    pub column_case: ColumnCase,

    pub root_projection: RootProjection,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: "postgres".to_string(),
            default_limit: DEFAULT_LIMIT,
            max_limit: None,
            alias_strategy: AliasStrategy::default(),
            alias_seed: None,
            column_case: ColumnCase::default(),
            root_projection: RootProjection::default(),
        }
    }
}

impl CompilerSettings {
    /// Get the dialect type.
    pub fn dialect_type(&self) -> Result<Dialect, SettingsError> {
        self.dialect
            .parse()
            .map_err(|_| SettingsError::UnsupportedDialect(self.dialect.clone()))
    }

    /// Convert to in-memory compile options.
    pub fn to_compile_options(&self) -> Result<CompileOptions, SettingsError> {
        let mut options = CompileOptions::default()
            .with_dialect(self.dialect_type()?)
            .with_default_limit(self.default_limit)
            .with_alias_strategy(self.alias_strategy)
            .with_column_case(self.column_case)
            .with_root_projection(self.root_projection);
        options.max_limit = self.max_limit;
        options.alias_seed = self.alias_seed;
        Ok(options)
    }
}

/// `[schema]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Path to the schema file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

impl SchemaSettings {
    /// The schema path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `NESTQL_CONFIG`
    /// 2. `./nestql.toml`
    /// 3. `~/.config/nestql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("NESTQL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("nestql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("nestql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings the compiler cannot honour.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let compiler = &self.compiler;
        compiler.dialect_type()?;
        if compiler.default_limit == 0 {
            return Err(SettingsError::InvalidConfig(
                "compiler.default_limit must be greater than zero".into(),
            ));
        }
        if let Some(max) = compiler.max_limit {
            if compiler.default_limit > max {
                return Err(SettingsError::InvalidConfig(format!(
                    "compiler.default_limit ({}) exceeds compiler.max_limit ({})",
                    compiler.default_limit, max
                )));
            }
        }
        Ok(())
    }

    pub fn compile_options(&self) -> Result<CompileOptions, SettingsError> {
        self.compiler.to_compile_options()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for caps in ENV_VAR.captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        let value = env::var(name.as_str())
            .map_err(|_| SettingsError::MissingEnvVar(name.as_str().to_string()))?;
        result.push_str(&s[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }

    result.push_str(&s[last..]);
    Ok(result)
}
