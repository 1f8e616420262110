//! nestql CLI - Compile nested selections to SQL
//!
//! Usage:
//!   nestql compile --schema <schema.toml> --selection <selection.json> [--dialect <dialect>]
//!   nestql compile --schema <schema.toml> --selection - --mutation
//!   nestql check-schema <schema.toml>
//!
//! Examples:
//!   nestql compile -s app.toml -q users.json --dialect duckdb
//!   echo '{"name":"users","fields":[{"name":"id"}]}' | nestql compile -s app.toml -q -

use clap::{Parser, Subcommand, ValueEnum};
use nestql::config::Settings;
use nestql::schema::RelationResolver;
use nestql::{Compiler, Dialect, Schema, SelectionField};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "nestql")]
#[command(about = "nestql - Compile nested GraphQL-style selections into one SQL query")]
#[command(version)]
struct Cli {
    /// Log compiler decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a selection to SQL
    Compile {
        /// Schema file (.toml or .json); falls back to the config's schema.path
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Selection JSON file, or `-` for stdin
        #[arg(short = 'q', long)]
        selection: PathBuf,

        /// SQL dialect (overrides the config file)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Treat the selection as a mutation field
        #[arg(short, long)]
        mutation: bool,

        /// Settings file (defaults to NESTQL_CONFIG, ./nestql.toml, then the user config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a schema file without compiling anything
    CheckSchema {
        /// Path to the schema file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Mysql,
    Duckdb,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Duckdb => Dialect::DuckDb,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// SQL followed by one argument per line
    Text,
    /// `{"sql": ..., "args": [...]}`
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Compile {
            schema,
            selection,
            dialect,
            mutation,
            config,
            format,
        } => cmd_compile(schema, selection, dialect, mutation, config, format),
        Commands::CheckSchema { file } => cmd_check_schema(file),
    }
}

fn init_logger(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("nestql=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| eprintln!("Error initializing the global logger: {err}"))
        .ok();
}

fn cmd_compile(
    schema: Option<PathBuf>,
    selection: PathBuf,
    dialect: Option<DialectArg>,
    mutation: bool,
    config: Option<PathBuf>,
    format: OutputFormat,
) -> ExitCode {
    let settings = match config {
        Some(path) => Settings::from_file(&path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut options = match settings.compile_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dialect) = dialect {
        options = options.with_dialect(dialect.into());
    }

    let schema_path = match schema {
        Some(path) => path,
        None => match settings.schema.resolved_path() {
            Ok(Some(path)) => path,
            Ok(None) => {
                eprintln!("No schema given: pass --schema or set schema.path in the config");
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let schema = match load_schema(&schema_path) {
        Some(s) => s,
        None => return ExitCode::FAILURE,
    };

    let field = match read_selection(&selection) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error reading selection '{}': {}", selection.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let compiler = Compiler::new(schema).with_options(options);
    let result = if mutation {
        compiler.compile_mutation(&field)
    } else {
        compiler.compile_query(&field)
    };

    match result {
        Ok(compiled) => {
            match format {
                OutputFormat::Text => {
                    println!("{}", compiled.sql);
                    for (i, arg) in compiled.args.iter().enumerate() {
                        println!("-- ${} = {}", i + 1, arg);
                    }
                }
                OutputFormat::Json => {
                    let out = serde_json::json!({
                        "sql": compiled.sql,
                        "args": compiled.args,
                        "dialect": compiled.dialect.to_string(),
                    });
                    println!("{}", out);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_check_schema(file: PathBuf) -> ExitCode {
    let Some(schema) = load_schema(&file) else {
        return ExitCode::FAILURE;
    };

    println!("File: {}", file.display());
    println!();

    let mut resolver = RelationResolver::new(&schema);
    for (name, def) in &schema.types {
        let kind = if def.is_interface() { "interface" } else { "type" };
        println!("  {} {} (table: {})", kind, name, schema.table_for(name));

        for field in &def.fields {
            if let Some(relation) = resolver.resolve(name, field) {
                let via = relation
                    .join
                    .as_ref()
                    .map(|j| format!(" via {}", j.table))
                    .unwrap_or_default();
                println!(
                    "    - {} -> {} ({}{})",
                    field.name, relation.reference_table, relation.kind, via
                );
            }
        }
    }

    println!();
    println!("OK: {} is valid", file.display());
    ExitCode::SUCCESS
}

fn load_schema(path: &Path) -> Option<Schema> {
    // from_file validates as it parses
    match Schema::from_file(path) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("Error loading schema '{}': {}", path.display(), e);
            None
        }
    }
}

fn read_selection(path: &Path) -> io::Result<SelectionField> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path)?
    };
    serde_json::from_str(&text).map_err(io::Error::from)
}
