//! relsql CLI - compile query descriptions to SQL
//!
//! Usage:
//!   relsql compile --schema <schema.json> --query <query.json> [--dialect <dialect>] [--operation <op>]
//!   relsql dialects
//!
//! Examples:
//!   relsql compile --schema shop.json --query orders.json --dialect postgres
//!   relsql compile -s shop.toml -q new_order.json -o create --output verbose

use clap::{Parser, Subcommand, ValueEnum};
use relsql::config::Settings;
use relsql::query::QuerySpec;
use relsql::sql::{Dialect, SqlDialect};
use relsql::{QueryBuilder, Schema};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relsql")]
#[command(about = "relsql - compiles object-level queries to multi-dialect SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query description to SQL
    Compile {
        /// Path to the schema (.json or .toml)
        #[arg(short, long)]
        schema: PathBuf,

        /// Path to the JSON query description
        #[arg(short, long)]
        query: PathBuf,

        /// SQL dialect to generate (defaults to the configured dialect)
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// Statement kind to generate
        #[arg(short = 'o', long, default_value = "read")]
        operation: Operation,

        /// Output format
        #[arg(long, default_value = "sql")]
        output: OutputFormat,
    },

    /// List supported dialects
    Dialects,
}

#[derive(Clone, Copy, ValueEnum)]
enum Operation {
    Read,
    Count,
    Create,
    Update,
    Delete,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output SQL with comments
    Verbose,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            schema,
            query,
            dialect,
            operation,
            output,
        } => cmd_compile(schema, query, dialect, operation, output),
        Commands::Dialects => cmd_dialects(),
    }
}

fn cmd_compile(
    schema_path: PathBuf,
    query_path: PathBuf,
    dialect: Option<Dialect>,
    operation: Operation,
    output: OutputFormat,
) -> ExitCode {
    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let options = match settings.compile_options(dialect) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let schema = match Schema::from_file(&schema_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading schema '{}': {}", schema_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let spec = match fs::read_to_string(&query_path)
        .map_err(|e| e.to_string())
        .and_then(|source| QuerySpec::from_json(&source).map_err(|e| e.to_string()))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading query '{}': {}", query_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let dialect = options.dialect;
    let statements = QueryBuilder::from_spec(&schema, &spec, options).and_then(|builder| {
        Ok(match operation {
            Operation::Read => vec![builder.compile_read()?.sql],
            Operation::Count => vec![builder.compile_count()?.sql],
            Operation::Create => sql_of(builder.compile_create()?),
            Operation::Update => sql_of(builder.compile_update()?),
            Operation::Delete => sql_of(builder.compile_delete()?),
        })
    });

    match statements {
        Ok(statements) => {
            if let OutputFormat::Verbose = output {
                println!("-- relsql compiled SQL");
                println!("-- Schema: {}", schema_path.display());
                println!("-- Query: {}", query_path.display());
                println!("-- Object: {}", spec.object);
                println!("-- Dialect: {}", dialect);
                println!();
            }
            for sql in statements {
                println!("{};", sql);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn sql_of(plan: relsql::compiler::WritePlan) -> Vec<String> {
    plan.statements.into_iter().map(|s| s.sql).collect()
}

fn dialect_line(dialect: Dialect) -> String {
    format!(
        "{:<10} multi-row insert: {:<5} DML alias: {}",
        dialect.to_string(),
        dialect.supports_multi_row_insert(),
        dialect.supports_dml_table_alias(),
    )
}

fn cmd_dialects() -> ExitCode {
    for dialect in Dialect::all() {
        println!("{}", dialect_line(*dialect));
    }
    ExitCode::SUCCESS
}
