//! CLI entry point for `sql2dao`.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use sql2dao::config::GeneratorConfig;
use sql2dao::metadata::source::Catalog;
use sql2dao::output::formatter::{self, OutputFormat};
use sql2dao::pipeline;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sql2dao",
    about = "Generate a typed data-access code model from a parameterized SQL statement"
)]
struct Cli {
    /// SQL file holding exactly one statement
    sql_file: PathBuf,

    /// Business domain name used for class and method names
    #[arg(long, short = 'n')]
    business_name: String,

    /// DDL files (`CREATE TABLE ...`) describing the catalog
    #[arg(long)]
    ddl: Vec<PathBuf>,

    /// JSON catalog files (`{"tables": {...}}`)
    #[arg(long)]
    catalog: Vec<PathBuf>,

    /// TOML generator configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured SQL dialect
    #[arg(long)]
    dialect: Option<String>,

    /// Output format: json or report
    #[arg(long, default_value = "json")]
    format: OutputFormat,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => match GeneratorConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => fail(&format!("Error loading {}: {e}", path.display())),
        },
        None => GeneratorConfig::default(),
    };
    if let Some(dialect) = &cli.dialect {
        config.dialect = dialect.clone();
        if let Err(e) = config.validate() {
            fail(&e.to_string());
        }
    }

    let dialect = match config.sql_dialect() {
        Ok(d) => d,
        Err(e) => fail(&e.to_string()),
    };
    let mut catalog = Catalog::new(dialect);
    for path in &cli.ddl {
        let text = read(path);
        if let Err(e) = catalog.add_ddl(&text) {
            fail(&format!("Error loading {}: {e}", path.display()));
        }
    }
    for path in &cli.catalog {
        let text = read(path);
        if let Err(e) = catalog.add_json(&text) {
            fail(&format!("Error loading {}: {e}", path.display()));
        }
    }
    if catalog.is_empty() {
        tracing::warn!("catalog is empty; every type will fall back to the default");
    } else {
        let tables: Vec<&str> = catalog.table_names().collect();
        tracing::debug!(?tables, "catalog loaded");
    }

    let sql = read(&cli.sql_file);
    let generation = match pipeline::generate(&sql, &cli.business_name, &mut catalog, &config) {
        Ok(g) => g,
        Err(e) => fail(&e.to_string()),
    };

    match formatter::render(&generation, cli.format) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&format!("Error rendering output: {e}")),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sql2dao=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => fail(&format!("Error reading {}: {e}", path.display())),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(2);
}
