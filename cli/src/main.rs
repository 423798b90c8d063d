mod server;

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dbcroissant_convert::{
    ConversionReport, ConvertConfig, ConvertError, REPORT_FILE_NAME, convert_database,
};
use dbcroissant_core::DataType;
use dbcroissant_sqlite::Introspector;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::server::{DEFAULT_BIND, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_DIR, ServerState};

/// Exit status when the run finished but some tables were skipped.
const EXIT_PARTIAL: i32 = 2;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum InspectFormat {
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "dbcroissant", version)]
#[command(about = "Convert SQLite databases to RDF triples and Croissant descriptors")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert every table of a database into Turtle and Croissant files.
    Convert(ConvertArgs),
    /// List tables and columns with their mapped data types.
    Inspect(InspectArgs),
    /// Run the HTTP upload/download service.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// SQLite database file.
    db: PathBuf,
    /// Output directory (default: the database's directory).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Include one RDF subject per row.
    #[arg(long)]
    rows: bool,
    /// Number of tables rendered and written in parallel.
    #[arg(long)]
    jobs: Option<usize>,
    /// YAML configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write conversion-report.json to the output directory.
    #[arg(long)]
    report: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// SQLite database file.
    db: PathBuf,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: InspectFormat,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: SocketAddr,
    /// Directory for staged uploads and generated files; removed on shutdown.
    #[arg(long, default_value = DEFAULT_UPLOAD_DIR)]
    upload_dir: PathBuf,
    /// Include row triples unless a request says otherwise.
    #[arg(long)]
    rows: bool,
    /// Maximum accepted upload size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Inspect(args) => run_inspect(args).map(|()| true),
        Command::Serve(args) => run_serve(args).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_PARTIAL),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `Ok(false)` when some tables failed.
fn run_convert(args: ConvertArgs) -> Result<bool, String> {
    let mut config = match &args.config {
        Some(path) => ConvertConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => ConvertConfig::default(),
    };
    if let Some(output) = args.output {
        config.output_dir = Some(output);
    }
    if args.rows {
        config.include_rows = true;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }

    let outcome = convert_database(&args.db, &config).map_err(|e| match e {
        ConvertError::DatabaseUnreadable { .. } => e.to_string(),
        other => format!("Conversion of '{}' failed: {other}", args.db.display()),
    })?;

    for path in outcome.output_paths() {
        println!("{}", path.display());
    }

    if args.report {
        let dir = config.output_dir_for(&args.db);
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create output directory '{}': {e}", dir.display()))?;
        let path = dir.join(REPORT_FILE_NAME);
        ConversionReport::from_outcome(&args.db, &outcome)
            .save(&path)
            .map_err(|e| format!("Failed to write report '{}': {e}", path.display()))?;
        println!("{}", path.display());
    }

    for failure in &outcome.failures {
        eprintln!("failed: {}: {}", failure.table, failure.error);
    }
    if !outcome.is_complete() {
        eprintln!(
            "{} of {} tables failed",
            outcome.failures.len(),
            outcome.failures.len() + outcome.tables.len()
        );
    }
    Ok(outcome.is_complete())
}

#[derive(Debug, Serialize)]
struct InspectTable {
    name: String,
    rows: usize,
    columns: Vec<InspectColumn>,
}

#[derive(Debug, Serialize)]
struct InspectColumn {
    name: String,
    declared_type: String,
    data_type: DataType,
    not_null: bool,
    primary_key: bool,
    default_value: Option<String>,
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let db = Introspector::open(&args.db).map_err(|e| e.to_string())?;
    let schema = db
        .schema()
        .map_err(|e| format!("Failed to read schema: {e}"))?;

    let mut tables = Vec::with_capacity(schema.len());
    for table in schema {
        let rows = db
            .row_count(&table.name)
            .map_err(|e| format!("Failed to count rows of '{}': {e}", table.name))?;
        tables.push(InspectTable {
            rows,
            columns: table
                .columns
                .iter()
                .map(|c| InspectColumn {
                    name: c.name.clone(),
                    declared_type: c.declared_type.clone(),
                    data_type: c.data_type(),
                    not_null: c.not_null,
                    primary_key: c.primary_key,
                    default_value: c.default_value.clone(),
                })
                .collect(),
            name: table.name,
        });
    }

    match args.format {
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&tables)
                .map_err(|e| format!("JSON serialization failed: {e}"))?;
            println!("{json}");
        }
        InspectFormat::Table => print!("{}", format_tables(&tables)),
    }
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<(), String> {
    let config = ConvertConfig {
        include_rows: args.rows,
        ..ConvertConfig::default()
    };
    let state =
        ServerState::new(args.upload_dir, config).with_max_upload_bytes(args.max_upload_bytes);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    runtime.block_on(server::serve(args.bind, state))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn format_tables(tables: &[InspectTable]) -> String {
    let mut out = String::new();
    for table in tables {
        out.push_str(&format!(
            "{} ({} columns, {} rows)\n",
            table.name,
            table.columns.len(),
            table.rows
        ));

        let name_width = table.columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let type_width = table
            .columns
            .iter()
            .map(|c| c.declared_type.len())
            .max()
            .unwrap_or(0);
        for column in &table.columns {
            let mut flags = Vec::new();
            if column.primary_key {
                flags.push("PK".to_string());
            }
            if column.not_null {
                flags.push("NOT NULL".to_string());
            }
            if let Some(default) = &column.default_value {
                flags.push(format!("DEFAULT {default}"));
            }
            let line = format!(
                "  {:<name_width$}  {:<type_width$}  {:<7}  {}",
                column.name,
                column.declared_type,
                column.data_type.croissant_tag(),
                flags.join(", ")
            );
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, declared: &str) -> InspectColumn {
        InspectColumn {
            name: name.to_string(),
            declared_type: declared.to_string(),
            data_type: DataType::from_sql(declared),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    #[test]
    fn test_format_tables_aligns_columns() {
        let mut id = column("id", "INTEGER");
        id.primary_key = true;
        let mut score = column("score", "REAL");
        score.default_value = Some("0".to_string());

        let text = format_tables(&[InspectTable {
            name: "var".to_string(),
            rows: 2,
            columns: vec![id, score],
        }]);

        assert_eq!(
            text,
            "var (2 columns, 2 rows)\n\
             \x20\x20id     INTEGER  integer  PK\n\
             \x20\x20score  REAL     float    DEFAULT 0\n"
        );
    }

    #[test]
    fn test_cli_parses_convert_flags() {
        let cli = Cli::parse_from(["dbcroissant", "convert", "a.db", "--rows", "--jobs", "3"]);
        match cli.command {
            Command::Convert(args) => {
                assert!(args.rows);
                assert_eq!(args.jobs, Some(3));
                assert!(!args.report);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
