//! Whole-database conversion.
//!
//! A run opens the database once, lists its user tables, and turns each
//! one into a Turtle file and a Croissant descriptor. Opening the database
//! is the only step whose failure aborts the run; anything that goes wrong
//! while handling a single table is recorded as a [`TableFailure`] and the
//! remaining tables are still converted.
//!
//! Tables are handled in batches of [`ConvertConfig::jobs`]. Catalog and
//! row reads go through the single read-only connection in catalog order;
//! rendering and writing the batch then runs on a rayon pool.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use dbcroissant_core::{CroissantDataset, DatasetOptions, Graph, Table, TripleBuilder};
use dbcroissant_sqlite::Introspector;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ConvertConfig;
use crate::error::{ConvertError, ErrorKind, Result};
use crate::writer::{OutputWriter, TableOutputs};

/// In-memory artifacts for one table, ready to be written.
#[derive(Debug, Clone)]
pub struct TableArtifacts {
    /// Catalog description of the table.
    pub table: Table,
    /// Schema triples, plus row triples when rows were included.
    pub graph: Graph,
    /// Croissant descriptor.
    pub dataset: CroissantDataset,
    /// Number of rows exported.
    pub rows: usize,
}

/// Reads `name` from the database and builds its graph and descriptor.
///
/// # Errors
///
/// Returns [`ConvertError::TableNotFound`] if the table disappeared from
/// the catalog, or [`ConvertError::DatabaseError`] if reading fails.
pub fn build_table(
    db: &Introspector,
    name: &str,
    include_rows: bool,
    options: &DatasetOptions,
    date: NaiveDate,
) -> Result<TableArtifacts> {
    let table = db.table(name)?;
    let builder = TripleBuilder::new(&table);
    let mut graph = builder.schema();

    let rows = if include_rows {
        db.for_each_row(&table, |row| builder.add_row(&mut graph, &row))?
    } else {
        0
    };

    let dataset = CroissantDataset::from_table(&table, options, date);
    Ok(TableArtifacts {
        table,
        graph,
        dataset,
        rows,
    })
}

/// A table that could not be converted.
#[derive(Debug)]
pub struct TableFailure {
    /// Table name as stored in the catalog.
    pub table: String,
    /// Cause.
    pub error: ConvertError,
}

impl TableFailure {
    /// Classification of the cause.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Result of a conversion run that got past opening the database.
#[derive(Debug, Default)]
pub struct ConversionOutcome {
    /// Successfully converted tables, in catalog order.
    pub tables: Vec<TableOutputs>,
    /// Tables that failed, in catalog order.
    pub failures: Vec<TableFailure>,
}

impl ConversionOutcome {
    /// Paths of all generated files: for each table its Turtle file then
    /// its Croissant file.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.tables
            .iter()
            .flat_map(|t| [t.turtle.path.clone(), t.croissant.path.clone()])
            .collect()
    }

    /// File names of all generated files, in the order of
    /// [`output_paths`](Self::output_paths).
    pub fn output_file_names(&self) -> Vec<String> {
        self.tables
            .iter()
            .flat_map(|t| [t.turtle.file_name(), t.croissant.file_name()])
            .collect()
    }

    /// Returns `true` if every table was converted.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Converts every user table of the database at `db_path`.
///
/// Outputs go to [`ConvertConfig::output_dir_for`]. A database without
/// user tables yields an empty outcome and writes nothing.
///
/// # Errors
///
/// Returns [`ConvertError::DatabaseUnreadable`] if the file is missing, is
/// not a SQLite database, or is locked, and [`ConvertError::DatabaseError`]
/// if the catalog cannot be listed. Per-table errors are reported in
/// [`ConversionOutcome::failures`] instead.
pub fn convert_database(db_path: impl AsRef<Path>, config: &ConvertConfig) -> Result<ConversionOutcome> {
    let db_path = db_path.as_ref();
    let db = Introspector::open(db_path)?;
    let names = db.tables()?;
    let writer = OutputWriter::new(config.output_dir_for(db_path));

    info!(
        db = %db_path.display(),
        tables = names.len(),
        output_dir = %writer.dir().display(),
        "Converting database"
    );

    let outcome = convert_tables(&db, &names, &writer, config, Local::now().date_naive())?;

    info!(
        converted = outcome.tables.len(),
        failed = outcome.failures.len(),
        "Conversion finished"
    );
    Ok(outcome)
}

/// Converts the named tables of an open database.
///
/// Lower-level entry point behind [`convert_database`], with an explicit
/// `datePublished`.
pub fn convert_tables(
    db: &Introspector,
    names: &[String],
    writer: &OutputWriter,
    config: &ConvertConfig,
    date: NaiveDate,
) -> Result<ConversionOutcome> {
    let jobs = config.effective_jobs();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| ConvertError::IoError(std::io::Error::other(e.to_string())))?;

    let mut outcome = ConversionOutcome::default();
    for batch in names.chunks(jobs) {
        let built: Vec<(&String, Result<TableArtifacts>)> = batch
            .iter()
            .map(|name| {
                debug!(table = %name, "Reading table");
                let artifacts =
                    build_table(db, name, config.include_rows, &config.dataset, date);
                (name, artifacts)
            })
            .collect();

        let written: Vec<(&String, Result<TableOutputs>)> = pool.install(|| {
            built
                .into_par_iter()
                .map(|(name, artifacts)| (name, artifacts.and_then(|a| write_artifacts(writer, a))))
                .collect()
        });

        for (name, result) in written {
            match result {
                Ok(outputs) => outcome.tables.push(outputs),
                Err(error) => {
                    warn!(table = %name, error = %error, "Table conversion failed");
                    outcome.failures.push(TableFailure {
                        table: name.clone(),
                        error,
                    });
                }
            }
        }
    }
    Ok(outcome)
}

fn write_artifacts(writer: &OutputWriter, artifacts: TableArtifacts) -> Result<TableOutputs> {
    let name = &artifacts.table.name;
    let (turtle, croissant) = writer.write_table(name, &artifacts.graph, &artifacts.dataset)?;
    Ok(TableOutputs {
        table: name.clone(),
        columns: artifacts.table.columns.len(),
        rows: artifacts.rows,
        triples: artifacts.graph.len(),
        turtle,
        croissant,
    })
}
