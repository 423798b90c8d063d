//! Conversion reports.
//!
//! A report records what a run produced: for every converted table its
//! column, row and triple counts plus the SHA-256 of both output files, and
//! for every failed table the error kind and message. It is written as
//! pretty-printed JSON next to the outputs and can later be checked against
//! the files on disk with [`ConversionReport::verify`].
//!
//! # Examples
//!
//! ```no_run
//! use dbcroissant_convert::{ConversionReport, ConvertConfig, convert_database};
//!
//! let outcome = convert_database("sales.db", &ConvertConfig::default()).unwrap();
//! let report = ConversionReport::from_outcome("sales.db", &outcome);
//! report.save("conversion-report.json").unwrap();
//!
//! let loaded = ConversionReport::load("conversion-report.json").unwrap();
//! assert!(loaded.verify(".").unwrap().is_empty());
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};
use crate::pipeline::{ConversionOutcome, TableFailure};
use crate::writer::sha256_hex;

/// File name used for reports written next to the outputs.
pub const REPORT_FILE_NAME: &str = "conversion-report.json";

/// Report format version.
pub const REPORT_VERSION: &str = "1.0";

/// Per-table entry of a [`ConversionReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Table name as stored in the catalog.
    pub table: String,
    /// Number of columns.
    pub columns: usize,
    /// Number of rows exported.
    pub rows: usize,
    /// Number of triples in the Turtle file.
    pub triples: usize,
    /// Turtle file name relative to the output directory.
    pub turtle_file: String,
    /// SHA-256 hex digest of the Turtle file.
    pub turtle_sha256: String,
    /// Croissant file name relative to the output directory.
    pub croissant_file: String,
    /// SHA-256 hex digest of the Croissant file.
    pub croissant_sha256: String,
}

/// A table that failed during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    /// Table name as stored in the catalog.
    pub table: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl From<&TableFailure> for FailureEntry {
    fn from(failure: &TableFailure) -> Self {
        Self {
            table: failure.table.clone(),
            kind: failure.kind(),
            message: failure.error.to_string(),
        }
    }
}

/// Summary of one conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Report format version.
    pub version: String,
    /// Version of the tool that produced the outputs.
    pub tool_version: String,
    /// File name of the source database.
    pub source: String,
    /// RFC 3339 timestamp of the run.
    pub generated_at: String,
    /// Converted tables in catalog order.
    pub tables: Vec<TableEntry>,
    /// Failed tables in catalog order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureEntry>,
}

impl ConversionReport {
    /// Builds a report from a finished run over the database at `source`.
    pub fn from_outcome(source: impl AsRef<Path>, outcome: &ConversionOutcome) -> Self {
        let source = source
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tables = outcome
            .tables
            .iter()
            .map(|t| TableEntry {
                table: t.table.clone(),
                columns: t.columns,
                rows: t.rows,
                triples: t.triples,
                turtle_file: t.turtle.file_name(),
                turtle_sha256: t.turtle.sha256.clone(),
                croissant_file: t.croissant.file_name(),
                croissant_sha256: t.croissant.sha256.clone(),
            })
            .collect();

        let failures = outcome.failures.iter().map(FailureEntry::from).collect();

        Self {
            version: REPORT_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            source,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            tables,
            failures,
        }
    }

    /// Loads a report from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConvertError::IoError) if the file cannot
    /// be read, or [`SerializationError`](crate::ConvertError::SerializationError)
    /// if the content is not valid report JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let report = serde_json::from_reader(reader)?;
        Ok(report)
    }

    /// Saves the report as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Computes the SHA-256 hex digest of a file.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(sha256_hex(&bytes))
    }

    /// Checks the recorded files in `dir` against their checksums.
    ///
    /// Returns the names of files that are missing or whose content
    /// changed; an empty list means the outputs are intact.
    pub fn verify(&self, dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        let mut mismatched = Vec::new();

        for entry in &self.tables {
            for (file, expected) in [
                (&entry.turtle_file, &entry.turtle_sha256),
                (&entry.croissant_file, &entry.croissant_sha256),
            ] {
                let path = dir.join(file);
                if !path.is_file() || Self::calculate_checksum(&path)? != *expected {
                    mismatched.push(file.clone());
                }
            }
        }
        Ok(mismatched)
    }

    /// Returns `true` if no table failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
