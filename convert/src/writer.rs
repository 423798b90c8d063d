//! Output file naming and writing.

use std::fs;
use std::path::{Path, PathBuf};

use dbcroissant_core::{CroissantDataset, Graph, escape_component, to_turtle_string};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::Result;

/// Suffix of the Turtle file written for each table.
pub const TRIPLES_SUFFIX: &str = "_triples.ttl";
/// Suffix of the Croissant file written for each table.
pub const CROISSANT_SUFFIX: &str = "_croissant.json";

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// A file produced by a conversion and its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
}

impl WrittenFile {
    /// Final path component, as reported to clients.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Everything written for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutputs {
    /// Table name as stored in the catalog.
    pub table: String,
    /// Number of columns.
    pub columns: usize,
    /// Number of rows exported (zero unless rows were included).
    pub rows: usize,
    /// Number of triples in the Turtle file.
    pub triples: usize,
    /// The `<table>_triples.ttl` file.
    pub turtle: WrittenFile,
    /// The `<table>_croissant.json` file.
    pub croissant: WrittenFile,
}

/// Writes per-table outputs into one directory.
///
/// File stems are the escaped table name, so distinct tables never share
/// a file and no name can leave the directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Creates a writer targeting `dir`. The directory is created on the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the Turtle file for `table`.
    pub fn triples_path(&self, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}{TRIPLES_SUFFIX}", escape_component(table)))
    }

    /// Path of the Croissant file for `table`.
    pub fn croissant_path(&self, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}{CROISSANT_SUFFIX}", escape_component(table)))
    }

    /// Renders and writes both files for `table`, replacing existing ones.
    ///
    /// Both documents are rendered before anything is written. If the
    /// Croissant file cannot be written the Turtle file is removed again, so
    /// a failed table leaves no output behind.
    ///
    /// Returns `(turtle, croissant)`.
    pub fn write_table(
        &self,
        table: &str,
        graph: &Graph,
        dataset: &CroissantDataset,
    ) -> Result<(WrittenFile, WrittenFile)> {
        let turtle = to_turtle_string(graph);
        let json = dataset.to_json_pretty()?;

        fs::create_dir_all(&self.dir)?;
        let turtle = write_file(self.triples_path(table), turtle.as_bytes())?;
        let croissant = match write_file(self.croissant_path(table), json.as_bytes()) {
            Ok(file) => file,
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&turtle.path) {
                    warn!(
                        path = %turtle.path.display(),
                        error = %cleanup,
                        "Failed to remove Turtle file of failed table"
                    );
                }
                return Err(err);
            }
        };

        debug!(
            table,
            turtle = %turtle.path.display(),
            croissant = %croissant.path.display(),
            "Wrote table outputs"
        );
        Ok((turtle, croissant))
    }
}

fn write_file(path: PathBuf, bytes: &[u8]) -> Result<WrittenFile> {
    fs::write(&path, bytes)?;
    Ok(WrittenFile {
        sha256: sha256_hex(bytes),
        path,
    })
}
