//! Conversion configuration.
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration and command-line flags only need to override what they
//! name.
//!
//! # Example YAML
//!
//! ```yaml
//! output_dir: ./out
//! include_rows: true
//! jobs: 4
//! dataset:
//!   version: "2.1.0"
//!   license: https://creativecommons.org/publicdomain/zero/1.0/
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use dbcroissant_core::DatasetOptions;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for one conversion run.
///
/// # Examples
///
/// ```
/// use dbcroissant_convert::ConvertConfig;
///
/// let config: ConvertConfig = serde_yaml::from_str("jobs: 4").unwrap();
/// assert_eq!(config.jobs, 4);
/// assert!(!config.include_rows);
/// assert!(config.output_dir.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Directory receiving the generated files. Defaults to the directory
    /// containing the database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Emit one RDF subject per row in addition to the schema triples.
    pub include_rows: bool,
    /// Number of tables rendered and written concurrently.
    pub jobs: usize,
    /// Descriptor metadata (`version`, `license`).
    pub dataset: DatasetOptions,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            include_rows: false,
            jobs: 1,
            dataset: DatasetOptions::default(),
        }
    }
}

impl ConvertConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConvertError::IoError) if the file cannot
    /// be read, or [`ConfigError`](crate::ConvertError::ConfigError) if
    /// parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Output directory for a database at `db_path`.
    pub fn output_dir_for(&self, db_path: &Path) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match db_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Worker count, never below one.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.max(1)
    }
}
