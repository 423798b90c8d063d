//! Conversion of SQLite databases into RDF/Turtle and Croissant files.
//!
//! For every user table of a database the pipeline writes two files into
//! the output directory:
//!
//! - `<table>_triples.ttl`: table, column and (optionally) row facts;
//! - `<table>_croissant.json`: a Croissant JSON-LD descriptor.
//!
//! Table names are percent-escaped in file names (see
//! [`dbcroissant_core::escape_component`]).
//!
//! # Quick start
//!
//! ```no_run
//! use dbcroissant_convert::{ConversionReport, ConvertConfig, REPORT_FILE_NAME, convert_database};
//!
//! let config = ConvertConfig {
//!     include_rows: true,
//!     jobs: 4,
//!     ..ConvertConfig::default()
//! };
//! let outcome = convert_database("sales.db", &config).unwrap();
//! for path in outcome.output_paths() {
//!     println!("{}", path.display());
//! }
//! for failure in &outcome.failures {
//!     eprintln!("{}: {}", failure.table, failure.error);
//! }
//!
//! ConversionReport::from_outcome("sales.db", &outcome)
//!     .save(REPORT_FILE_NAME)
//!     .unwrap();
//! ```

mod config;
mod error;
mod pipeline;
mod report;
mod writer;

pub use config::ConvertConfig;
pub use error::{ConvertError, ErrorKind, Result};
pub use pipeline::{
    ConversionOutcome, TableArtifacts, TableFailure, build_table, convert_database, convert_tables,
};
pub use report::{ConversionReport, FailureEntry, REPORT_FILE_NAME, REPORT_VERSION, TableEntry};
pub use writer::{
    CROISSANT_SUFFIX, OutputWriter, TRIPLES_SUFFIX, TableOutputs, WrittenFile, sha256_hex,
};
