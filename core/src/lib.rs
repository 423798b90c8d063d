//! Core model and mappings for converting SQLite tables to RDF and Croissant.
//!
//! This crate is pure: it never opens a database or a file. Given the
//! catalog description of a table (and optionally its rows) it builds:
//!
//! - an RDF [`Graph`] of table, column and row facts in the `db` namespace
//!   ([`TripleBuilder`]), rendered as Turtle by [`write_turtle`];
//! - a Croissant JSON-LD descriptor ([`CroissantDataset`]) with one field
//!   per column.
//!
//! Both outputs type columns through [`DataType::from_sql`], so they never
//! disagree about a column's semantic type.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use dbcroissant_core::*;
//!
//! let table = Table::new("var")
//!     .with_column(Column::new(0, "id", "INTEGER").primary_key().not_null())
//!     .with_column(Column::new(1, "name", "TEXT"))
//!     .with_column(Column::new(2, "score", "REAL").with_default("0"));
//!
//! let graph = TripleBuilder::new(&table).schema();
//! assert_eq!(graph.len(), 2 + 7 * 3);
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//! let dataset = CroissantDataset::from_table(&table, &DatasetOptions::default(), date);
//! assert_eq!(dataset.fields().len(), 3);
//!
//! let turtle = to_turtle_string(&graph);
//! assert_eq!(parse_turtle(&turtle).unwrap(), graph);
//! ```

mod croissant;
mod error;
mod model;
mod naming;
mod rdf;
mod turtle;
mod types;

pub use croissant::{
    Citation, Context, CroissantDataset, CroissantField, DEFAULT_LICENSE, DEFAULT_VERSION,
    DatasetOptions, RecordSet,
};
pub use error::SerializationError;
pub use model::{Column, Row, Table, Value};
pub use naming::{escape_component, is_turtle_local_name};
pub use rdf::{DB_NS, Graph, Literal, NO_VALUE, RDF_NS, RDFS_NS, Term, Triple, TripleBuilder, db_iri};
pub use turtle::{TurtleError, parse_turtle, to_turtle_string, write_turtle};
pub use types::{DataType, XSD_NS};
