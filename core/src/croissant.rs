//! Croissant (JSON-LD) dataset descriptors for tables.
//!
//! One descriptor is produced per table. It carries fixed dataset metadata
//! (version, license, citation, publish date) and a single record set whose
//! fields mirror the table's columns in declaration order. Field data types
//! come from [`DataType::from_sql`], the same mapping used for RDF literals.
//!
//! # Example output
//!
//! ```json
//! {
//!   "@context": {
//!     "@vocab": "http://schema.org/",
//!     "sc": "http://schema.org/",
//!     "cr": "http://mlcommons.org/croissant/"
//!   },
//!   "@type": "sc:Dataset",
//!   "name": "var",
//!   "datePublished": "2024-05-01",
//!   "version": "1.0.0",
//!   "license": "https://creativecommons.org/licenses/by/4.0/",
//!   "citation": { "@type": "CreativeWork", "name": "Citation for var dataset", "url": "http://cbs.nl/db#var" },
//!   "recordSet": [ { "@type": "cr:RecordSet", "name": "var", "field": [ ... ] } ]
//! }
//! ```

use std::io;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SerializationError;
use crate::model::Table;
use crate::rdf::db_iri;
use crate::types::DataType;

/// Default dataset version.
pub const DEFAULT_VERSION: &str = "1.0.0";
/// Default dataset license (CC-BY 4.0).
pub const DEFAULT_LICENSE: &str = "https://creativecommons.org/licenses/by/4.0/";

/// Overridable dataset-level metadata.
///
/// # Examples
///
/// ```
/// use dbcroissant_core::DatasetOptions;
///
/// let options = DatasetOptions::default();
/// assert_eq!(options.version, "1.0.0");
/// assert!(options.license.contains("by/4.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetOptions {
    /// Value of the `version` property.
    pub version: String,
    /// Value of the `license` property.
    pub license: String,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            license: DEFAULT_LICENSE.to_string(),
        }
    }
}

/// JSON-LD `@context` of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Default vocabulary.
    #[serde(rename = "@vocab")]
    pub vocab: String,
    /// schema.org prefix.
    pub sc: String,
    /// Croissant prefix.
    pub cr: String,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            vocab: "http://schema.org/".to_string(),
            sc: "http://schema.org/".to_string(),
            cr: "http://mlcommons.org/croissant/".to_string(),
        }
    }
}

/// Citation sub-record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Always `CreativeWork`.
    #[serde(rename = "@type")]
    pub kind: String,
    /// Human-readable citation title.
    pub name: String,
    /// IRI of the table resource.
    pub url: String,
}

/// One field of a record set, describing one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CroissantField {
    /// Always `cr:Field`.
    #[serde(rename = "@type")]
    pub kind: String,
    /// Column name.
    pub name: String,
    /// `Column {name} from {table}`.
    pub description: String,
    /// Mapped data type tag.
    #[serde(rename = "dataType")]
    pub data_type: DataType,
    /// Whether the column is declared `NOT NULL`.
    pub required: bool,
}

/// Record set holding the fields of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Always `cr:RecordSet`.
    #[serde(rename = "@type")]
    pub kind: String,
    /// Table name.
    pub name: String,
    /// `Records from {table} table`.
    pub description: String,
    /// Fields in column order.
    pub field: Vec<CroissantField>,
}

/// Croissant descriptor for one table.
///
/// Key order in the rendered JSON follows field order here, so two
/// descriptors built from the same table on the same day are byte-identical.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use dbcroissant_core::{Column, CroissantDataset, DataType, DatasetOptions, Table};
///
/// let table = Table::new("var")
///     .with_column(Column::new(0, "id", "INTEGER").primary_key().not_null())
///     .with_column(Column::new(1, "score", "REAL"));
/// let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
/// let dataset = CroissantDataset::from_table(&table, &DatasetOptions::default(), date);
///
/// assert_eq!(dataset.date_published, "2024-05-01");
/// let types: Vec<_> = dataset.fields().iter().map(|f| f.data_type).collect();
/// assert_eq!(types, vec![DataType::Integer, DataType::Float]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CroissantDataset {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Context,
    /// Always `sc:Dataset`.
    #[serde(rename = "@type")]
    pub kind: String,
    /// Table name.
    pub name: String,
    /// Dataset description.
    pub description: String,
    /// IRI of the table resource.
    pub url: String,
    /// Conversion date, `YYYY-MM-DD`.
    #[serde(rename = "datePublished")]
    pub date_published: String,
    /// Dataset version.
    pub version: String,
    /// License URL.
    pub license: String,
    /// Citation record.
    pub citation: Citation,
    /// Record sets; always exactly one.
    #[serde(rename = "recordSet")]
    pub record_set: Vec<RecordSet>,
}

impl CroissantDataset {
    /// Builds the descriptor for `table`, published on `date`.
    pub fn from_table(table: &Table, options: &DatasetOptions, date: NaiveDate) -> Self {
        let name = &table.name;
        let url = db_iri(name);

        let field = table
            .columns
            .iter()
            .map(|column| CroissantField {
                kind: "cr:Field".to_string(),
                name: column.name.clone(),
                description: format!("Column {} from {name}", column.name),
                data_type: column.data_type(),
                required: column.not_null,
            })
            .collect();

        Self {
            context: Context::default(),
            kind: "sc:Dataset".to_string(),
            name: name.clone(),
            description: format!("Database table {name} converted to Croissant format"),
            url: url.clone(),
            date_published: date.format("%Y-%m-%d").to_string(),
            version: options.version.clone(),
            license: options.license.clone(),
            citation: Citation {
                kind: "CreativeWork".to_string(),
                name: format!("Citation for {name} dataset"),
                url,
            },
            record_set: vec![RecordSet {
                kind: "cr:RecordSet".to_string(),
                name: name.clone(),
                description: format!("Records from {name} table"),
                field,
            }],
        }
    }

    /// Fields of the table's record set.
    pub fn fields(&self) -> &[CroissantField] {
        self.record_set
            .first()
            .map(|rs| rs.field.as_slice())
            .unwrap_or_default()
    }

    /// Renders the descriptor as JSON with 2-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::Json`] if rendering fails.
    pub fn to_json_pretty(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the pretty JSON rendering to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::Json`] if rendering or writing fails.
    pub fn write_json(&self, writer: impl io::Write) -> Result<(), SerializationError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
