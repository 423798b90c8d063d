//! Mapping from declared SQL column types to output data types.
//!
//! SQLite accepts any string as a column's declared type. Both output
//! formats need a small closed set of semantic types instead, and they must
//! agree with each other: a column typed `float` in the Croissant descriptor
//! has its row values typed `xsd:double` in the RDF graph. [`DataType::from_sql`]
//! is the only place where that decision is made.

use std::fmt;

use serde::{Deserialize, Serialize};

/// XSD namespace IRI.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// Semantic type of a column, shared by the RDF and Croissant outputs.
///
/// # Examples
///
/// ```
/// use dbcroissant_core::DataType;
///
/// assert_eq!(DataType::from_sql("INTEGER"), DataType::Integer);
/// assert_eq!(DataType::from_sql("real"), DataType::Float);
/// assert_eq!(DataType::from_sql("VARCHAR(255)"), DataType::String);
/// assert_eq!(DataType::from_sql(""), DataType::String);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Whole numbers.
    Integer,
    /// Text, and the fallback for anything unrecognized.
    #[default]
    String,
    /// Floating point numbers.
    Float,
    /// True/false values.
    Boolean,
}

impl DataType {
    /// Maps a declared SQL type to its data type.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Only the bare names `INTEGER`, `TEXT`, `REAL`, `BLOB`, `VARCHAR` and
    /// `BOOLEAN` are recognized; parametrized forms such as `VARCHAR(50)`
    /// and every other input map to [`DataType::String`].
    pub fn from_sql(declared: &str) -> Self {
        match declared.trim().to_ascii_uppercase().as_str() {
            "INTEGER" => Self::Integer,
            "TEXT" | "BLOB" | "VARCHAR" => Self::String,
            "REAL" => Self::Float,
            "BOOLEAN" => Self::Boolean,
            _ => Self::String,
        }
    }

    /// Croissant `dataType` tag for this type.
    pub fn croissant_tag(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }

    /// Full XSD datatype IRI used for RDF literals of this type.
    pub fn xsd_iri(self) -> String {
        let local = match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Float => "double",
            Self::Boolean => "boolean",
        };
        format!("{XSD_NS}{local}")
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.croissant_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert_eq!(DataType::from_sql("INTEGER"), DataType::Integer);
        assert_eq!(DataType::from_sql("TEXT"), DataType::String);
        assert_eq!(DataType::from_sql("REAL"), DataType::Float);
        assert_eq!(DataType::from_sql("BLOB"), DataType::String);
        assert_eq!(DataType::from_sql("VARCHAR"), DataType::String);
        assert_eq!(DataType::from_sql("BOOLEAN"), DataType::Boolean);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(DataType::from_sql("integer"), DataType::from_sql("INTEGER"));
        assert_eq!(DataType::from_sql("Integer"), DataType::from_sql("INTEGER"));
        assert_eq!(DataType::from_sql("bOoLeAn"), DataType::Boolean);
    }

    #[test]
    fn test_unknown_and_parametrized_fall_back_to_string() {
        assert_eq!(DataType::from_sql("VARCHAR(50)"), DataType::String);
        assert_eq!(DataType::from_sql("NUMERIC"), DataType::String);
        assert_eq!(DataType::from_sql("INT"), DataType::String);
        assert_eq!(DataType::from_sql(""), DataType::String);
    }

    #[test]
    fn test_repeated_calls_agree() {
        for input in ["REAL", "text", "DOUBLE PRECISION", ""] {
            assert_eq!(DataType::from_sql(input), DataType::from_sql(input));
        }
    }

    #[test]
    fn test_tags_and_xsd() {
        assert_eq!(DataType::Float.croissant_tag(), "float");
        assert_eq!(DataType::Boolean.to_string(), "boolean");
        assert_eq!(
            DataType::Float.xsd_iri(),
            "http://www.w3.org/2001/XMLSchema#double"
        );
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&DataType::Integer).unwrap();
        assert_eq!(json, "\"integer\"");
    }
}
