//! RDF graph model and the table-to-triples mapping.
//!
//! Every table becomes a small graph in the `db` namespace:
//!
//! ```text
//! db:var      a db:Table ; rdfs:label "var" ; db:hasColumn db:id .
//! db:id       a db:Column ;
//!             rdfs:label "id" ;
//!             db:columnType "INTEGER" ;
//!             db:notNull true ;
//!             db:defaultValue "None" ;
//!             db:primaryKey true .
//! db:var_row_1 a db:Row ; db:id 7 .
//! db:var      db:hasRow db:var_row_1 .
//! ```
//!
//! The schema part always has `2 + 7 * columns` triples. Each row adds
//! `2 + columns` triples: its type, the `hasRow` link, and one triple per
//! value with the column IRI as predicate.

use std::collections::BTreeSet;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::model::{Row, Table, Value};
use crate::naming::escape_component;
use crate::types::{DataType, XSD_NS};

/// Base namespace for every generated identifier, bound to the `db` prefix.
pub const DB_NS: &str = "http://cbs.nl/db#";
/// RDF namespace.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// RDFS namespace.
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";

/// Literal written for a missing default value or a `NULL` cell.
pub const NO_VALUE: &str = "None";

/// Builds an IRI in the `db` namespace, escaping the local name.
pub fn db_iri(local: &str) -> String {
    format!("{DB_NS}{}", escape_component(local))
}

fn rdf_type() -> String {
    format!("{RDF_NS}type")
}

fn rdfs_label() -> String {
    format!("{RDFS_NS}label")
}

/// An RDF literal: lexical form plus optional datatype IRI.
///
/// A literal without a datatype is a plain string literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    /// Lexical form.
    pub lexical: String,
    /// Datatype IRI, `None` for plain strings.
    pub datatype: Option<String>,
}

impl Literal {
    /// Plain string literal.
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
        }
    }

    /// Literal with an explicit datatype IRI.
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
        }
    }

    /// `xsd:boolean` literal.
    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), DataType::Boolean.xsd_iri())
    }

    /// Converts a cell value to a literal, using the column's data type
    /// where the stored value fits it.
    ///
    /// `NULL` becomes the [`NO_VALUE`] sentinel and blobs become
    /// `xsd:base64Binary`.
    pub fn from_value(value: &Value, data_type: DataType) -> Self {
        match value {
            Value::Null => Self::plain(NO_VALUE),
            Value::Integer(i) => match data_type {
                DataType::Boolean if *i == 0 || *i == 1 => Self::boolean(*i == 1),
                // "5" is a valid xsd:double lexical form.
                DataType::Float => Self::typed(i.to_string(), DataType::Float.xsd_iri()),
                _ => Self::typed(i.to_string(), DataType::Integer.xsd_iri()),
            },
            Value::Real(r) => Self::typed(format_double(*r), DataType::Float.xsd_iri()),
            Value::Text(s) => Self::plain(s.clone()),
            Value::Blob(bytes) => {
                Self::typed(BASE64.encode(bytes), format!("{XSD_NS}base64Binary"))
            }
        }
    }
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let lexical = if value > 0.0 { "INF" } else { "-INF" };
        lexical.to_string()
    } else {
        value.to_string()
    }
}

/// Subject, predicate or object of a triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    /// Absolute IRI.
    Iri(String),
    /// Literal value.
    Literal(Literal),
}

impl Term {
    /// Returns the IRI if this term is one.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Literal(_) => None,
        }
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Literal(lit) => match &lit.datatype {
                Some(dt) => write!(f, "{:?}^^<{dt}>", lit.lexical),
                None => write!(f, "{:?}", lit.lexical),
            },
        }
    }
}

/// A single `(subject, predicate, object)` fact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    /// Subject IRI.
    pub subject: String,
    /// Predicate IRI.
    pub predicate: String,
    /// Object term.
    pub object: Term,
}

impl Triple {
    /// Creates a triple.
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// A set of triples.
///
/// Inserting a triple that is already present has no effect. Iteration is
/// sorted, which keeps serialized output stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    triples: BTreeSet<Triple>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triple; returns `false` if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Number of distinct triples.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Returns `true` if the graph holds no triples.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Returns `true` if the triple is present.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Iterates triples in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Triples with the given predicate.
    pub fn with_predicate<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a Triple> {
        self.triples.iter().filter(move |t| t.predicate == predicate)
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        self.triples.extend(iter);
    }
}

/// Maps one table (and optionally its rows) to triples.
///
/// Column IRIs are computed once so that adding many rows does not
/// re-escape names.
///
/// # Examples
///
/// ```
/// use dbcroissant_core::{Column, Row, Table, TripleBuilder, Value};
///
/// let table = Table::new("var")
///     .with_column(Column::new(0, "id", "INTEGER").primary_key().not_null())
///     .with_column(Column::new(1, "name", "TEXT"));
/// let builder = TripleBuilder::new(&table);
///
/// let mut graph = builder.schema();
/// assert_eq!(graph.len(), 2 + 7 * 2);
///
/// builder.add_row(&mut graph, &Row::new(1, vec![Value::Integer(1), Value::Null]));
/// assert_eq!(graph.len(), 2 + 7 * 2 + 2 + 2);
/// ```
pub struct TripleBuilder<'a> {
    table: &'a Table,
    table_iri: String,
    column_iris: Vec<String>,
    column_types: Vec<DataType>,
}

impl<'a> TripleBuilder<'a> {
    /// Prepares a builder for `table`.
    ///
    /// Table and column IRIs share the `db:` namespace. A column named like
    /// its table maps to the table's IRI, and the identical `rdfs:label`
    /// triples merge into one.
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            table_iri: db_iri(&table.name),
            column_iris: table.columns.iter().map(|c| db_iri(&c.name)).collect(),
            column_types: table.columns.iter().map(|c| c.data_type()).collect(),
        }
    }

    /// IRI of the table resource.
    pub fn table_iri(&self) -> &str {
        &self.table_iri
    }

    /// IRI of the `number`-th row resource.
    pub fn row_iri(&self, number: usize) -> String {
        db_iri(&format!("{}_row_{number}", self.table.name))
    }

    /// Builds a fresh graph holding the schema triples.
    pub fn schema(&self) -> Graph {
        let mut graph = Graph::new();
        self.add_schema(&mut graph);
        graph
    }

    /// Adds the table and column triples to `graph`.
    pub fn add_schema(&self, graph: &mut Graph) {
        let rdf_type = rdf_type();
        let label = rdfs_label();
        let table_iri = &self.table_iri;

        graph.insert(Triple::new(table_iri, &rdf_type, Term::Iri(db_iri("Table"))));
        graph.insert(Triple::new(
            table_iri,
            &label,
            Literal::plain(&self.table.name).into(),
        ));

        for (column, column_iri) in self.table.columns.iter().zip(&self.column_iris) {
            let default = column.default_value.as_deref().unwrap_or(NO_VALUE);
            graph.extend([
                Triple::new(column_iri, &rdf_type, Term::Iri(db_iri("Column"))),
                Triple::new(column_iri, &label, Literal::plain(&column.name).into()),
                Triple::new(
                    column_iri,
                    db_iri("columnType"),
                    Literal::plain(&column.declared_type).into(),
                ),
                Triple::new(
                    column_iri,
                    db_iri("notNull"),
                    Literal::boolean(column.not_null).into(),
                ),
                Triple::new(
                    column_iri,
                    db_iri("defaultValue"),
                    Literal::plain(default).into(),
                ),
                Triple::new(
                    column_iri,
                    db_iri("primaryKey"),
                    Literal::boolean(column.primary_key).into(),
                ),
                Triple::new(table_iri, db_iri("hasColumn"), Term::Iri(column_iri.clone())),
            ]);
        }
    }

    /// Adds the triples for one row to `graph`.
    ///
    /// Values beyond the table's column count are ignored.
    pub fn add_row(&self, graph: &mut Graph, row: &Row) {
        let row_iri = self.row_iri(row.number);
        graph.insert(Triple::new(&row_iri, rdf_type(), Term::Iri(db_iri("Row"))));
        graph.insert(Triple::new(
            &self.table_iri,
            db_iri("hasRow"),
            Term::Iri(row_iri.clone()),
        ));

        for ((value, column_iri), data_type) in row
            .values
            .iter()
            .zip(&self.column_iris)
            .zip(&self.column_types)
        {
            graph.insert(Triple::new(
                &row_iri,
                column_iri,
                Literal::from_value(value, *data_type).into(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn var_table() -> Table {
        Table::new("var")
            .with_column(Column::new(0, "id", "INTEGER").primary_key().not_null())
            .with_column(Column::new(1, "name", "TEXT"))
            .with_column(Column::new(2, "score", "REAL").with_default("0"))
    }

    #[test]
    fn test_schema_triple_count() {
        let table = var_table();
        let graph = TripleBuilder::new(&table).schema();
        assert_eq!(graph.len(), 23);
    }

    #[test]
    fn test_table_without_columns() {
        let table = Table::new("empty");
        assert_eq!(TripleBuilder::new(&table).schema().len(), 2);
    }

    #[test]
    fn test_column_named_like_table_shares_iri() {
        let table = Table::new("id").with_column(Column::new(0, "id", "INTEGER"));
        let builder = TripleBuilder::new(&table);
        let graph = builder.schema();

        assert_eq!(graph.len(), 2 + 7 - 1);
        let rdf_type = rdf_type();
        assert!(graph.contains(&Triple::new("http://cbs.nl/db#id", &rdf_type, Term::Iri(db_iri("Table")))));
        assert!(graph.contains(&Triple::new("http://cbs.nl/db#id", &rdf_type, Term::Iri(db_iri("Column")))));
        assert_eq!(graph.with_predicate(&rdfs_label()).count(), 1);
    }

    #[test]
    fn test_one_has_column_per_column() {
        let table = var_table();
        let graph = TripleBuilder::new(&table).schema();
        let has_column = db_iri("hasColumn");
        assert_eq!(graph.with_predicate(&has_column).count(), 3);
    }

    #[test]
    fn test_default_sentinel_and_flags() {
        let table = var_table();
        let graph = TripleBuilder::new(&table).schema();

        assert!(graph.contains(&Triple::new(
            db_iri("name"),
            db_iri("defaultValue"),
            Literal::plain("None").into(),
        )));
        assert!(graph.contains(&Triple::new(
            db_iri("score"),
            db_iri("defaultValue"),
            Literal::plain("0").into(),
        )));
        assert!(graph.contains(&Triple::new(
            db_iri("id"),
            db_iri("primaryKey"),
            Literal::boolean(true).into(),
        )));
        assert!(graph.contains(&Triple::new(
            db_iri("name"),
            db_iri("notNull"),
            Literal::boolean(false).into(),
        )));
        assert_eq!(graph.with_predicate(&db_iri("defaultValue")).count(), 3);
    }

    #[test]
    fn test_row_triples() {
        let table = var_table();
        let builder = TripleBuilder::new(&table);
        let mut graph = builder.schema();
        builder.add_row(
            &mut graph,
            &Row::new(
                1,
                vec![
                    Value::Integer(7),
                    Value::Text("x".into()),
                    Value::Real(1.5),
                ],
            ),
        );
        builder.add_row(
            &mut graph,
            &Row::new(2, vec![Value::Integer(8), Value::Null, Value::Integer(2)]),
        );
        assert_eq!(graph.len(), 23 + 2 * (2 + 3));

        let row2 = db_iri("var_row_2");
        assert!(graph.contains(&Triple::new(
            &row2,
            db_iri("name"),
            Literal::plain(NO_VALUE).into(),
        )));
        assert!(graph.contains(&Triple::new(
            &row2,
            db_iri("score"),
            Literal::typed("2", DataType::Float.xsd_iri()).into(),
        )));
        assert!(graph.contains(&Triple::new(
            db_iri("var"),
            db_iri("hasRow"),
            Term::Iri(row2.clone()),
        )));
    }

    #[test]
    fn test_value_literals_follow_column_type() {
        assert_eq!(
            Literal::from_value(&Value::Integer(1), DataType::Boolean),
            Literal::boolean(true)
        );
        assert_eq!(
            Literal::from_value(&Value::Integer(5), DataType::Boolean),
            Literal::typed("5", DataType::Integer.xsd_iri())
        );
        assert_eq!(
            Literal::from_value(&Value::Real(0.25), DataType::String),
            Literal::typed("0.25", DataType::Float.xsd_iri())
        );
        assert_eq!(
            Literal::from_value(&Value::Real(f64::NEG_INFINITY), DataType::Float).lexical,
            "-INF"
        );
    }

    #[test]
    fn test_blob_literal_is_base64() {
        let lit = Literal::from_value(&Value::Blob(vec![0xde, 0xad, 0xbe, 0xef]), DataType::String);
        assert_eq!(lit.lexical, "3q2+7w==");
        assert_eq!(
            lit.datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#base64Binary")
        );
    }

    #[test]
    fn test_unsafe_names_are_escaped_in_iris() {
        let table = Table::new("my table").with_column(Column::new(0, "a/b", "TEXT"));
        let builder = TripleBuilder::new(&table);
        assert_eq!(builder.table_iri(), "http://cbs.nl/db#my%20table");
        assert_eq!(builder.row_iri(3), "http://cbs.nl/db#my%20table_row_3");
        let graph = builder.schema();
        assert!(graph.contains(&Triple::new(
            "http://cbs.nl/db#a%2Fb",
            format!("{RDFS_NS}label"),
            Literal::plain("a/b").into(),
        )));
    }

    #[test]
    fn test_builds_are_deterministic() {
        let table = var_table();
        let a = TripleBuilder::new(&table).schema();
        let b = TripleBuilder::new(&table).schema();
        assert_eq!(a, b);
    }
}
