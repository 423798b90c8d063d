//! Mapping a table description without a database.
//!
//! Builds a [`Table`] by hand and shows the triples and Croissant
//! descriptor derived from it, then reads the Turtle back.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p dbcroissant-demos --example table_mapping
//! ```

use chrono::NaiveDate;
use dbcroissant_core::{
    Column, CroissantDataset, DatasetOptions, Row, Table, TripleBuilder, Value, parse_turtle,
    to_turtle_string,
};

fn main() {
    let table = Table::new("var")
        .with_column(Column::new(0, "id", "INTEGER").primary_key().not_null())
        .with_column(Column::new(1, "name", "VARCHAR(40)"))
        .with_column(Column::new(2, "score", "REAL").with_default("0"));

    let builder = TripleBuilder::new(&table);
    let mut graph = builder.schema();
    println!("schema triples: {}", graph.len());

    builder.add_row(
        &mut graph,
        &Row::new(1, vec![Value::Integer(7), Value::Text("seven".into()), Value::Null]),
    );
    println!("with one row:   {}", graph.len());

    let turtle = to_turtle_string(&graph);
    println!("\n{turtle}");

    let parsed = parse_turtle(&turtle).unwrap();
    println!("round-trip equal: {}", parsed == graph);

    let options = DatasetOptions {
        version: "2.0.0".into(),
        ..DatasetOptions::default()
    };
    let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let dataset = CroissantDataset::from_table(&table, &options, date);
    println!("\n{}", dataset.to_json_pretty().unwrap());
}
