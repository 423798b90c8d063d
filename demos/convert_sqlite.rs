//! End-to-end conversion of a SQLite file.
//!
//! Creates a small database in a scratch directory, converts it with row
//! triples, prints the generated files, and checks them against the
//! conversion report.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p dbcroissant-demos --example convert_sqlite
//! ```

use dbcroissant_convert::{ConversionReport, ConvertConfig, REPORT_FILE_NAME, convert_database};
use dbcroissant_sqlite::Introspector;
use rusqlite::Connection;

fn main() {
    // === Step 1: Create a sample database ===
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shop.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE products (
             id INTEGER PRIMARY KEY NOT NULL,
             name TEXT NOT NULL,
             price REAL DEFAULT 0,
             in_stock BOOLEAN,
             thumbnail BLOB
         );
         INSERT INTO products VALUES (1, 'Kettle', 24.5, 1, x'89504E47');
         INSERT INTO products VALUES (2, 'Toaster', 31, 0, NULL);
         CREATE TABLE \"order lines\" (product_id INTEGER, quantity INTEGER);
         INSERT INTO \"order lines\" VALUES (1, 3);",
    )
    .unwrap();
    drop(conn);

    // === Step 2: Look at the catalog ===
    println!("=== Catalog ===");
    let db = Introspector::open(&db_path).unwrap();
    for table in db.schema().unwrap() {
        println!("{}", table.name);
        for column in &table.columns {
            println!("  {} {} -> {}", column.name, column.declared_type, column.data_type());
        }
    }
    drop(db);

    // === Step 3: Convert ===
    println!("\n=== Conversion ===");
    let config = ConvertConfig {
        output_dir: Some(dir.path().join("out")),
        include_rows: true,
        jobs: 2,
        ..ConvertConfig::default()
    };
    let outcome = convert_database(&db_path, &config).unwrap();
    for table in &outcome.tables {
        println!(
            "{}: {} columns, {} rows, {} triples",
            table.table, table.columns, table.rows, table.triples
        );
        println!("  {}", table.turtle.path.display());
        println!("  {}", table.croissant.path.display());
    }

    let products = &outcome.tables[0];
    println!("\n=== {} ===", products.turtle.file_name());
    print!("{}", std::fs::read_to_string(&products.turtle.path).unwrap());
    println!("\n=== {} ===", products.croissant.file_name());
    println!("{}", std::fs::read_to_string(&products.croissant.path).unwrap());

    // === Step 4: Report and verification ===
    let out_dir = config.output_dir_for(&db_path);
    let report = ConversionReport::from_outcome(&db_path, &outcome);
    report.save(out_dir.join(REPORT_FILE_NAME)).unwrap();
    let changed = report.verify(&out_dir).unwrap();
    println!("\n=== Report ===");
    println!(
        "{} tables, {} failures, {} changed files",
        report.tables.len(),
        report.failures.len(),
        changed.len()
    );
}
