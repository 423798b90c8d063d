//! Read-only SQLite introspection for dbcroissant.
//!
//! [`Introspector`] opens a database file without ever writing to it and
//! reports the catalog as [`dbcroissant_core::Table`] values: user tables
//! in catalog order (internal `sqlite_*` tables excluded) and their columns
//! in declaration order. Rows are streamed through a cursor so that callers
//! can build output incrementally.
//!
//! # Quick start
//!
//! ```no_run
//! use dbcroissant_sqlite::Introspector;
//!
//! let db = Introspector::open("dsc.db").unwrap();
//! for name in db.tables().unwrap() {
//!     let table = db.table(&name).unwrap();
//!     println!("{} has {} columns", table.name, table.columns.len());
//!     let rows = db.for_each_row(&table, |row| {
//!         println!("row {}: {:?}", row.number, row.values);
//!     }).unwrap();
//!     println!("{rows} rows");
//! }
//! ```

mod error;
mod introspect;

pub use error::{IntrospectError, Result};
pub use introspect::{Introspector, quote_identifier};
