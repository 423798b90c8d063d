//! Catalog and row access over a read-only connection.
//!
//! The connection is opened with `SQLITE_OPEN_READ_ONLY`, so nothing in
//! this module can modify the database. It lives exactly as long as the
//! [`Introspector`] and is closed on drop on every exit path.
//!
//! Identifiers are never interpolated raw: table names are bound as
//! parameters where SQLite allows it (`pragma_table_info(?1)`) and quoted
//! with [`quote_identifier`] where it does not.

use std::path::{Path, PathBuf};

use dbcroissant_core::{Column, Row, Table, Value};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::debug;

use crate::error::{IntrospectError, Result};

/// Quotes an SQL identifier, doubling embedded `"`.
///
/// # Examples
///
/// ```
/// use dbcroissant_sqlite::quote_identifier;
///
/// assert_eq!(quote_identifier("var"), "\"var\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Read-only view of one SQLite database.
pub struct Introspector {
    conn: Connection,
    path: PathBuf,
}

impl Introspector {
    /// Opens the database at `path` read-only and checks that it is readable.
    ///
    /// SQLite opens files lazily, so the catalog is queried once here; a
    /// file that is not a database fails at this point rather than later.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectError::DatabaseUnreadable`] if the file does not
    /// exist, is not a SQLite database, is corrupt, or is locked.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unreadable = |reason: String| IntrospectError::DatabaseUnreadable {
            path: path.clone(),
            reason,
        };

        if !path.is_file() {
            return Err(unreadable("file does not exist".to_string()));
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unreadable(e.to_string()))?;

        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| unreadable(e.to_string()))?;

        debug!(path = %path.display(), "Opened database read-only");
        Ok(Self { conn, path })
    }

    /// Wraps an existing connection, e.g. an in-memory database.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            path: PathBuf::from(":memory:"),
        }
    }

    /// Path the database was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists user tables in catalog order, excluding `sqlite_*` internals.
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY rowid",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(count = names.len(), "Listed tables");
        Ok(names)
    }

    /// Returns `true` if a user table with this exact name exists.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Reads the columns of `table` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectError::TableNotFound`] if the table is not in the
    /// catalog.
    pub fn columns(&self, table: &str) -> Result<Vec<Column>> {
        let mut stmt = self.conn.prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk \
             FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let columns = stmt
            .query_map(params![table], |row| {
                Ok(Column {
                    position: row.get::<_, i64>(0)?.max(0) as usize,
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    default_value: row.get(4)?,
                    primary_key: row.get::<_, i64>(5)? > 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(IntrospectError::TableNotFound(table.to_string()));
        }
        Ok(columns)
    }

    /// Reads the table with its columns.
    pub fn table(&self, name: &str) -> Result<Table> {
        Ok(Table {
            name: name.to_string(),
            columns: self.columns(name)?,
        })
    }

    /// Reads every user table with its columns.
    pub fn schema(&self) -> Result<Vec<Table>> {
        self.tables()?.iter().map(|name| self.table(name)).collect()
    }

    /// Counts rows in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        if !self.table_exists(table)? {
            return Err(IntrospectError::TableNotFound(table.to_string()));
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Streams the rows of `table` to `f` and returns how many were seen.
    ///
    /// Only the columns listed in `table` are selected, in that order, so
    /// every [`Row`] lines up with `table.columns`. Rows are numbered from 1.
    /// Each call starts a fresh scan.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectError::TableNotFound`] if the table is gone.
    pub fn for_each_row(&self, table: &Table, mut f: impl FnMut(Row)) -> Result<usize> {
        if !self.table_exists(&table.name)? {
            return Err(IntrospectError::TableNotFound(table.name.clone()));
        }
        if table.columns.is_empty() {
            return Ok(0);
        }

        let column_list = table
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column_list} FROM {}",
            quote_identifier(&table.name)
        ))?;
        let width = stmt.column_count();

        let mut rows = stmt.query([])?;
        let mut number = 0;
        while let Some(row) = rows.next()? {
            number += 1;
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_value(row.get_ref(i)?));
            }
            f(Row::new(number, values));
        }
        debug!(table = %table.name, rows = number, "Scanned rows");
        Ok(number)
    }

    /// Collects all rows of `table` into memory.
    pub fn rows(&self, table: &Table) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.for_each_row(table, |row| rows.push(row))?;
        Ok(rows)
    }
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db(sql: &str) -> Introspector {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        Introspector::from_connection(conn)
    }

    #[test]
    fn test_tables_in_catalog_order_without_internal() {
        let db = memory_db(
            "CREATE TABLE zeta (a INTEGER PRIMARY KEY AUTOINCREMENT);
             CREATE TABLE alpha (b TEXT);
             CREATE VIEW v AS SELECT * FROM alpha;
             INSERT INTO zeta DEFAULT VALUES;",
        );
        // AUTOINCREMENT creates sqlite_sequence, which must not be listed.
        assert_eq!(db.tables().unwrap(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_columns_metadata() {
        let db = memory_db(
            "CREATE TABLE var (id INTEGER PRIMARY KEY NOT NULL, name TEXT, score REAL DEFAULT 0, note VARCHAR(20) DEFAULT '')",
        );
        let cols = db.columns("var").unwrap();
        assert_eq!(cols.len(), 4);

        assert_eq!(cols[0].name, "id");
        assert_eq!(cols[0].declared_type, "INTEGER");
        assert!(cols[0].primary_key);
        assert!(cols[0].not_null);
        assert_eq!(cols[0].default_value, None);

        assert_eq!(cols[2].position, 2);
        assert_eq!(cols[2].default_value.as_deref(), Some("0"));
        assert!(!cols[2].not_null);

        assert_eq!(cols[3].declared_type, "VARCHAR(20)");
        assert_eq!(cols[3].default_value.as_deref(), Some("''"));
    }

    #[test]
    fn test_untyped_column_has_empty_declared_type() {
        let db = memory_db("CREATE TABLE t (x)");
        assert_eq!(db.columns("t").unwrap()[0].declared_type, "");
    }

    #[test]
    fn test_missing_table() {
        let db = memory_db("CREATE TABLE t (x)");
        assert!(matches!(
            db.columns("nope"),
            Err(IntrospectError::TableNotFound(name)) if name == "nope"
        ));
        assert!(matches!(
            db.row_count("nope"),
            Err(IntrospectError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_rows_are_numbered_and_typed() {
        let db = memory_db(
            "CREATE TABLE t (i INTEGER, r REAL, s TEXT, b BLOB);
             INSERT INTO t VALUES (1, 2.5, 'x', x'0102');
             INSERT INTO t VALUES (NULL, NULL, NULL, NULL);",
        );
        let table = db.table("t").unwrap();
        let rows = db.rows(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 1);
        assert_eq!(
            rows[0].values,
            vec![
                Value::Integer(1),
                Value::Real(2.5),
                Value::Text("x".into()),
                Value::Blob(vec![1, 2]),
            ]
        );
        assert_eq!(rows[1].number, 2);
        assert!(rows[1].values.iter().all(|v| *v == Value::Null));
        assert_eq!(db.row_count("t").unwrap(), 2);
    }

    #[test]
    fn test_quoted_names() {
        let db = memory_db(
            "CREATE TABLE \"odd \"\"name\"\"\" (\"col one\" TEXT);
             INSERT INTO \"odd \"\"name\"\"\" VALUES ('v');",
        );
        let names = db.tables().unwrap();
        assert_eq!(names, vec!["odd \"name\""]);
        let table = db.table(&names[0]).unwrap();
        assert_eq!(table.columns[0].name, "col one");
        assert_eq!(db.rows(&table).unwrap()[0].values, vec![Value::Text("v".into())]);
    }

    #[test]
    fn test_scan_is_restartable() {
        let db = memory_db("CREATE TABLE t (x); INSERT INTO t VALUES (1), (2), (3);");
        let table = db.table("t").unwrap();
        assert_eq!(db.for_each_row(&table, |_| {}).unwrap(), 3);
        assert_eq!(db.for_each_row(&table, |_| {}).unwrap(), 3);
    }
}
