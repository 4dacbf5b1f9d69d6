// ABOUTME: SQLite implementation of the Store capability using rusqlite
// ABOUTME: Handles opening database files, catalog queries, and transactional writes

use super::{Row, Side, Store, Value};
use crate::error::{MigrationError, StoreError};
use crate::utils::{quote_identifier, validate_store_path};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension, ToSql};
use std::path::Path;

/// A SQLite database file opened for one side of a transfer
pub struct SqliteStore {
    side: Side,
    location: String,
    conn: Option<Connection>,
}

impl SqliteStore {
    /// Open an existing database file.
    ///
    /// The source is opened read-only; the destination read-write with foreign
    /// key enforcement off. Neither side is created if missing: a missing,
    /// non-file, or non-SQLite location is reported as
    /// [`MigrationError::Unreachable`].
    pub fn open(side: Side, path: &Path) -> Result<Self, MigrationError> {
        validate_store_path(side, path)?;

        let access = match side {
            Side::Source => OpenFlags::SQLITE_OPEN_READ_ONLY,
            Side::Destination => OpenFlags::SQLITE_OPEN_READ_WRITE,
        };
        let location = path.display().to_string();
        let unreachable = |reason: String| MigrationError::Unreachable {
            side,
            location: location.clone(),
            reason,
        };

        let conn = Connection::open_with_flags(path, access | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|e| unreachable(e.to_string()))?;

        // Opening is lazy in SQLite; touch the catalog so a non-database file fails here
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| unreachable(e.to_string()))?;

        if side == Side::Destination {
            // Tables are cleared in catalog order, so a parent may be emptied
            // while its children still reference it. Must run outside a transaction.
            conn.execute_batch("PRAGMA foreign_keys = OFF")
                .map_err(|e| unreachable(e.to_string()))?;
        }

        tracing::debug!("Opened {} database '{}'", side, location);
        Ok(Self::from_connection(side, location, conn))
    }

    /// Wrap an already-open connection (in-memory databases, tests)
    pub fn from_connection(side: Side, location: impl Into<String>, conn: Connection) -> Self {
        Self {
            side,
            location: location.into(),
            conn: Some(conn),
        }
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn
            .as_ref()
            .ok_or(StoreError::Closed { side: self.side })
    }

    fn has_sequence_table(conn: &Connection) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
            [],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
    }
}

impl Store for SqliteStore {
    fn side(&self) -> Side {
        self.side
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let op = || format!("list tables in {} database", self.side);

        // No ORDER BY: catalog order is the plan order
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
            )
            .map_err(|e| StoreError::driver(op(), e))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| StoreError::driver(op(), e))?;

        Ok(names)
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let op = || format!("read columns of '{}' in {} database", table, self.side);

        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(|e| StoreError::driver(op(), e))?;

        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| StoreError::driver(op(), e))?;

        Ok(columns)
    }

    fn count_rows(&self, table: &str) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let op = || format!("count rows of '{}' in {} database", table, self.side);

        let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| StoreError::driver(op(), e))?;

        u64::try_from(count).map_err(|e| StoreError::driver(op(), e))
    }

    fn read_rows(&self, table: &str, columns: &[String]) -> Result<Vec<Row>, StoreError> {
        let conn = self.conn()?;
        let op = || format!("read rows of '{}' from {} database", table, self.side);

        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!("SELECT {} FROM {}", column_list, quote_identifier(table));
        tracing::debug!("{}", query);

        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| StoreError::driver(op(), e))?;
        let mut rows = stmt.query([]).map_err(|e| StoreError::driver(op(), e))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(|e| StoreError::driver(op(), e))? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let raw = row.get_ref(idx).map_err(|e| StoreError::driver(op(), e))?;
                values.push(value_from_ref(raw).map_err(|e| StoreError::driver(op(), e))?);
            }
            result.push(values);
        }

        Ok(result)
    }

    fn begin(&self) -> Result<(), StoreError> {
        // IMMEDIATE takes the write lock up front so a busy destination fails before any delete
        self.conn()?
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| StoreError::driver(format!("begin transaction on {}", self.side), e))
    }

    fn commit(&self) -> Result<(), StoreError> {
        self.conn()?
            .execute_batch("COMMIT")
            .map_err(|e| StoreError::driver(format!("commit transaction on {}", self.side), e))
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")
            .map_err(|e| StoreError::driver(format!("roll back transaction on {}", self.side), e))
    }

    fn delete_all(&self, table: &str) -> Result<u64, StoreError> {
        let query = format!("DELETE FROM {}", quote_identifier(table));
        let removed = self
            .conn()?
            .execute(&query, [])
            .map_err(|e| StoreError::driver(format!("clear '{}'", table), e))?;
        Ok(removed as u64)
    }

    fn reset_sequence(&self, table: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let op = || format!("reset sequence of '{}'", table);

        // sqlite_sequence only exists once some table declares AUTOINCREMENT
        if !Self::has_sequence_table(conn).map_err(|e| StoreError::driver(op(), e))? {
            return Ok(());
        }

        conn.execute("DELETE FROM sqlite_sequence WHERE name = ?1", [table])
            .map_err(|e| StoreError::driver(op(), e))?;
        Ok(())
    }

    fn bulk_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let op = || format!("insert rows into '{}'", table);

        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            column_list,
            placeholders
        );
        tracing::debug!("{}", query);

        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| StoreError::driver(op(), e))?;

        let mut written = 0u64;
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(StoreError::driver(
                    op(),
                    format!(
                        "row {} has {} values but {} columns were named",
                        idx,
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            written += stmt
                .execute(params_from_iter(row.iter()))
                .map_err(|e| StoreError::driver(op(), e))? as u64;
        }

        Ok(written)
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_conn, e)) = conn.close() {
                tracing::warn!(
                    "Ignoring error while closing {} database '{}': {}",
                    self.side,
                    self.location,
                    e
                );
            } else {
                tracing::debug!("Closed {} database '{}'", self.side, self.location);
            }
        }
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn value_from_ref(raw: ValueRef<'_>) -> Result<Value, std::str::Utf8Error> {
    Ok(match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(std::str::from_utf8(bytes)?.to_string()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store(side: Side, ddl: &str) -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        SqliteStore::from_connection(side, ":memory:", conn)
    }

    #[test]
    fn test_list_tables_keeps_catalog_order_and_skips_internal() {
        let store = memory_store(
            Side::Source,
            "CREATE TABLE zeta (id INTEGER PRIMARY KEY AUTOINCREMENT);
             CREATE TABLE alpha (id INTEGER PRIMARY KEY);
             CREATE TABLE sqliteish (id INTEGER);
             CREATE INDEX alpha_idx ON alpha(id);",
        );

        let tables = store.list_tables().unwrap();
        // sqlite_sequence is internal, but 'sqliteish' merely shares a prefix without the underscore
        assert_eq!(tables, vec!["zeta", "alpha", "sqliteish"]);
    }

    #[test]
    fn test_column_names_in_declaration_order() {
        let store = memory_store(
            Side::Source,
            "CREATE TABLE wallet (id INTEGER PRIMARY KEY, name TEXT, balance REAL);",
        );
        assert_eq!(
            store.column_names("wallet").unwrap(),
            vec!["id", "name", "balance"]
        );
        assert!(store.column_names("missing").unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_read_preserve_every_value_kind() {
        let store = memory_store(
            Side::Destination,
            "CREATE TABLE mixed (id INTEGER PRIMARY KEY, r REAL, t TEXT, b BLOB, n TEXT);",
        );
        let columns: Vec<String> = ["id", "r", "t", "b", "n"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = vec![vec![
            Value::Integer(42),
            Value::Real(1.5),
            Value::Text("héllo".to_string()),
            Value::Blob(vec![0, 1, 2]),
            Value::Null,
        ]];

        assert_eq!(store.bulk_insert("mixed", &columns, &rows).unwrap(), 1);
        assert_eq!(store.read_rows("mixed", &columns).unwrap(), rows);
        assert_eq!(store.count_rows("mixed").unwrap(), 1);
    }

    #[test]
    fn test_bulk_insert_rejects_arity_mismatch() {
        let store = memory_store(Side::Destination, "CREATE TABLE t (a INTEGER, b INTEGER);");
        let columns = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec![Value::Integer(1)]];
        assert!(store.bulk_insert("t", &columns, &rows).is_err());
    }

    #[test]
    fn test_reset_sequence_without_autoincrement_tables() {
        let store = memory_store(Side::Destination, "CREATE TABLE plain (id INTEGER PRIMARY KEY);");
        assert!(store.reset_sequence("plain").is_ok());
    }

    #[test]
    fn test_reset_sequence_restarts_numbering() {
        let store = memory_store(
            Side::Destination,
            "CREATE TABLE seq (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT);
             INSERT INTO seq (v) VALUES ('a'), ('b'), ('c');",
        );
        store.delete_all("seq").unwrap();
        store.reset_sequence("seq").unwrap();

        let conn = store.conn().unwrap();
        conn.execute("INSERT INTO seq (v) VALUES ('fresh')", []).unwrap();
        let id: i64 = conn
            .query_row("SELECT id FROM seq WHERE v = 'fresh'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_rollback_discards_deletes() {
        let store = memory_store(
            Side::Destination,
            "CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1), (2);",
        );
        store.begin().unwrap();
        assert_eq!(store.delete_all("t").unwrap(), 2);
        store.rollback().unwrap();
        assert_eq!(store.count_rows("t").unwrap(), 2);

        // Nothing open any more; a second rollback is harmless
        assert!(store.rollback().is_ok());
    }

    #[test]
    fn test_close_is_idempotent_and_later_calls_fail() {
        let mut store = memory_store(Side::Source, "CREATE TABLE t (id INTEGER);");
        store.close();
        store.close();
        assert!(matches!(
            store.list_tables(),
            Err(StoreError::Closed { side: Side::Source })
        ));
    }

    #[test]
    fn test_open_missing_file_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteStore::open(Side::Source, &dir.path().join("absent.db"));
        assert!(matches!(
            result,
            Err(MigrationError::Unreachable {
                side: Side::Source,
                ..
            })
        ));
    }

    #[test]
    fn test_open_non_database_file_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        std::fs::write(&path, b"this is definitely not a sqlite database file at all").unwrap();

        let result = SqliteStore::open(Side::Destination, &path);
        assert!(matches!(
            result,
            Err(MigrationError::Unreachable {
                side: Side::Destination,
                ..
            })
        ));
    }

    #[test]
    fn test_destination_opens_with_foreign_keys_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE wallet (id INTEGER PRIMARY KEY);
                 CREATE TABLE goal (id INTEGER PRIMARY KEY, wallet_id INTEGER REFERENCES wallet(id));
                 INSERT INTO wallet VALUES (1);
                 INSERT INTO goal VALUES (1, 1);",
            )
            .unwrap();

        let store = SqliteStore::open(Side::Destination, &path).unwrap();
        let enforced: i64 = store
            .conn()
            .unwrap()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enforced, 0);

        // Parent cleared before its child inside one transaction
        store.begin().unwrap();
        assert_eq!(store.delete_all("wallet").unwrap(), 1);
        assert_eq!(store.delete_all("goal").unwrap(), 1);
        store.commit().unwrap();
    }
}
