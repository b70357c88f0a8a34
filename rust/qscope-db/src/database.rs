use std::path::Path;

use qscope_common::{Result, error::Error};
use rusqlite::Connection;

use crate::schema::SCHEMA;

/// Attaches a context string to database errors.
pub trait DbResultExt<T> {
    fn db_context(self, context: &str) -> Result<T>;
}

impl<T> DbResultExt<T> for rusqlite::Result<T> {
    fn db_context(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::database(context, e))
    }
}

/// An open database with the core schema installed.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: &Path) -> Result<Database> {
        let conn = Connection::open(path).db_context("open database")?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Database> {
        let conn = Connection::open_in_memory().db_context("open in-memory database")?;
        Self::from_connection(conn)
    }

    /// Wraps an existing connection, installing the core schema.
    pub fn from_connection(conn: Connection) -> Result<Database> {
        conn.execute_batch(SCHEMA).db_context("install schema")?;
        Ok(Database { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns true when a table named `table` exists.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
            .db_context("look up table")
    }
}
