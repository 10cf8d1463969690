/// Database Module
///
/// This module handles the embedded DuckDB database file:
/// - Opening a connection per stage (the file is created if absent)
/// - Small catalog queries used by the load and transform stages
use duckdb::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to create database directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Point at a database file; nothing is opened until a stage connects
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection; dropping it closes the database
    pub fn connect(&self) -> Result<Connection, DbError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| DbError::CreateDir { path: parent.to_path_buf(), source })?;
        }
        Ok(Connection::open(&self.path)?)
    }

    /// Test the database connection
    pub fn test_connection(&self) -> Result<(), DbError> {
        let conn = self.connect()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
        Ok(())
    }
}

/// Number of rows in `table`
pub fn row_count(conn: &Connection, table: &str) -> duckdb::Result<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Column names of `table` in ordinal order
pub fn table_columns(conn: &Connection, table: &str) -> duckdb::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns WHERE table_name = ? ORDER BY ordinal_position",
    )?;
    let columns = stmt.query_map([table], |row| row.get::<_, String>(0))?.collect::<duckdb::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Quote an SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
