/// Load Module
///
/// Handles (re)creating a base table in DuckDB from the run's Parquet file.
/// The table gets a synthetic `id` column numbering rows in file order,
/// independent of any natural identifier in the data.
use crate::db::{self, quote_ident, quote_literal, Database};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Parquet file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error(transparent)]
    Database(#[from] db::DbError),
}

/// SQL that rebuilds `table` from `parquet_path` with a 1-based row-number `id`
pub fn create_table_sql(table: &str, parquet_path: &Path) -> String {
    format!(
        "CREATE TABLE {table} AS \
         SELECT row_number() OVER (ORDER BY file_row_number) AS id, * EXCLUDE (file_row_number) \
         FROM read_parquet({path}, file_row_number = true)",
        table = quote_ident(table),
        path = quote_literal(&parquet_path.to_string_lossy()),
    )
}

/// Drop and recreate `table` from the Parquet file, returning its row count
///
/// The connection is opened here and closed on return. A missing Parquet
/// file fails before the existing table is touched; an unreadable one rolls
/// back the drop, so the previous table survives.
pub fn load_table(database: &Database, table: &str, parquet_path: &Path) -> Result<u64, LoadError> {
    if !parquet_path.is_file() {
        return Err(LoadError::MissingFile(parquet_path.to_path_buf()));
    }

    let mut conn = database.connect()?;

    let tx = conn.transaction()?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
    tx.execute_batch(&create_table_sql(table, parquet_path))?;
    tx.commit()?;

    let rows = db::row_count(&conn, table)?;
    tracing::info!("Loaded {} rows into DuckDB table '{}'", rows, table);

    Ok(rows)
}
