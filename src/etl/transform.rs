/// Transform Module
///
/// Builds the one-row summary table for a loaded resource and reads back
/// both the summary and a preview of the base table for the run report.
use crate::db::{self, quote_ident, Database};
use crate::models::ResourceKind;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use duckdb::{Connection, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("base table '{0}' does not exist, run the load stage first")]
    MissingTable(String),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error(transparent)]
    Database(#[from] db::DbError),
}

/// `pokemon_stats` row
#[derive(Debug, Clone, PartialEq)]
pub struct PokemonStats {
    pub total_pokemon: i64,
    pub first_id_pokemon: Option<i64>,
    pub last_id_pokemon: Option<i64>,
    pub avg_height: Option<f64>,
    pub avg_weight: Option<f64>,
    /// Distinct type names across all `types` lists
    pub distinct_types: i64,
}

/// `pokemon_names_stats` row
#[derive(Debug, Clone, PartialEq)]
pub struct NameStats {
    pub total_pokemon: i64,
    pub first_id_pokemon: Option<i64>,
    pub last_id_pokemon: Option<i64>,
}

/// `evolution_chain_summary` row
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionChainSummary {
    pub number_chain: i64,
    pub first_id_chain: Option<i64>,
    pub last_id_chain: Option<i64>,
    pub evolve_count: i64,
    pub no_evolve_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Pokemon(PokemonStats),
    PokemonNames(NameStats),
    EvolutionChain(EvolutionChainSummary),
}

impl Summary {
    /// Row count of the base table as seen by the summary query
    pub fn total(&self) -> i64 {
        match self {
            Self::Pokemon(s) => s.total_pokemon,
            Self::PokemonNames(s) => s.total_pokemon,
            Self::EvolutionChain(s) => s.number_chain,
        }
    }

    /// (column, value) pairs in table order
    pub fn columns(&self) -> Vec<(&'static str, String)> {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "NULL".to_string(), |v| v.to_string())
        }

        match self {
            Self::Pokemon(s) => vec![
                ("total_pokemon", s.total_pokemon.to_string()),
                ("first_id_pokemon", opt(&s.first_id_pokemon)),
                ("last_id_pokemon", opt(&s.last_id_pokemon)),
                ("avg_height", opt(&s.avg_height)),
                ("avg_weight", opt(&s.avg_weight)),
                ("distinct_types", s.distinct_types.to_string()),
            ],
            Self::PokemonNames(s) => vec![
                ("total_pokemon", s.total_pokemon.to_string()),
                ("first_id_pokemon", opt(&s.first_id_pokemon)),
                ("last_id_pokemon", opt(&s.last_id_pokemon)),
            ],
            Self::EvolutionChain(s) => vec![
                ("number_chain", s.number_chain.to_string()),
                ("first_id_chain", opt(&s.first_id_chain)),
                ("last_id_chain", opt(&s.last_id_chain)),
                ("evolve_count", s.evolve_count.to_string()),
                ("no_evolve_count", s.no_evolve_count.to_string()),
            ],
        }
    }

    /// Format the summary row as a table
    pub fn format_table(&self) -> String {
        let columns = self.columns();
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(columns.iter().map(|(name, _)| Cell::new(name).fg(Color::Cyan)).collect::<Vec<_>>());
        table.add_row(columns.into_iter().map(|(_, value)| Cell::new(value)).collect::<Vec<_>>());
        table.to_string()
    }
}

/// Result of the transform stage
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub summary: Summary,
    /// `SELECT COUNT(*)` of the base table
    pub base_rows: u64,
    /// First rows of the base table, ordered by `id`
    pub preview: String,
}

/// Aggregate query that (re)creates the summary table of `kind`
pub fn summary_sql(kind: ResourceKind) -> String {
    let base = quote_ident(kind.base_table());
    let summary = quote_ident(kind.summary_table());

    match kind {
        ResourceKind::Pokemon => format!(
            "CREATE OR REPLACE TABLE {summary} AS
             SELECT COUNT(id) AS total_pokemon,
                    MIN(id) AS first_id_pokemon,
                    MAX(id) AS last_id_pokemon,
                    AVG(height) AS avg_height,
                    AVG(weight) AS avg_weight,
                    (SELECT COUNT(DISTINCT type_name)
                       FROM (SELECT UNNEST(types) AS type_name FROM {base})) AS distinct_types
             FROM {base}"
        ),
        ResourceKind::PokemonNames => format!(
            "CREATE OR REPLACE TABLE {summary} AS
             SELECT COUNT(id) AS total_pokemon,
                    MIN(id) AS first_id_pokemon,
                    MAX(id) AS last_id_pokemon
             FROM {base}"
        ),
        ResourceKind::EvolutionChain => format!(
            "CREATE OR REPLACE TABLE {summary} AS
             SELECT COUNT(*) AS number_chain,
                    MIN(id) AS first_id_chain,
                    MAX(id) AS last_id_chain,
                    COUNT(next_evolve) AS evolve_count,
                    COUNT(*) - COUNT(next_evolve) AS no_evolve_count
             FROM {base}"
        ),
    }
}

fn read_summary(kind: ResourceKind, row: &Row<'_>) -> duckdb::Result<Summary> {
    Ok(match kind {
        ResourceKind::Pokemon => Summary::Pokemon(PokemonStats {
            total_pokemon: row.get(0)?,
            first_id_pokemon: row.get(1)?,
            last_id_pokemon: row.get(2)?,
            avg_height: row.get(3)?,
            avg_weight: row.get(4)?,
            distinct_types: row.get(5)?,
        }),
        ResourceKind::PokemonNames => Summary::PokemonNames(NameStats {
            total_pokemon: row.get(0)?,
            first_id_pokemon: row.get(1)?,
            last_id_pokemon: row.get(2)?,
        }),
        ResourceKind::EvolutionChain => Summary::EvolutionChain(EvolutionChainSummary {
            number_chain: row.get(0)?,
            first_id_chain: row.get(1)?,
            last_id_chain: row.get(2)?,
            evolve_count: row.get(3)?,
            no_evolve_count: row.get(4)?,
        }),
    })
}

fn table_exists(conn: &Connection, table: &str) -> duckdb::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Render the first `limit` rows of `table` (every column cast to text)
pub fn preview_table(conn: &Connection, table: &str, limit: usize) -> duckdb::Result<String> {
    let columns = db::table_columns(conn, table)?;
    let select_list =
        columns.iter().map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c))).collect::<Vec<_>>().join(", ");

    let sql = format!("SELECT {select_list} FROM {} ORDER BY id LIMIT {limit}", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            (0..columns.len()).map(|i| row.get::<_, Option<String>>(i)).collect::<duckdb::Result<Vec<_>>>()
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;

    let mut rendered = Table::new();
    rendered
        .load_preset(UTF8_FULL)
        .set_header(columns.iter().map(|c| Cell::new(c).fg(Color::Cyan)).collect::<Vec<_>>());
    for row in rows {
        rendered.add_row(row.into_iter().map(|v| v.unwrap_or_else(|| "NULL".to_string())).collect::<Vec<_>>());
    }

    Ok(rendered.to_string())
}

/// Recreate the summary table for `kind` and read back summary and preview
pub fn summarize(
    database: &Database,
    kind: ResourceKind,
    preview_rows: usize,
) -> Result<TransformOutput, TransformError> {
    let conn = database.connect()?;

    if !table_exists(&conn, kind.base_table())? {
        return Err(TransformError::MissingTable(kind.base_table().to_string()));
    }

    conn.execute_batch(&summary_sql(kind))?;
    tracing::info!("Created summary table '{}'", kind.summary_table());

    let summary_query = format!("SELECT * FROM {}", quote_ident(kind.summary_table()));
    let summary = conn.query_row(&summary_query, [], |row| read_summary(kind, row))?;
    let base_rows = db::row_count(&conn, kind.base_table())?;
    let preview = preview_table(&conn, kind.base_table(), preview_rows)?;

    tracing::info!("Transformed {} data: {} rows summarized", kind, summary.total());

    Ok(TransformOutput { summary, base_rows, preview })
}
