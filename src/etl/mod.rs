/// ELT Pipeline Module
///
/// This module holds the stages of one pipeline run:
/// - Extract: walk PokeAPI listing pages and enrich items from their detail URLs
/// - Accumulate: key records by natural identifier
/// - Columnar: write the RecordSet to a Parquet file
/// - Load: recreate the DuckDB base table from that file
/// - Transform: derive the summary table
pub mod accumulate;
pub mod backoff;
pub mod columnar;
pub mod extract;
pub mod load;
pub mod parsers;
pub mod transform;
