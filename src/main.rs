/// Pokedex ELT
///
/// An ELT pipeline that extracts PokeAPI resources, persists them as Parquet,
/// loads them into DuckDB and derives summary tables.
mod api;
mod cli;
mod db;
mod etl;
mod models;
mod pipeline;

use anyhow::{Context, Result};
use api::ApiClient;
use clap::Parser;
use cli::Cli;
use db::Database;
use pipeline::{print_final_stats, Pipeline, PipelineConfig};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
const DEFAULT_DB_PATH: &str = "pokemon.db";
const DEFAULT_OUTPUT_DIR: &str = ".";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    let base_url = setting(cli.base_url.clone(), "POKEAPI_BASE_URL", DEFAULT_BASE_URL);
    let db_path = setting(cli.db_path.clone(), "POKEDEX_DB_PATH", DEFAULT_DB_PATH);
    let output_dir = setting(cli.output_dir.clone(), "POKEDEX_OUTPUT_DIR", DEFAULT_OUTPUT_DIR);

    let mut config = PipelineConfig::for_resource(cli.resource, &base_url, &output_dir);
    if let Some(start_url) = &cli.start_url {
        config.start_url = start_url.clone();
    }
    if let Some(limit) = cli.limit {
        config.start_url = api::with_limit(&config.start_url, limit)
            .with_context(|| format!("Invalid listing URL: {}", config.start_url))?;
    }
    config.extract.backoff = cli.backoff_policy();
    config.extract.duplicates = cli.duplicate_policy();
    config.extract.max_pages = cli.max_pages;
    config.failure_policy = cli.failure_policy();
    config.preview_rows = cli.preview_rows;

    println!("🚀 Starting Pokedex ELT...");
    println!("   📦 Resource: {}", cli.resource);
    println!("   🌐 Start URL: {}", config.start_url);
    println!("   💾 Database: {}", db_path);
    println!("   📁 Parquet file: {}", config.parquet_path.display());
    println!("   ⏳ Page delay: {:?} | Request timeout: {}s", config.extract.backoff, cli.timeout);

    let client = ApiClient::new(Duration::from_secs(cli.timeout)).context("Failed to create API client")?;

    let database = Database::new(&db_path);
    database
        .test_connection()
        .with_context(|| format!("Failed to open DuckDB database at {}", database.path().display()))?;

    let pipeline = Pipeline::new(client, database, config);
    let report = pipeline.run().await.context("Pipeline execution failed")?;

    print_final_stats(cli.resource, &report);

    if let Some(failure) = report.failure {
        anyhow::bail!("Pipeline persisted a partial run: {}", failure);
    }

    println!("\n✨ Pipeline execution complete!");

    Ok(())
}

/// Resolve a setting: CLI flag, then environment variable, then default
fn setting(flag: Option<String>, env_key: &str, default: &str) -> String {
    flag.or_else(|| env::var(env_key).ok().filter(|v| !v.is_empty())).unwrap_or_else(|| default.to_string())
}
