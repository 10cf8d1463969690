/// CLI Module
///
/// Command-line interface configuration using clap.
use crate::etl::accumulate::DuplicatePolicy;
use crate::etl::backoff::BackoffPolicy;
use crate::models::ResourceKind;
use crate::pipeline::FailurePolicy;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Delay strategy between listing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackoffKind {
    None,
    Fixed,
    Exponential,
}

/// Pokedex ELT - PokeAPI to Parquet to DuckDB
///
/// Extract a PokeAPI resource, write it to Parquet, load it into DuckDB and
/// build a summary table. Runs the `pokemon` resource when called without arguments.
#[derive(Parser, Debug)]
#[command(name = "pokedex-elt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Resource to extract
    #[arg(short = 'r', long, value_enum, default_value = "pokemon")]
    pub resource: ResourceKind,

    /// API base URL (overrides POKEAPI_BASE_URL env var)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Full listing URL to start from (overrides the resource default)
    #[arg(long, value_name = "URL")]
    pub start_url: Option<String>,

    /// Page size requested from the listing endpoint
    #[arg(short = 'l', long, value_name = "COUNT")]
    pub limit: Option<u32>,

    /// Stop after this many listing pages
    #[arg(long, value_name = "COUNT")]
    pub max_pages: Option<usize>,

    /// DuckDB database file (overrides POKEDEX_DB_PATH env var)
    #[arg(short = 'd', long, value_name = "PATH")]
    pub db_path: Option<String>,

    /// Directory for the Parquet file (overrides POKEDEX_OUTPUT_DIR env var)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value = "10")]
    pub timeout: u64,

    /// Delay strategy between listing pages
    #[arg(long, value_enum, default_value = "fixed")]
    pub backoff: BackoffKind,

    /// Delay between pages in milliseconds (base delay for exponential)
    #[arg(long, value_name = "MS", default_value = "200")]
    pub page_delay_ms: u64,

    /// Upper bound for exponential delays in milliseconds
    #[arg(long, value_name = "MS", default_value = "5000")]
    pub max_delay_ms: u64,

    /// Abort when a natural identifier appears twice instead of keeping the last record
    #[arg(long)]
    pub fail_on_duplicate: bool,

    /// Persist records fetched before an extraction failure (the run still exits non-zero)
    #[arg(long)]
    pub keep_partial: bool,

    /// Number of base table rows shown in the report
    #[arg(long, value_name = "COUNT", default_value = "10")]
    pub preview_rows: usize,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.limit == Some(0) {
            anyhow::bail!("Page size must be greater than 0");
        }

        if self.max_pages == Some(0) {
            anyhow::bail!("Max pages must be greater than 0");
        }

        if self.timeout == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        if self.start_url.is_some() && self.limit.is_some() {
            anyhow::bail!("--limit cannot be combined with --start-url; put the page size in the URL instead");
        }

        if self.backoff == BackoffKind::Exponential && self.max_delay_ms < self.page_delay_ms {
            anyhow::bail!(
                "Max delay ({}ms) must be at least the page delay ({}ms)",
                self.max_delay_ms,
                self.page_delay_ms
            );
        }

        Ok(())
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        let base = Duration::from_millis(self.page_delay_ms);
        match self.backoff {
            BackoffKind::None => BackoffPolicy::None,
            BackoffKind::Fixed => BackoffPolicy::Fixed(base),
            BackoffKind::Exponential => {
                BackoffPolicy::Exponential { base, max: Duration::from_millis(self.max_delay_ms) }
            }
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        if self.fail_on_duplicate {
            DuplicatePolicy::FailFast
        } else {
            DuplicatePolicy::LastWriteWins
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.keep_partial {
            FailurePolicy::KeepPartial
        } else {
            FailurePolicy::Atomic
        }
    }
}
