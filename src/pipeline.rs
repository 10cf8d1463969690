/// Pipeline Module
///
/// Orchestrates one complete run: Extract → Write Parquet → Load → Summarize,
/// with an explicit state machine, a failure policy for interrupted
/// extractions, and statistics tracking.
use crate::api::JsonSource;
use crate::db::Database;
use crate::etl::{
    columnar::{self, FileMetadata},
    extract::{self, ExtractOptions, ExtractionStats},
    load,
    transform::{self, TransformOutput},
};
use crate::models::ResourceKind;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Fetching,
    Accumulating,
    Writing,
    Loading,
    Summarizing,
    Done,
    Failed,
}

impl PipelineState {
    /// Whether `self -> to` is a legal transition
    pub fn can_transition_to(self, to: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, to),
            (Idle, Fetching)
                | (Fetching, Accumulating)
                | (Fetching, Failed)
                | (Accumulating, Writing)
                | (Writing, Loading)
                | (Loading, Summarizing)
                | (Summarizing, Done)
        )
    }

    /// Move to `to`, rejecting illegal transitions
    pub fn transition(&mut self, to: PipelineState) -> Result<()> {
        if !self.can_transition_to(to) {
            anyhow::bail!("Illegal pipeline transition {} -> {}", self, to);
        }
        tracing::debug!("Pipeline state {} -> {}", self, to);
        *self = to;
        Ok(())
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Idle => "Idle",
            PipelineState::Fetching => "Fetching",
            PipelineState::Accumulating => "Accumulating",
            PipelineState::Writing => "Writing",
            PipelineState::Loading => "Loading",
            PipelineState::Summarizing => "Summarizing",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// What to do with records fetched before an extraction failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Persist nothing; existing file and tables stay as they were
    #[default]
    Atomic,
    /// Write, load and summarize the partial RecordSet, then report the failure
    KeepPartial,
}

/// Configuration for pipeline execution
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub resource: ResourceKind,
    pub start_url: String,
    pub parquet_path: PathBuf,
    pub extract: ExtractOptions,
    pub failure_policy: FailurePolicy,
    pub preview_rows: usize,
}

impl PipelineConfig {
    /// Default configuration for `resource` against `base_url`, writing into `output_dir`
    pub fn for_resource(resource: ResourceKind, base_url: &str, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource,
            start_url: crate::api::join_url(base_url, resource.listing_path()),
            parquet_path: output_dir.into().join(resource.parquet_file()),
            extract: ExtractOptions::default(),
            failure_policy: FailurePolicy::default(),
            preview_rows: 10,
        }
    }
}

/// Pipeline execution statistics
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub extraction: ExtractionStats,
    pub rows_written: u64,
    pub rows_loaded: u64,
    pub elapsed_time: Duration,
}

impl PipelineStats {
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rows_loaded as f64 / secs
        }
    }
}

/// Outcome of a run that reached the database
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub stats: PipelineStats,
    pub output: TransformOutput,
    /// Extraction error when a partial RecordSet was persisted
    pub failure: Option<String>,
}

/// Main ELT Pipeline
pub struct Pipeline<S> {
    source: S,
    database: Database,
    config: PipelineConfig,
}

impl<S: JsonSource> Pipeline<S> {
    /// Create a new pipeline instance
    pub fn new(source: S, database: Database, config: PipelineConfig) -> Self {
        Self { source, database, config }
    }

    /// Run the complete pipeline for the configured resource
    pub async fn run(&self) -> Result<PipelineReport> {
        let span = tracing::info_span!("pipeline", resource = %self.config.resource);
        self.run_stages().instrument(span).await
    }

    async fn run_stages(&self) -> Result<PipelineReport> {
        let start_time = Instant::now();
        let kind = self.config.resource;
        let mut state = PipelineState::Idle;
        let mut stats = PipelineStats::default();

        tracing::info!("Starting {} pipeline from {}", kind, self.config.start_url);

        // Extract: walk listing pages and accumulate records
        state.transition(PipelineState::Fetching)?;
        let extraction = extract::fetch_all(&self.source, kind, &self.config.start_url, &self.config.extract).await;
        stats.extraction = extraction.stats.clone();

        if extraction.is_complete() {
            tracing::info!("Extraction of {} complete after {} pages", kind, stats.extraction.pages_fetched);
        }

        let failure = match extraction.failure {
            None => None,
            Some(e) if self.config.failure_policy == FailurePolicy::Atomic || extraction.records.is_empty() => {
                state.transition(PipelineState::Failed)?;
                return Err(anyhow::Error::new(e)
                    .context(format!("Extraction of {} failed, nothing was persisted", kind)));
            }
            Some(e) => {
                tracing::warn!("Persisting {} {} records fetched before the failure", extraction.records.len(), kind);
                Some(e.to_string())
            }
        };

        state.transition(PipelineState::Accumulating)?;
        let records = extraction.records;
        tracing::info!("Accumulated {} unique {} records", records.len(), kind);

        // Write: one Parquet file per resource, replaced in full
        state.transition(PipelineState::Writing)?;
        let metadata = FileMetadata { resource: kind.to_string(), extracted_at: Utc::now() };
        stats.rows_written = columnar::write_parquet(&records, &self.config.parquet_path, &metadata)
            .with_context(|| format!("Failed to write {}", self.config.parquet_path.display()))?;
        tracing::info!("Saved {} data to {}", kind, self.config.parquet_path.display());

        // Load: drop and recreate the base table
        state.transition(PipelineState::Loading)?;
        stats.rows_loaded = load::load_table(&self.database, kind.base_table(), &self.config.parquet_path)
            .with_context(|| format!("Failed to load table '{}'", kind.base_table()))?;

        // Transform: recreate the summary table
        state.transition(PipelineState::Summarizing)?;
        let output = transform::summarize(&self.database, kind, self.config.preview_rows)
            .with_context(|| format!("Failed to create summary table '{}'", kind.summary_table()))?;

        state.transition(PipelineState::Done)?;
        stats.elapsed_time = start_time.elapsed();

        Ok(PipelineReport { state, stats, output, failure })
    }
}

/// Print final statistics
pub fn print_final_stats(kind: ResourceKind, report: &PipelineReport) {
    let stats = &report.stats;

    println!("\n📋 {} (first rows):", kind.base_table());
    println!("{}", report.output.preview);
    println!("\n📊 {}:", kind.summary_table());
    println!("{}", report.output.summary.format_table());

    println!("\n📊 Pipeline Statistics:");
    println!("   ⏱️  Total time: {:.2}s", stats.elapsed_time.as_secs_f64());
    println!(
        "   📄 Pages: {} fetched, {} items seen, {} detail requests",
        stats.extraction.pages_fetched, stats.extraction.items_seen, stats.extraction.detail_requests
    );
    println!(
        "   🧮 Records: {} unique, {} overwritten duplicates",
        stats.extraction.unique_records, stats.extraction.overwrites
    );
    println!("   💾 Rows written: {} | Rows loaded: {}", stats.rows_written, stats.rows_loaded);
    println!("   🗄️  {} now holds {} rows", kind.base_table(), report.output.base_rows);
    println!("   🏁 Final state: {}", report.state);
    println!("   ⚡ Throughput: {:.1} records/sec", stats.records_per_second());

    if let Some(failure) = &report.failure {
        println!("\n❌ Extraction stopped early: {}", failure);
    }
}
