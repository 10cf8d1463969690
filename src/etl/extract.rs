/// Extract Module
///
/// Handles walking PokeAPI listing pages via their `next` cursor and
/// dereferencing each item's detail URL into keyed records.
use super::accumulate::{DuplicateId, DuplicatePolicy, RecordAccumulator};
use super::backoff::BackoffPolicy;
use super::parsers::{parse_item, ParseError};
use crate::api::{FetchError, JsonSource};
use crate::models::{EnrichedRecord, ListingPage, ResourceKind};
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateId),
}

/// Knobs for a single extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub backoff: BackoffPolicy,
    pub duplicates: DuplicatePolicy,
    /// Stop after this many listing pages, as if `next` had been null
    pub max_pages: Option<usize>,
}

/// Statistics for one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub pages_fetched: usize,
    pub items_seen: usize,
    pub detail_requests: usize,
    pub unique_records: usize,
    pub overwrites: usize,
}

/// Everything fetched before extraction finished or failed
#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<EnrichedRecord>,
    pub stats: ExtractionStats,
    pub failure: Option<ExtractError>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Fetch every page reachable from `start_url` and accumulate its records
///
/// Any non-200 response, transport error or malformed body stops the walk.
/// The error is logged and returned in [`Extraction::failure`] together with
/// the records accumulated up to that point.
pub async fn fetch_all<S: JsonSource>(
    source: &S,
    kind: ResourceKind,
    start_url: &str,
    options: &ExtractOptions,
) -> Extraction {
    let mut acc = RecordAccumulator::new(options.duplicates);
    let mut stats = ExtractionStats::default();
    let mut cursor = Some(start_url.to_string());
    let mut failure = None;

    while let Some(url) = cursor.take() {
        match fetch_page(source, kind, &url, &mut acc, &mut stats).await {
            Ok(next) => cursor = next,
            Err(e) => {
                tracing::error!("Extraction of {} stopped at {}: {}", kind, url, e);
                failure = Some(e);
                break;
            }
        }

        if cursor.is_none() {
            break;
        }

        if options.max_pages.is_some_and(|max| stats.pages_fetched >= max) {
            tracing::info!(
                "Reached page limit of {}, not following {}",
                stats.pages_fetched,
                cursor.as_deref().unwrap_or("")
            );
            break;
        }

        let delay = options.backoff.delay(stats.pages_fetched - 1);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    stats.unique_records = acc.len();
    stats.overwrites = acc.overwrites();

    Extraction { records: acc.into_record_set(), stats, failure }
}

/// Fetch one listing page, enrich its items and return the `next` cursor
async fn fetch_page<S: JsonSource>(
    source: &S,
    kind: ResourceKind,
    url: &str,
    acc: &mut RecordAccumulator,
    stats: &mut ExtractionStats,
) -> Result<Option<String>, ExtractError> {
    let body = source.get_json(url).await?;
    let page: ListingPage =
        serde_json::from_value(body).map_err(|source| FetchError::Decode { url: url.to_string(), source })?;

    stats.pages_fetched += 1;
    tracing::info!("Fetched {} {} items from {}", page.results.len(), kind, url);

    for item in &page.results {
        stats.items_seen += 1;

        let detail = if kind.is_enriched() {
            stats.detail_requests += 1;
            Some(source.get_json(&item.url).await?)
        } else {
            None
        };

        let (id, record) = parse_item(kind, item, detail)?;
        acc.insert(id, record)?;
        tracing::debug!("Saved details for {} #{}", item.name.as_deref().unwrap_or("<unnamed>"), id);
    }

    tracing::info!("Extracted {} unique {} records so far", acc.len(), kind);

    Ok(page.next)
}
