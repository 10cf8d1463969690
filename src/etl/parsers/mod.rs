/// Parsers Module
///
/// Contains detail-body parsers for the different PokeAPI resources.
/// Each parser turns a listing item (plus its detail body, when the resource
/// is enriched) into a keyed record.
pub mod evolution;
pub mod pokemon;

use crate::models::{EnrichedRecord, NaturalId, RawItem, ResourceKind};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// Re-export commonly used parsers
pub use evolution::parse_evolution_chain;
pub use pokemon::{parse_pokemon, parse_pokemon_name};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no natural identifier in {url}")]
    MissingId { url: String },

    #[error("no name for item {url}")]
    MissingName { url: String },

    #[error("unexpected detail body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// `{ "name": ..., "url": ... }` reference used throughout the API
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// Build the keyed record for one listing item of `kind`
///
/// `detail` must be present for enriched resources and is ignored otherwise.
pub fn parse_item(
    kind: ResourceKind,
    item: &RawItem,
    detail: Option<Value>,
) -> Result<(NaturalId, EnrichedRecord), ParseError> {
    match (kind, detail) {
        (ResourceKind::PokemonNames, _) => parse_pokemon_name(item),
        (ResourceKind::Pokemon, Some(detail)) => parse_pokemon(item, detail),
        (ResourceKind::EvolutionChain, Some(detail)) => parse_evolution_chain(item, detail),
        (_, None) => Err(ParseError::Decode {
            url: item.url.clone(),
            source: serde::de::Error::custom("missing detail body for enriched resource"),
        }),
    }
}

/// Deserialize a detail body, tagging failures with the item URL
pub(crate) fn decode<T: serde::de::DeserializeOwned>(url: &str, detail: Value) -> Result<T, ParseError> {
    serde_json::from_value(detail).map_err(|source| ParseError::Decode { url: url.to_string(), source })
}
