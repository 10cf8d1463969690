/// Data Models Module
///
/// This module defines the core data structures used throughout the application.
/// These models represent PokeAPI listing pages, the enriched records built from
/// them, and the resource kinds the pipeline knows how to process.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Natural identifier taken from the API (detail URL segment or response body)
pub type NaturalId = u64;

/// One listing page: a `results` array plus an optional `next` cursor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage {
    pub results: Vec<RawItem>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Summary reference returned by a listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

/// A scalar or list-of-string value stored in a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    TextList(Vec<String>),
}

impl FieldValue {
    /// Render the value as text (used when a column mixes incompatible types)
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::TextList(items) => Some(format!("[{}]", items.join(", "))),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::TextList(items)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// The unit of persisted data: field name -> value, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl EnrichedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing an existing value of the same name in place
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// API resources the pipeline can extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ResourceKind {
    /// Pokémon with height, weight, types and abilities from the detail endpoint
    Pokemon,
    /// Pokémon names only (listing pages, no detail requests)
    PokemonNames,
    /// Evolution chains: root species and its first evolution
    EvolutionChain,
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pokemon => "pokemon",
            Self::PokemonNames => "pokemon-names",
            Self::EvolutionChain => "evolution-chain",
        }
    }

    /// Listing endpoint path relative to the API base URL
    pub fn listing_path(&self) -> &str {
        match self {
            Self::Pokemon | Self::PokemonNames => "pokemon",
            Self::EvolutionChain => "evolution-chain/?offset=0&limit=10",
        }
    }

    /// Whether each listing item is dereferenced through its detail URL
    pub fn is_enriched(&self) -> bool {
        !matches!(self, Self::PokemonNames)
    }

    pub fn parquet_file(&self) -> &str {
        match self {
            Self::Pokemon => "pokemon_data.parquet",
            Self::PokemonNames => "pokemon_names.parquet",
            Self::EvolutionChain => "evolution_chain_data.parquet",
        }
    }

    pub fn base_table(&self) -> &str {
        match self {
            Self::Pokemon => "pokedex",
            Self::PokemonNames => "pokemon_names",
            Self::EvolutionChain => "evolution_chain",
        }
    }

    pub fn summary_table(&self) -> &str {
        match self {
            Self::Pokemon => "pokemon_stats",
            Self::PokemonNames => "pokemon_names_stats",
            Self::EvolutionChain => "evolution_chain_summary",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
