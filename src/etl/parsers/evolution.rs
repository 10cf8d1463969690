/// Evolution Chain Parser
///
/// Parses `/evolution-chain/{id}/` bodies. Only the chain root and its first
/// evolution are kept; the natural identifier is the body's `id`.
use super::{decode, NamedRef, ParseError};
use crate::models::{EnrichedRecord, NaturalId, RawItem};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct EvolutionChainDetail {
    id: NaturalId,
    chain: ChainLink,
}

#[derive(Debug, Deserialize)]
struct ChainLink {
    species: NamedRef,
    #[serde(default)]
    evolves_to: Vec<ChainLink>,
}

/// Parse `pokemon` (root species) and `next_evolve` (first evolution, if any)
pub fn parse_evolution_chain(item: &RawItem, detail: Value) -> Result<(NaturalId, EnrichedRecord), ParseError> {
    let detail: EvolutionChainDetail = decode(&item.url, detail)?;

    let next_evolve = detail.chain.evolves_to.into_iter().next().map(|link| link.species.name);
    let record = EnrichedRecord::new().with("pokemon", detail.chain.species.name).with("next_evolve", next_evolve);

    Ok((detail.id, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn item() -> RawItem {
        RawItem { name: None, url: "https://pokeapi.co/api/v2/evolution-chain/1/".into() }
    }

    #[test]
    fn test_parse_evolution_chain() {
        let detail = serde_json::json!({
            "id": 1,
            "chain": {
                "species": {"name": "bulbasaur"},
                "evolves_to": [{
                    "species": {"name": "ivysaur"},
                    "evolves_to": [{"species": {"name": "venusaur"}, "evolves_to": []}]
                }]
            }
        });

        let (id, record) = parse_evolution_chain(&item(), detail).unwrap();
        assert_eq!(id, 1);
        assert_eq!(record.get("pokemon"), Some(&FieldValue::Text("bulbasaur".into())));
        assert_eq!(record.get("next_evolve"), Some(&FieldValue::Text("ivysaur".into())));
    }

    #[test]
    fn test_parse_evolution_chain_without_evolution() {
        let detail = serde_json::json!({
            "id": 67,
            "chain": { "species": {"name": "tauros"}, "evolves_to": [] }
        });

        let (id, record) = parse_evolution_chain(&item(), detail).unwrap();
        assert_eq!(id, 67);
        assert_eq!(record.get("next_evolve"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_parse_evolution_chain_missing_chain() {
        let detail = serde_json::json!({ "id": 3 });
        assert!(parse_evolution_chain(&item(), detail).is_err());
    }
}
