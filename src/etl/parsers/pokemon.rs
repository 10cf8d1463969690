/// Pokémon Detail Parser
///
/// Parses `/pokemon/{id}/` bodies into `name, height, weight, types, abilities`
/// records. The natural identifier is the numeric segment of the item URL.
use super::{decode, NamedRef, ParseError};
use crate::api::id_from_url;
use crate::models::{EnrichedRecord, NaturalId, RawItem};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct PokemonDetail {
    #[serde(default)]
    name: Option<String>,
    height: i64,
    weight: i64,
    types: Vec<TypeSlot>,
    abilities: Vec<AbilitySlot>,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: NamedRef,
}

#[derive(Debug, Deserialize)]
struct AbilitySlot {
    ability: NamedRef,
}

/// Parse an enriched Pokémon record from a listing item and its detail body
///
/// The listing name wins over the detail name; either one must be present.
pub fn parse_pokemon(item: &RawItem, detail: Value) -> Result<(NaturalId, EnrichedRecord), ParseError> {
    let id = id_from_url(&item.url).ok_or_else(|| ParseError::MissingId { url: item.url.clone() })?;
    let detail: PokemonDetail = decode(&item.url, detail)?;

    let name = item.name.clone().or(detail.name).ok_or_else(|| ParseError::MissingName { url: item.url.clone() })?;
    let types: Vec<String> = detail.types.into_iter().map(|slot| slot.kind.name).collect();
    let abilities: Vec<String> = detail.abilities.into_iter().map(|slot| slot.ability.name).collect();

    let record = EnrichedRecord::new()
        .with("name", name)
        .with("height", detail.height)
        .with("weight", detail.weight)
        .with("types", types)
        .with("abilities", abilities);

    Ok((id, record))
}

/// Parse a name-only record straight from a listing item
pub fn parse_pokemon_name(item: &RawItem) -> Result<(NaturalId, EnrichedRecord), ParseError> {
    let id = id_from_url(&item.url).ok_or_else(|| ParseError::MissingId { url: item.url.clone() })?;
    let name = item.name.clone().ok_or_else(|| ParseError::MissingName { url: item.url.clone() })?;

    Ok((id, EnrichedRecord::new().with("name", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn bulbasaur() -> RawItem {
        RawItem { name: Some("bulbasaur".into()), url: "https://pokeapi.co/api/v2/pokemon/1/".into() }
    }

    #[test]
    fn test_parse_pokemon() {
        let detail = serde_json::json!({
            "height": 7,
            "weight": 69,
            "types": [{"slot": 1, "type": {"name": "grass", "url": "https://pokeapi.co/api/v2/type/12/"}},
                      {"slot": 2, "type": {"name": "poison", "url": "https://pokeapi.co/api/v2/type/4/"}}],
            "abilities": [{"ability": {"name": "overgrow"}, "is_hidden": false}]
        });

        let (id, record) = parse_pokemon(&bulbasaur(), detail).unwrap();
        assert_eq!(id, 1);
        assert_eq!(record.get("name"), Some(&FieldValue::Text("bulbasaur".into())));
        assert_eq!(record.get("height"), Some(&FieldValue::Int(7)));
        assert_eq!(record.get("weight"), Some(&FieldValue::Int(69)));
        assert_eq!(record.get("types"), Some(&FieldValue::TextList(vec!["grass".into(), "poison".into()])));
        assert_eq!(record.get("abilities"), Some(&FieldValue::TextList(vec!["overgrow".into()])));
    }

    #[test]
    fn test_parse_pokemon_missing_key() {
        let detail = serde_json::json!({ "height": 7, "types": [], "abilities": [] });
        assert!(matches!(parse_pokemon(&bulbasaur(), detail), Err(ParseError::Decode { .. })));
    }

    #[test]
    fn test_parse_pokemon_falls_back_to_detail_name() {
        let item = RawItem { name: None, url: "https://pokeapi.co/api/v2/pokemon/25/".into() };
        let detail = serde_json::json!({ "name": "pikachu", "height": 4, "weight": 60, "types": [], "abilities": [] });

        let (id, record) = parse_pokemon(&item, detail).unwrap();
        assert_eq!(id, 25);
        assert_eq!(record.get("name"), Some(&FieldValue::Text("pikachu".into())));
    }

    #[test]
    fn test_parse_pokemon_name_requires_numeric_url() {
        let item = RawItem { name: Some("pikachu".into()), url: "https://pokeapi.co/api/v2/pokemon/pikachu/".into() };
        assert!(matches!(parse_pokemon_name(&item), Err(ParseError::MissingId { .. })));

        let (id, record) = parse_pokemon_name(&bulbasaur()).unwrap();
        assert_eq!(id, 1);
        assert_eq!(record.fields().count(), 1);
    }
}
