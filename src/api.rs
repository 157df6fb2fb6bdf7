use std::ops::RangeInclusive;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::state::{EvolutionStage, PokemonRecord, SpeciesEntry};

const API_BASE: &str = "https://pokeapi.co/api/v2";
const SPRITE_BASE: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";
const CATALOG_LIMIT: u32 = 10000;
const SEARCH_CONCURRENCY: usize = 12;

/// Upper bound of the national dex; batch ranges are clamped to it and the
/// random pick draws from it.
pub const MAX_POKEMON_ID: u32 = 1025;
pub const BATCH_SIZE: u32 = 20;

#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("Enter a valid Pokémon name or ID")]
    InvalidInput,
    #[error("Pokémon not found")]
    NotFound,
    #[error("No matching Pokémon")]
    NoMatches,
    #[error("network error: {0}")]
    Network(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("no Pokémon ID provided")]
    NoId,
}

/// A validated search, ready to run. Produced by [`plan_search`] without any
/// network traffic; [`run_search`] performs the fetches.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchPlan {
    ById(u32),
    ByNames(Vec<String>),
}

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogResponse {
    results: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogEntry {
    name: String,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    height: u16,
    weight: u16,
    types: Vec<PokemonTypeSlot>,
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonTypeSlot {
    #[serde(rename = "type")]
    type_info: CatalogEntry,
}

#[derive(Clone, Debug, Deserialize)]
struct SpeciesResponse {
    flavor_text_entries: Vec<FlavorTextEntry>,
    evolution_chain: Option<ApiResource>,
}

#[derive(Clone, Debug, Deserialize)]
struct FlavorTextEntry {
    flavor_text: String,
    language: CatalogEntry,
}

#[derive(Clone, Debug, Deserialize)]
struct ApiResource {
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct EvolutionChainResponse {
    chain: ChainLink,
}

/// Recursive, externally supplied chain graph. Read-only input to the walk.
#[derive(Clone, Debug, Deserialize)]
struct ChainLink {
    species: NamedResource,
    evolves_to: Vec<ChainLink>,
}

/// Fetches the full species name list, once per session. Callers treat a
/// failure as "prefix search unavailable", never as fatal.
pub async fn fetch_species_catalog() -> Result<Vec<SpeciesEntry>, ApiError> {
    let url = format!("{API_BASE}/pokemon?limit={CATALOG_LIMIT}");
    let response: CatalogResponse = get_json(&url).await?;
    Ok(response
        .results
        .into_iter()
        .map(|entry| SpeciesEntry { name: entry.name })
        .collect())
}

/// Fetches a single record from the detail endpoint. The result has no
/// flavor text; see [`fetch_record_full`] for the species-metadata join.
pub async fn fetch_record(identifier: &str) -> Result<PokemonRecord, ApiError> {
    let url = format!("{API_BASE}/pokemon/{}", identifier.to_lowercase());
    let response: PokemonResponse = get_json(&url).await?;
    Ok(record_from_response(response))
}

/// Fetches a record and joins the species metadata for its flavor text.
/// The join is soft: a failed species request still yields a valid record
/// with `flavor_text: None`.
pub async fn fetch_record_full(identifier: &str) -> Result<PokemonRecord, ApiError> {
    let mut record = fetch_record(identifier).await?;
    record.flavor_text = fetch_flavor_text(record.id).await.ok().flatten();
    Ok(record)
}

async fn fetch_flavor_text(id: u32) -> Result<Option<String>, ApiError> {
    let url = format!("{API_BASE}/pokemon-species/{id}");
    let response: SpeciesResponse = get_json(&url).await?;
    Ok(english_flavor_text(&response.flavor_text_entries))
}

/// Fetches the contiguous id range `[start_id, start_id + count - 1]`,
/// clamped to [`MAX_POKEMON_ID`]. Each id is fetched independently and
/// concurrently; a per-id failure drops that id from the result, the batch
/// itself never fails. Returns the records sorted ascending by id together
/// with the number of dropped ids.
pub async fn fetch_record_batch(start_id: u32, count: u32) -> (Vec<PokemonRecord>, usize) {
    let Some(range) = batch_range(start_id, count) else {
        return (Vec::new(), 0);
    };

    let mut join_set = JoinSet::new();
    for id in range {
        join_set.spawn(async move { fetch_record(&id.to_string()).await });
    }

    let mut outcomes = Vec::new();
    while let Some(result) = join_set.join_next().await {
        outcomes.push(
            result.unwrap_or_else(|err| Err(ApiError::Fetch(err.to_string()))),
        );
    }
    merge_batch_outcomes(outcomes)
}

/// Merges a settled batch: failures are dropped and counted, survivors are
/// sorted ascending by id regardless of completion order. A batch is never
/// an error as a whole, even when every id in it failed.
fn merge_batch_outcomes(
    outcomes: Vec<Result<PokemonRecord, ApiError>>,
) -> (Vec<PokemonRecord>, usize) {
    let mut records = Vec::new();
    let mut dropped = 0;
    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(_) => dropped += 1,
        }
    }
    records.sort_by_key(|record| record.id);
    (records, dropped)
}

/// Validates a query and resolves it to a plan without touching the network.
///
/// A trimmed query that is empty or contains anything outside `[A-Za-z0-9]`
/// is `InvalidInput`. All-digit queries search by id; everything else is a
/// case-insensitive prefix scan over the catalog, failing with `NoMatches`
/// when no name starts with the query (which is always the case while the
/// catalog is still empty).
pub fn plan_search(catalog: &[SpeciesEntry], query: &str) -> Result<SearchPlan, ApiError> {
    let trimmed = query.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ApiError::InvalidInput);
    }

    if let Ok(id) = trimmed.parse::<u32>() {
        return Ok(SearchPlan::ById(id));
    }

    let candidates: Vec<String> = catalog
        .iter()
        .filter(|entry| entry.name.starts_with(&trimmed))
        .map(|entry| entry.name.clone())
        .collect();
    if candidates.is_empty() {
        return Err(ApiError::NoMatches);
    }
    Ok(SearchPlan::ByNames(candidates))
}

/// Runs a plan produced by [`plan_search`].
///
/// Id mode propagates its single failure. Name mode fetches every candidate
/// concurrently, waits for all of them to settle, and returns the successful
/// subset in catalog order; only when every candidate fails does the whole
/// call fail with `NoMatches`. One bad entry never blocks the rest.
pub async fn run_search(plan: SearchPlan) -> Result<Vec<PokemonRecord>, ApiError> {
    match plan {
        SearchPlan::ById(id) => Ok(vec![fetch_record_full(&id.to_string()).await?]),
        SearchPlan::ByNames(names) => {
            let semaphore = Arc::new(Semaphore::new(SEARCH_CONCURRENCY));
            let mut join_set = JoinSet::new();
            for (index, name) in names.iter().enumerate() {
                let name = name.clone();
                let semaphore = semaphore.clone();
                join_set.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| ApiError::Fetch("search semaphore closed".to_string()))?;
                    fetch_record_full(&name).await.map(|record| (index, record))
                });
            }

            let mut slots: Vec<Option<PokemonRecord>> = vec![None; names.len()];
            while let Some(result) = join_set.join_next().await {
                if let Ok(Ok((index, record))) = result {
                    slots[index] = Some(record);
                }
            }
            merge_search_slots(slots)
        }
    }
}

/// Merges settled name-mode candidates: the successful subsequence in
/// candidate order, dropping failures silently. Only a fully failed set is
/// `NoMatches`; one bad entry never blocks the rest.
fn merge_search_slots(
    slots: Vec<Option<PokemonRecord>>,
) -> Result<Vec<PokemonRecord>, ApiError> {
    let records: Vec<PokemonRecord> = slots.into_iter().flatten().collect();
    if records.is_empty() {
        return Err(ApiError::NoMatches);
    }
    Ok(records)
}

/// Resolves a species' evolution sequence: species metadata, then the linked
/// chain graph, then the walk. Either request failing is a `Fetch` error;
/// an empty id fails with `NoId` before any network call.
pub async fn fetch_evolution_stages(id: &str) -> Result<Vec<EvolutionStage>, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::NoId);
    }

    let species_url = format!("{API_BASE}/pokemon-species/{id}");
    let species: SpeciesResponse = get_json(&species_url)
        .await
        .map_err(|err| ApiError::Fetch(err.to_string()))?;
    let chain_url = species
        .evolution_chain
        .map(|resource| resource.url)
        .ok_or_else(|| ApiError::Fetch("species has no evolution chain".to_string()))?;

    let response: EvolutionChainResponse = get_json(&chain_url)
        .await
        .map_err(|err| ApiError::Fetch(err.to_string()))?;
    Ok(flatten_chain(&response.chain))
}

pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, ApiError> {
    let response = http_client()
        .get(url)
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;
    if !response.status().is_success() {
        return Err(ApiError::NotFound);
    }
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|err| ApiError::Network(err.to_string()))
}

/// Deterministic sprite location for records whose payload carries no
/// `front_default`.
pub fn fallback_sprite_url(id: u32) -> String {
    format!("{SPRITE_BASE}/{id}.png")
}

/// Walks a chain graph into a flat stage sequence.
///
/// The walk emits the root, descends through single-child links, and at the
/// first node with more than one child emits every child and stops. Deeper
/// levels past a branch point stay unexplored; a species with no children
/// yields just itself.
fn flatten_chain(root: &ChainLink) -> Vec<EvolutionStage> {
    let mut stages = vec![stage_from(&root.species)];
    let mut current = root;
    loop {
        match current.evolves_to.len() {
            0 => break,
            1 => {
                current = &current.evolves_to[0];
                stages.push(stage_from(&current.species));
            }
            _ => {
                for child in &current.evolves_to {
                    stages.push(stage_from(&child.species));
                }
                break;
            }
        }
    }
    stages
}

fn stage_from(species: &NamedResource) -> EvolutionStage {
    EvolutionStage {
        name: species.name.clone(),
        id: id_from_url(&species.url),
    }
}

fn id_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .split('/')
        .next_back()
        .unwrap_or("unknown")
        .to_string()
}

fn record_from_response(response: PokemonResponse) -> PokemonRecord {
    let sprite_url = pointer_string(&response.sprites, "/front_default")
        .unwrap_or_else(|| fallback_sprite_url(response.id));
    PokemonRecord {
        id: response.id,
        name: response.name,
        height: response.height,
        weight: response.weight,
        types: response
            .types
            .into_iter()
            .map(|slot| slot.type_info.name)
            .collect(),
        sprite_url,
        flavor_text: None,
    }
}

fn english_flavor_text(entries: &[FlavorTextEntry]) -> Option<String> {
    entries
        .iter()
        .find(|entry| entry.language.name == "en")
        .map(|entry| sanitize_text(&entry.flavor_text))
}

fn sanitize_text(text: &str) -> String {
    text.replace('\n', " ").replace('\u{000C}', " ")
}

fn batch_range(start_id: u32, count: u32) -> Option<RangeInclusive<u32>> {
    if start_id == 0 || count == 0 || start_id > MAX_POKEMON_ID {
        return None;
    }
    let end_id = start_id.saturating_add(count - 1).min(MAX_POKEMON_ID);
    Some(start_id..=end_id)
}

fn pointer_string(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

async fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, ApiError> {
    let response = http_client()
        .get(url)
        .send()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))?;
    if !response.status().is_success() {
        return Err(ApiError::NotFound);
    }
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::Network(err.to_string()))
}

fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog(names: &[&str]) -> Vec<SpeciesEntry> {
        names
            .iter()
            .map(|name| SpeciesEntry {
                name: name.to_string(),
            })
            .collect()
    }

    fn link(name: &str, id: u32, evolves_to: Vec<ChainLink>) -> ChainLink {
        ChainLink {
            species: NamedResource {
                name: name.to_string(),
                url: format!("https://pokeapi.co/api/v2/pokemon-species/{id}/"),
            },
            evolves_to,
        }
    }

    fn stage_names(stages: &[EvolutionStage]) -> Vec<&str> {
        stages.iter().map(|stage| stage.name.as_str()).collect()
    }

    fn record(id: u32, name: &str) -> PokemonRecord {
        PokemonRecord {
            id,
            name: name.to_string(),
            height: 7,
            weight: 69,
            types: vec!["grass".to_string()],
            sprite_url: fallback_sprite_url(id),
            flavor_text: None,
        }
    }

    #[test]
    fn plan_rejects_empty_and_whitespace_queries() {
        let catalog = catalog(&["pikachu"]);
        assert_eq!(plan_search(&catalog, ""), Err(ApiError::InvalidInput));
        assert_eq!(plan_search(&catalog, "   "), Err(ApiError::InvalidInput));
    }

    #[test]
    fn plan_rejects_non_alphanumeric_queries() {
        let catalog = catalog(&["mr-mime", "pikachu"]);
        assert_eq!(plan_search(&catalog, "mr-mime"), Err(ApiError::InvalidInput));
        assert_eq!(plan_search(&catalog, "mr mime"), Err(ApiError::InvalidInput));
        assert_eq!(plan_search(&catalog, "pika!"), Err(ApiError::InvalidInput));
    }

    #[test]
    fn plan_parses_numeric_queries_as_ids() {
        let catalog = catalog(&["pikachu"]);
        assert_eq!(plan_search(&catalog, "25"), Ok(SearchPlan::ById(25)));
        assert_eq!(plan_search(&catalog, "  25  "), Ok(SearchPlan::ById(25)));
        assert_eq!(plan_search(&catalog, "0025"), Ok(SearchPlan::ById(25)));
    }

    #[test]
    fn plan_scans_catalog_by_prefix_in_catalog_order() {
        let catalog = catalog(&["bulbasaur", "pikachu", "pidgey", "venusaur", "pidgeotto"]);
        assert_eq!(
            plan_search(&catalog, "pi"),
            Ok(SearchPlan::ByNames(vec![
                "pikachu".to_string(),
                "pidgey".to_string(),
                "pidgeotto".to_string(),
            ]))
        );
    }

    #[test]
    fn plan_lowercases_before_matching() {
        let catalog = catalog(&["pikachu"]);
        assert_eq!(
            plan_search(&catalog, "PIKA"),
            Ok(SearchPlan::ByNames(vec!["pikachu".to_string()]))
        );
    }

    #[test]
    fn plan_fails_with_no_matches_for_unknown_prefix() {
        let catalog = catalog(&["bulbasaur", "ivysaur"]);
        assert_eq!(plan_search(&catalog, "mew"), Err(ApiError::NoMatches));
    }

    #[test]
    fn plan_fails_with_no_matches_on_empty_catalog() {
        // Catalog loader failed or has not finished; name search is
        // unavailable even for prefixes that would otherwise match.
        assert_eq!(plan_search(&[], "pika"), Err(ApiError::NoMatches));
    }

    #[test]
    fn linear_chain_walks_to_the_end() {
        let chain = link(
            "bulbasaur",
            1,
            vec![link("ivysaur", 2, vec![link("venusaur", 3, vec![])])],
        );
        let stages = flatten_chain(&chain);
        assert_eq!(stage_names(&stages), vec!["bulbasaur", "ivysaur", "venusaur"]);
        assert_eq!(stages[2].id, "3");
    }

    #[test]
    fn chain_without_evolutions_yields_singleton() {
        let stages = flatten_chain(&link("farfetchd", 83, vec![]));
        assert_eq!(stage_names(&stages), vec!["farfetchd"]);
    }

    #[test]
    fn branch_at_root_emits_every_child_and_stops() {
        let chain = link(
            "eevee",
            133,
            vec![
                link("vaporeon", 134, vec![]),
                link("jolteon", 135, vec![]),
                link("flareon", 136, vec![]),
            ],
        );
        assert_eq!(
            stage_names(&flatten_chain(&chain)),
            vec!["eevee", "vaporeon", "jolteon", "flareon"]
        );
    }

    #[test]
    fn walk_stops_at_first_branch_point() {
        // root -> a -> {b, c, d}, with a grandchild under b that must not
        // be emitted.
        let chain = link(
            "root",
            1,
            vec![link(
                "a",
                2,
                vec![
                    link("b", 3, vec![link("deeper", 6, vec![])]),
                    link("c", 4, vec![]),
                    link("d", 5, vec![]),
                ],
            )],
        );
        assert_eq!(
            stage_names(&flatten_chain(&chain)),
            vec!["root", "a", "b", "c", "d"]
        );
    }

    #[test]
    fn stage_ids_come_from_the_species_url() {
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon-species/133/"), "133");
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon-species/133"), "133");
    }

    #[test]
    fn fallback_sprite_url_is_deterministic() {
        assert_eq!(
            fallback_sprite_url(25),
            "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png"
        );
        assert_eq!(fallback_sprite_url(25), fallback_sprite_url(25));
    }

    #[test]
    fn record_normalization_flattens_type_wrappers() {
        let response: PokemonResponse = serde_json::from_str(
            r#"{
                "id": 6,
                "name": "charizard",
                "height": 17,
                "weight": 905,
                "types": [
                    {"slot": 1, "type": {"name": "fire", "url": "https://pokeapi.co/api/v2/type/10/"}},
                    {"slot": 2, "type": {"name": "flying", "url": "https://pokeapi.co/api/v2/type/3/"}}
                ],
                "sprites": {"front_default": "https://example.test/6.png"}
            }"#,
        )
        .expect("pokemon response");
        let record = record_from_response(response);
        assert_eq!(record.id, 6);
        assert_eq!(record.types, vec!["fire", "flying"]);
        assert_eq!(record.sprite_url, "https://example.test/6.png");
        assert_eq!(record.flavor_text, None);
    }

    #[test]
    fn missing_front_default_falls_back_to_derived_url() {
        let response: PokemonResponse = serde_json::from_str(
            r#"{
                "id": 25,
                "name": "pikachu",
                "height": 4,
                "weight": 60,
                "types": [{"slot": 1, "type": {"name": "electric", "url": ""}}],
                "sprites": {"front_default": null}
            }"#,
        )
        .expect("pokemon response");
        let record = record_from_response(response);
        assert_eq!(record.sprite_url, fallback_sprite_url(25));
    }

    #[test]
    fn flavor_text_prefers_english_and_strips_control_characters() {
        let entries = vec![
            FlavorTextEntry {
                flavor_text: "Ein seltsamer Samen.".to_string(),
                language: CatalogEntry {
                    name: "de".to_string(),
                },
            },
            FlavorTextEntry {
                flavor_text: "A strange seed was\nplanted on its\u{000C}back.".to_string(),
                language: CatalogEntry {
                    name: "en".to_string(),
                },
            },
        ];
        assert_eq!(
            english_flavor_text(&entries),
            Some("A strange seed was planted on its back.".to_string())
        );
        assert_eq!(english_flavor_text(&entries[..1]), None);
    }

    #[test]
    fn one_failed_candidate_does_not_fail_the_search() {
        let slots = vec![
            Some(record(25, "pikachu")),
            None,
            Some(record(16, "pidgey")),
            Some(record(17, "pidgeotto")),
            Some(record(18, "pidgeot")),
        ];
        let records = merge_search_slots(slots).expect("partial success");
        assert_eq!(records.len(), 4);
        assert_eq!(
            records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["pikachu", "pidgey", "pidgeotto", "pidgeot"]
        );
    }

    #[test]
    fn search_fails_only_when_every_candidate_fails() {
        assert_eq!(
            merge_search_slots(vec![None, None, None]),
            Err(ApiError::NoMatches)
        );
        assert_eq!(
            merge_search_slots(vec![None, Some(record(16, "pidgey"))]),
            Ok(vec![record(16, "pidgey")])
        );
    }

    #[test]
    fn batch_merge_drops_failures_and_sorts_ascending() {
        let outcomes = vec![
            Ok(record(3, "venusaur")),
            Err(ApiError::NotFound),
            Ok(record(1, "bulbasaur")),
            Ok(record(2, "ivysaur")),
        ];
        let (records, dropped) = merge_batch_outcomes(outcomes);
        assert_eq!(dropped, 1);
        assert_eq!(
            records.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn batch_never_fails_as_a_whole() {
        let outcomes = vec![
            Err(ApiError::NotFound),
            Err(ApiError::Network("timeout".to_string())),
        ];
        assert_eq!(merge_batch_outcomes(outcomes), (Vec::new(), 2));
    }

    #[test]
    fn batch_range_clamps_to_the_dex_upper_bound() {
        assert_eq!(batch_range(1, 20), Some(1..=20));
        assert_eq!(batch_range(21, 20), Some(21..=40));
        assert_eq!(batch_range(MAX_POKEMON_ID - 4, 20), Some(MAX_POKEMON_ID - 4..=MAX_POKEMON_ID));
        assert_eq!(batch_range(MAX_POKEMON_ID + 1, 20), None);
        assert_eq!(batch_range(0, 20), None);
        assert_eq!(batch_range(1, 0), None);
    }

    #[test]
    fn chain_response_deserializes_recursively() {
        let response: EvolutionChainResponse = serde_json::from_str(
            r#"{
                "chain": {
                    "species": {"name": "eevee", "url": "https://pokeapi.co/api/v2/pokemon-species/133/"},
                    "evolves_to": [
                        {"species": {"name": "vaporeon", "url": "https://pokeapi.co/api/v2/pokemon-species/134/"}, "evolves_to": []}
                    ]
                }
            }"#,
        )
        .expect("chain response");
        let stages = flatten_chain(&response.chain);
        assert_eq!(stage_names(&stages), vec!["eevee", "vaporeon"]);
        assert_eq!(stages[0].id, "133");
    }
}
