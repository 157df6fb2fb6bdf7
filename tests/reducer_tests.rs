//! Reducer tests: dispatch actions against an EffectStore and assert on the
//! resulting state and emitted effects.

use pretty_assertions::assert_eq;
use tui_dispatch::EffectStore;

use pokedex::action::Action;
use pokedex::api::{self, ApiError, SearchPlan, BATCH_SIZE, MAX_POKEMON_ID};
use pokedex::effect::Effect;
use pokedex::reducer::reducer;
use pokedex::state::{AppState, EvolutionStage, FocusArea, PokemonRecord, SpeciesEntry};

fn record(id: u32, name: &str) -> PokemonRecord {
    PokemonRecord {
        id,
        name: name.to_string(),
        height: 7,
        weight: 69,
        types: vec!["grass".to_string(), "poison".to_string()],
        sprite_url: api::fallback_sprite_url(id),
        flavor_text: Some("A strange seed was planted on its back at birth.".to_string()),
    }
}

fn catalog(names: &[&str]) -> Vec<SpeciesEntry> {
    names
        .iter()
        .map(|name| SpeciesEntry {
            name: name.to_string(),
        })
        .collect()
}

fn stage(name: &str, id: &str) -> EvolutionStage {
    EvolutionStage {
        name: name.to_string(),
        id: id.to_string(),
    }
}

fn store() -> EffectStore<AppState, Action, Effect> {
    EffectStore::new(AppState::default(), reducer)
}

#[test]
fn init_requests_catalog_and_first_batch() {
    let mut store = store();

    let result = store.dispatch(Action::Init);
    assert!(result.changed);
    assert_eq!(
        result.effects,
        vec![
            Effect::LoadCatalog,
            Effect::LoadBatch {
                start_id: 1,
                count: BATCH_SIZE,
                seq: 1,
            },
        ]
    );
    assert!(store.state().catalog_loading);
    assert!(store.state().batch_loading);
    // The cursor moves at submission time, not on arrival.
    assert_eq!(store.state().next_id, 1 + BATCH_SIZE);
}

#[test]
fn batch_results_append_and_stale_batches_are_dropped() {
    let mut store = store();
    store.dispatch(Action::Init);

    let result = store.dispatch(Action::BatchDidLoad {
        seq: 1,
        records: vec![record(1, "bulbasaur"), record(2, "ivysaur")],
        dropped: 0,
    });
    assert!(result.changed);
    assert_eq!(store.state().records.len(), 2);
    assert!(!store.state().batch_loading);
    // First arrival selects row 0, which fetches its sprite and evolutions.
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::LoadSprite { id: 1, .. })));
    assert!(result
        .effects
        .contains(&Effect::LoadEvolution { id: "1".to_string() }));

    // A completion from a superseded generation must not touch the list.
    let stale = store.dispatch(Action::BatchDidLoad {
        seq: 0,
        records: vec![record(99, "kecleon")],
        dropped: 0,
    });
    assert!(!stale.changed);
    assert_eq!(store.state().records.len(), 2);
}

#[test]
fn batch_reports_dropped_records() {
    let mut store = store();
    store.dispatch(Action::Init);

    store.dispatch(Action::BatchDidLoad {
        seq: 1,
        records: vec![record(1, "bulbasaur")],
        dropped: 3,
    });
    assert_eq!(
        store.state().message.as_deref(),
        Some("3 Pokémon failed to load")
    );
}

#[test]
fn scrolling_near_the_end_requests_the_next_batch() {
    let mut store = store();
    store.dispatch(Action::Init);
    let records: Vec<_> = (1..=BATCH_SIZE)
        .map(|id| record(id, &format!("mon-{id}")))
        .collect();
    store.dispatch(Action::BatchDidLoad {
        seq: 1,
        records,
        dropped: 0,
    });

    let result = store.dispatch(Action::Select(19));
    assert!(result.effects.iter().any(|effect| matches!(
        effect,
        Effect::LoadBatch {
            start_id,
            seq: 2,
            ..
        } if *start_id == 1 + BATCH_SIZE
    )));
}

#[test]
fn invalid_query_sets_message_without_effects() {
    let mut store = store();
    store.dispatch(Action::CatalogDidLoad(catalog(&["pikachu"])));
    store.dispatch(Action::SearchStart);
    for ch in "pika chu".chars() {
        store.dispatch(Action::SearchInput(ch));
    }

    let result = store.dispatch(Action::SearchSubmit);
    assert!(result.effects.is_empty());
    assert_eq!(
        store.state().message.as_deref(),
        Some(ApiError::InvalidInput.to_string().as_str())
    );
    assert!(!store.state().search.active);
}

#[test]
fn prefix_search_before_catalog_arrival_is_not_a_miss() {
    let mut store = store();
    store.dispatch(Action::SearchStart);
    store.dispatch(Action::SearchInput('p'));

    let result = store.dispatch(Action::SearchSubmit);
    assert!(result.effects.is_empty());
    assert_eq!(
        store.state().message.as_deref(),
        Some("Name list is still loading — try again shortly")
    );
}

#[test]
fn numeric_query_works_without_a_catalog() {
    let mut store = store();
    store.dispatch(Action::SearchStart);
    for ch in "25".chars() {
        store.dispatch(Action::SearchInput(ch));
    }

    let result = store.dispatch(Action::SearchSubmit);
    assert_eq!(
        result.effects,
        vec![Effect::RunSearch {
            plan: SearchPlan::ById(25),
            seq: 1,
        }]
    );
    assert!(store.state().search_loading);
}

#[test]
fn prefix_search_runs_against_the_catalog_and_ignores_stale_results() {
    let mut store = store();
    store.dispatch(Action::CatalogDidLoad(catalog(&[
        "bulbasaur",
        "ivysaur",
        "pikachu",
        "pidgey",
    ])));
    store.dispatch(Action::SearchStart);
    for ch in "pi".chars() {
        store.dispatch(Action::SearchInput(ch));
    }

    let result = store.dispatch(Action::SearchSubmit);
    assert_eq!(
        result.effects,
        vec![Effect::RunSearch {
            plan: SearchPlan::ByNames(vec!["pikachu".to_string(), "pidgey".to_string()]),
            seq: 1,
        }]
    );

    // An error from an earlier submission must not clobber this one.
    let stale = store.dispatch(Action::SearchDidError {
        seq: 0,
        error: ApiError::NoMatches,
    });
    assert!(!stale.changed);
    assert!(store.state().search_loading);

    store.dispatch(Action::SearchDidLoad {
        seq: 1,
        records: vec![record(25, "pikachu"), record(16, "pidgey")],
    });
    assert!(!store.state().search_loading);
    assert_eq!(store.state().visible_records().len(), 2);
    assert_eq!(store.state().selected_index, 0);
}

#[test]
fn clearing_a_search_restores_the_browse_list() {
    let mut store = store();
    store.dispatch(Action::Init);
    store.dispatch(Action::BatchDidLoad {
        seq: 1,
        records: vec![record(1, "bulbasaur"), record(2, "ivysaur")],
        dropped: 0,
    });
    store.dispatch(Action::SearchDidLoad {
        seq: 0,
        records: vec![record(25, "pikachu")],
    });
    // seq 0 is current before any submission, so the result lands.
    assert_eq!(store.state().visible_records().len(), 1);

    let result = store.dispatch(Action::SearchClear);
    assert!(result.changed);
    assert_eq!(store.state().visible_records().len(), 2);
    assert_eq!(store.state().selected_index, 0);
    assert!(store.state().search_results.is_none());
}

#[test]
fn random_pick_shares_the_search_generation() {
    let mut store = store();

    let result = store.dispatch(Action::RandomPick);
    assert_eq!(
        result.effects,
        vec![Effect::LoadRandom {
            max_id: MAX_POKEMON_ID,
            seq: 1,
        }]
    );

    let stale = store.dispatch(Action::RandomDidLoad {
        seq: 0,
        record: record(150, "mewtwo"),
    });
    assert!(!stale.changed);

    store.dispatch(Action::RandomDidLoad {
        seq: 1,
        record: record(150, "mewtwo"),
    });
    assert_eq!(store.state().visible_records().len(), 1);
    assert_eq!(store.state().visible_records()[0].name, "mewtwo");
}

#[test]
fn evolution_jump_fetches_the_chosen_stage_by_id() {
    let mut store = store();
    store.dispatch(Action::Init);
    store.dispatch(Action::BatchDidLoad {
        seq: 1,
        records: vec![record(1, "bulbasaur")],
        dropped: 0,
    });
    store.dispatch(Action::EvolutionDidLoad {
        id: "1".to_string(),
        stages: vec![
            stage("bulbasaur", "1"),
            stage("ivysaur", "2"),
            stage("venusaur", "3"),
        ],
    });
    assert_eq!(store.state().evolution_selected_index, 0);

    let result = store.dispatch(Action::EvolutionJump(2));
    assert_eq!(
        result.effects,
        vec![Effect::RunSearch {
            plan: SearchPlan::ById(3),
            seq: 1,
        }]
    );

    // Jumping to the stage already shown is a no-op.
    store.dispatch(Action::SearchDidLoad {
        seq: 1,
        records: vec![record(3, "venusaur")],
    });
    let noop = store.dispatch(Action::EvolutionJump(0));
    assert!(noop.effects.is_empty());
}

#[test]
fn missing_flavor_text_triggers_a_single_refresh() {
    let mut store = store();
    store.dispatch(Action::Init);
    let mut bare = record(1, "bulbasaur");
    bare.flavor_text = None;

    // Selecting a flavorless record requests the species join right away.
    let arrival = store.dispatch(Action::BatchDidLoad {
        seq: 1,
        records: vec![bare, record(2, "ivysaur")],
        dropped: 0,
    });
    assert!(arrival.effects.contains(&Effect::RefreshRecord { id: 1 }));

    // Re-selecting must not ask again, even while flavor is still missing.
    store.dispatch(Action::Select(1));
    let again = store.dispatch(Action::Select(0));
    assert!(!again
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::RefreshRecord { .. })));
    // The complete record has flavor text, so no further joins either.
    store.dispatch(Action::Select(1));
    let other = store.dispatch(Action::Select(0));
    assert!(!other
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::RefreshRecord { .. })));
}

#[test]
fn refreshed_records_replace_by_id() {
    let mut store = store();
    store.dispatch(Action::Init);
    let mut bare = record(1, "bulbasaur");
    bare.flavor_text = None;
    store.dispatch(Action::BatchDidLoad {
        seq: 1,
        records: vec![bare],
        dropped: 0,
    });

    let refreshed = record(1, "bulbasaur");
    store.dispatch(Action::RecordDidRefresh(refreshed.clone()));
    assert_eq!(store.state().records[0], refreshed);

    // A refresh for a record no longer present is ignored.
    let gone = store.dispatch(Action::RecordDidRefresh(record(7, "squirtle")));
    assert!(!gone.changed);
}

#[test]
fn focus_cycles_through_the_three_panes() {
    let mut store = store();
    assert_eq!(store.state().focus, FocusArea::List);
    store.dispatch(Action::FocusNext);
    assert_eq!(store.state().focus, FocusArea::Detail);
    store.dispatch(Action::FocusNext);
    assert_eq!(store.state().focus, FocusArea::Evolution);
    store.dispatch(Action::FocusNext);
    assert_eq!(store.state().focus, FocusArea::List);
    store.dispatch(Action::FocusPrev);
    assert_eq!(store.state().focus, FocusArea::Evolution);
}

#[test]
fn focus_is_locked_while_searching() {
    let mut store = store();
    store.dispatch(Action::SearchStart);
    let result = store.dispatch(Action::FocusNext);
    assert!(!result.changed);
    assert_eq!(store.state().focus, FocusArea::List);
}

#[test]
fn batch_cursor_stops_at_the_dex_bound() {
    let mut store = store();
    store.dispatch(Action::Init);
    store.state_mut().next_id = MAX_POKEMON_ID + 1;
    store.state_mut().batch_loading = false;

    let result = store.dispatch(Action::LoadMore);
    assert!(!result.changed);
    assert!(result.effects.is_empty());
}
