use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::api::{self, ApiError, SearchPlan, BATCH_SIZE, MAX_POKEMON_ID};
use crate::effect::Effect;
use crate::state::AppState;

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => {
            state.catalog_loading = true;
            state.message = None;
            let mut effects = vec![Effect::LoadCatalog];
            effects.extend(submit_batch(state));
            DispatchResult::changed_with_many(effects)
        }

        Action::CatalogDidLoad(entries) => {
            state.catalog_loading = false;
            // Write-once: a second load never replaces the session catalog.
            if !state.catalog.is_empty() {
                return DispatchResult::unchanged();
            }
            state.catalog = entries;
            DispatchResult::changed()
        }

        Action::CatalogDidError(error) => {
            state.catalog_loading = false;
            state.message = Some(format!("Name list error: {error}"));
            DispatchResult::changed()
        }

        Action::LoadMore => {
            if state.search_results.is_some() {
                return DispatchResult::unchanged();
            }
            let effects = submit_batch(state);
            if effects.is_empty() {
                DispatchResult::unchanged()
            } else {
                DispatchResult::changed_with_many(effects)
            }
        }

        Action::BatchDidLoad {
            seq,
            records,
            dropped,
        } => {
            if seq != state.batch_seq {
                return DispatchResult::unchanged();
            }
            state.batch_loading = false;
            if dropped > 0 {
                state.message = Some(format!("{dropped} Pokémon failed to load"));
            }
            let first_arrival = state.records.is_empty();
            state.records.extend(records);
            let mut effects = Vec::new();
            if first_arrival && state.search_results.is_none() {
                effects.extend(select_current(state));
            }
            if effects.is_empty() {
                DispatchResult::changed()
            } else {
                DispatchResult::changed_with_many(effects)
            }
        }

        Action::FocusNext => {
            if state.search.active {
                return DispatchResult::unchanged();
            }
            state.focus_next();
            DispatchResult::changed()
        }

        Action::FocusPrev => {
            if state.search.active {
                return DispatchResult::unchanged();
            }
            state.focus_prev();
            DispatchResult::changed()
        }

        Action::FocusSet(area) => {
            if state.search.active || state.focus == area {
                return DispatchResult::unchanged();
            }
            state.focus = area;
            DispatchResult::changed()
        }

        Action::SelectionMove(delta) => {
            let mut index = state.selected_index as i16 + delta;
            if index < 0 {
                index = 0;
            }
            move_selection(state, index as usize)
        }

        Action::SelectionPage(delta) => {
            let page = list_page_size(state) as i16;
            let mut index = state.selected_index as i16 + delta * page;
            if index < 0 {
                index = 0;
            }
            move_selection(state, index as usize)
        }

        Action::Select(index) => move_selection(state, index),

        Action::SearchStart => {
            state.search.active = true;
            state.search.query.clear();
            DispatchResult::changed()
        }

        Action::SearchCancel => {
            if !state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.active = false;
            state.search.query.clear();
            DispatchResult::changed()
        }

        Action::SearchInput(ch) => {
            state.search.query.push(ch);
            DispatchResult::changed()
        }

        Action::SearchBackspace => {
            state.search.query.pop();
            DispatchResult::changed()
        }

        Action::SearchSubmit => {
            state.search.active = false;
            match api::plan_search(&state.catalog, &state.search.query) {
                Ok(plan) => {
                    state.search_seq += 1;
                    state.search_loading = true;
                    state.message = None;
                    DispatchResult::changed_with(Effect::RunSearch {
                        plan,
                        seq: state.search_seq,
                    })
                }
                Err(ApiError::NoMatches) if state.catalog.is_empty() => {
                    // The catalog never loaded (or has not finished); this is
                    // "search unavailable", not "no such Pokémon".
                    state.message =
                        Some("Name list is still loading — try again shortly".to_string());
                    DispatchResult::changed()
                }
                Err(error) => {
                    state.message = Some(error.to_string());
                    DispatchResult::changed()
                }
            }
        }

        Action::SearchClear => {
            if state.search_results.is_none() {
                return DispatchResult::unchanged();
            }
            state.search_results = None;
            state.selected_index = 0;
            state.reset_detail_view();
            state.message = None;
            let effects = select_current(state);
            if effects.is_empty() {
                DispatchResult::changed()
            } else {
                DispatchResult::changed_with_many(effects)
            }
        }

        Action::SearchDidLoad { seq, records } => {
            if seq != state.search_seq {
                return DispatchResult::unchanged();
            }
            state.search_loading = false;
            state.search_results = Some(records);
            state.selected_index = 0;
            state.reset_detail_view();
            let effects = select_current(state);
            if effects.is_empty() {
                DispatchResult::changed()
            } else {
                DispatchResult::changed_with_many(effects)
            }
        }

        Action::SearchDidError { seq, error } => {
            if seq != state.search_seq {
                return DispatchResult::unchanged();
            }
            state.search_loading = false;
            state.message = Some(error.to_string());
            DispatchResult::changed()
        }

        Action::RandomPick => {
            state.search_seq += 1;
            state.search_loading = true;
            state.message = None;
            DispatchResult::changed_with(Effect::LoadRandom {
                max_id: MAX_POKEMON_ID,
                seq: state.search_seq,
            })
        }

        Action::RandomDidLoad { seq, record } => {
            if seq != state.search_seq {
                return DispatchResult::unchanged();
            }
            state.search_loading = false;
            state.search_results = Some(vec![record]);
            state.selected_index = 0;
            state.reset_detail_view();
            let effects = select_current(state);
            if effects.is_empty() {
                DispatchResult::changed()
            } else {
                DispatchResult::changed_with_many(effects)
            }
        }

        Action::RandomDidError { seq, error } => {
            if seq != state.search_seq {
                return DispatchResult::unchanged();
            }
            state.search_loading = false;
            state.message = Some(format!("Random pick failed: {error}"));
            DispatchResult::changed()
        }

        Action::EvolutionDidLoad { id, stages } => {
            state.evolution_loading = false;
            state.evolution.insert(id, stages);
            if let Some(name) = state.current_record().map(|record| record.name.clone()) {
                sync_evolution_selection(state, &name);
            }
            DispatchResult::changed()
        }

        Action::EvolutionDidError { id: _, error } => {
            state.evolution_loading = false;
            state.message = Some(format!("Evolution error: {error}"));
            DispatchResult::changed()
        }

        Action::EvolutionSelect(index) => {
            let Some(count) = state.current_evolution().map(|stages| stages.len()) else {
                return DispatchResult::unchanged();
            };
            if count == 0 {
                return DispatchResult::unchanged();
            }
            let bounded = index.min(count - 1);
            if bounded == state.evolution_selected_index {
                return DispatchResult::unchanged();
            }
            state.evolution_selected_index = bounded;
            DispatchResult::changed()
        }

        Action::EvolutionJump(index) => {
            let Some(stage) = state
                .current_evolution()
                .and_then(|stages| stages.get(index))
                .cloned()
            else {
                return DispatchResult::unchanged();
            };
            let Ok(id) = stage.id.parse::<u32>() else {
                return DispatchResult::unchanged();
            };
            if state.current_record().map(|record| record.id) == Some(id) {
                return DispatchResult::unchanged();
            }
            state.evolution_selected_index = index;
            state.search_seq += 1;
            state.search_loading = true;
            DispatchResult::changed_with(Effect::RunSearch {
                plan: SearchPlan::ById(id),
                seq: state.search_seq,
            })
        }

        Action::RecordDidRefresh(record) => {
            let mut replaced = false;
            if let Some(slot) = state
                .records
                .iter_mut()
                .find(|existing| existing.id == record.id)
            {
                *slot = record.clone();
                replaced = true;
            }
            if let Some(results) = state.search_results.as_mut() {
                if let Some(slot) = results.iter_mut().find(|existing| existing.id == record.id) {
                    *slot = record.clone();
                    replaced = true;
                }
            }
            if replaced {
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::RecordRefreshDidError { id, error } => {
            state.message = Some(format!("#{id} details error: {error}"));
            DispatchResult::changed()
        }

        Action::SpriteDidLoad { id, sprite } => {
            state.sprites.insert(id, sprite);
            state.sprite_loading = false;
            DispatchResult::changed()
        }

        Action::SpriteDidError { id, error } => {
            state.sprite_loading = false;
            state.message = Some(format!("Sprite #{id} error: {error}"));
            DispatchResult::changed()
        }

        Action::FlavorScroll(delta) => {
            let next = if delta < 0 {
                state.flavor_scroll.saturating_sub(delta.unsigned_abs())
            } else {
                state.flavor_scroll.saturating_add(delta as u16)
            };
            if next == state.flavor_scroll {
                return DispatchResult::unchanged();
            }
            state.flavor_scroll = next;
            DispatchResult::changed()
        }

        Action::UiTerminalResize(width, height) => {
            state.terminal_size = (width, height);
            DispatchResult::changed()
        }

        Action::Tick => {
            state.tick = state.tick.wrapping_add(1);
            if state.batch_loading
                || state.search_loading
                || state.catalog_loading
                || state.evolution_loading
                || state.sprite_loading
            {
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

/// Starts the next browse batch unless one is in flight or the dex is
/// exhausted. The cursor advances at submission time; the caller side of the
/// range contract means batches never overlap.
fn submit_batch(state: &mut AppState) -> Vec<Effect> {
    if state.batch_loading || state.next_id > MAX_POKEMON_ID {
        return Vec::new();
    }
    state.batch_seq += 1;
    state.batch_loading = true;
    let start_id = state.next_id;
    state.next_id = state.next_id.saturating_add(BATCH_SIZE);
    vec![Effect::LoadBatch {
        start_id,
        count: BATCH_SIZE,
        seq: state.batch_seq,
    }]
}

fn move_selection(state: &mut AppState, index: usize) -> DispatchResult<Effect> {
    let changed = state.set_selected_index(index);
    let mut effects = Vec::new();
    if changed {
        state.reset_detail_view();
        effects.extend(select_current(state));
    }
    // Browse mode grows the list when the cursor nears the end, the
    // scroll-to-end contract of the original list.
    if state.search_results.is_none() {
        let len = state.records.len();
        if len > 0 && state.selected_index + (BATCH_SIZE as usize / 2) >= len {
            effects.extend(submit_batch(state));
        }
    }
    if !changed && effects.is_empty() {
        return DispatchResult::unchanged();
    }
    if effects.is_empty() {
        DispatchResult::changed()
    } else {
        DispatchResult::changed_with_many(effects)
    }
}

/// Follow-up fetches for the newly selected record: sprite, evolution
/// sequence, and the soft species join when flavor text is still missing.
fn select_current(state: &mut AppState) -> Vec<Effect> {
    let Some(record) = state.current_record().cloned() else {
        return Vec::new();
    };
    let mut effects = Vec::new();

    if !state.sprites.contains_key(&record.id) {
        state.sprite_loading = true;
        effects.push(Effect::LoadSprite {
            id: record.id,
            url: record.sprite_url.clone(),
        });
    }

    let chain_key = record.id.to_string();
    if state.evolution.contains_key(&chain_key) {
        sync_evolution_selection(state, &record.name);
    } else {
        state.evolution_loading = true;
        effects.push(Effect::LoadEvolution { id: chain_key });
    }

    if record.flavor_text.is_none() && state.species_requested.insert(record.id) {
        effects.push(Effect::RefreshRecord { id: record.id });
    }

    effects
}

fn sync_evolution_selection(state: &mut AppState, name: &str) {
    let index = state
        .current_evolution()
        .and_then(|stages| stages.iter().position(|stage| stage.name == name));
    if let Some(index) = index {
        state.evolution_selected_index = index;
    }
}

fn list_page_size(state: &AppState) -> usize {
    state.terminal_size.1.saturating_sub(8) as usize
}
