use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::sprite::SpriteImage;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub active: bool,
    pub query: String,
}

/// One entry of the session-wide species name catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub name: String,
}

/// Normalized creature record. Built fresh on every fetch and never mutated
/// in place; a re-fetch supersedes the old value wholesale.
///
/// `types` is already flattened from the API's `{type:{name}}` wrappers, so
/// display and color mapping never see the raw wire shape. `flavor_text` is
/// only present when the species metadata join succeeded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub id: u32,
    pub name: String,
    /// Decimeters, as reported by the API. Display divides by 10.
    pub height: u16,
    /// Decigrams, as reported by the API. Display divides by 10.
    pub weight: u16,
    pub types: Vec<String>,
    pub sprite_url: String,
    pub flavor_text: Option<String>,
}

/// One node of a resolved evolution sequence, in walk order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStage {
    pub name: String,
    pub id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum FocusArea {
    List,
    Detail,
    Evolution,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub focus: FocusArea,

    /// Species name catalog, loaded once per session; write-once read-many.
    /// Empty means prefix search is unavailable, not that no species exist.
    pub catalog: Vec<SpeciesEntry>,
    pub catalog_loading: bool,

    /// Accumulated browse list, append-only in ascending-id batches.
    pub records: Vec<PokemonRecord>,
    /// First id of the next batch; advanced at submission time.
    pub next_id: u32,
    pub batch_seq: u64,
    pub batch_loading: bool,

    pub search: SearchState,
    /// When set, the list pane shows these instead of the browse list.
    pub search_results: Option<Vec<PokemonRecord>>,
    pub search_seq: u64,
    pub search_loading: bool,

    pub selected_index: usize,
    pub flavor_scroll: u16,

    /// Resolved evolution sequences keyed by species id.
    pub evolution: HashMap<String, Vec<EvolutionStage>>,
    pub evolution_loading: bool,
    pub evolution_selected_index: usize,

    pub sprites: HashMap<u32, SpriteImage>,
    pub sprite_loading: bool,

    /// Ids whose species-metadata join was already attempted this session,
    /// so a failed soft join is not retried on every selection change.
    pub species_requested: HashSet<u32>,

    pub message: Option<String>,
    pub tick: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            terminal_size: (80, 24),
            focus: FocusArea::List,
            catalog: Vec::new(),
            catalog_loading: false,
            records: Vec::new(),
            next_id: 1,
            batch_seq: 0,
            batch_loading: false,
            search: SearchState::default(),
            search_results: None,
            search_seq: 0,
            search_loading: false,
            selected_index: 0,
            flavor_scroll: 0,
            evolution: HashMap::new(),
            evolution_loading: false,
            evolution_selected_index: 0,
            sprites: HashMap::new(),
            sprite_loading: false,
            species_requested: HashSet::new(),
            message: None,
            tick: 0,
        }
    }
}

impl AppState {
    /// Records currently shown in the list pane: search results when a
    /// search is active, the accumulated browse list otherwise.
    pub fn visible_records(&self) -> &[PokemonRecord] {
        match &self.search_results {
            Some(results) => results,
            None => &self.records,
        }
    }

    pub fn current_record(&self) -> Option<&PokemonRecord> {
        self.visible_records().get(self.selected_index)
    }

    pub fn set_selected_index(&mut self, index: usize) -> bool {
        let len = self.visible_records().len();
        if len == 0 {
            self.selected_index = 0;
            return false;
        }
        let bounded = index.min(len - 1);
        if bounded != self.selected_index {
            self.selected_index = bounded;
            return true;
        }
        false
    }

    pub fn current_evolution(&self) -> Option<&Vec<EvolutionStage>> {
        let record = self.current_record()?;
        self.evolution.get(&record.id.to_string())
    }

    pub fn reset_detail_view(&mut self) {
        self.flavor_scroll = 0;
        self.evolution_selected_index = 0;
    }

    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            FocusArea::List => FocusArea::Detail,
            FocusArea::Detail => FocusArea::Evolution,
            FocusArea::Evolution => FocusArea::List,
        };
    }

    pub fn focus_prev(&mut self) {
        self.focus = match self.focus {
            FocusArea::List => FocusArea::Evolution,
            FocusArea::Detail => FocusArea::List,
            FocusArea::Evolution => FocusArea::Detail,
        };
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        vec![
            DebugSection::new("List")
                .entry("records", ron_string(&self.records.len()))
                .entry("next_id", ron_string(&self.next_id))
                .entry("selected", ron_string(&self.selected_index))
                .entry(
                    "results",
                    ron_string(&self.search_results.as_ref().map(|results| results.len())),
                )
                .entry("focus", ron_string(&self.focus)),
            DebugSection::new("Search")
                .entry("query", ron_string(&self.search.query))
                .entry("active", ron_string(&self.search.active))
                .entry("catalog", ron_string(&self.catalog.len()))
                .entry("search_seq", ron_string(&self.search_seq))
                .entry("batch_seq", ron_string(&self.batch_seq)),
            DebugSection::new("Status")
                .entry("catalog_loading", ron_string(&self.catalog_loading))
                .entry("batch_loading", ron_string(&self.batch_loading))
                .entry("search_loading", ron_string(&self.search_loading))
                .entry("evolution_loading", ron_string(&self.evolution_loading))
                .entry("sprite_loading", ron_string(&self.sprite_loading))
                .entry("message", ron_string(&self.message)),
        ]
    }
}
