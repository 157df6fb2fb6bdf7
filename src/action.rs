use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::sprite::SpriteImage;
use crate::state::{EvolutionStage, FocusArea, PokemonRecord, SpeciesEntry};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,

    CatalogDidLoad(Vec<SpeciesEntry>),
    CatalogDidError(ApiError),

    LoadMore,
    BatchDidLoad {
        seq: u64,
        records: Vec<PokemonRecord>,
        dropped: usize,
    },

    FocusNext,
    FocusPrev,
    FocusSet(FocusArea),

    SelectionMove(i16),
    SelectionPage(i16),
    Select(usize),

    SearchStart,
    SearchCancel,
    SearchSubmit,
    SearchClear,
    SearchInput(char),
    SearchBackspace,
    SearchDidLoad {
        seq: u64,
        records: Vec<PokemonRecord>,
    },
    SearchDidError {
        seq: u64,
        error: ApiError,
    },

    RandomPick,
    RandomDidLoad {
        seq: u64,
        record: PokemonRecord,
    },
    RandomDidError {
        seq: u64,
        error: ApiError,
    },

    EvolutionDidLoad {
        id: String,
        stages: Vec<EvolutionStage>,
    },
    EvolutionDidError {
        id: String,
        error: ApiError,
    },
    EvolutionSelect(usize),
    EvolutionJump(usize),

    RecordDidRefresh(PokemonRecord),
    RecordRefreshDidError {
        id: u32,
        error: ApiError,
    },

    SpriteDidLoad {
        id: u32,
        sprite: SpriteImage,
    },
    SpriteDidError {
        id: u32,
        error: ApiError,
    },

    FlavorScroll(i16),

    UiTerminalResize(u16, u16),
    Tick,
    Quit,
}
