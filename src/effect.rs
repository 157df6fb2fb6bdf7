use crate::api::SearchPlan;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    LoadCatalog,
    LoadBatch { start_id: u32, count: u32, seq: u64 },
    RunSearch { plan: SearchPlan, seq: u64 },
    LoadRandom { max_id: u32, seq: u64 },
    LoadEvolution { id: String },
    RefreshRecord { id: u32 },
    LoadSprite { id: u32, url: String },
}
