pub mod engine;
pub mod fallback;
pub mod fetcher;
pub mod providers;
pub mod ranking;
pub mod seeds;
pub mod thematic;

pub use engine::{EngineSettings, RecommendationEngine, RecomputeHandle, SlotSnapshot};
