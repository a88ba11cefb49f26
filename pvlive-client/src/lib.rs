pub mod api;
pub mod domain;

pub use api::{EntityType, PvLive, PvLiveConfig, PvLiveError};
pub use domain::{GenerationSample, GenerationTable};
