pub mod pvlive;

pub use pvlive::{EntityType, PvLive, PvLiveConfig, PvLiveError, DEFAULT_BASE_URL};
