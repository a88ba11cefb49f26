pub mod pvlive;

pub use pvlive::PvLiveSource;
