pub mod generation_sample;
pub mod generation_table;

pub use generation_sample::GenerationSample;
pub use generation_table::GenerationTable;
