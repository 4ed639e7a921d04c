// Core algorithm exports
pub mod distance;
pub mod engine;
pub mod filters;
pub mod normalizer;
pub mod ranking;

pub use distance::{haversine_distance, is_within_radius};
pub use engine::SearchEngine;
pub use filters::{filter_records, first_rejection, matches_criteria, FilterContext, Predicate};
pub use normalizer::{normalize_batch, normalize_record, FieldAnomaly, Normalized, NormalizedBatch};
pub use ranking::rank_records;
