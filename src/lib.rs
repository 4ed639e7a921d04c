//! Networkk Search - listing search-and-filter engine for the Networkk marketplace
//!
//! Turns the flat listing collection returned by the backend into a ranked,
//! filtered result set for the user's current criteria and location, and
//! recomputes it with a debounce whenever any of those inputs change.

pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use crate::core::{haversine_distance, filter_records, rank_records, normalize_record, SearchEngine};
pub use crate::models::{Coordinate, Criteria, CriteriaUpdate, RawServiceRecord, ResultSet, ServiceRecord, SortKey, SortOrder};
pub use crate::session::{SearchSession, SessionError, SessionOptions, SessionView};
