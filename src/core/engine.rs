use crate::core::{
    filters::filter_records,
    normalizer::normalize_batch,
    ranking::rank_records,
};
use crate::models::{Coordinate, Criteria, RawServiceRecord, ResultSet, ServiceRecord};

/// Search orchestrator - runs the filter and ranking stages
///
/// # Pipeline Stages
/// 1. Normalization of backend listings (see [`SearchEngine::search_raw`])
/// 2. Predicate filtering
/// 3. Ranking by the selected sort key
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchEngine;

impl SearchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Filter and rank already-normalized records
    ///
    /// `version` is stamped on the result so consumers can tell which
    /// criteria generation it reflects.
    pub fn search(
        &self,
        records: &[ServiceRecord],
        criteria: &Criteria,
        origin: Option<Coordinate>,
        version: u64,
    ) -> ResultSet {
        let total_candidates = records.len();

        let filtered = filter_records(records, criteria, origin);
        let ranked = rank_records(filtered, criteria.sort_by, criteria.sort_order);

        tracing::debug!(
            "Search v{} kept {} of {} listings (sort: {} {})",
            version,
            ranked.len(),
            total_candidates,
            criteria.sort_by,
            criteria.sort_order
        );

        ResultSet {
            version,
            records: ranked,
            origin,
            total_candidates,
            computed_at: chrono::Utc::now(),
        }
    }

    /// Normalize backend listings, then filter and rank them
    pub fn search_raw(
        &self,
        raws: &[RawServiceRecord],
        criteria: &Criteria,
        origin: Option<Coordinate>,
        version: u64,
    ) -> ResultSet {
        let batch = normalize_batch(raws);
        let mut result = self.search(&batch.records, criteria, origin, version);
        result.total_candidates = raws.len();
        result
    }
}
