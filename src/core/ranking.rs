use std::cmp::Ordering;

use crate::models::{ServiceRecord, SortKey, SortOrder};

/// Order two prices, treating an unspecified price as negative infinity
///
/// Unpriced listings therefore lead an ascending sort and trail a
/// descending one.
#[inline]
pub fn compare_price(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    let a = a.unwrap_or(f64::NEG_INFINITY);
    let b = b.unwrap_or(f64::NEG_INFINITY);

    match order {
        SortOrder::Asc => a.total_cmp(&b),
        SortOrder::Desc => b.total_cmp(&a),
    }
}

/// Highest rating first. Sort order is ignored for ratings.
#[inline]
pub fn compare_rating(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Sort records by the chosen key
///
/// The sort is stable: records that compare equal keep their input order.
pub fn rank_records(
    mut records: Vec<ServiceRecord>,
    sort_by: SortKey,
    sort_order: SortOrder,
) -> Vec<ServiceRecord> {
    match sort_by {
        SortKey::Price => {
            records.sort_by(|a, b| compare_price(a.base_price, b.base_price, sort_order));
        }
        SortKey::Rating => {
            records.sort_by(|a, b| compare_rating(a.avg_rating, b.avg_rating));
        }
    }

    records
}
