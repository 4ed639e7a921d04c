use crate::models::{Coordinate, Criteria, ServiceRecord};

/// One stage of the filter pipeline
///
/// Stages are independent of each other; [`PIPELINE_ORDER`] only fixes the
/// order in which a record is checked so evaluation can stop at the first
/// rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Lifecycle,
    OpenOnly,
    Holiday,
    Category,
    ProviderName,
    PriceRange,
    Distance,
    RatingFloor,
}

pub const PIPELINE_ORDER: [Predicate; 8] = [
    Predicate::Lifecycle,
    Predicate::OpenOnly,
    Predicate::Holiday,
    Predicate::Category,
    Predicate::ProviderName,
    Predicate::PriceRange,
    Predicate::Distance,
    Predicate::RatingFloor,
];

/// Criteria prepared once per pipeline run
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub criteria: &'a Criteria,
    pub origin: Option<Coordinate>,
    category_needle: String,
    name_needle: String,
}

impl<'a> FilterContext<'a> {
    /// Text filters are trimmed before matching: `"ravi "` searches for
    /// `"ravi"`, and a filter that is only whitespace is inactive.
    pub fn new(criteria: &'a Criteria, origin: Option<Coordinate>) -> Self {
        Self {
            criteria,
            origin,
            category_needle: criteria.category.trim().to_lowercase(),
            name_needle: criteria.name.trim().to_lowercase(),
        }
    }

    /// Predicates whose trigger condition holds for these criteria
    pub fn active_predicates(&self) -> Vec<Predicate> {
        PIPELINE_ORDER
            .iter()
            .copied()
            .filter(|p| p.is_active(self))
            .collect()
    }
}

impl Predicate {
    pub fn is_active(self, ctx: &FilterContext<'_>) -> bool {
        let criteria = ctx.criteria;
        match self {
            Predicate::Lifecycle => true,
            Predicate::OpenOnly => criteria.open_only,
            Predicate::Holiday => criteria.date.is_some(),
            Predicate::Category => !ctx.category_needle.is_empty(),
            Predicate::ProviderName => !ctx.name_needle.is_empty(),
            Predicate::PriceRange => criteria.min_price.is_some() || criteria.max_price.is_some(),
            // Without a user location there is nothing to measure against
            Predicate::Distance => ctx.origin.is_some() && criteria.max_distance_km.is_some(),
            Predicate::RatingFloor => criteria.min_rating.is_some(),
        }
    }

    /// Whether `record` passes this stage. Only meaningful when active.
    pub fn admits(self, record: &ServiceRecord, ctx: &FilterContext<'_>) -> bool {
        let criteria = ctx.criteria;
        match self {
            Predicate::Lifecycle => record.is_accepted(),
            Predicate::OpenOnly => record.is_open,
            Predicate::Holiday => match &criteria.date {
                Some(date) => !record.is_holiday(date),
                None => true,
            },
            Predicate::Category => record
                .category
                .as_deref()
                .is_some_and(|category| category.to_lowercase().contains(&ctx.category_needle)),
            Predicate::ProviderName => {
                record.provider.first_name.to_lowercase().contains(&ctx.name_needle)
                    || record.provider.last_name.to_lowercase().contains(&ctx.name_needle)
            }
            Predicate::PriceRange => matches_price_range(record.base_price, criteria),
            Predicate::Distance => match (ctx.origin, criteria.max_distance_km, record.coordinate()) {
                (Some(origin), Some(max_km), Some(point)) => {
                    super::distance::is_within_radius(&origin, &point, max_km)
                }
                // A record without a position never passes an active distance filter
                (Some(_), Some(_), None) => false,
                _ => true,
            },
            Predicate::RatingFloor => match criteria.min_rating {
                Some(min) => record.avg_rating >= min,
                None => true,
            },
        }
    }
}

/// An unspecified price never satisfies an explicit bound
#[inline]
fn matches_price_range(price: Option<f64>, criteria: &Criteria) -> bool {
    if criteria.min_price.is_none() && criteria.max_price.is_none() {
        return true;
    }

    let Some(price) = price else {
        return false;
    };

    if let Some(min) = criteria.min_price {
        if price < min {
            return false;
        }
    }

    if let Some(max) = criteria.max_price {
        if price > max {
            return false;
        }
    }

    true
}

/// First active predicate that rejects `record`, if any
pub fn first_rejection(record: &ServiceRecord, ctx: &FilterContext<'_>) -> Option<Predicate> {
    PIPELINE_ORDER
        .iter()
        .copied()
        .find(|p| p.is_active(ctx) && !p.admits(record, ctx))
}

/// Check a record against every active predicate
#[inline]
pub fn matches_criteria(record: &ServiceRecord, ctx: &FilterContext<'_>) -> bool {
    first_rejection(record, ctx).is_none()
}

/// Keep the records that pass every active predicate, preserving order
pub fn filter_records(
    records: &[ServiceRecord],
    criteria: &Criteria,
    origin: Option<Coordinate>,
) -> Vec<ServiceRecord> {
    let ctx = FilterContext::new(criteria, origin);
    let active = ctx.active_predicates();

    records
        .iter()
        .filter(|record| match active.iter().find(|p| !p.admits(record, &ctx)) {
            Some(predicate) => {
                tracing::trace!("Service {} rejected by {:?}", record.id, predicate);
                false
            }
            None => true,
        })
        .cloned()
        .collect()
}
