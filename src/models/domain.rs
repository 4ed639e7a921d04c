use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::core::distance::haversine_distance;

/// Geographic point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range degrees
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        valid.then_some(Self { latitude, longitude })
    }

    /// Great-circle distance to another point in kilometers
    #[inline]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(self, other)
    }
}

/// Moderation state of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Pending,
    Accepted,
    Rejected,
}

impl LifecycleStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Provider attached to a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRef {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    /// `None` when the backend sent no usable coordinates
    pub coordinate: Option<Coordinate>,
}

impl ProviderRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Canonical listing produced by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "basePrice")]
    pub base_price: Option<f64>,
    #[serde(rename = "isOpen")]
    pub is_open: bool,
    #[serde(rename = "avgRating")]
    pub avg_rating: f64,
    pub locality: Option<String>,
    pub provider: ProviderRef,
    pub holidays: BTreeSet<String>,
    pub status: LifecycleStatus,
}

impl ServiceRecord {
    pub fn is_accepted(&self) -> bool {
        self.status == LifecycleStatus::Accepted
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.provider.coordinate
    }

    pub fn is_holiday(&self, date: &str) -> bool {
        self.holidays.contains(date)
    }
}

/// Provider block as sent by the listings backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProvider {
    #[serde(default)]
    pub fname: Option<Value>,
    #[serde(default)]
    pub lname: Option<Value>,
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
}

/// Listing exactly as the backend returns it
///
/// Every field is kept as raw JSON and resolved by
/// [`crate::core::normalizer`], so a badly typed field never costs the
/// whole listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawServiceRecord {
    #[serde(rename = "serviceId", default)]
    pub service_id: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(rename = "basePrice", default)]
    pub base_price: Option<Value>,
    #[serde(rename = "isOpen", default)]
    pub is_open: Option<Value>,
    #[serde(rename = "avgRating", default)]
    pub avg_rating: Option<Value>,
    #[serde(default)]
    pub locality: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub holidays: Option<Value>,
    /// Decoded into a [`RawProvider`] during normalization
    #[serde(rename = "serviceProvider", default)]
    pub service_provider: Option<Value>,
}

/// Ranked, filtered output of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet {
    /// Scheduler version the result was computed for
    pub version: u64,
    pub records: Vec<ServiceRecord>,
    /// User location the distance predicate ran against, if any
    pub origin: Option<Coordinate>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
    #[serde(rename = "computedAt")]
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self {
            version: 0,
            records: Vec::new(),
            origin: None,
            total_candidates: 0,
            computed_at: chrono::Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Records paired with their distance from the origin, when both are known
    pub fn with_distances(&self) -> impl Iterator<Item = (&ServiceRecord, Option<f64>)> + '_ {
        self.records.iter().map(move |record| {
            let distance = match (self.origin, record.coordinate()) {
                (Some(origin), Some(coordinate)) => Some(origin.distance_to(&coordinate)),
                _ => None,
            };
            (record, distance)
        })
    }
}
