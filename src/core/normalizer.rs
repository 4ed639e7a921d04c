//! Total conversion from backend listings to [`ServiceRecord`]s.
//!
//! Nothing in here fails: malformed fields fall back to a safe default and
//! are reported as [`FieldAnomaly`]s, and records that break a hard
//! invariant (no id, no accepted status) are excluded with a reason.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::models::{Coordinate, LifecycleStatus, ProviderRef, RawProvider, RawServiceRecord, ServiceRecord};

/// Field that could not be read as sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyField {
    Holidays,
    Coordinate,
    BasePrice,
    Rating,
    OpenFlag,
    Category,
    Description,
    Locality,
    Provider,
    FirstName,
    LastName,
}

impl fmt::Display for AnomalyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Holidays => "holidays",
            Self::Coordinate => "coordinate",
            Self::BasePrice => "basePrice",
            Self::Rating => "avgRating",
            Self::OpenFlag => "isOpen",
            Self::Category => "category",
            Self::Description => "description",
            Self::Locality => "locality",
            Self::Provider => "serviceProvider",
            Self::FirstName => "fname",
            Self::LastName => "lname",
        };
        f.write_str(name)
    }
}

/// A malformed field that was replaced by its default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAnomaly {
    pub record_id: String,
    pub field: AnomalyField,
    pub detail: String,
}

/// Why a listing never reaches the filter pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    MissingId,
    MissingStatus,
    UnknownStatus(String),
    NotAccepted(LifecycleStatus),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => f.write_str("missing serviceId"),
            Self::MissingStatus => f.write_str("missing status"),
            Self::UnknownStatus(status) => write!(f, "unknown status {:?}", status),
            Self::NotAccepted(status) => write!(f, "status is {:?}", status),
        }
    }
}

/// Outcome of normalizing one listing
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record {
        record: ServiceRecord,
        anomalies: Vec<FieldAnomaly>,
    },
    Excluded(Exclusion),
}

impl Normalized {
    pub fn record(&self) -> Option<&ServiceRecord> {
        match self {
            Self::Record { record, .. } => Some(record),
            Self::Excluded(_) => None,
        }
    }
}

/// Result of normalizing a whole fetch
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Eligible records, in input order
    pub records: Vec<ServiceRecord>,
    pub excluded: usize,
    pub anomalies: Vec<FieldAnomaly>,
}

/// Normalize a single listing
pub fn normalize_record(raw: &RawServiceRecord) -> Normalized {
    let Some(id) = raw.service_id.as_ref().and_then(parse_id) else {
        return Normalized::Excluded(Exclusion::MissingId);
    };

    let status = match raw.status.as_ref() {
        None | Some(Value::Null) => return Normalized::Excluded(Exclusion::MissingStatus),
        Some(Value::String(s)) => match LifecycleStatus::parse(s) {
            Some(status) => status,
            None => return Normalized::Excluded(Exclusion::UnknownStatus(s.to_string())),
        },
        Some(other) => return Normalized::Excluded(Exclusion::UnknownStatus(other.to_string())),
    };
    if status != LifecycleStatus::Accepted {
        return Normalized::Excluded(Exclusion::NotAccepted(status));
    }

    let mut anomalies = Vec::new();
    let mut note = |field: AnomalyField, detail: String| {
        tracing::warn!("Malformed {} on service {}: {}", field, id, detail);
        anomalies.push(FieldAnomaly {
            record_id: id.clone(),
            field,
            detail,
        });
    };

    let holidays = match raw.holidays.as_ref() {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::String(s)) if s.trim().is_empty() => BTreeSet::new(),
        Some(value) => match parse_holidays(value) {
            Ok((dates, dropped)) => {
                if dropped > 0 {
                    note(AnomalyField::Holidays, format!("dropped {} non-string entries", dropped));
                }
                dates
            }
            Err(detail) => {
                note(AnomalyField::Holidays, detail);
                BTreeSet::new()
            }
        },
    };

    let base_price = match raw.base_price.as_ref() {
        None | Some(Value::Null) => None,
        Some(value) => match parse_number(value) {
            Some(price) if price >= 0.0 => Some(price),
            _ => {
                note(AnomalyField::BasePrice, format!("unusable price {}", value));
                None
            }
        },
    };

    let avg_rating = match raw.avg_rating.as_ref() {
        None | Some(Value::Null) => 0.0,
        Some(value) => parse_number(value).unwrap_or_else(|| {
            note(AnomalyField::Rating, format!("unusable rating {}", value));
            0.0
        }),
    };

    let is_open = match raw.is_open.as_ref() {
        None | Some(Value::Null) => false,
        Some(value) => parse_flag(value).unwrap_or_else(|| {
            note(AnomalyField::OpenFlag, format!("unusable flag {}", value));
            false
        }),
    };

    let category = parse_text(raw.category.as_ref(), AnomalyField::Category, &mut note);
    let description = parse_text(raw.description.as_ref(), AnomalyField::Description, &mut note);
    let locality = parse_text(raw.locality.as_ref(), AnomalyField::Locality, &mut note);

    let provider = match raw.service_provider.as_ref() {
        None | Some(Value::Null) => RawProvider::default(),
        Some(value) => serde_json::from_value::<RawProvider>(value.clone()).unwrap_or_else(|e| {
            note(AnomalyField::Provider, format!("unusable provider: {}", e));
            RawProvider::default()
        }),
    };
    let first_name = parse_text(provider.fname.as_ref(), AnomalyField::FirstName, &mut note);
    let last_name = parse_text(provider.lname.as_ref(), AnomalyField::LastName, &mut note);

    let coordinate = match (provider.latitude.as_ref(), provider.longitude.as_ref()) {
        (Some(lat), Some(lon)) if !lat.is_null() && !lon.is_null() => {
            let parsed = parse_number(lat)
                .zip(parse_number(lon))
                .and_then(|(lat, lon)| Coordinate::new(lat, lon));
            if parsed.is_none() {
                note(AnomalyField::Coordinate, format!("unusable position ({}, {})", lat, lon));
            }
            parsed
        }
        _ => None,
    };

    let record = ServiceRecord {
        id: id.clone(),
        category,
        description,
        base_price,
        is_open,
        avg_rating,
        locality,
        provider: ProviderRef {
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            coordinate,
        },
        holidays,
        status,
    };

    Normalized::Record { record, anomalies }
}

/// Normalize every listing of a fetch, keeping input order
pub fn normalize_batch(raws: &[RawServiceRecord]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for raw in raws {
        match normalize_record(raw) {
            Normalized::Record { record, anomalies } => {
                batch.records.push(record);
                batch.anomalies.extend(anomalies);
            }
            Normalized::Excluded(reason) => {
                tracing::debug!("Excluding listing: {}", reason);
                batch.excluded += 1;
            }
        }
    }

    tracing::debug!(
        "Normalized {} listings ({} excluded, {} anomalies)",
        batch.records.len(),
        batch.excluded,
        batch.anomalies.len()
    );

    batch
}

fn parse_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers may arrive as JSON numbers or numeric strings
fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Free text: strings as sent, numbers rendered as text
fn parse_text(
    value: Option<&Value>,
    field: AnomalyField,
    note: &mut impl FnMut(AnomalyField, String),
) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            note(field, format!("expected text, got {}", other));
            None
        }
    }
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Holidays arrive either as a JSON array or as a string holding one.
/// Returns the dates and how many non-string entries were dropped.
fn parse_holidays(value: &Value) -> Result<(BTreeSet<String>, usize), String> {
    let decoded;
    let items = match value {
        Value::Array(items) => items,
        Value::String(encoded) => {
            decoded = serde_json::from_str::<Value>(encoded)
                .map_err(|e| format!("not valid JSON: {}", e))?;
            match &decoded {
                Value::Array(items) => items,
                Value::Null => return Ok((BTreeSet::new(), 0)),
                other => return Err(format!("expected an array, got {}", other)),
            }
        }
        other => return Err(format!("expected an array, got {}", other)),
    };

    let mut dates = BTreeSet::new();
    let mut dropped = 0;
    for item in items {
        match item.as_str() {
            Some(date) => {
                dates.insert(date.to_string());
            }
            None => dropped += 1,
        }
    }

    Ok((dates, dropped))
}
