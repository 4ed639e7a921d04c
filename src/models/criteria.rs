use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Default search radius in kilometers
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;

/// Date format used by the holiday lists
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Rating,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rating" => Ok(Self::Rating),
            "price" => Ok(Self::Price),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rating => f.write_str("rating"),
            Self::Price => f.write_str("price"),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// Filter and sort parameters chosen by the user
///
/// A `Criteria` value is never edited in place; the session store replaces
/// it wholesale on each accepted [`CriteriaUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Criteria {
    /// ISO date (`YYYY-MM-DD`) the user wants the service on
    #[validate(custom(function = "validate_iso_date"))]
    pub date: Option<String>,
    /// Free-text category filter, empty = inactive
    pub category: String,
    /// Free-text provider name filter, empty = inactive
    pub name: String,
    #[serde(rename = "minPrice")]
    #[validate(range(min = 0.0))]
    pub min_price: Option<f64>,
    #[serde(rename = "maxPrice")]
    #[validate(range(min = 0.0))]
    pub max_price: Option<f64>,
    #[serde(rename = "maxDistanceKm")]
    #[validate(range(min = 0.0))]
    pub max_distance_km: Option<f64>,
    #[serde(rename = "minRating")]
    #[validate(range(min = 0.0, max = 5.0))]
    pub min_rating: Option<f64>,
    #[serde(rename = "openOnly")]
    pub open_only: bool,
    #[serde(rename = "sortBy")]
    pub sort_by: SortKey,
    #[serde(rename = "sortOrder")]
    pub sort_order: SortOrder,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            date: None,
            category: String::new(),
            name: String::new(),
            min_price: None,
            max_price: None,
            max_distance_km: Some(DEFAULT_MAX_DISTANCE_KM),
            min_rating: None,
            open_only: true,
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl Criteria {
    /// Apply a partial update, returning the resulting criteria
    pub fn merged(&self, update: &CriteriaUpdate) -> Criteria {
        let mut next = self.clone();

        if let Some(date) = &update.date {
            next.date = date.clone();
        }
        if let Some(category) = &update.category {
            next.category = category.clone();
        }
        if let Some(name) = &update.name {
            next.name = name.clone();
        }
        if let Some(min_price) = update.min_price {
            next.min_price = min_price;
        }
        if let Some(max_price) = update.max_price {
            next.max_price = max_price;
        }
        if let Some(max_distance_km) = update.max_distance_km {
            next.max_distance_km = max_distance_km;
        }
        if let Some(min_rating) = update.min_rating {
            next.min_rating = min_rating;
        }
        if let Some(open_only) = update.open_only {
            next.open_only = open_only;
        }
        if let Some(sort_by) = update.sort_by {
            next.sort_by = sort_by;
        }
        if let Some(sort_order) = update.sort_order {
            next.sort_order = sort_order;
        }

        next
    }
}

fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| ValidationError::new("iso_date"))
}

/// Partial change to [`Criteria`]
///
/// Outer `None` leaves a field untouched. For clearable fields the inner
/// `Option` is the new value, so `Some(None)` unsets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaUpdate {
    pub date: Option<Option<String>>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub min_price: Option<Option<f64>>,
    pub max_price: Option<Option<f64>>,
    pub max_distance_km: Option<Option<f64>>,
    pub min_rating: Option<Option<f64>>,
    pub open_only: Option<bool>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
}

impl CriteriaUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(Some(date.format(ISO_DATE_FORMAT).to_string()));
        self
    }

    pub fn date_str(mut self, date: impl Into<String>) -> Self {
        self.date = Some(Some(date.into()));
        self
    }

    pub fn clear_date(mut self) -> Self {
        self.date = Some(None);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn min_price(mut self, min_price: Option<f64>) -> Self {
        self.min_price = Some(min_price);
        self
    }

    pub fn max_price(mut self, max_price: Option<f64>) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn max_distance_km(mut self, max_distance_km: Option<f64>) -> Self {
        self.max_distance_km = Some(max_distance_km);
        self
    }

    pub fn min_rating(mut self, min_rating: Option<f64>) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    pub fn open_only(mut self, open_only: bool) -> Self {
        self.open_only = Some(open_only);
        self
    }

    pub fn sort(mut self, sort_by: SortKey, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_order = Some(sort_order);
        self
    }
}
