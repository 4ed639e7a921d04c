use crate::models::Coordinate;
use std::future::Future;
use thiserror::Error;

/// Errors that can occur when acquiring the user's position
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Permission to access location was denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// One-shot source of the user's current position
pub trait LocationProvider {
    fn current_location(&self) -> impl Future<Output = Result<Coordinate, LocationError>> + Send;
}

/// Provider answering with a fixed position, or with "unavailable"
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocation(pub Option<Coordinate>);

impl StaticLocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self(Coordinate::new(latitude, longitude))
    }

    pub fn unknown() -> Self {
        Self(None)
    }
}

impl LocationProvider for StaticLocation {
    async fn current_location(&self) -> Result<Coordinate, LocationError> {
        self.0
            .ok_or_else(|| LocationError::Unavailable("no position configured".to_string()))
    }
}
