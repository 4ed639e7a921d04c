use crate::models::RawServiceRecord;
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching listings
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Source of the flat listing collection
///
/// Implementations return everything in one go; the engine never pages or
/// patches the collection.
pub trait ServiceDataSource {
    fn fetch_services(
        &self,
    ) -> impl Future<Output = Result<Vec<RawServiceRecord>, DataSourceError>> + Send;
}

/// Listings backend client
pub struct HttpDataSource {
    base_url: String,
    services_path: String,
    client: Client,
}

impl HttpDataSource {
    /// Create a new client for `base_url`
    pub fn new(
        base_url: impl Into<String>,
        services_path: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataSourceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            services_path: services_path.into(),
            client,
        })
    }

    fn services_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.services_path.trim_start_matches('/')
        )
    }
}

impl ServiceDataSource for HttpDataSource {
    async fn fetch_services(&self) -> Result<Vec<RawServiceRecord>, DataSourceError> {
        let url = self.services_url();

        tracing::debug!("Fetching services from: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch services: {} - {}", status, body);
            return Err(DataSourceError::ApiError(format!(
                "Failed to fetch services: {}",
                status
            )));
        }

        let json: Value = response.json().await?;
        let services = decode_services(json)?;

        tracing::info!("Fetched {} services", services.len());

        Ok(services)
    }
}

/// Accept either a bare array or an object wrapping it in `data`
fn decode_services(json: Value) -> Result<Vec<RawServiceRecord>, DataSourceError> {
    let documents = match json {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DataSourceError::InvalidResponse(
                    "Missing services array".into(),
                ))
            }
        },
        other => {
            return Err(DataSourceError::InvalidResponse(format!(
                "Expected an array of services, got {}",
                other
            )))
        }
    };

    let total = documents.len();
    let services: Vec<RawServiceRecord> = documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value(doc) {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::warn!("Skipping undecodable service: {}", e);
                None
            }
        })
        .collect();

    if services.len() < total {
        tracing::warn!("Decoded {} of {} services", services.len(), total);
    }

    Ok(services)
}
