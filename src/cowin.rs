//! Vaccine availability client
//!
//! Queries the public appointment calendar by district or by pincode for the
//! week starting today.

mod error;
mod types;

pub use error::{QueryError, QueryErrorKind};
pub use types::*;

use crate::runtime::AvailabilityClient;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_BASE_URL: &str =
    "https://cdn-api.co-vin.in/api/v2/appointment/sessions/public";

/// The calendar endpoints reject requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) vaccine-slot-bot";

/// Date format the calendar endpoints expect
const DATE_FORMAT: &str = "%d-%m-%Y";

/// HTTP client for the appointment calendar API
pub struct CowinClient {
    client: Client,
    base_url: String,
}

impl CowinClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full calendar URL for `key`, starting at `date`
    pub fn calendar_url(&self, key: &QueryKey, date: NaiveDate) -> String {
        let date = date.format(DATE_FORMAT);
        match key {
            QueryKey::District(id) => format!(
                "{}/calendarByDistrict?district_id={id}&date={date}",
                self.base_url
            ),
            QueryKey::Pincode(code) => {
                format!("{}/calendarByPin?pincode={code}&date={date}", self.base_url)
            }
        }
    }
}

#[async_trait]
impl AvailabilityClient for CowinClient {
    async fn fetch_availability(&self, key: &QueryKey) -> Result<QueryResult, QueryError> {
        let operation = key.operation();
        let url = self.calendar_url(key, Local::now().date_naive());

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QueryError::network(operation, key.to_string(), format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    QueryError::network(operation, key.to_string(), format!("Connection failed: {e}"))
                } else {
                    QueryError::network(operation, key.to_string(), format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            QueryError::network(operation, key.to_string(), format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(QueryError::status(
                operation,
                key.to_string(),
                format!("HTTP {status}: {body}"),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            QueryError::parse(operation, key.to_string(), format!("Failed to parse response: {e}"))
        })
    }
}

/// Logging wrapper for availability clients
pub struct LoggingAvailabilityClient {
    inner: Arc<dyn AvailabilityClient>,
}

impl LoggingAvailabilityClient {
    pub fn new(inner: Arc<dyn AvailabilityClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AvailabilityClient for LoggingAvailabilityClient {
    async fn fetch_availability(&self, key: &QueryKey) -> Result<QueryResult, QueryError> {
        let start = Instant::now();
        let result = self.inner.fetch_availability(key).await;
        let duration = start.elapsed();

        match &result {
            Ok(calendar) => {
                tracing::info!(
                    key = %key,
                    mode = ?key.mode(),
                    duration_ms = %duration.as_millis(),
                    centers = calendar.centers.len(),
                    "Availability query completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    key = %key,
                    operation = e.operation,
                    kind = e.kind.as_str(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "Availability query failed"
                );
            }
        }

        result
    }
}
