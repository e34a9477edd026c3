//! Pincode validation
//!
//! A pincode is accepted only if it is six digits without a leading zero and
//! the postal directory does not report it as an error. Lookup failures
//! reject the code.

use crate::cowin::QueryError;
use crate::runtime::PincodeValidator;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.postalpincode.in/pincode";

const LOOKUP_OPERATION: &str = "pincodeLookup";

fn pincode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[1-9][0-9]{5}$").expect("valid regex"))
}

/// Six digits, first one non-zero
pub fn is_well_formed(code: &str) -> bool {
    pincode_pattern().is_match(code)
}

/// One record of the postal directory reply
#[derive(Debug, Clone, Deserialize)]
pub struct PostalRecord {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

impl PostalRecord {
    /// The directory flags unknown codes with an `Error` status
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }
}

/// External postal directory
#[async_trait]
pub trait PostalLookup: Send + Sync {
    async fn lookup(&self, code: &str) -> Result<Vec<PostalRecord>, QueryError>;
}

/// HTTP client for the public postal directory
pub struct PostalClient {
    client: Client,
    base_url: String,
}

impl PostalClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PostalLookup for PostalClient {
    async fn lookup(&self, code: &str) -> Result<Vec<PostalRecord>, QueryError> {
        let url = format!("{}/{code}", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            QueryError::network(LOOKUP_OPERATION, code, format!("Request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::status(
                LOOKUP_OPERATION,
                code,
                format!("HTTP {status}"),
            ));
        }

        response.json().await.map_err(|e| {
            QueryError::parse(LOOKUP_OPERATION, code, format!("Failed to parse response: {e}"))
        })
    }
}

/// Syntax check followed by a directory lookup
pub struct PincodeChecker<L> {
    lookup: L,
}

impl<L: PostalLookup> PincodeChecker<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<L: PostalLookup> PincodeValidator for PincodeChecker<L> {
    async fn validate_pincode(&self, code: &str) -> bool {
        if !is_well_formed(code) {
            return false;
        }

        match self.lookup.lookup(code).await {
            Ok(records) => match records.first() {
                Some(record) if !record.is_error() => true,
                Some(record) => {
                    tracing::warn!(
                        pincode = %code,
                        status = %record.status,
                        message = record.message.as_deref().unwrap_or(""),
                        "Pincode not found in postal directory"
                    );
                    false
                }
                None => {
                    tracing::warn!(pincode = %code, "Postal directory returned no records");
                    false
                }
            },
            Err(e) => {
                tracing::error!(
                    pincode = %code,
                    kind = e.kind.as_str(),
                    error = %e.message,
                    "Pincode lookup failed"
                );
                false
            }
        }
    }
}
