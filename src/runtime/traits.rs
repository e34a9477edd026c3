//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::cowin::{QueryError, QueryKey, QueryResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for the appointment calendar
#[async_trait]
pub trait AvailabilityClient: Send + Sync {
    /// Sessions for the week starting today. Single attempt, no retry.
    async fn fetch_availability(&self, key: &QueryKey) -> Result<QueryResult, QueryError>;
}

/// Decides whether a pincode may be queried
#[async_trait]
pub trait PincodeValidator: Send + Sync {
    /// `false` for malformed codes, unknown codes and failed lookups
    async fn validate_pincode(&self, code: &str) -> bool;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: AvailabilityClient + ?Sized> AvailabilityClient for Arc<T> {
    async fn fetch_availability(&self, key: &QueryKey) -> Result<QueryResult, QueryError> {
        (**self).fetch_availability(key).await
    }
}

#[async_trait]
impl<T: PincodeValidator + ?Sized> PincodeValidator for Arc<T> {
    async fn validate_pincode(&self, code: &str) -> bool {
        (**self).validate_pincode(code).await
    }
}
