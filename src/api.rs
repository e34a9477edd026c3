//! HTTP chat transport
//!
//! Each POST is one inbound action; the response carries every message the
//! bot sends back for it.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::{AvailabilityClient, ConversationRuntime, PincodeValidator};
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState<V, Q>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    pub runtime: Arc<ConversationRuntime<V, Q>>,
}

impl<V, Q> AppState<V, Q>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    pub fn new(runtime: Arc<ConversationRuntime<V, Q>>) -> Self {
        Self { runtime }
    }
}

impl<V, Q> Clone for AppState<V, Q>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
        }
    }
}
