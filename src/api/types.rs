//! API request and response types

use crate::state_machine::{ConvState, SessionData};
use serde::{Deserialize, Serialize};

/// One inbound chat action
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// Free text, or `/command [argument]`
    pub text: String,
    /// Used in the greeting
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Where a conversation stands
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub state: ConvState,
    pub session: SessionData,
}

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    pub regions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DistrictEntry {
    pub name: String,
    pub id: u32,
}

#[derive(Debug, Serialize)]
pub struct DistrictsResponse {
    pub region: String,
    pub districts: Vec<DistrictEntry>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
