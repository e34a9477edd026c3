//! Conversation state types

use crate::cowin::{QueryKey, QueryMode};
use crate::reference::ReferenceMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where the key of a pending query came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrigin {
    /// Built up step by step through the dialogue
    Conversation,
    /// Passed as the argument of a one-shot command
    Argument,
}

/// Conversation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Waiting for "District" or "PIN-code"
    ChooseQueryMethod,
    /// Waiting for a region name
    ChooseState,
    /// Waiting for a pincode
    ChoosePin,
    /// Waiting for a district name under the chosen region
    ChooseDistrict,
    /// No conversation in progress. Entry commands are accepted here.
    #[default]
    Finished,
    /// About text shown; the next message closes the conversation
    Help,

    /// Postal directory lookup in flight
    CheckingPincode { pincode: String, origin: KeyOrigin },
    /// Availability query in flight
    Querying { key: QueryKey, origin: KeyOrigin },
}

impl ConvState {
    pub fn name(&self) -> &'static str {
        match self {
            ConvState::ChooseQueryMethod => "choose_query_method",
            ConvState::ChooseState => "choose_state",
            ConvState::ChoosePin => "choose_pin",
            ConvState::ChooseDistrict => "choose_district",
            ConvState::Finished => "finished",
            ConvState::Help => "help",
            ConvState::CheckingPincode { .. } => "checking_pincode",
            ConvState::Querying { .. } => "querying",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ConvState::Finished)
    }

    /// Waiting on an external call rather than on the user
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ConvState::CheckingPincode { .. } | ConvState::Querying { .. }
        )
    }
}

/// Per-conversation scratch data, discarded when the conversation ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub mode: Option<QueryMode>,
    pub region: Option<String>,
    pub district_id: Option<u32>,
    pub pincode: Option<String>,
}

impl SessionData {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.region.is_none()
            && self.district_id.is_none()
            && self.pincode.is_none()
    }
}

/// Context available to every transition (immutable)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub conversation_id: String,
    /// Display name of the user who sent the current action
    pub user_name: Option<String>,
    pub reference: Arc<ReferenceMap>,
}

impl ConvContext {
    pub fn new(conversation_id: impl Into<String>, reference: Arc<ReferenceMap>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_name: None,
            reference,
        }
    }

    pub fn with_user_name(mut self, user_name: Option<String>) -> Self {
        self.user_name = user_name;
        self
    }
}
