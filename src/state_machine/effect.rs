//! Effects produced by state transitions

use crate::cowin::QueryKey;
use serde::Serialize;

/// Which fixed set of replies the transport should offer next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", content = "choices", rename_all = "snake_case")]
pub enum ReplyOptions {
    /// Leave whatever the transport shows as is
    #[default]
    None,
    /// "District" / "PIN-code"
    QueryMethods,
    /// One button per entry
    Choices(Vec<String>),
    /// Ask for a typed reply
    ForceReply,
    /// Take any keyboard away
    Remove,
}

pub const QUERY_METHOD_DISTRICT: &str = "District";
pub const QUERY_METHOD_PINCODE: &str = "PIN-code";

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send one text segment to the user
    Reply { text: String, options: ReplyOptions },

    /// Look the pincode up; answers with `Event::PincodeChecked`
    ValidatePincode { pincode: String },

    /// Query the calendar; answers with `Event::AvailabilityFetched`
    FetchAvailability { key: QueryKey },

    /// Tell the transport this conversation is over
    EndConversation,
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            options: ReplyOptions::None,
        }
    }

    pub fn reply_with(text: impl Into<String>, options: ReplyOptions) -> Self {
        Effect::Reply {
            text: text.into(),
            options,
        }
    }

    #[cfg(test)]
    pub fn is_external_call(&self) -> bool {
        matches!(
            self,
            Effect::ValidatePincode { .. } | Effect::FetchAvailability { .. }
        )
    }
}
