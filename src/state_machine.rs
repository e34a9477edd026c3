//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, ReplyOptions, QUERY_METHOD_DISTRICT, QUERY_METHOD_PINCODE};
pub use event::{Command, Event};
pub use state::{ConvContext, ConvState, KeyOrigin, SessionData};
pub use transition::{
    abandon, transition, TransitionError, TransitionResult, CLOSING_MESSAGE, GENERIC_FAILURE,
    USAGE_MESSAGE,
};
