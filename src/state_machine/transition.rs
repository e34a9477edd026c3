//! Pure state transition function
//!
//! Every user action and every completed external call goes through
//! `transition`, which returns the next state, the replacement session data
//! and the effects the runtime must carry out. No I/O happens here.

use super::effect::{QUERY_METHOD_DISTRICT, QUERY_METHOD_PINCODE};
use super::event::Command;
use super::{ConvContext, ConvState, Effect, Event, KeyOrigin, ReplyOptions, SessionData};
use crate::cowin::{QueryError, QueryKey, QueryMode, QueryResult};
use crate::formatter;
use crate::reference::ReferenceMap;
use thiserror::Error;

pub const CLOSING_MESSAGE: &str = "Hope this bot helped you";
pub const USAGE_MESSAGE: &str = "press -> /start to start conversation\n\
                             press -> /cancel between query to force stop\n\
                             press -> /about for more info about the bot";
pub const GENERIC_FAILURE: &str = "Something went wrong :( ....\ntry again later";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    /// Replaces the caller's session data
    pub session: SessionData,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState, session: SessionData) -> Self {
        Self {
            new_state: state,
            session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    fn with_leading_effect(mut self, effect: Effect) -> Self {
        self.effects.insert(0, effect);
        self
    }

    /// Text of every reply effect, in order
    #[cfg(test)]
    pub fn replies(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Reply { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Errors that can occur during transition.
///
/// The messages are shown to the user as is.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("No search in progress. Press /start to begin")]
    NoConversation,
    #[error("A search is already in progress. Finish it or press /cancel first")]
    ConversationInProgress,
    #[error("Unknown command /{0}. Press /start to begin")]
    UnknownCommand(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Input that could not be turned into a query key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("district id argument missing")]
    MissingDistrictId,
    #[error("pincode argument missing")]
    MissingPincode,
    #[error("malformed district id {0:?}")]
    MalformedDistrictId(String),
    #[error("unknown district {district:?} in {region:?}")]
    UnknownDistrict { region: String, district: String },
    #[error("no region chosen")]
    NoRegionChosen,
}

/// Source of a query key
#[derive(Debug, Clone, Copy)]
pub enum KeyInput<'a> {
    /// Argument of a one-shot command
    Argument(Option<&'a str>),
    /// User's latest choice on top of the session built so far
    Choice {
        session: &'a SessionData,
        text: &'a str,
    },
}

/// A key ready to query, or a pincode that still needs the postal lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingKey {
    Ready(QueryKey),
    NeedsPincodeCheck(String),
}

/// Resolve the key for `mode`, whichever path the user took to supply it
pub fn resolve_key(
    mode: QueryMode,
    input: KeyInput<'_>,
    reference: &ReferenceMap,
) -> Result<PendingKey, ValidationError> {
    match (mode, input) {
        (QueryMode::ByDistrict, KeyInput::Argument(None)) => Err(ValidationError::MissingDistrictId),
        (QueryMode::ByPincode, KeyInput::Argument(None)) => Err(ValidationError::MissingPincode),
        (QueryMode::ByDistrict, KeyInput::Argument(Some(raw))) => raw
            .parse::<u32>()
            .ok()
            .filter(|id| *id > 0)
            .map(|id| PendingKey::Ready(QueryKey::District(id)))
            .ok_or_else(|| ValidationError::MalformedDistrictId(raw.to_string())),
        (QueryMode::ByDistrict, KeyInput::Choice { session, text }) => {
            let region = session
                .region
                .as_deref()
                .ok_or(ValidationError::NoRegionChosen)?;
            reference
                .district_id(region, text)
                .map(|id| PendingKey::Ready(QueryKey::District(id)))
                .ok_or_else(|| ValidationError::UnknownDistrict {
                    region: region.to_string(),
                    district: text.to_string(),
                })
        }
        (
            QueryMode::ByPincode,
            KeyInput::Argument(Some(code)) | KeyInput::Choice { text: code, .. },
        ) => Ok(PendingKey::NeedsPincodeCheck(code.to_string())),
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs.
pub fn transition(
    state: &ConvState,
    session: &SessionData,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Cancellation: accepted everywhere, never runs a pending query
        // ============================================================
        (_, Event::UserCommand { command, .. }) if command.is_cancel() => Ok(finish(vec![])),

        // ============================================================
        // Entry points
        // ============================================================
        (ConvState::Finished, Event::UserCommand { command: Command::Start, .. }) => {
            let greeting = match &context.user_name {
                Some(name) => format!("Hey there {name}!"),
                None => "Hey there!".to_string(),
            };
            Ok(
                TransitionResult::new(ConvState::ChooseQueryMethod, SessionData::default())
                    .with_effect(Effect::reply(greeting))
                    .with_effect(Effect::reply_with(
                        "Choose how you'd like to find your vaccine slots",
                        ReplyOptions::QueryMethods,
                    )),
            )
        }

        (ConvState::Finished, Event::UserCommand { command: Command::ByDistrict, argument }) => {
            Ok(one_shot(QueryMode::ByDistrict, argument.as_deref(), context))
        }

        (ConvState::Finished, Event::UserCommand { command: Command::ByPincode, argument }) => {
            Ok(one_shot(QueryMode::ByPincode, argument.as_deref(), context))
        }

        (ConvState::Finished, Event::UserCommand { command: Command::About, .. }) => Ok(
            TransitionResult::new(ConvState::Help, SessionData::default())
                .with_effect(Effect::reply(
                    "This bot looks up vaccine slots using data from COWIN/API-Setu\n\n\
                     Here's the free API on https://apisetu.gov.in/public/api/cowin",
                ))
                .with_effect(Effect::reply(
                    "Check out the source code on ::\nhttps://github.com/arv-sajeev",
                ))
                .with_effect(Effect::reply("Send any message to continue")),
        ),

        (_, Event::UserCommand { command: Command::Unknown(name), .. }) => {
            Err(TransitionError::UnknownCommand(name))
        }

        (ConvState::Finished, Event::UserText { .. }) => Err(TransitionError::NoConversation),

        (_, Event::UserCommand { .. }) => Err(TransitionError::ConversationInProgress),

        // ============================================================
        // Query method
        // ============================================================
        (ConvState::ChooseQueryMethod, Event::UserText { text }) if text == QUERY_METHOD_DISTRICT => {
            let session = SessionData {
                mode: Some(QueryMode::ByDistrict),
                ..session.clone()
            };
            Ok(TransitionResult::new(ConvState::ChooseState, session)
                .with_effect(Effect::reply(
                    "Great, you've chosen to find the vaccines by district",
                ))
                .with_effect(Effect::reply_with(
                    "Find your state in the list below...",
                    region_choices(&context.reference),
                )))
        }

        (ConvState::ChooseQueryMethod, Event::UserText { text }) if text == QUERY_METHOD_PINCODE => {
            let session = SessionData {
                mode: Some(QueryMode::ByPincode),
                ..session.clone()
            };
            Ok(TransitionResult::new(ConvState::ChoosePin, session)
                .with_effect(Effect::reply_with("Enter the PINCODE", ReplyOptions::ForceReply)))
        }

        (ConvState::ChooseQueryMethod, Event::UserText { .. }) => Ok(TransitionResult::new(
            ConvState::ChooseQueryMethod,
            session.clone(),
        )
        .with_effect(Effect::reply_with(
            "Please choose one of the options below",
            ReplyOptions::QueryMethods,
        ))),

        // ============================================================
        // By district
        // ============================================================
        (ConvState::ChooseState, Event::UserText { text }) => {
            let Some(districts) = context.reference.district_names(&text) else {
                return Ok(
                    TransitionResult::new(ConvState::ChooseState, session.clone()).with_effect(
                        Effect::reply_with(
                            "That option was not in our list, could you please choose from the \
                             drop down list below rather than typing :)",
                            region_choices(&context.reference),
                        ),
                    ),
                );
            };

            let reply = format!("The state you have chosen is :: {text}");
            let session = SessionData {
                region: Some(text),
                ..session.clone()
            };
            Ok(TransitionResult::new(ConvState::ChooseDistrict, session)
                .with_effect(Effect::reply(reply))
                .with_effect(Effect::reply_with(
                    "Now find your district in the list below",
                    ReplyOptions::Choices(districts),
                )))
        }

        (ConvState::ChooseDistrict, Event::UserText { text }) => {
            let input = KeyInput::Choice {
                session,
                text: &text,
            };
            match begin_query(QueryMode::ByDistrict, input, KeyOrigin::Conversation, session, context) {
                Ok(result) => Ok(result.with_leading_effect(Effect::reply(format!(
                    "The district you have chosen is :: {text}"
                )))),
                Err(ValidationError::UnknownDistrict { region, .. }) => {
                    let districts = context.reference.district_names(&region).unwrap_or_default();
                    Ok(
                        TransitionResult::new(ConvState::ChooseDistrict, session.clone()).with_effect(
                            Effect::reply_with(
                                "That option was not in our list :(\n\
                                 1. Try typing the district\n\
                                 2. Choose the dropdown and try again\n\
                                 3. Press -> /cancel and restart conversation",
                                ReplyOptions::Choices(districts),
                            ),
                        ),
                    )
                }
                Err(_) => {
                    // Region lost or unknown: go back one step
                    let session = SessionData {
                        region: None,
                        ..session.clone()
                    };
                    Ok(TransitionResult::new(ConvState::ChooseState, session).with_effect(
                        Effect::reply_with(
                            "Find your state in the list below...",
                            region_choices(&context.reference),
                        ),
                    ))
                }
            }
        }

        // ============================================================
        // By pincode
        // ============================================================
        (ConvState::ChoosePin, Event::UserText { text }) => {
            let input = KeyInput::Choice {
                session,
                text: &text,
            };
            begin_query(QueryMode::ByPincode, input, KeyOrigin::Conversation, session, context)
                .map_err(|e| TransitionError::InvalidTransition(e.to_string()))
        }

        (
            ConvState::CheckingPincode { pincode, origin },
            Event::PincodeChecked {
                pincode: checked,
                valid,
            },
        ) if *pincode == checked => Ok(pincode_checked(session, checked, valid, *origin)),

        // ============================================================
        // Results
        // ============================================================
        (
            ConvState::Querying { key, origin },
            Event::AvailabilityFetched {
                key: fetched,
                result,
            },
        ) if *key == fetched => Ok(query_completed(key, *origin, result)),

        // ============================================================
        // Help
        // ============================================================
        (ConvState::Help, Event::UserText { .. }) => Ok(finish(vec![])),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

// Helper functions

fn region_choices(reference: &ReferenceMap) -> ReplyOptions {
    ReplyOptions::Choices(reference.region_names())
}

/// Move to the step that obtains the key's data: the postal lookup for a
/// pincode, the calendar query otherwise
fn begin_query(
    mode: QueryMode,
    input: KeyInput<'_>,
    origin: KeyOrigin,
    session: &SessionData,
    context: &ConvContext,
) -> Result<TransitionResult, ValidationError> {
    let mut session = SessionData {
        mode: Some(mode),
        ..session.clone()
    };

    match resolve_key(mode, input, &context.reference)? {
        PendingKey::Ready(key) => {
            if let QueryKey::District(id) = key {
                session.district_id = Some(id);
            }
            Ok(
                TransitionResult::new(
                    ConvState::Querying {
                        key: key.clone(),
                        origin,
                    },
                    session,
                )
                .with_effect(Effect::FetchAvailability { key }),
            )
        }
        PendingKey::NeedsPincodeCheck(pincode) => Ok(TransitionResult::new(
            ConvState::CheckingPincode {
                pincode: pincode.clone(),
                origin,
            },
            session,
        )
        .with_effect(Effect::ValidatePincode { pincode })),
    }
}

/// One-shot command: the argument replaces the whole dialogue
fn one_shot(mode: QueryMode, argument: Option<&str>, context: &ConvContext) -> TransitionResult {
    let input = KeyInput::Argument(argument);
    begin_query(mode, input, KeyOrigin::Argument, &SessionData::default(), context)
        .unwrap_or_else(|err| finish(argument_error_replies(&err)))
}

fn argument_error_replies(err: &ValidationError) -> Vec<Effect> {
    match err {
        ValidationError::MissingDistrictId => vec![
            Effect::reply("You might have missed out the district id :("),
            Effect::reply("Usage: /bydistrict <dist-id>"),
        ],
        ValidationError::MissingPincode => vec![
            Effect::reply("You might have missed out the PINCODE :("),
            Effect::reply("Usage: /bypincode <pincode>"),
        ],
        ValidationError::MalformedDistrictId(raw) => vec![Effect::reply(format!(
            "{raw} is not a district id, it should be a number like /bydistrict 307"
        ))],
        other => vec![Effect::reply(format!("Could not run the search: {other}"))],
    }
}

fn pincode_checked(
    session: &SessionData,
    pincode: String,
    valid: bool,
    origin: KeyOrigin,
) -> TransitionResult {
    if valid {
        let key = QueryKey::Pincode(pincode.clone());
        let session = SessionData {
            mode: Some(QueryMode::ByPincode),
            pincode: Some(pincode.clone()),
            ..session.clone()
        };
        return TransitionResult::new(
            ConvState::Querying {
                key: key.clone(),
                origin,
            },
            session,
        )
        .with_effect(Effect::reply(format!("The Entered PIN :: {pincode} is valid")))
        .with_effect(Effect::FetchAvailability { key });
    }

    match origin {
        KeyOrigin::Conversation => TransitionResult::new(ConvState::ChoosePin, session.clone())
            .with_effect(Effect::reply_with(
                "The Entered PIN is incorrect, try again with valid PINCODE ..",
                ReplyOptions::ForceReply,
            )),
        KeyOrigin::Argument => finish(vec![Effect::reply(format!(
            "The Entered PIN :: {pincode} is incorrect"
        ))]),
    }
}

fn query_completed(
    key: &QueryKey,
    origin: KeyOrigin,
    result: Result<QueryResult, QueryError>,
) -> TransitionResult {
    match result {
        Ok(calendar) => {
            let replies = formatter::render(&calendar)
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    if i == 0 {
                        Effect::reply_with(text, ReplyOptions::Remove)
                    } else {
                        Effect::reply(text)
                    }
                });
            finish(replies.collect())
        }
        Err(_) => {
            let mut replies = Vec::new();
            if origin == KeyOrigin::Argument && matches!(key, QueryKey::District(_)) {
                replies.push(Effect::reply(
                    "Entered district ID maybe wrong start the app with /start",
                ));
            }
            replies.push(Effect::reply(GENERIC_FAILURE));
            finish(replies)
        }
    }
}

/// Give up on a conversation the machine can no longer continue
pub fn abandon() -> TransitionResult {
    finish(vec![Effect::reply(GENERIC_FAILURE)])
}

/// Terminal step of every conversation: clear the session, say goodbye,
/// signal the end
fn finish(replies: Vec<Effect>) -> TransitionResult {
    TransitionResult::new(ConvState::Finished, SessionData::default())
        .with_effects(replies)
        .with_effect(Effect::reply_with(CLOSING_MESSAGE, ReplyOptions::Remove))
        .with_effect(Effect::reply(USAGE_MESSAGE))
        .with_effect(Effect::EndConversation)
}
