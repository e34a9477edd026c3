//! Conversation runtime executor

use super::traits::{AvailabilityClient, PincodeValidator};
use super::{Session, SessionStore};

use crate::reference::ReferenceMap;
use crate::state_machine::{
    abandon, transition, ConvContext, ConvState, Effect, Event, ReplyOptions, TransitionError,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const NOT_UNDERSTOOD: &str = "Sorry, I didn't get that. Press /cancel to start over";

/// One text segment for the transport to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    pub options: ReplyOptions,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: ReplyOptions::None,
        }
    }
}

/// Everything the transport needs after one inbound action
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub state: ConvState,
    pub messages: Vec<OutboundMessage>,
    pub conversation_ended: bool,
}

impl ActionOutcome {
    #[cfg(test)]
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.text.as_str()).collect()
    }
}

/// Runs the state machine for any number of conversations with any
/// validator and calendar client
pub struct ConversationRuntime<V, Q>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    reference: Arc<ReferenceMap>,
    validator: Arc<V>,
    client: Arc<Q>,
    sessions: SessionStore,
}

impl<V, Q> ConversationRuntime<V, Q>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    pub fn new(reference: Arc<ReferenceMap>, validator: V, client: Q) -> Self {
        Self {
            reference,
            validator: Arc::new(validator),
            client: Arc::new(client),
            sessions: SessionStore::new(),
        }
    }

    pub fn reference(&self) -> &ReferenceMap {
        &self.reference
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Forget conversations left idle for `max_idle` or longer
    pub async fn evict_idle_sessions(&self, max_idle: Duration) -> usize {
        let evicted = self.sessions.evict_idle(max_idle).await;
        if evicted > 0 {
            let active = self.sessions.active_count().await;
            tracing::info!(evicted, active, "Evicted idle sessions");
        }
        evicted
    }

    /// Handle raw chat input (`/command arg` or free text)
    pub async fn handle_input(
        &self,
        conversation_id: &str,
        user_name: Option<String>,
        input: &str,
    ) -> ActionOutcome {
        self.handle_action(conversation_id, user_name, Event::parse_user_input(input))
            .await
    }

    /// Process one inbound action to completion, external calls included
    pub async fn handle_action(
        &self,
        conversation_id: &str,
        user_name: Option<String>,
        event: Event,
    ) -> ActionOutcome {
        let handle = self.sessions.get_or_create(conversation_id).await;
        let mut session = handle.lock().await;

        let context = ConvContext::new(conversation_id, self.reference.clone())
            .with_user_name(user_name);
        let mut outcome = ActionOutcome {
            state: session.state.clone(),
            messages: Vec::new(),
            conversation_ended: false,
        };

        self.process_event(&context, &mut session, event, &mut outcome)
            .await;

        // A rejected completion event would leave the conversation waiting forever
        if session.state.is_in_flight() {
            tracing::error!(
                conv_id = %conversation_id,
                state = session.state.name(),
                "Conversation stuck on an external call, resetting"
            );
            let reset = abandon();
            session.state = reset.new_state;
            session.data = reset.session;
            for effect in reset.effects {
                // Closing effects are replies and the end marker only
                let _ = self.execute_effect(&context, effect, &mut outcome).await;
            }
        }
        outcome.state = session.state.clone();

        let finished = session.state.is_finished();
        drop(session);
        drop(handle);
        if finished {
            self.sessions.release(conversation_id).await;
            let active = self.sessions.active_count().await;
            tracing::debug!(conv_id = %conversation_id, active, "Session released");
        }

        outcome
    }

    async fn process_event(
        &self,
        context: &ConvContext,
        session: &mut Session,
        event: Event,
        outcome: &mut ActionOutcome,
    ) {
        let conv_id = context.conversation_id.as_str();

        // Effects may produce follow-up events; keep going until none are left
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let from_user = current_event.is_user_input();

            // Pure state transition
            let result = match transition(&session.state, &session.data, context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    report_rejection(context, &session.state, &e, outcome);
                    return;
                }
            };

            let old_state = std::mem::replace(&mut session.state, result.new_state);
            session.data = result.session;

            if from_user && old_state == session.state && !session.state.is_finished() {
                tracing::warn!(
                    conv_id = %conv_id,
                    state = session.state.name(),
                    "Input not accepted, prompting again"
                );
            } else {
                tracing::info!(
                    conv_id = %conv_id,
                    from = old_state.name(),
                    to = session.state.name(),
                    mode = ?session.data.mode,
                    "State transition"
                );
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(context, effect, outcome).await
                {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    async fn execute_effect(
        &self,
        context: &ConvContext,
        effect: Effect,
        outcome: &mut ActionOutcome,
    ) -> Option<Event> {
        let conv_id = context.conversation_id.as_str();

        match effect {
            Effect::Reply { text, options } => {
                outcome.messages.push(OutboundMessage { text, options });
                None
            }

            Effect::ValidatePincode { pincode } => {
                let valid = self.validator.validate_pincode(&pincode).await;
                if valid {
                    tracing::info!(conv_id = %conv_id, pincode = %pincode, "Pincode accepted");
                } else {
                    tracing::warn!(conv_id = %conv_id, pincode = %pincode, "Pincode rejected");
                }
                Some(Event::PincodeChecked { pincode, valid })
            }

            Effect::FetchAvailability { key } => {
                let result = self.client.fetch_availability(&key).await;
                if let Err(e) = &result {
                    tracing::error!(
                        conv_id = %conv_id,
                        operation = e.operation,
                        key = %key,
                        error = %e,
                        "Could not fetch availability"
                    );
                }
                Some(Event::AvailabilityFetched { key, result })
            }

            Effect::EndConversation => {
                outcome.conversation_ended = true;
                tracing::info!(conv_id = %conv_id, "Finished cleanup");
                None
            }
        }
    }
}

fn report_rejection(
    context: &ConvContext,
    state: &ConvState,
    error: &TransitionError,
    outcome: &mut ActionOutcome,
) {
    let conv_id = context.conversation_id.as_str();
    match error {
        TransitionError::InvalidTransition(detail) => {
            tracing::error!(conv_id = %conv_id, state = state.name(), detail = %detail, "Invalid transition");
            outcome.messages.push(OutboundMessage::text(NOT_UNDERSTOOD));
        }
        other => {
            tracing::info!(conv_id = %conv_id, state = state.name(), reason = %other, "Action rejected");
            outcome.messages.push(OutboundMessage::text(other.to_string()));
        }
    }
}
