//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::cowin::{QueryKey, QueryMode, QueryResult};
use crate::postal::is_well_formed;
use crate::reference::ReferenceMap;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ConvContext {
    let reference = ReferenceMap::from_pairs([
        ("Kerala", vec![("Ernakulam", 307), ("Idukki", 306)]),
        ("Delhi", vec![("New Delhi", 140), ("Central Delhi", 141)]),
    ]);
    ConvContext::new("test-conv", Arc::new(reference))
}

/// Apply one user event, then answer every external call the way a
/// well-behaved directory and calendar would, until the machine settles.
fn settle(
    state: &ConvState,
    session: &SessionData,
    ctx: &ConvContext,
    event: Event,
) -> Result<Vec<TransitionResult>, TransitionError> {
    let mut steps = Vec::new();
    let mut pending = vec![event];
    let mut state = state.clone();
    let mut session = session.clone();

    while let Some(event) = pending.pop() {
        let result = transition(&state, &session, ctx, event)?;
        for effect in &result.effects {
            match effect {
                Effect::ValidatePincode { pincode } => pending.push(Event::PincodeChecked {
                    pincode: pincode.clone(),
                    valid: is_well_formed(pincode),
                }),
                Effect::FetchAvailability { key } => pending.push(Event::AvailabilityFetched {
                    key: key.clone(),
                    result: Ok(QueryResult::default()),
                }),
                Effect::Reply { .. } | Effect::EndConversation => {}
            }
        }
        state = result.new_state.clone();
        session = result.session.clone();
        steps.push(result);
    }

    Ok(steps)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_origin() -> impl Strategy<Value = KeyOrigin> {
    prop_oneof![Just(KeyOrigin::Conversation), Just(KeyOrigin::Argument)]
}

fn arb_key() -> impl Strategy<Value = QueryKey> {
    prop_oneof![
        (1u32..800).prop_map(QueryKey::District),
        "[1-9][0-9]{5}".prop_map(QueryKey::Pincode),
    ]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::ChooseQueryMethod),
        Just(ConvState::ChooseState),
        Just(ConvState::ChoosePin),
        Just(ConvState::ChooseDistrict),
        Just(ConvState::Finished),
        Just(ConvState::Help),
        ("[0-9]{6}", arb_origin())
            .prop_map(|(pincode, origin)| ConvState::CheckingPincode { pincode, origin }),
        (arb_key(), arb_origin()).prop_map(|(key, origin)| ConvState::Querying { key, origin }),
    ]
}

fn arb_session() -> impl Strategy<Value = SessionData> {
    (
        proptest::option::of(prop_oneof![
            Just(QueryMode::ByDistrict),
            Just(QueryMode::ByPincode)
        ]),
        proptest::option::of(prop_oneof![
            Just("Kerala".to_string()),
            Just("Delhi".to_string()),
            "[A-Za-z]{1,10}",
        ]),
        proptest::option::of(1u32..800),
        proptest::option::of("[0-9]{6}"),
    )
        .prop_map(|(mode, region, district_id, pincode)| SessionData {
            mode,
            region,
            district_id,
            pincode,
        })
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("District".to_string()),
        Just("PIN-code".to_string()),
        Just("Kerala".to_string()),
        Just("Delhi".to_string()),
        Just("Ernakulam".to_string()),
        Just("New Delhi".to_string()),
        Just("110001".to_string()),
        Just("000000".to_string()),
        "[A-Za-z ]{0,12}",
        "[0-9]{4,7}",
    ]
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Start),
        Just(Command::ByDistrict),
        Just(Command::ByPincode),
        Just(Command::Cancel),
        Just(Command::Exit),
        Just(Command::About),
        "[a-z]{1,8}".prop_map(Command::Unknown),
    ]
}

fn arb_user_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => arb_text().prop_map(|text| Event::UserText { text }),
        1 => (arb_command(), proptest::option::of("[0-9]{1,6}"))
            .prop_map(|(command, argument)| Event::UserCommand { command, argument }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Cancel and exit reach Finished in one step from anywhere
    #[test]
    fn prop_cancel_always_finishes(
        state in arb_state(),
        session in arb_session(),
        exit in any::<bool>(),
    ) {
        let command = if exit { Command::Exit } else { Command::Cancel };
        let result = transition(
            &state,
            &session,
            &test_context(),
            Event::UserCommand { command, argument: None },
        );

        let result = result.expect("cancel is accepted in every state");
        prop_assert_eq!(result.new_state, ConvState::Finished);
        prop_assert!(result.session.is_empty());
        prop_assert!(!result.effects.iter().any(Effect::is_external_call));
        prop_assert_eq!(result.effects.last(), Some(&Effect::EndConversation));
    }

    // Reaching Finished always clears the session and signals the end
    #[test]
    fn prop_finished_clears_session(events in proptest::collection::vec(arb_user_event(), 0..20)) {
        let ctx = test_context();
        let mut state = ConvState::Finished;
        let mut session = SessionData::default();

        for event in events {
            let Ok(steps) = settle(&state, &session, &ctx, event) else {
                continue;
            };
            for step in &steps {
                if step.new_state.is_finished() {
                    prop_assert!(step.session.is_empty(), "Session not cleared: {:?}", step.session);
                    prop_assert_eq!(step.effects.last(), Some(&Effect::EndConversation));
                } else {
                    prop_assert!(!step.effects.contains(&Effect::EndConversation));
                }
            }
            let last = steps.last().expect("at least one step");
            state = last.new_state.clone();
            session = last.session.clone();
        }
    }

    // After every user action has settled, the machine waits on the user again
    #[test]
    fn prop_settles_outside_in_flight_states(events in proptest::collection::vec(arb_user_event(), 0..20)) {
        let ctx = test_context();
        let mut state = ConvState::Finished;
        let mut session = SessionData::default();

        for event in events {
            if let Ok(steps) = settle(&state, &session, &ctx, event) {
                let last = steps.last().expect("at least one step");
                state = last.new_state.clone();
                session = last.session.clone();
            }
            prop_assert!(!state.is_in_flight(), "Stuck in {:?}", state);
        }
    }

    // In-flight states are entered only together with the call they wait on
    #[test]
    fn prop_in_flight_state_has_one_external_call(
        state in arb_state(),
        session in arb_session(),
        event in arb_user_event(),
    ) {
        if let Ok(result) = transition(&state, &session, &test_context(), event) {
            let calls: Vec<_> = result.effects.iter().filter(|e| e.is_external_call()).collect();
            if result.new_state.is_in_flight() {
                prop_assert_eq!(calls.len(), 1);
                prop_assert!(result.effects.last().is_some_and(Effect::is_external_call));
            } else {
                prop_assert!(calls.is_empty());
            }
        }
    }

    // Same inputs, same outputs
    #[test]
    fn prop_transition_is_deterministic(
        state in arb_state(),
        session in arb_session(),
        event in arb_user_event(),
    ) {
        let ctx = test_context();
        let first = transition(&state, &session, &ctx, event.clone());
        let second = transition(&state, &session, &ctx, event);

        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.session, b.session);
                prop_assert_eq!(a.effects, b.effects);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "Diverged: {:?} vs {:?}", a, b),
        }
    }

    // Unknown region names never leave ChooseState
    #[test]
    fn prop_unknown_region_stays(text in "[a-z ]{0,15}") {
        let session = SessionData { mode: Some(QueryMode::ByDistrict), ..Default::default() };
        let result = transition(
            &ConvState::ChooseState,
            &session,
            &test_context(),
            Event::UserText { text },
        ).unwrap();

        prop_assert_eq!(result.new_state, ConvState::ChooseState);
        prop_assert_eq!(result.session, session);
    }

    // One-shot district ids either query directly or finish without a call
    #[test]
    fn prop_one_shot_district(argument in proptest::option::of("[0-9a-z]{0,6}")) {
        let result = transition(
            &ConvState::Finished,
            &SessionData::default(),
            &test_context(),
            Event::UserCommand { command: Command::ByDistrict, argument: argument.clone() },
        ).unwrap();

        let parsed = argument.as_deref().and_then(|a| a.parse::<u32>().ok()).filter(|id| *id > 0);
        match parsed {
            Some(id) => prop_assert_eq!(
                result.new_state,
                ConvState::Querying { key: QueryKey::District(id), origin: KeyOrigin::Argument }
            ),
            None => {
                prop_assert_eq!(result.new_state, ConvState::Finished);
                prop_assert!(!result.effects.iter().any(Effect::is_external_call));
            }
        }
    }
}

// ============================================================================
// Reachability
// ============================================================================

fn run(ctx: &ConvContext, inputs: &[Event]) -> Vec<ConvState> {
    let mut state = ConvState::Finished;
    let mut session = SessionData::default();
    let mut visited = vec![state.clone()];

    for input in inputs {
        let result = transition(&state, &session, ctx, input.clone()).expect("valid input");
        state = result.new_state;
        session = result.session;
        visited.push(state.clone());
    }
    visited
}

fn text(t: &str) -> Event {
    Event::UserText {
        text: t.to_string(),
    }
}

fn start() -> Event {
    Event::UserCommand {
        command: Command::Start,
        argument: None,
    }
}

#[test]
fn test_every_state_reachable() {
    let ctx = test_context();

    let by_district = run(&ctx, &[start(), text("District"), text("Kerala"), text("Idukki")]);
    assert_eq!(
        by_district,
        vec![
            ConvState::Finished,
            ConvState::ChooseQueryMethod,
            ConvState::ChooseState,
            ConvState::ChooseDistrict,
            ConvState::Querying {
                key: QueryKey::District(306),
                origin: KeyOrigin::Conversation,
            },
        ]
    );

    let by_pin = run(&ctx, &[start(), text("PIN-code"), text("560001")]);
    assert_eq!(by_pin[2], ConvState::ChoosePin);
    assert_eq!(
        by_pin[3],
        ConvState::CheckingPincode {
            pincode: "560001".to_string(),
            origin: KeyOrigin::Conversation,
        }
    );

    let help = run(
        &ctx,
        &[Event::UserCommand {
            command: Command::About,
            argument: None,
        }],
    );
    assert_eq!(help[1], ConvState::Help);
}
