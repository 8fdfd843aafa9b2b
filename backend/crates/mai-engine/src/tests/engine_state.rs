use crate::EngineState;

use googletest::prelude::*;
use serde_json::json;

#[test]
fn given_restarting_state_when_serialized_then_tagged_with_phase_and_attempt() {
    // Given
    let state = EngineState::Restarting { attempt: 2 };

    // When
    let value = serde_json::to_value(&state).unwrap();

    // Then
    assert_that!(value, eq(&json!({"phase": "restarting", "attempt": 2})));
}

#[test]
fn given_unit_state_when_serialized_then_only_phase_present() {
    // Given / When
    let value = serde_json::to_value(EngineState::ShuttingDown).unwrap();

    // Then
    assert_that!(value, eq(&json!({"phase": "shutting_down"})));
}

#[test]
fn given_every_state_when_as_str_then_matches_serialized_phase() {
    let states = [
        EngineState::Stopped,
        EngineState::Starting,
        EngineState::Running,
        EngineState::Unhealthy,
        EngineState::Restarting { attempt: 1 },
        EngineState::ShuttingDown,
        EngineState::Failed {
            error: "boom".to_string(),
        },
    ];

    for state in states {
        let value = serde_json::to_value(&state).unwrap();
        assert_that!(value["phase"].as_str(), some(eq(state.as_str())));
    }
}
