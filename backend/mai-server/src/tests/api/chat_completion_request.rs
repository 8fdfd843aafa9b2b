use crate::{ApiError, ChatCompletionRequest, ChatRole};

use googletest::prelude::*;
use serde_json::json;

const LIMIT: u32 = 32768;

fn parse(value: serde_json::Value) -> ChatCompletionRequest {
    serde_json::from_value(value).unwrap()
}

fn validation_field(result: Result<ChatCompletionRequest, ApiError>) -> Option<String> {
    match result {
        Err(ApiError::Validation { field, .. }) => field,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn given_minimal_request_when_validated_then_defaults_applied() {
    // Given
    let request = parse(json!({"messages": [{"role": "user", "content": "Hi"}]}));

    // When
    let request = request.validate(LIMIT).unwrap();

    // Then
    assert_that!(request.max_tokens, some(eq(2048)));
    assert_that!(request.temperature, some(eq(0.7)));
    assert_that!(request.top_p, some(eq(1.0)));
    assert_that!(request.stream, eq(false));
    assert_that!(request.messages[0].role, eq(ChatRole::User));
}

#[test]
fn given_validated_request_when_serialized_then_optional_fields_omitted() {
    // Given
    let request = parse(json!({"messages": [{"role": "system", "content": "Be brief"}]}))
        .validate(LIMIT)
        .unwrap();

    // When
    let value = serde_json::to_value(&request).unwrap();

    // Then
    assert_that!(value.get("model"), none());
    assert_that!(value.get("stop"), none());
    assert_that!(value["max_tokens"], eq(&json!(2048)));
    assert_that!(value["messages"][0]["role"], eq(&json!("system")));
}

#[test]
fn given_small_engine_limit_when_max_tokens_omitted_then_default_clamped() {
    let request = parse(json!({"messages": [{"role": "user", "content": "Hi"}]}));

    let request = request.validate(512).unwrap();

    assert_that!(request.max_tokens, some(eq(512)));
}

#[test]
fn given_empty_messages_when_validated_then_rejected() {
    let request = parse(json!({"messages": []}));

    let field = validation_field(request.validate(LIMIT));

    assert_that!(field, some(eq("messages")));
}

#[test]
fn given_zero_max_tokens_when_validated_then_rejected() {
    let request = parse(json!({
        "messages": [{"role": "user", "content": "Hi"}],
        "max_tokens": 0
    }));

    let field = validation_field(request.validate(LIMIT));

    assert_that!(field, some(eq("max_tokens")));
}

#[test]
fn given_max_tokens_over_engine_limit_when_validated_then_rejected() {
    let request = parse(json!({
        "messages": [{"role": "user", "content": "Hi"}],
        "max_tokens": 32769
    }));

    let field = validation_field(request.validate(LIMIT));

    assert_that!(field, some(eq("max_tokens")));
}

#[test]
fn given_temperature_above_two_when_validated_then_rejected() {
    let request = parse(json!({
        "messages": [{"role": "user", "content": "Hi"}],
        "temperature": 2.5
    }));

    let field = validation_field(request.validate(LIMIT));

    assert_that!(field, some(eq("temperature")));
}

#[test]
fn given_negative_top_p_when_validated_then_rejected() {
    let request = parse(json!({
        "messages": [{"role": "user", "content": "Hi"}],
        "top_p": -0.1
    }));

    let field = validation_field(request.validate(LIMIT));

    assert_that!(field, some(eq("top_p")));
}

#[test]
fn given_boundary_values_when_validated_then_accepted() {
    let request = parse(json!({
        "messages": [{"role": "assistant", "content": "Hello"}],
        "max_tokens": 1,
        "temperature": 0.0,
        "top_p": 1.0,
        "stop": ["\n\n"],
        "model": "model-a",
        "stream": true
    }));

    let request = request.validate(LIMIT).unwrap();

    assert_that!(request.max_tokens, some(eq(1)));
    assert_that!(request.stop, some(elements_are![eq("\n\n")]));
    assert_that!(request.model, some(eq("model-a")));
    assert_that!(request.stream, eq(true));
}

#[test]
fn given_unknown_role_when_parsed_then_rejected() {
    let result: serde_json::Result<ChatCompletionRequest> = serde_json::from_value(json!({
        "messages": [{"role": "tool", "content": "Hi"}]
    }));

    assert_that!(result, err(anything()));
}
