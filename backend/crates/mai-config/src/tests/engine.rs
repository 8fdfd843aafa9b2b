use crate::Config;
use crate::tests::{EnvGuard, setup_config_dir};

use googletest::assert_that;
use googletest::prelude::{anything, eq, err, ok};
use serial_test::serial;

// =========================================================================
// Validation Tests - Engine
// =========================================================================

#[test]
#[serial]
fn given_non_loopback_engine_host_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _host = EnvGuard::set("MAI_ENGINE_HOST", "0.0.0.0");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_localhost_engine_host_when_validate_then_ok() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _host = EnvGuard::set("MAI_ENGINE_HOST", "localhost");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, ok(anything()));
}

#[test]
#[serial]
fn given_empty_default_model_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _model = EnvGuard::set("MAI_ENGINE_DEFAULT_MODEL", "  ");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_zero_max_tokens_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _tokens = EnvGuard::set("MAI_ENGINE_MAX_TOKENS", "0");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_privileged_engine_port_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _port = EnvGuard::set("MAI_ENGINE_PORT", "443");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_ipv6_loopback_when_base_url_then_bracketed() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _host = EnvGuard::set("MAI_ENGINE_HOST", "::1");
    let _port = EnvGuard::set("MAI_ENGINE_PORT", "9100");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.engine.base_url().as_str(), eq("http://[::1]:9100"));
}
