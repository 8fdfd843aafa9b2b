use crate::EngineState;
use crate::server_status::{ServerStatus, StatusSnapshot};

use std::time::{Duration, Instant};

use chrono::Utc;
use googletest::prelude::*;

fn running_snapshot() -> StatusSnapshot {
    StatusSnapshot {
        state: EngineState::Running,
        model: Some("model-a".to_string()),
        pid: Some(4242),
        started_at: Some(Instant::now() - Duration::from_secs(5)),
        started_at_utc: Some(Utc::now()),
        restart_attempts: 0,
        monitoring: true,
        last_exit_code: None,
        last_error: None,
    }
}

#[test]
fn given_stopped_snapshot_when_converted_then_stopped_with_zero_uptime() {
    // Given
    let snapshot = StatusSnapshot::stopped();

    // When
    let status = ServerStatus::from_snapshot(&snapshot, 8081, 8082);

    // Then
    assert_that!(status.status, eq("stopped"));
    assert_that!(status.running, eq(false));
    assert_that!(status.current_model, none());
    assert_that!(status.uptime_seconds, eq(0.0));
    assert_that!(status.port, eq(8081));
    assert_that!(status.engine_port, eq(8082));
    assert_that!(snapshot.is_serving(), eq(false));
}

#[test]
fn given_running_snapshot_when_converted_then_running_with_uptime() {
    // Given
    let snapshot = running_snapshot();

    // When
    let status = ServerStatus::from_snapshot(&snapshot, 8081, 8082);

    // Then
    assert_that!(status.status, eq("running"));
    assert_that!(status.running, eq(true));
    assert_that!(status.current_model, some(eq("model-a")));
    assert_that!(status.uptime_seconds, ge(5.0));
    assert_that!(status.pid, some(eq(4242)));
    assert_that!(status.started_at, some(anything()));
    assert_that!(snapshot.is_serving(), eq(true));
}

#[test]
fn given_unhealthy_process_when_checked_then_running_but_not_serving() {
    // Given
    let snapshot = StatusSnapshot {
        state: EngineState::Unhealthy,
        ..running_snapshot()
    };

    // When
    let status = ServerStatus::from_snapshot(&snapshot, 8081, 8082);

    // Then
    assert_that!(status.running, eq(true));
    assert_that!(snapshot.is_serving(), eq(false));
}
