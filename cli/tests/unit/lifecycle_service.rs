//! Lifecycle service tests: precondition gating, launch, stop and status.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use ndt_ops::application::ports::{Signal, SilentReporter};
use ndt_ops::application::services::lifecycle::{StartAttempt, start, status, stop};
use ndt_ops::domain::error::LifecycleError;
use ndt_ops::domain::lifecycle::{LifecycleState, StartOutcome, StopOutcome};

use crate::helpers::{FakeHost, LIVE_PID, err_output, handle, stale_handle, test_config};

// ── start ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_blocked_by_failed_precondition_launches_nothing() {
    let host = FakeHost::idle();
    host.set_unit("redis-server", "inactive");

    let attempt = start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    match attempt {
        StartAttempt::Blocked {
            preconditions,
            error,
        } => {
            assert_eq!(preconditions.len(), 3);
            assert!(matches!(
                error,
                LifecycleError::PreconditionFailed { ref check, .. } if check == "cache"
            ));
        }
        StartAttempt::Started { .. } => panic!("start should have been blocked"),
    }
    assert!(host.launches.lock().expect("lock").is_empty());
    assert!(
        host.unit_starts.lock().expect("lock").is_empty(),
        "start must not remediate"
    );
}

#[tokio::test]
async fn test_start_blocked_by_invalid_credentials() {
    let host = FakeHost::idle();
    host.respond("aws sts", err_output(255, b"ExpiredToken"));

    let attempt = start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert!(matches!(
        attempt,
        StartAttempt::Blocked {
            error: LifecycleError::PreconditionFailed { .. },
            ..
        }
    ));
    assert!(host.launches.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_start_launches_directly_with_provisioned_environment() {
    let host = FakeHost::idle();
    host.files.lock().expect("lock").insert(
        PathBuf::from("/opt/ndt/config/ndt.env"),
        ("NDT_INSTANCE_ID=i-0abc\nNDT_PORT=8000\n".to_string(), 0o640),
    );

    let attempt = start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    let StartAttempt::Started { outcome, .. } = attempt else {
        panic!("start was blocked");
    };
    let StartOutcome::Direct { handle } = outcome else {
        panic!("expected a direct launch, got {outcome:?}");
    };
    assert_eq!(handle.pid, 4242);
    assert_eq!(host.saved_handle().map(|h| h.pid), Some(4242));

    let launches = host.launches.lock().expect("lock");
    assert_eq!(launches.len(), 1);
    let spec = &launches[0];
    assert_eq!(spec.argv[0], "/opt/ndt/venv/bin/uvicorn");
    assert!(spec.argv.windows(2).any(|w| w == ["--port", "8000"]));
    assert!(
        spec.env
            .contains(&("NDT_INSTANCE_ID".to_string(), "i-0abc".to_string()))
    );
    assert_eq!(spec.log_file, "/opt/ndt/logs/ndt-manager.log");
}

#[tokio::test]
async fn test_start_is_idempotent_while_recorded_process_lives() {
    let host = FakeHost::healthy();

    let attempt = start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert!(matches!(
        attempt,
        StartAttempt::Started {
            outcome: StartOutcome::AlreadyRunning {
                pid: Some(LIVE_PID)
            },
            ..
        }
    ));
    assert!(host.launches.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_start_reclaims_port_from_stale_listener() {
    let mut host = FakeHost::idle();
    host.listening = HashMap::from([(8000, vec![777])]);
    host.alive.lock().expect("lock").insert(777);

    start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert_eq!(host.sent(), vec![(777, Signal::Terminate)]);
    assert_eq!(host.launches.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn test_start_kills_listener_that_ignores_terminate() {
    let mut host = FakeHost::idle();
    host.listening = HashMap::from([(8000, vec![777])]);
    host.stubborn = HashSet::from([777]);
    host.alive.lock().expect("lock").insert(777);

    start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert_eq!(
        host.sent(),
        vec![(777, Signal::Terminate), (777, Signal::Kill)]
    );
}

#[tokio::test]
async fn test_start_clears_stale_handle_before_launch() {
    let host = FakeHost::idle();
    *host.handle.lock().expect("lock") = Some(handle(31337));

    start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert_eq!(host.saved_handle().map(|h| h.pid), Some(4242));
}

#[tokio::test]
async fn test_start_ignores_reused_pid_that_does_not_hold_the_port() {
    let host = FakeHost::idle();
    host.alive.lock().expect("lock").insert(555);
    *host.handle.lock().expect("lock") = Some(stale_handle(555));

    let attempt = start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert!(matches!(
        attempt,
        StartAttempt::Started {
            outcome: StartOutcome::Direct { .. },
            ..
        }
    ));
    assert!(host.sent().is_empty(), "the unrelated process is left alone");
    assert_eq!(host.saved_handle().map(|h| h.pid), Some(4242));
}

#[tokio::test]
async fn test_start_uses_registered_unit() {
    let mut host = FakeHost::idle();
    host.registered = HashSet::from(["ndt-manager".to_string()]);
    host.startable = HashSet::from(["ndt-manager".to_string()]);

    let attempt = start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert!(matches!(
        attempt,
        StartAttempt::Started {
            outcome: StartOutcome::ServiceManager { .. },
            ..
        }
    ));
    assert_eq!(*host.unit_starts.lock().expect("lock"), vec!["ndt-manager"]);
    assert!(host.launches.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_start_with_active_unit_is_a_no_op() {
    let mut host = FakeHost::idle();
    host.registered = HashSet::from(["ndt-manager".to_string()]);
    host.set_unit("ndt-manager", "active");

    let attempt = start(&host, &test_config(), &SilentReporter)
        .await
        .expect("start");

    assert!(matches!(
        attempt,
        StartAttempt::Started {
            outcome: StartOutcome::AlreadyRunning { pid: None },
            ..
        }
    ));
    assert!(host.unit_starts.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_unit_that_fails_to_start_is_a_launch_error() {
    let mut host = FakeHost::idle();
    host.registered = HashSet::from(["ndt-manager".to_string()]);

    let err = start(&host, &test_config(), &SilentReporter)
        .await
        .expect_err("start should fail");

    assert!(matches!(
        err.downcast_ref::<LifecycleError>(),
        Some(LifecycleError::LaunchFailed(_))
    ));
}

// ── stop ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_when_nothing_runs_is_a_no_op() {
    let host = FakeHost::idle();

    let outcome = stop(&host, &test_config(), &SilentReporter)
        .await
        .expect("stop");

    assert_eq!(outcome, StopOutcome::AlreadyStopped);
    assert!(host.sent().is_empty());
    assert!(host.unit_stops.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_stop_terminates_recorded_process_and_clears_handle() {
    let host = FakeHost::healthy();

    let outcome = stop(&host, &test_config(), &SilentReporter)
        .await
        .expect("stop");

    assert_eq!(outcome, StopOutcome::Terminated);
    assert_eq!(host.sent(), vec![(LIVE_PID, Signal::Terminate)]);
    assert!(host.saved_handle().is_none());
}

#[tokio::test]
async fn test_stop_escalates_to_kill_after_grace() {
    let mut host = FakeHost::healthy();
    host.stubborn = HashSet::from([LIVE_PID]);

    let outcome = stop(&host, &test_config(), &SilentReporter)
        .await
        .expect("stop");

    assert_eq!(outcome, StopOutcome::Killed);
    assert_eq!(
        host.sent(),
        vec![(LIVE_PID, Signal::Terminate), (LIVE_PID, Signal::Kill)]
    );
}

#[tokio::test]
async fn test_stop_with_dead_recorded_process_only_clears_handle() {
    let host = FakeHost::healthy();
    host.alive.lock().expect("lock").clear();

    let outcome = stop(&host, &test_config(), &SilentReporter)
        .await
        .expect("stop");

    assert_eq!(outcome, StopOutcome::AlreadyStopped);
    assert!(host.sent().is_empty());
    assert!(host.saved_handle().is_none());
}

#[tokio::test]
async fn test_stop_does_not_signal_reused_pid() {
    let mut host = FakeHost::healthy();
    host.listening.clear();
    *host.handle.lock().expect("lock") = Some(stale_handle(LIVE_PID));

    let outcome = stop(&host, &test_config(), &SilentReporter)
        .await
        .expect("stop");

    assert_eq!(outcome, StopOutcome::AlreadyStopped);
    assert!(host.sent().is_empty());
    assert!(host.saved_handle().is_none());
}

#[tokio::test]
async fn test_stop_signals_old_handle_that_still_holds_the_port() {
    let host = FakeHost::healthy();
    *host.handle.lock().expect("lock") = Some(stale_handle(LIVE_PID));

    let outcome = stop(&host, &test_config(), &SilentReporter)
        .await
        .expect("stop");

    assert_eq!(outcome, StopOutcome::Terminated);
    assert_eq!(host.sent(), vec![(LIVE_PID, Signal::Terminate)]);
}

#[tokio::test]
async fn test_stop_registered_unit_goes_through_service_manager() {
    let mut host = FakeHost::idle();
    host.registered = HashSet::from(["ndt-manager".to_string()]);
    host.set_unit("ndt-manager", "active");

    let outcome = stop(&host, &test_config(), &SilentReporter)
        .await
        .expect("stop");

    assert_eq!(outcome, StopOutcome::ManagerStopped);
    assert_eq!(*host.unit_stops.lock().expect("lock"), vec!["ndt-manager"]);
    assert!(host.sent().is_empty());
}

#[tokio::test]
async fn test_stop_twice_is_safe() {
    let host = FakeHost::healthy();
    let cfg = test_config();

    let first = stop(&host, &cfg, &SilentReporter).await.expect("stop");
    let second = stop(&host, &cfg, &SilentReporter).await.expect("stop");

    assert_eq!(first, StopOutcome::Terminated);
    assert_eq!(second, StopOutcome::AlreadyStopped);
}

// ── status ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_reports_running_service() {
    let host = FakeHost::healthy();

    let snapshot = status(&host, &test_config()).await;

    assert_eq!(snapshot.state, LifecycleState::Running);
    assert!(snapshot.process_alive);
    assert!(snapshot.api.reachable);
    assert!(snapshot.dependencies.cache_reachable);
    assert!(snapshot.dependencies.container_daemon_reachable);
    let resources = snapshot.resources.expect("resources sampled");
    assert!((resources.cpu - 12.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_status_never_remediates() {
    let mut host = FakeHost::idle();
    host.startable = HashSet::from(["redis-server".to_string()]);
    host.set_unit("redis-server", "inactive");

    let snapshot = status(&host, &test_config()).await;

    assert_eq!(snapshot.state, LifecycleState::Stopped);
    assert!(!snapshot.dependencies.cache_reachable);
    assert!(host.unit_starts.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn test_status_prefers_service_manager_state() {
    let mut host = FakeHost::healthy();
    host.registered = HashSet::from(["ndt-manager".to_string()]);
    host.set_unit("ndt-manager", "activating");

    let snapshot = status(&host, &test_config()).await;

    assert_eq!(snapshot.state, LifecycleState::Starting);
    assert_eq!(snapshot.manager_state.as_deref(), Some("activating"));
}

#[tokio::test]
async fn test_status_treats_reused_pid_as_not_running() {
    let mut host = FakeHost::healthy();
    host.listening.clear();
    *host.handle.lock().expect("lock") = Some(stale_handle(LIVE_PID));

    let snapshot = status(&host, &test_config()).await;

    assert!(!snapshot.process_alive);
}

#[tokio::test]
async fn test_status_daemon_unreachable_when_container_service_is_down() {
    let host = FakeHost::healthy();
    host.set_unit("docker", "inactive");

    let snapshot = status(&host, &test_config()).await;

    assert!(!snapshot.dependencies.container_service_active);
    assert!(!snapshot.dependencies.container_daemon_reachable);
    assert!(snapshot.dependencies.cache_reachable);
}
