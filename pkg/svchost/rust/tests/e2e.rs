// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![cfg(unix)]

mod helpers;

use helpers::{DemoHandle, FULL_LIFECYCLE};
use nix::sys::signal::Signal;
use std::path::Path;
use std::time::{Duration, Instant};

// ===========================================================================
// Group 1: Stop requests
// ===========================================================================

#[test]
fn test_sigterm_runs_full_lifecycle() {
    let mut demo = DemoHandle::start(&[]);
    assert!(demo.wait_for_log_default("status: running"));
    assert!(demo.wait_for_log_default("tick 2"), "ticker should be ticking");

    demo.send_signal(Signal::SIGTERM);
    let status = demo.wait_default();

    assert!(status.success(), "demo should exit cleanly, got {status:?}");
    assert_eq!(demo.reported_states(), FULL_LIFECYCLE);
    assert_eq!(demo.count_log_matches("received SIGTERM"), 1);
    assert_eq!(demo.count_log_matches("stop routine done"), 1);
    assert_eq!(demo.count_log_matches("ticker stopped after"), 1);
}

#[test]
fn test_sigint_is_handled_like_sigterm() {
    let mut demo = DemoHandle::start(&[]);
    assert!(demo.wait_for_log_default("status: running"));

    demo.send_signal(Signal::SIGINT);
    let status = demo.wait_default();

    assert!(status.success(), "demo should exit cleanly, got {status:?}");
    assert_eq!(demo.reported_states(), FULL_LIFECYCLE);
    assert_eq!(demo.count_log_matches("received SIGINT"), 1);
}

#[test]
fn test_self_cancel_runs_single_stop_sequence() {
    let mut demo = DemoHandle::start(&["--exit-after-ms", "200"]);
    let status = demo.wait_default();

    assert!(status.success(), "demo should exit cleanly, got {status:?}");
    assert_eq!(demo.reported_states(), FULL_LIFECYCLE);
    assert_eq!(demo.count_log_matches("service cancelled its context"), 1);
    assert_eq!(demo.count_log_matches("stop routine running"), 1);
}

// ===========================================================================
// Group 2: Stop timeout
// ===========================================================================

#[test]
fn test_hung_stop_is_abandoned_after_timeout() {
    let mut demo = DemoHandle::start(&["--stop-delay-ms", "60000", "--stop-timeout-ms", "300"]);
    assert!(demo.wait_for_log_default("status: running"));

    let signalled = Instant::now();
    demo.send_signal(Signal::SIGTERM);
    let status = demo.wait_default();
    let took = signalled.elapsed();

    assert!(status.success(), "demo should exit cleanly, got {status:?}");
    assert!(took >= Duration::from_millis(300), "exited too early: {took:?}");
    assert!(took < Duration::from_secs(5), "exited too late: {took:?}");
    assert_eq!(demo.reported_states(), FULL_LIFECYCLE);
    assert_eq!(demo.count_log_matches("abandoning it"), 1);
    assert_eq!(demo.count_log_matches("stop routine done"), 0);
}

// ===========================================================================
// Group 3: Panics
// ===========================================================================

#[test]
fn test_panic_while_running_exits_with_code_2() {
    let mut demo = DemoHandle::start(&["--fail-after-ms", "100"]);
    let status = demo.wait_default();

    assert_eq!(status.code(), Some(2), "got {status:?}");
    assert_eq!(demo.count_log_matches("panic in start: ticker gave up"), 1);
    assert_eq!(demo.count_log_matches("exiting with code 2"), 1);
    assert!(!demo.reported_states().contains(&"stopped".to_string()));
}

#[test]
fn test_panic_in_stop_is_suppressed() {
    let mut demo = DemoHandle::start(&["--fail-in-stop"]);
    assert!(demo.wait_for_log_default("status: running"));

    demo.send_signal(Signal::SIGTERM);
    let status = demo.wait_default();

    assert!(status.success(), "demo should exit cleanly, got {status:?}");
    assert_eq!(demo.reported_states(), FULL_LIFECYCLE);
    assert_eq!(demo.count_log_matches("panic in stop: stop routine failed"), 1);
    assert_eq!(demo.count_log_matches("panicked after stop was requested"), 1);
}

// ===========================================================================
// Group 4: Startup and administration
// ===========================================================================

#[test]
fn test_working_directory_is_executable_dir() {
    let bin = std::fs::canonicalize(env!("CARGO_BIN_EXE_dd-svchost-demo")).unwrap();
    let bin_dir = bin.parent().unwrap().display().to_string();

    let mut demo = DemoHandle::start(&[]);
    assert!(demo.wait_for_log_default("status: running"));
    demo.send_signal(Signal::SIGTERM);
    assert!(demo.wait_default().success());

    assert_eq!(
        demo.count_log_matches(&format!("working directory: {bin_dir}")),
        1
    );
}

#[test]
fn test_config_file_sets_name_and_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.yaml");
    std::fs::write(&path, "name: from-yaml\ntimeout_stop_ms: 300\n").unwrap();

    let mut demo = DemoHandle::start(&[
        "--config",
        path.to_str().unwrap(),
        "--stop-delay-ms",
        "60000",
    ]);
    assert!(demo.wait_for_log_default("[from-yaml] status: running"));
    demo.send_signal(Signal::SIGTERM);
    assert!(demo.wait_default().success());

    assert_eq!(demo.count_log_matches("still running after 300ms"), 1);
}

#[test]
fn test_admin_action_unsupported_outside_windows() {
    let mut demo = DemoHandle::start(&["--svc", "install"]);
    let status = demo.wait_default();

    assert_eq!(status.code(), Some(1), "got {status:?}");
    assert!(demo.count_log_matches("not supported on this platform") >= 1);
    assert!(demo.reported_states().is_empty());
}

#[test]
fn test_unknown_admin_action_is_rejected() {
    let mut demo = DemoHandle::start(&["--svc", "pause"]);
    let status = demo.wait_default();

    assert!(!status.success());
    assert!(demo.reported_states().is_empty());
}

#[test]
fn test_missing_config_file_fails() {
    let missing = Path::new("/nonexistent/dd-svchost/svc.yaml");
    let mut demo = DemoHandle::start(&["--config", missing.to_str().unwrap()]);
    let status = demo.wait_default();

    assert_eq!(status.code(), Some(1), "got {status:?}");
    assert!(demo.count_log_matches("/nonexistent/dd-svchost/svc.yaml") >= 1);
}
