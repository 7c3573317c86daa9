// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::sync::OnceLock;
use std::time::Duration;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use self::windows as imp;

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
use self::unsupported as imp;

pub(crate) use imp::run_service;
pub use imp::SystemRegistry;

/// Used when the OS does not say how long services get to stop.
pub const FALLBACK_STOP_TIMEOUT: Duration = Duration::from_millis(20_000);

static INTERACTIVE: OnceLock<bool> = OnceLock::new();
static DEFAULT_STOP_TIMEOUT: OnceLock<Duration> = OnceLock::new();

/// True when the process was launched from a terminal rather than by the
/// service manager. Always true outside Windows. Computed once.
pub fn interactive() -> bool {
    *INTERACTIVE.get_or_init(imp::detect_interactive)
}

/// How long the OS waits for services when shutting down: the
/// `WaitToKillServiceTimeout` system setting, or 20s. Computed once.
pub fn default_stop_timeout() -> Duration {
    *DEFAULT_STOP_TIMEOUT.get_or_init(|| {
        imp::read_wait_to_kill()
            .as_deref()
            .and_then(parse_wait_to_kill)
            .unwrap_or(FALLBACK_STOP_TIMEOUT)
    })
}

/// The setting is stored as a string of milliseconds.
pub(crate) fn parse_wait_to_kill(raw: &str) -> Option<Duration> {
    raw.trim_end_matches('\0')
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_millis)
}
