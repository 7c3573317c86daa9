// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Start routine launched, not yet reported running.
    StartPending,
    /// Accepting stop and shutdown requests.
    Running,
    /// Running context cancelled, stop routine in flight.
    StopPending,
    /// Terminal. The hosting call returns after this.
    Stopped,
}

impl ServiceState {
    pub fn is_terminal(self) -> bool {
        self == ServiceState::Stopped
    }

    /// Transitions only move forward, one step at a time.
    pub(crate) fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (StartPending, Running) | (Running, StopPending) | (StopPending, Stopped)
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::StartPending => write!(f, "start pending"),
            ServiceState::Running => write!(f, "running"),
            ServiceState::StopPending => write!(f, "stop pending"),
            ServiceState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Value handed back to the host when a run concludes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitStatus {
    /// `code` is service specific rather than a platform error code.
    pub service_specific: bool,
    pub code: u32,
}

impl ExitStatus {
    pub const NEUTRAL: ExitStatus = ExitStatus {
        service_specific: false,
        code: 0,
    };
}

/// One status report sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: ServiceState,
    /// Stop and shutdown requests are accepted.
    pub accepts_stop: bool,
    pub exit: ExitStatus,
}

impl Status {
    pub fn new(state: ServiceState) -> Self {
        Self {
            state,
            accepts_stop: state == ServiceState::Running,
            exit: ExitStatus::NEUTRAL,
        }
    }
}
