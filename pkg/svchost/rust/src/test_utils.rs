// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use crate::context::RunContext;
use crate::control::{ControlRequest, ServiceHost};
use crate::guard::Terminator;
use crate::service::Service;
use crate::state::{ServiceState, Status};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Records exit codes instead of exiting the test binary.
#[derive(Default)]
pub(crate) struct RecordingTerminator {
    codes: Mutex<Vec<i32>>,
}

impl RecordingTerminator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

pub(crate) fn context_with(terminator: Arc<RecordingTerminator>) -> Arc<RunContext> {
    RunContext::new(
        "test-svc",
        Arc::new(ScriptedService::default()),
        Duration::from_secs(1),
        terminator,
    )
}

pub(crate) fn context_for(
    service: Arc<ScriptedService>,
    stop_timeout: Duration,
    terminator: Arc<RecordingTerminator>,
) -> Arc<RunContext> {
    RunContext::new("test-svc", service, stop_timeout, terminator)
}

/// Service whose behavior is set per test.
#[derive(Default)]
pub(crate) struct ScriptedService {
    /// `start` cancels its own token this many times right away.
    pub cancel_self: usize,
    pub start_panics: bool,
    pub stop_delay: Duration,
    pub stop_hangs: bool,
    pub stop_panics: bool,
    pub(crate) token: Mutex<Option<CancellationToken>>,
    pub(crate) events: Mutex<Vec<String>>,
    pub(crate) stop_calls: AtomicUsize,
}

impl ScriptedService {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

#[async_trait]
impl Service for ScriptedService {
    async fn start(&self, cancel: CancellationToken) {
        *self.token.lock().unwrap() = Some(cancel.clone());
        self.record("start");
        if self.start_panics {
            panic!("start exploded");
        }
        for _ in 0..self.cancel_self {
            cancel.cancel();
        }
        cancel.cancelled().await;
        self.record("start observed cancel");
    }

    async fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        let cancelled = self
            .token
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled);
        self.record(format!("stop (context cancelled={cancelled})"));
        if self.stop_panics {
            panic!("stop exploded");
        }
        if self.stop_hangs {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(self.stop_delay).await;
        self.record("stop done");
    }
}

/// Host recording every report, with the time it was made.
pub(crate) struct RecordingHost {
    statuses: Mutex<Vec<(Status, Instant)>>,
    interrogations: Mutex<Vec<ServiceState>>,
    stop_requests: AtomicUsize,
    /// Where `request_stop` delivers the resulting Stop, like the SCM would.
    forward: Option<UnboundedSender<ControlRequest>>,
}

impl RecordingHost {
    pub fn new(forward: UnboundedSender<ControlRequest>) -> Arc<Self> {
        Arc::new(Self::build(Some(forward)))
    }

    /// `request_stop` fails, as when the SCM cannot be reached.
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    fn build(forward: Option<UnboundedSender<ControlRequest>>) -> Self {
        Self {
            statuses: Mutex::new(Vec::new()),
            interrogations: Mutex::new(Vec::new()),
            stop_requests: AtomicUsize::new(0),
            forward,
        }
    }

    pub fn states(&self) -> Vec<ServiceState> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .map(|(status, _)| status.state)
            .collect()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .map(|(status, _)| *status)
            .collect()
    }

    pub fn reported_at(&self, state: ServiceState) -> Instant {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .find(|(status, _)| status.state == state)
            .map(|(_, at)| *at)
            .unwrap_or_else(|| panic!("{state} was never reported"))
    }

    pub fn interrogations(&self) -> Vec<ServiceState> {
        self.interrogations.lock().unwrap().clone()
    }

    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }
}

impl ServiceHost for RecordingHost {
    fn set_status(&self, status: Status) -> Result<()> {
        self.statuses.lock().unwrap().push((status, Instant::now()));
        Ok(())
    }

    fn interrogate(&self, current: Status) -> Result<()> {
        self.interrogations.lock().unwrap().push(current.state);
        Ok(())
    }

    fn request_stop(&self) -> Result<()> {
        self.stop_requests.fetch_add(1, Ordering::SeqCst);
        let forward = self
            .forward
            .as_ref()
            .ok_or_else(|| anyhow!("service manager unreachable"))?;
        forward.send(ControlRequest::Stop)?;
        Ok(())
    }
}
