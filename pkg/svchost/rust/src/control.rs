// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! The control loop shared by SCM and interactive runs.
//!
//! ```text
//! start pending --> running --> stop pending --> stopped
//!                      ^             |
//!                      |             +-- context cancelled, stop routine
//!                      |                 awaited up to the stop timeout
//!                      +-- Stop/Shutdown request, or the service cancelled
//!                          its own context and the host sent Stop back
//! ```

use crate::context::RunContext;
use crate::guard;
use crate::state::{ExitStatus, ServiceState, Status};
use crate::stop::{self, StopOutcome};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Request delivered by the host to a running service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Report the current status again.
    Interrogate,
    Stop,
    /// The machine is shutting down. Handled like `Stop`.
    Shutdown,
}

/// Whatever runs the service: the SCM or a terminal.
pub trait ServiceHost: Send + Sync {
    /// Publish a lifecycle transition.
    fn set_status(&self, status: Status) -> anyhow::Result<()>;

    /// Answer an interrogate request with the current status.
    fn interrogate(&self, current: Status) -> anyhow::Result<()>;

    /// Ask the host to send a Stop request back to this service.
    fn request_stop(&self) -> anyhow::Result<()>;
}

/// Publishes transitions in order and refuses anything else.
struct Reporter<'a, H: ?Sized> {
    host: &'a H,
    name: &'a str,
    current: ServiceState,
}

impl<'a, H: ServiceHost + ?Sized> Reporter<'a, H> {
    fn begin(host: &'a H, name: &'a str) -> Self {
        let reporter = Self {
            host,
            name,
            current: ServiceState::StartPending,
        };
        reporter.publish(Status::new(ServiceState::StartPending));
        reporter
    }

    fn transition(&mut self, next: ServiceState) {
        if !self.current.can_transition_to(next) {
            warn!(
                "[{}] ignoring invalid transition {} -> {next}",
                self.name, self.current
            );
            return;
        }
        self.current = next;
        self.publish(Status::new(next));
    }

    fn publish(&self, status: Status) {
        info!("[{}] status: {}", self.name, status.state);
        if let Err(e) = self.host.set_status(status) {
            warn!(
                "[{}] failed to report {} to the host: {e:#}",
                self.name, status.state
            );
        }
    }

    fn interrogate(&self) {
        if let Err(e) = self.host.interrogate(Status::new(self.current)) {
            warn!("[{}] failed to answer interrogate: {e:#}", self.name);
        }
    }
}

enum Event {
    Request(ControlRequest),
    /// The request stream closed; no further stop can ever arrive.
    HostGone,
    /// The service cancelled its own context.
    ForceStop,
}

/// Host one run of the service until it reaches [`ServiceState::Stopped`].
///
/// The start routine is spawned under the panic guard right after start
/// pending is reported. A stop sequence runs exactly once, whatever mix of
/// requests and self-cancellations leads to it.
pub async fn execute<H>(
    ctx: &Arc<RunContext>,
    host: &H,
    mut requests: UnboundedReceiver<ControlRequest>,
) -> ExitStatus
where
    H: ServiceHost + ?Sized,
{
    let mut reporter = Reporter::begin(host, ctx.name());

    let service = ctx.service();
    let token = ctx.token().clone();
    // Detached: nothing waits for start to finish.
    drop(guard::spawn("start", Arc::clone(ctx), async move {
        service.start(token).await;
    }));

    reporter.transition(ServiceState::Running);

    // Fires at most once per run.
    let mut force_stop_armed = true;
    loop {
        let event = tokio::select! {
            biased;
            request = requests.recv() => request.map_or(Event::HostGone, Event::Request),
            _ = ctx.token().cancelled(), if force_stop_armed => Event::ForceStop,
        };

        match event {
            Event::Request(ControlRequest::Interrogate) => reporter.interrogate(),
            Event::Request(request @ (ControlRequest::Stop | ControlRequest::Shutdown)) => {
                info!("[{}] received {request:?} request", ctx.name());
                break;
            }
            Event::HostGone => {
                warn!("[{}] control requests closed, stopping", ctx.name());
                break;
            }
            Event::ForceStop => {
                force_stop_armed = false;
                info!("[{}] service cancelled its context, asking host to stop", ctx.name());
                if let Err(e) = host.request_stop() {
                    warn!("[{}] host refused stop request: {e:#}, stopping locally", ctx.name());
                    break;
                }
            }
        }
    }

    reporter.transition(ServiceState::StopPending);
    ctx.cancel();
    if stop::stop_within(ctx).await == StopOutcome::TimedOut {
        info!("[{}] reporting stopped without waiting for stop", ctx.name());
    }
    reporter.transition(ServiceState::Stopped);

    ExitStatus::NEUTRAL
}
