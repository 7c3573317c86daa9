// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::context::RunContext;
use crate::guard;
use log::{debug, warn};
use std::sync::Arc;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopOutcome {
    /// The stop routine returned, or panicked and was recovered.
    Completed,
    /// The stop timeout elapsed first. The routine keeps running unobserved.
    TimedOut,
}

/// Run the service's stop routine as a guarded task and wait for it, at most
/// for the context's stop timeout.
pub(crate) async fn stop_within(ctx: &Arc<RunContext>) -> StopOutcome {
    let service = ctx.service();
    let handle = guard::spawn("stop", Arc::clone(ctx), async move {
        service.stop().await;
    });

    let limit = ctx.stop_timeout();
    match timeout(limit, handle).await {
        Ok(Ok(outcome)) => {
            debug!("[{}] stop routine finished: {outcome:?}", ctx.name());
            StopOutcome::Completed
        }
        Ok(Err(e)) => {
            warn!("[{}] stop task did not finish: {e}", ctx.name());
            StopOutcome::Completed
        }
        Err(_) => {
            warn!(
                "[{}] stop routine still running after {}ms, abandoning it",
                ctx.name(),
                limit.as_millis()
            );
            StopOutcome::TimedOut
        }
    }
}
