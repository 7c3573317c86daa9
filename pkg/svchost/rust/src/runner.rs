// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Interactive mode: the service runs from a terminal and the console plays
//! the part of the SCM.

use crate::context::RunContext;
use crate::control::{self, ControlRequest, ServiceHost};
use crate::state::{ExitStatus, Status};
use anyhow::anyhow;
use log::debug;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};

/// Statuses are already logged by the control loop. A stop request is fed
/// straight back into it, since there is nobody else to ask.
struct ConsoleHost {
    requests: UnboundedSender<ControlRequest>,
}

impl ServiceHost for ConsoleHost {
    fn set_status(&self, _status: Status) -> anyhow::Result<()> {
        Ok(())
    }

    fn interrogate(&self, current: Status) -> anyhow::Result<()> {
        debug!("interrogated while {}", current.state);
        Ok(())
    }

    fn request_stop(&self) -> anyhow::Result<()> {
        self.requests
            .send(ControlRequest::Stop)
            .map_err(|_| anyhow!("control loop is gone"))
    }
}

/// Run the service until `shutdown` resolves or the service cancels its own
/// context, whichever comes first.
pub async fn run_interactive<F>(ctx: Arc<RunContext>, shutdown: F) -> ExitStatus
where
    F: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let host = ConsoleHost {
        requests: tx.clone(),
    };

    let forwarder = tokio::spawn(async move {
        shutdown.await;
        let _ = tx.send(ControlRequest::Stop);
    });

    let exit = control::execute(&ctx, &host, rx).await;
    forwarder.abort();
    exit
}
