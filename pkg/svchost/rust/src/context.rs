// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::guard::Terminator;
use crate::service::Service;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// State shared by the control loop and the tasks running user code for one run.
pub struct RunContext {
    name: String,
    service: Arc<dyn Service>,
    token: CancellationToken,
    stop_timeout: Duration,
    terminator: Arc<dyn Terminator>,
}

impl RunContext {
    pub fn new(
        name: impl Into<String>,
        service: Arc<dyn Service>,
        stop_timeout: Duration,
        terminator: Arc<dyn Terminator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            service,
            token: CancellationToken::new(),
            stop_timeout,
            terminator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Idempotent; once cancelled the context stays cancelled.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    pub(crate) fn service(&self) -> Arc<dyn Service> {
        Arc::clone(&self.service)
    }

    pub(crate) fn terminator(&self) -> &dyn Terminator {
        self.terminator.as_ref()
    }
}
