// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Without a service manager every run is interactive and the registry
//! operations fail with [`Error::Unsupported`].

use crate::config::Config;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::registry::{RegisteredService, ServiceRegistry};
use crate::state::ServiceState;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn detect_interactive() -> bool {
    true
}

pub(crate) fn read_wait_to_kill() -> Option<String> {
    None
}

pub(crate) fn run_service(_ctx: Arc<RunContext>) -> Result<()> {
    Err(Error::Unsupported("running under a service manager"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRegistry;

/// Never constructed: opening a service always fails here.
pub enum NoService {}

impl RegisteredService for NoService {
    fn start(&self) -> Result<()> {
        match *self {}
    }

    fn stop(&self) -> Result<ServiceState> {
        match *self {}
    }

    fn query(&self) -> Result<ServiceState> {
        match *self {}
    }

    fn set_restart_on_failure(&self, _delay: Duration) -> Result<()> {
        match *self {}
    }

    fn delete(self) -> Result<()> {
        match self {}
    }
}

impl ServiceRegistry for SystemRegistry {
    type Service = NoService;

    fn open(&self, _name: &str) -> Result<Option<NoService>> {
        Err(Error::Unsupported("the service registry"))
    }

    fn create(&self, _config: &Config, _executable: &Path) -> Result<NoService> {
        Err(Error::Unsupported("the service registry"))
    }
}
