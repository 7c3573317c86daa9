// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Access to the operating system's service registry.

use crate::config::Config;
use crate::error::Result;
use crate::state::ServiceState;
use std::path::Path;
use std::time::Duration;

/// A service entry opened in the registry.
pub trait RegisteredService {
    /// Ask the service manager to launch the service.
    fn start(&self) -> Result<()>;

    /// Send a stop request. Returns the state reported right after.
    fn stop(&self) -> Result<ServiceState>;

    fn query(&self) -> Result<ServiceState>;

    /// Register a restart action after `delay`, applied to crashes and
    /// to non-zero exits alike.
    fn set_restart_on_failure(&self, delay: Duration) -> Result<()>;

    fn delete(self) -> Result<()>
    where
        Self: Sized;
}

pub trait ServiceRegistry {
    type Service: RegisteredService;

    /// `Ok(None)` when no service with that name is registered.
    fn open(&self, name: &str) -> Result<Option<Self::Service>>;

    /// Register an auto-start service running `executable` with the
    /// arguments, account and dependencies from `config`.
    fn create(&self, config: &Config, executable: &Path) -> Result<Self::Service>;
}
