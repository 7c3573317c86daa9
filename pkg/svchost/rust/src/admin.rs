// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Install, uninstall, start, stop and restart a registered service.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::{RegisteredService, ServiceRegistry};
use crate::state::ServiceState;
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};

/// How often `stop` checks whether the service reached stopped.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn open_existing<R: ServiceRegistry>(registry: &R, name: &str) -> Result<R::Service> {
    registry
        .open(name)?
        .ok_or_else(|| Error::NotInstalled(name.to_string()))
}

pub fn install<R: ServiceRegistry>(registry: &R, config: &Config) -> Result<()> {
    let executable = config.exec_path()?;
    if registry.open(&config.name)?.is_some() {
        return Err(Error::AlreadyExists(config.name.clone()));
    }

    let service = registry.create(config, &executable)?;
    info!(
        "[{}] installed, running {}",
        config.name,
        executable.display()
    );

    if !config.restart_on_failure.is_zero() {
        service.set_restart_on_failure(config.restart_on_failure)?;
        info!(
            "[{}] restarts {}ms after a failure",
            config.name,
            config.restart_on_failure.as_millis()
        );
    }
    Ok(())
}

pub fn uninstall<R: ServiceRegistry>(registry: &R, config: &Config) -> Result<()> {
    open_existing(registry, &config.name)?.delete()?;
    info!("[{}] uninstalled", config.name);
    Ok(())
}

pub fn start<R: ServiceRegistry>(registry: &R, config: &Config) -> Result<()> {
    open_existing(registry, &config.name)?.start()?;
    info!("[{}] start requested", config.name);
    Ok(())
}

/// Stop the service and wait until it reports stopped. Gives up quietly a
/// little after `stop_timeout`, as the service manager will have ended the
/// process by then anyway.
pub fn stop<R: ServiceRegistry>(
    registry: &R,
    config: &Config,
    stop_timeout: Duration,
) -> Result<()> {
    let service = open_existing(registry, &config.name)?;
    stop_and_wait(&service, &config.name, stop_timeout)
}

pub fn restart<R: ServiceRegistry>(
    registry: &R,
    config: &Config,
    stop_timeout: Duration,
) -> Result<()> {
    let service = open_existing(registry, &config.name)?;
    stop_and_wait(&service, &config.name, stop_timeout)?;
    service.start()?;
    info!("[{}] restarted", config.name);
    Ok(())
}

fn stop_and_wait<S: RegisteredService>(
    service: &S,
    name: &str,
    stop_timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + stop_timeout + POLL_INTERVAL * 2;
    let mut state = service.stop()?;
    while state != ServiceState::Stopped {
        if Instant::now() >= deadline {
            warn!(
                "[{name}] still {state} after {}ms, not waiting any longer",
                stop_timeout.as_millis()
            );
            return Ok(());
        }
        thread::sleep(POLL_INTERVAL);
        state = service.query()?;
    }
    info!("[{name}] stopped");
    Ok(())
}
