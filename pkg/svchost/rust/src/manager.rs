// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::admin;
use crate::cli::Action;
use crate::config::Config;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::guard::ProcessExit;
use crate::platform::{self, SystemRegistry};
use crate::registry::ServiceRegistry;
use crate::runner;
use crate::service::Service;
use crate::signals::ShutdownSignals;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

struct Registration {
    config: Config,
    service: Arc<dyn Service>,
    stop_timeout: Duration,
}

/// Entry point of a hosted program: register one [`Service`], then either
/// [`run`](Manager::run) it or perform an administrative [`Action`] on it.
pub struct Manager<R = SystemRegistry> {
    registry: R,
    registration: Option<Registration>,
}

impl Manager {
    pub fn new() -> Self {
        Self::with_registry(SystemRegistry)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ServiceRegistry> Manager<R> {
    pub fn with_registry(registry: R) -> Self {
        Self {
            registry,
            registration: None,
        }
    }

    /// Register the service and its settings. Allowed once per manager.
    ///
    /// A zero `timeout_stop` is replaced by the platform's stop timeout.
    pub fn initialize<S: Service>(&mut self, service: S, config: Config) -> Result<()> {
        self.initialize_with_default(Arc::new(service), config, platform::default_stop_timeout())
    }

    fn initialize_with_default(
        &mut self,
        service: Arc<dyn Service>,
        config: Config,
        platform_default: Duration,
    ) -> Result<()> {
        if self.registration.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        if config.name.is_empty() {
            return Err(Error::EmptyName);
        }
        let stop_timeout = config.effective_stop_timeout(platform_default);
        debug!("[{}] stop timeout set to {}ms", config.name, stop_timeout.as_millis());
        self.registration = Some(Registration {
            config,
            service,
            stop_timeout,
        });
        Ok(())
    }

    fn registration(&self) -> Result<&Registration> {
        self.registration.as_ref().ok_or(Error::NotInitialized)
    }

    pub fn config(&self) -> Result<&Config> {
        Ok(&self.registration()?.config)
    }

    pub fn stop_timeout(&self) -> Result<Duration> {
        Ok(self.registration()?.stop_timeout)
    }

    /// Host the service until it stops. Under the service manager this
    /// talks to the SCM; from a terminal, SIGINT/SIGTERM (Ctrl-C and
    /// friends on Windows) stand in for the stop request.
    ///
    /// The working directory is switched to the executable's directory first,
    /// since the SCM starts services in the system directory.
    pub fn run(&self) -> Result<()> {
        let registration = self.registration()?;
        enter_executable_dir()?;

        let ctx = RunContext::new(
            registration.config.name.as_str(),
            Arc::clone(&registration.service),
            registration.stop_timeout,
            Arc::new(ProcessExit),
        );

        if !platform::interactive() {
            info!("[{}] running under the service manager", ctx.name());
            return platform::run_service(ctx);
        }

        info!("[{}] running interactively", ctx.name());
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let exit = runtime.block_on(async {
            let signals = ShutdownSignals::register()?;
            let name = ctx.name().to_string();
            let shutdown = async move {
                let signal = signals.recv().await;
                info!("[{name}] received {signal}");
            };
            Ok::<_, Error>(runner::run_interactive(ctx, shutdown).await)
        })?;
        // Abandoned stop routines must not hold the process.
        runtime.shutdown_background();
        debug!("interactive run finished with {exit:?}");
        Ok(())
    }

    pub fn install(&self) -> Result<()> {
        admin::install(&self.registry, &self.registration()?.config)
    }

    pub fn uninstall(&self) -> Result<()> {
        admin::uninstall(&self.registry, &self.registration()?.config)
    }

    pub fn start(&self) -> Result<()> {
        admin::start(&self.registry, &self.registration()?.config)
    }

    /// Stop the installed service and wait for it, bounded by the stop timeout.
    pub fn stop(&self) -> Result<()> {
        let registration = self.registration()?;
        admin::stop(&self.registry, &registration.config, registration.stop_timeout)
    }

    pub fn restart(&self) -> Result<()> {
        let registration = self.registration()?;
        admin::restart(&self.registry, &registration.config, registration.stop_timeout)
    }

    pub fn run_action(&self, action: Action) -> Result<()> {
        match action {
            Action::Install => self.install(),
            Action::Uninstall => self.uninstall(),
            Action::Start => self.start(),
            Action::Stop => self.stop(),
            Action::Restart => self.restart(),
        }
    }
}

fn enter_executable_dir() -> Result<()> {
    let exe = std::env::current_exe()?;
    if let Some(dir) = exe.parent() {
        std::env::set_current_dir(dir)?;
        info!("working directory: {}", dir.display());
    }
    Ok(())
}
