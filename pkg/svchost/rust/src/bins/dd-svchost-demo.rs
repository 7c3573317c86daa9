// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Sample program hosted by dd-svchost: ticks until asked to stop.
//!
//! The failure flags exist so the lifecycle can be exercised end to end.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use dd_agent_log::Logger;
use dd_svchost::{CancellationToken, Config, Manager, Service, ServiceArgs};
use log::{LevelFilter, debug, info};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Parser)]
#[command(name = "dd-svchost-demo", version, about)]
struct Args {
    #[command(flatten)]
    service: ServiceArgs,

    /// YAML service configuration. Overrides --name
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service name used without --config
    #[arg(long, default_value = "dd-svchost-demo")]
    name: String,

    /// Budget for the stop routine, in milliseconds
    #[arg(long)]
    stop_timeout_ms: Option<u64>,

    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Cancel the running context after this long
    #[arg(long)]
    exit_after_ms: Option<u64>,

    /// Panic in the start routine after this long
    #[arg(long)]
    fail_after_ms: Option<u64>,

    /// Time the stop routine takes
    #[arg(long, default_value_t = 0)]
    stop_delay_ms: u64,

    /// Panic in the stop routine
    #[arg(long)]
    fail_in_stop: bool,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Also append log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

struct Ticker {
    tick: Duration,
    exit_after: Option<Duration>,
    fail_after: Option<Duration>,
    stop_delay: Duration,
    fail_in_stop: bool,
}

impl From<&Args> for Ticker {
    fn from(args: &Args) -> Self {
        Self {
            tick: Duration::from_millis(args.tick_ms.max(1)),
            exit_after: args.exit_after_ms.map(Duration::from_millis),
            fail_after: args.fail_after_ms.map(Duration::from_millis),
            stop_delay: Duration::from_millis(args.stop_delay_ms),
            fail_in_stop: args.fail_in_stop,
        }
    }
}

#[async_trait]
impl Service for Ticker {
    async fn start(&self, cancel: CancellationToken) {
        info!("ticker started, one tick every {}ms", self.tick.as_millis());
        let began = Instant::now();
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            ticks += 1;
            debug!("tick {ticks}");

            let elapsed = began.elapsed();
            if self.fail_after.is_some_and(|limit| elapsed >= limit) {
                panic!("ticker gave up after {ticks} tick(s)");
            }
            if self.exit_after.is_some_and(|limit| elapsed >= limit) {
                info!("ticker done, cancelling its context");
                cancel.cancel();
            }
        }
        info!("ticker stopped after {ticks} tick(s)");
    }

    async fn stop(&self) {
        info!("stop routine running");
        if self.fail_in_stop {
            panic!("stop routine failed");
        }
        tokio::time::sleep(self.stop_delay).await;
        info!("stop routine done");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger = Logger::new("SVCHOST", args.log_level);
    if let Some(ref path) = args.log_file {
        logger = logger
            .with_file(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    logger.init().context("installing logger")?;

    let mut config = match args.config {
        Some(ref path) => Config::from_yaml_file(path)?,
        None => Config::new(args.name.as_str()),
    };
    if let Some(ms) = args.stop_timeout_ms {
        config.timeout_stop = Duration::from_millis(ms);
    }

    info!(
        "dd-svchost-demo {} starting (interactive: {})",
        env!("CARGO_PKG_VERSION"),
        dd_svchost::interactive()
    );

    let mut manager = Manager::new();
    manager.initialize(Ticker::from(&args), config)?;

    match args.service.action {
        Some(action) => {
            manager.run_action(action).with_context(|| format!("{action} failed"))?;
            info!("{action} done");
        }
        None => {
            manager.run()?;
            info!("dd-svchost-demo exiting");
        }
    }
    Ok(())
}
