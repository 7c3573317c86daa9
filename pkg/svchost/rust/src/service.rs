// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Program hosted by the engine, either under the SCM or interactively.
///
/// 1. The SCM (or a terminal) launches the program.
/// 2. The program builds a [`crate::Manager`] and calls `run`, which blocks.
/// 3. `start` is spawned and may run for the whole lifetime of the service.
/// 4. A stop request arrives: the token passed to `start` is cancelled, then
///    `stop` is spawned and given the stop timeout to return.
/// 5. `run` returns and the program should exit shortly after.
///
/// Neither routine may exit the process. A panic in `start` before any stop
/// was requested terminates the process with exit code 2 so the SCM restart
/// policy can kick in; panics after that are only logged.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Cancel `cancel` to ask for a stop; it is also cancelled by the engine
    /// when a stop request arrives.
    ///
    /// Blocking calls hold a runtime worker and can delay `stop` until the
    /// stop timeout; run them under `tokio::task::spawn_blocking`.
    async fn start(&self, cancel: CancellationToken);

    /// Clean up before the process ends. Must return within the stop timeout.
    /// The same rule about blocking calls applies.
    async fn stop(&self);
}
