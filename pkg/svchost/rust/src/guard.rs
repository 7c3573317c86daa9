// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Panic isolation for tasks running user code.
//!
//! [`guarded`] catches a panic at the task boundary and turns it into a
//! [`Fault`]. [`spawn`] then decides what the fault means for the process:
//! before the running context is cancelled it is [`Outcome::Escalated`] and the
//! [`Terminator`] ends the process with [`FAULT_EXIT_CODE`]; after cancellation
//! the shutdown is already converging and the fault is only logged.
//!
//! The backtrace is captured by a panic hook on the panicking thread, which is
//! the thread that unwinds into `catch_unwind`. Panics outside a guard still
//! reach the previously installed hook.

use crate::context::RunContext;
use futures::FutureExt;
use log::{error, warn};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Once};
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Exit code used when user code panics while the service is running.
pub const FAULT_EXIT_CODE: i32 = 2;

/// Final say on process termination after an escalated fault.
pub trait Terminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Exits the process. Used for real runs.
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, code: i32) {
        log::logger().flush();
        std::process::exit(code);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The task returned normally.
    Completed,
    /// The task panicked during shutdown; logged only.
    Recovered,
    /// The task panicked while running; the process must exit with this code.
    Escalated(i32),
}

pub struct Fault {
    message: String,
    backtrace: Option<Backtrace>,
}

impl Fault {
    fn from_payload(payload: Box<dyn Any + Send>, backtrace: Option<Backtrace>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self { message, backtrace }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref backtrace) = self.backtrace {
            write!(f, "\n\n{backtrace}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("message", &self.message)
            .field("backtrace", &self.backtrace.is_some())
            .finish()
    }
}

thread_local! {
    static GUARDED: Cell<bool> = const { Cell::new(false) };
    static LAST_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARDED.get() {
                LAST_TRACE.set(Some(Backtrace::force_capture()));
            } else {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as polling guarded code. Restored on drop, which
/// happens after the hook ran when the poll unwinds.
struct GuardScope {
    previous: bool,
}

impl GuardScope {
    fn enter() -> Self {
        Self {
            previous: GUARDED.replace(true),
        }
    }
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        GUARDED.set(self.previous);
    }
}

/// Marks the thread as guarded for the duration of each poll of the inner
/// future, so the hook records a trace for panics raised by it.
struct Traced<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for Traced<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let _scope = GuardScope::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Run `fut` to completion, resolving to `Err(Fault)` if it panics.
pub async fn guarded<F: Future>(fut: F) -> Result<F::Output, Fault> {
    install_hook();
    AssertUnwindSafe(Traced {
        inner: Box::pin(fut),
    })
    .catch_unwind()
    .await
    .map_err(|payload| Fault::from_payload(payload, LAST_TRACE.take()))
}

fn classify(ctx: &RunContext) -> Outcome {
    if ctx.is_cancelled() {
        Outcome::Recovered
    } else {
        Outcome::Escalated(FAULT_EXIT_CODE)
    }
}

/// Spawn `fut` as a guarded task named `task`. The handle resolves once the
/// task is done and, for escalated faults, after the terminator was invoked.
pub(crate) fn spawn<F>(task: &'static str, ctx: Arc<RunContext>, fut: F) -> JoinHandle<Outcome>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let fault = match guarded(fut).await {
            Ok(()) => return Outcome::Completed,
            Err(fault) => fault,
        };
        error!("[{}] panic in {task}: {fault}", ctx.name());
        let outcome = classify(&ctx);
        match outcome {
            Outcome::Escalated(code) => {
                error!(
                    "[{}] {task} failed while running, exiting with code {code}",
                    ctx.name()
                );
                ctx.terminator().terminate(code);
            }
            _ => warn!(
                "[{}] {task} panicked after stop was requested, shutdown continues",
                ctx.name()
            ),
        }
        outcome
    })
}
