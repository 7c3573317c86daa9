// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

//! Host a long-running program as a Windows service, or run the very same
//! program from a terminal.
//!
//! A program implements [`Service`], hands it to a [`Manager`] together with
//! a [`Config`], then calls [`Manager::run`] or one of the administrative
//! operations selected with [`ServiceArgs`].

pub mod admin;
pub mod cli;
pub mod config;
pub mod control;
mod context;
pub mod error;
pub mod guard;
mod manager;
mod platform;
pub mod registry;
pub mod runner;
mod service;
mod signals;
pub mod state;
mod stop;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cli::{Action, ServiceArgs};
pub use config::Config;
pub use context::RunContext;
pub use error::{Error, Result};
pub use manager::Manager;
pub use platform::{FALLBACK_STOP_TIMEOUT, SystemRegistry, default_stop_timeout, interactive};
pub use service::Service;
pub use state::{ExitStatus, ServiceState, Status};
pub use tokio_util::sync::CancellationToken;
