// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("name field is required")]
    EmptyName,

    #[error("service was not initialized")]
    NotInitialized,

    #[error("service was already initialized")]
    AlreadyInitialized,

    #[error("service is already hosted by this process")]
    AlreadyRunning,

    #[error("service '{0}' already exists")]
    AlreadyExists(String),

    #[error("service '{0}' is not installed")]
    NotInstalled(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("service registry: {0}")]
    Registry(#[source] BoxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{context}: {source}")]
    Config {
        context: String,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[cfg(any(windows, test))]
    pub(crate) fn registry(err: impl Into<BoxError>) -> Self {
        Error::Registry(err.into())
    }
}
