// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::Error;
use clap::{Args, ValueEnum};
use std::fmt;
use std::str::FromStr;

/// Administrative operation on the installed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Install,
    Uninstall,
    Start,
    Stop,
    Restart,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Install => "install",
            Action::Uninstall => "uninstall",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Action::Install),
            "uninstall" => Ok(Action::Uninstall),
            "start" => Ok(Action::Start),
            "stop" => Ok(Action::Stop),
            "restart" => Ok(Action::Restart),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// Flag to flatten into a program's own clap parser.
#[derive(Debug, Clone, Default, Args)]
pub struct ServiceArgs {
    /// Manage the installed service instead of running it
    #[arg(long = "svc", value_enum, value_name = "ACTION")]
    pub action: Option<Action>,
}
