// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! `log` backend producing agent-formatted lines:
//!
//! ```text
//! 2026-10-18 12:00:00 UTC | SVCHOST | INFO | (src/control.rs:42 in dd_svchost::control) | message
//! ```
//!
//! Lines always go to stderr. A log file can be added for processes that run
//! without a console (Windows services).

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use time::OffsetDateTime;
use time::macros::format_description;

pub struct Logger {
    component: &'static str,
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(component: &'static str, level: LevelFilter) -> Self {
        Self {
            component,
            level,
            file: None,
        }
    }

    /// Also append every line to `path`, creating it if needed.
    pub fn with_file(mut self, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.file = Some(Mutex::new(file));
        Ok(self)
    }

    /// Install as the global logger. Fails if a logger is already installed.
    pub fn init(self) -> io::Result<()> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self)).map_err(io::Error::other)?;
        log::set_max_level(level);
        Ok(())
    }
}

/// Install a stderr-only logger for `component`.
pub fn init(component: &'static str, level: LevelFilter) -> io::Result<()> {
    Logger::new(component, level).init()
}

pub fn format_line(component: &str, record: &Record<'_>, now: OffsetDateTime) -> String {
    let timestamp = now
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] UTC"
        ))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!(
        "{timestamp} | {component} | {} | ({}:{} in {}) | {}",
        record.level(),
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0),
        record.module_path().unwrap_or("unknown"),
        record.args()
    )
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.component, record, OffsetDateTime::now_utc());
        let _ = writeln!(io::stderr().lock(), "{line}");
        if let Some(ref file) = self.file {
            let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = writeln!(file, "{line}");
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(ref file) = self.file {
            let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = file.flush();
        }
    }
}
