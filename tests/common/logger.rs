//! Per-test structured logging.
//!
//! # Environment Variables
//!
//! - `TEST_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! - `TEST_LOG_JSON` - "1" or "true" for one JSON object per line
#![allow(dead_code)]

use std::env;
use std::fmt::Display;
use std::sync::OnceLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::log_capture::TestLogCapture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    test: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<&'a str>,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a serde_json::Value>,
}

struct Settings {
    min_level: LogLevel,
    json: bool,
}

fn settings() -> &'static Settings {
    static SETTINGS: OnceLock<Settings> = OnceLock::new();
    SETTINGS.get_or_init(|| Settings {
        min_level: env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or(LogLevel::Info),
        json: env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
    })
}

/// Logger scoped to one test, tracking phase and elapsed time.
pub struct TestLogger {
    name: String,
    started: Instant,
    phase: std::cell::RefCell<Option<String>>,
}

impl TestLogger {
    #[must_use]
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            name: test_name.to_string(),
            started: Instant::now(),
            phase: std::cell::RefCell::new(None),
        };
        logger.emit(LogLevel::Debug, "test started", None);
        logger
    }

    /// Logger plus a tracing capture for the same test.
    #[must_use]
    pub fn with_capture(test_name: &str) -> (Self, TestLogCapture) {
        (Self::new(test_name), TestLogCapture::start())
    }

    pub fn phase(&self, phase: &str) {
        *self.phase.borrow_mut() = Some(phase.to_string());
        self.emit(LogLevel::Debug, &format!("phase: {phase}"), None);
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message, None);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message, None);
    }

    /// Log with structured context attached.
    pub fn with_context(&self, level: LogLevel, message: &str, context: &serde_json::Value) {
        self.emit(level, message, Some(context));
    }

    pub fn finish_ok(&self) {
        self.emit(LogLevel::Info, "test passed", None);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn emit(&self, level: LogLevel, message: &str, context: Option<&serde_json::Value>) {
        let settings = settings();
        if level < settings.min_level {
            return;
        }
        let phase = self.phase.borrow();
        if settings.json {
            let entry = LogEntry {
                timestamp: Utc::now(),
                level,
                test: &self.name,
                message,
                phase: phase.as_deref(),
                elapsed_ms: self.elapsed_ms(),
                context,
            };
            if let Ok(line) = serde_json::to_string(&entry) {
                eprintln!("{line}");
            }
        } else {
            let phase = phase.as_deref().map(|p| format!("[{p}] ")).unwrap_or_default();
            let context = context.map(|c| format!(" {c}")).unwrap_or_default();
            eprintln!(
                "{level:<5} {} {phase}{message}{context} (+{}ms)",
                self.name,
                self.elapsed_ms()
            );
        }
    }
}
