//! Diagnostics channel for informational messages, warnings and errors
//!
//! Reporting never affects control flow; callers decide what is fatal.

use std::cell::RefCell;

/// Numeric codes carried by every diagnostic
pub mod codes {
    pub const WARNING_FILE_MISSING: i32 = 10;
    pub const WARNING_CUSTOM_TEMP_DIR_INVALID: i32 = 11;
    pub const WARNING_CELL_COERCION: i32 = 12;

    pub const ERROR_FILE_PATH_MISSING: i32 = 10;
    pub const ERROR_WEB_URL_MISSING: i32 = 11;
    pub const ERROR_WEB_URL_VARIABLE_MISSING: i32 = 12;
    pub const ERROR_FILE_VARIABLE_WRONG: i32 = 13;
    pub const ERROR_IOMAP_EMPTY: i32 = 14;
    pub const ERROR_IOMAP_ENTRY_ERROR: i32 = 15;

    pub const RUNTIME_ERROR_MODEL_INVALID: i32 = 100;
    pub const RUNTIME_GENERIC_ERROR: i32 = 1000;

    pub const INFO_PROGRESS: i32 = 1000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub code: i32,
    pub message: String,
}

/// Receiver for structured messages emitted during validation and runs
pub trait Diagnostics {
    fn info(&self, code: i32, message: &str);
    fn warning(&self, code: i32, message: &str);
    fn error(&self, code: i32, message: &str);
}

/// Discards everything
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn info(&self, _code: i32, _message: &str) {}
    fn warning(&self, _code: i32, _message: &str) {}
    fn error(&self, _code: i32, _message: &str) {}
}

/// Forwards to the `log` facade
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn info(&self, code: i32, message: &str) {
        log::info!("[{}] {}", code, message);
    }

    fn warning(&self, code: i32, message: &str) {
        log::warn!("[{}] {}", code, message);
    }

    fn error(&self, code: i32, message: &str) {
        log::error!("[{}] {}", code, message);
    }
}

/// Keeps every message in memory, in emission order
#[derive(Default)]
pub struct CollectingDiagnostics {
    messages: RefCell<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Diagnostic> {
        self.messages.borrow().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|m| m.level == level)
            .count()
    }

    fn push(&self, level: Level, code: i32, message: &str) {
        self.messages.borrow_mut().push(Diagnostic {
            level,
            code,
            message: message.to_string(),
        });
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn info(&self, code: i32, message: &str) {
        self.push(Level::Info, code, message);
    }

    fn warning(&self, code: i32, message: &str) {
        self.push(Level::Warning, code, message);
    }

    fn error(&self, code: i32, message: &str) {
        self.push(Level::Error, code, message);
    }
}
