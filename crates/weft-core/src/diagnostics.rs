//! Scoped diagnostic output.
//!
//! Everything weft reports goes through a [`DiagnosticSink`]. The default
//! [`LogSink`] forwards to the `log` facade under the `weft` target, so an
//! application only has to install a logger (`env_logger`, `android_logger`,
//! `console_log`, ...). Diagnostics are purely observational.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use log::Level;

pub const LOG_TARGET: &str = "weft";

pub trait DiagnosticSink {
    fn record(&self, level: Level, scope: &str, message: fmt::Arguments<'_>);
}

/// Forwards to the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, level: Level, scope: &str, message: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "[{scope}] {message}");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub level: Level,
    pub scope: String,
    pub message: String,
}

/// Keeps every record in memory. Handy in tests.
#[derive(Default)]
pub struct RecordingSink {
    entries: RefCell<Vec<Entry>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, level: Level, scope: &str, message: fmt::Arguments<'_>) {
        self.entries.borrow_mut().push(Entry {
            level,
            scope: scope.to_string(),
            message: message.to_string(),
        });
    }
}

/// A sink plus the name of the scope that is talking.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Rc<dyn DiagnosticSink>,
    scope: Rc<str>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Rc::new(LogSink), "weft")
    }
}

impl Diagnostics {
    pub fn new(sink: Rc<dyn DiagnosticSink>, scope: impl AsRef<str>) -> Self {
        Self {
            sink,
            scope: Rc::from(scope.as_ref()),
        }
    }

    /// Same sink, nested scope name (`parent/name`).
    pub fn for_scope(&self, name: impl fmt::Display) -> Self {
        Self {
            sink: self.sink.clone(),
            scope: Rc::from(format!("{}/{}", self.scope, name)),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn error(&self, message: fmt::Arguments<'_>) {
        self.sink.record(Level::Error, &self.scope, message);
    }

    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.sink.record(Level::Warn, &self.scope, message);
    }

    pub fn verbose(&self, message: fmt::Arguments<'_>) {
        self.sink.record(Level::Trace, &self.scope, message);
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("scope", &self.scope)
            .finish()
    }
}
