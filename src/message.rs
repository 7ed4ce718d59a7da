//! # Diagnostics Reporting
//!
//! Every diagnostic produced while resolving packages (transport failures,
//! POM policy violations, discarded metadata) flows through a `MessageSink`.
//! The host build decides where messages go; when it attaches nothing, the
//! `LogSink` forwards them to the `log` facade.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::{error, info, warn};

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single diagnostic with an optional source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    /// URL or path of the file the message refers to.
    pub location: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub severity: Severity,
}

impl Message {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
            line: None,
            column: None,
            severity,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Severity::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    /// Attach the file the message refers to.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach a line and column inside the location.
    pub fn at_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}", location)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(column) = self.column {
                    write!(f, ":{}", column)?;
                }
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.text)
    }
}

/// Receiver for diagnostics.
pub trait MessageSink {
    fn report(&self, message: Message);
}

/// Default sink: writes every message through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn report(&self, message: Message) {
        match message.severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

/// Sink that keeps every message in memory.
///
/// Clones share the same buffer, so a handle can be kept while the sink
/// itself is handed to a `RepositorySystem`.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<Message> {
        self.messages()
            .into_iter()
            .filter(|m| m.severity == Severity::Error)
            .collect()
    }
}

impl MessageSink for CollectingSink {
    fn report(&self, message: Message) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}
