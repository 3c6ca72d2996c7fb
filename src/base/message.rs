//! Diagnostic messages accumulated while parsing and shaping trees.

use super::location::PointLocation;
use std::fmt;

/// Kind of a log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageKind {
    Trace,
    #[default]
    Error,
    Warning,
}

impl MessageKind {
    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// A log entry produced by the lexer, parser or a tree visitor.
///
/// Errors never abort the pipeline; they are collected and the caller
/// decides what to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub location: Option<PointLocation>,
    pub file_name: Option<String>,
    /// Component that produced the message
    pub source: String,
    pub text: String,
}

impl Message {
    pub fn new(
        kind: MessageKind,
        source: impl Into<String>,
        text: impl Into<String>,
        location: Option<PointLocation>,
    ) -> Self {
        Self {
            kind,
            location,
            file_name: None,
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn error(source: impl Into<String>, text: impl Into<String>, location: Option<PointLocation>) -> Self {
        Self::new(MessageKind::Error, source, text, location)
    }

    pub fn warning(source: impl Into<String>, text: impl Into<String>, location: Option<PointLocation>) -> Self {
        Self::new(MessageKind::Warning, source, text, location)
    }

    pub fn trace(source: impl Into<String>, text: impl Into<String>, location: Option<PointLocation>) -> Self {
        Self::new(MessageKind::Trace, source, text, location)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\t", self.source)?;
        if let Some(file_name) = &self.file_name {
            write!(f, "{}\t", file_name)?;
        }
        if let Some(location) = &self.location {
            write!(f, "{}\t", location)?;
        }
        write!(f, "{}", self.text)
    }
}

/// Does the log contain at least one error?
pub fn has_errors(log: &[Message]) -> bool {
    log.iter().any(|m| m.kind.is_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_all_parts() {
        let message = Message::error("parser", "unexpected token", Some(PointLocation::new(3, 7, 40)))
            .with_file_name("a.cs");
        assert_eq!(message.to_string(), "parser:\ta.cs\t(3,7)\tunexpected token");
    }

    #[test]
    fn test_display_without_location() {
        let message = Message::warning("custom blocks", "bad block", None);
        assert_eq!(message.to_string(), "custom blocks:\tbad block");
    }

    #[test]
    fn test_has_errors() {
        let mut log = vec![Message::trace("parser", "started", None)];
        assert!(!has_errors(&log));
        log.push(Message::error("parser", "boom", None));
        assert!(has_errors(&log));
    }
}
