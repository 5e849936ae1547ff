// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The diagnostic builder (§4.9): `severity, primary message, primary(location), note(text),
//! hint(text), docs(url), emit(session)`.

use crate::session::DiagnosticSession;
use serde::Serialize;

/// Diagnostic severity (§3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Fatal at parse time; otherwise surfaced but does not abort.
    Error,
    /// Non-fatal but noteworthy.
    Warning,
    /// Informational.
    Note,
}

/// A source-location annotation attached to a diagnostic or one of its secondary notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// Byte offset into the originating TQL source, if known.
    pub offset: Option<usize>,
    /// Length in bytes of the annotated span.
    pub length: Option<usize>,
    /// Human-readable source name (e.g. a pipeline id or file name).
    pub source: Option<String>,
}

impl Location {
    /// Creates a location with no source-span information, only a named source.
    #[must_use]
    pub fn named(source: impl Into<String>) -> Self {
        Self {
            offset: None,
            length: None,
            source: Some(source.into()),
        }
    }

    /// Creates a location spanning `[offset, offset + length)` in `source`.
    #[must_use]
    pub fn span(source: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            offset: Some(offset),
            length: Some(length),
            source: Some(source.into()),
        }
    }
}

/// A secondary annotation on a diagnostic: a note or a hint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    /// The annotation text.
    pub text: String,
    /// Whether this annotation is a remedial hint rather than a plain note.
    pub is_hint: bool,
}

/// A fully built diagnostic (§3.6).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Primary message.
    pub message: String,
    /// Primary source-location annotation, if any.
    pub location: Option<Location>,
    /// Secondary notes and hints, in the order they were added.
    pub annotations: Vec<Annotation>,
    /// Optional documentation URL.
    pub docs: Option<String>,
}

impl Diagnostic {
    /// Starts building an error-severity diagnostic with the given primary message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(Severity::Error, message)
    }

    /// Starts building a warning-severity diagnostic with the given primary message.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(Severity::Warning, message)
    }

    /// Starts building a note-severity diagnostic with the given primary message.
    #[must_use]
    pub fn note(message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(Severity::Note, message)
    }

    /// A coalescing key: identical text and location coalesce within the dedup window (§4.9).
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!("{:?}|{}|{:?}", self.severity, self.message, self.location)
    }
}

/// Builds a [`Diagnostic`] through a fluent chain, finalized by [`emit`](Self::emit).
#[must_use]
pub struct DiagnosticBuilder {
    severity: Severity,
    message: String,
    location: Option<Location>,
    annotations: Vec<Annotation>,
    docs: Option<String>,
}

impl DiagnosticBuilder {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
            annotations: Vec::new(),
            docs: None,
        }
    }

    /// Attaches the primary source location.
    pub fn primary(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Adds a plain explanatory note.
    pub fn note(mut self, text: impl Into<String>) -> Self {
        self.annotations.push(Annotation {
            text: text.into(),
            is_hint: false,
        });
        self
    }

    /// Adds a remedial hint.
    pub fn hint(mut self, text: impl Into<String>) -> Self {
        self.annotations.push(Annotation {
            text: text.into(),
            is_hint: true,
        });
        self
    }

    /// Attaches a documentation URL.
    pub fn docs(mut self, url: impl Into<String>) -> Self {
        self.docs = Some(url.into());
        self
    }

    /// Finalizes the diagnostic and emits it into `session`'s sink.
    pub fn emit(self, session: &DiagnosticSession) -> Diagnostic {
        let diagnostic = Diagnostic {
            severity: self.severity,
            message: self.message,
            location: self.location,
            annotations: self.annotations,
            docs: self.docs,
        };
        session.emit(diagnostic.clone());
        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DiagnosticSession;

    #[test]
    fn builds_diagnostic_with_notes_and_hints() {
        let session = DiagnosticSession::new("pipeline-1", 16);
        let diag = Diagnostic::error("type clash")
            .primary(Location::span("pipeline-1", 10, 4))
            .note("left side is int64")
            .hint("use `cast`")
            .docs("https://example.invalid/docs/type-clash")
            .emit(&session);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.annotations.len(), 2);
        assert!(diag.annotations[1].is_hint);
        assert_eq!(session.snapshot().len(), 1);
    }
}
