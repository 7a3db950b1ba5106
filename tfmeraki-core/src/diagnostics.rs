//! Diagnostics - User-facing reports built from provider errors

use std::error::Error;
use std::fmt;

use serde::Serialize;

use crate::provider::{ErrorKind, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(error: &ProviderError) -> Self {
        let summary = match error.kind {
            ErrorKind::Configuration => "Invalid configuration",
            ErrorKind::Identifier => "Invalid identifier in API response",
            ErrorKind::Api => "Failure when executing request",
            ErrorKind::Internal => "Internal provider error",
        };

        let mut detail = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            // Converted errors carry their cause's text as the message
            let text = cause.to_string();
            if !detail.ends_with(&text) {
                detail.push_str(": ");
                detail.push_str(&text);
            }
            source = cause.source();
        }

        Diagnostic::error(summary, detail)
    }
}

/// Diagnostics collected over one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add_error(&mut self, error: &ProviderError) {
        self.push(Diagnostic::from(error));
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record the error of a failed result and pass its value through
    pub fn capture<T>(&mut self, result: Result<T, ProviderError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.add_error(&error);
                None
            }
        }
    }
}
