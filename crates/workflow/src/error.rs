//! Error types for step tree conversion.

use miette::Diagnostic;
use thiserror::Error;

/// An attribute tree did not have the shape of the `step` schema.
///
/// This is a contract violation between the framework and the resource.
/// Callers log it and abort the current operation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("Malformed state at {path}: expected {expected}")]
#[diagnostic(
    code(pagerduty_workflow::malformed_state),
    help("The stored state does not match the incident workflow step schema")
)]
pub struct MalformedStateError {
    /// Dotted attribute path, e.g. `step.0.input.2.value`.
    pub path: String,
    /// Description of the expected shape.
    pub expected: String,
}

impl MalformedStateError {
    /// Creates an error for the given path.
    pub fn new(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
        }
    }
}
