//! Error taxonomy for command execution.

use crate::transport::TransportError;
use depotkit_spec::SpecError;
use depotkit_types::{Diagnostic, ResultCollection};
use std::fmt;
use thiserror::Error;

/// Result type for session operations.
pub type RunResult<T> = Result<T, RunError>;

/// Errors returned by [`crate::Session`] operations.
#[derive(Debug, Error)]
pub enum RunError {
    /// No connection is established.
    #[error("not connected to a server")]
    NotConnected,

    /// A command was issued while another was outstanding.
    #[error("can't execute nested commands")]
    NestedCommand,

    /// Performance tracking cannot change once connected.
    #[error("can't change performance tracking once connected")]
    TrackModeLocked,

    /// The transport failed outside a command.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A document could not be translated.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// The command ran but reported failures; the collection travels
    /// with the error so callers can inspect every unit in order.
    #[error("{0}")]
    Command(CommandFailure),

    /// A fetch produced no record to return.
    #[error("'{command}' returned no record")]
    MissingResult { command: String },
}

/// A command's failure: the (possibly partial) result collection, the
/// Failed/Fatal diagnostics that caused it, and any transport error the
/// command ended with.
#[derive(Debug)]
pub struct CommandFailure {
    results: ResultCollection,
    failures: Vec<Diagnostic>,
    transport: Option<TransportError>,
}

impl CommandFailure {
    pub(crate) fn new(
        results: ResultCollection,
        failures: Vec<Diagnostic>,
        transport: Option<TransportError>,
    ) -> Self {
        Self {
            results,
            failures,
            transport,
        }
    }

    /// Every unit the command produced before and after the failure.
    pub fn results(&self) -> &ResultCollection {
        &self.results
    }

    pub fn into_results(self) -> ResultCollection {
        self.results
    }

    /// The Failed/Fatal diagnostics, in arrival order, including any the
    /// output handler kept out of the collection.
    pub fn failures(&self) -> &[Diagnostic] {
        &self.failures
    }

    pub fn transport(&self) -> Option<&TransportError> {
        self.transport.as_ref()
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first diagnostic is the headline; transport trouble only
        // when there were no diagnostics at all.
        match (self.failures.first(), &self.transport) {
            (Some(d), _) => write!(f, "command failed: {d}"),
            (None, Some(t)) => write!(f, "command failed: {t}"),
            (None, None) => write!(f, "command failed"),
        }
    }
}
