//! Caller-supplied handler roles.
//!
//! A handler intercepts output units in flight, before they reach the
//! result collection. Every callback decides the unit's fate with a
//! [`HandlerAction`]; the default implementations report everything.

use depotkit_types::{Diagnostic, SpecRecord, TagMap};
use serde::{Deserialize, Serialize};

/// What a handler wants done with the output unit it was offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerAction {
    /// Append the unit to the result collection and continue.
    #[default]
    Report,
    /// The handler consumed the unit; do not append it.
    Handled,
    /// Stop the command; nothing further is appended.
    Cancel,
}

/// Intercepts each output unit of a running command.
pub trait OutputHandler: Send + Sync {
    fn handle_text(&self, data: &str) -> HandlerAction {
        let _ = data;
        HandlerAction::Report
    }

    fn handle_binary(&self, data: &[u8]) -> HandlerAction {
        let _ = data;
        HandlerAction::Report
    }

    fn handle_stat(&self, record: &TagMap) -> HandlerAction {
        let _ = record;
        HandlerAction::Report
    }

    fn handle_spec(&self, spec: &SpecRecord) -> HandlerAction {
        let _ = spec;
        HandlerAction::Report
    }

    fn handle_track(&self, line: &str) -> HandlerAction {
        let _ = line;
        HandlerAction::Report
    }

    fn handle_message(&self, message: &Diagnostic) -> HandlerAction {
        let _ = message;
        HandlerAction::Report
    }
}

/// Observes long-running command progress.
pub trait ProgressHandler: Send + Sync {
    fn begin(&self, kind: u32) {
        let _ = kind;
    }

    fn describe(&self, description: &str, units: u32) {
        let _ = (description, units);
    }

    fn total(&self, total: u64) {
        let _ = total;
    }

    fn update(&self, position: u64) {
        let _ = position;
    }

    fn done(&self, failed: bool) {
        let _ = failed;
    }
}

/// Outcome of a single-sign-on attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsoOutcome {
    /// Authorization succeeded; the reply data is the token.
    Pass,
    /// Authorization failed; the reply data is logged as an error.
    Fail,
    /// The client has no SSO support.
    Unset,
    /// Stop the login process.
    Exit,
    /// Fall back to the default behavior.
    Skip,
}

/// An SSO handler's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoReply {
    pub outcome: SsoOutcome,
    pub data: String,
}

impl SsoReply {
    pub fn new(outcome: SsoOutcome, data: impl Into<String>) -> Self {
        Self {
            outcome,
            data: data.into(),
        }
    }

    /// The no-handler answer.
    pub fn skip() -> Self {
        Self::new(SsoOutcome::Skip, "")
    }
}

/// Answers the server's single-sign-on challenge.
pub trait SsoHandler: Send + Sync {
    fn authorize(&self, vars: &TagMap, max_length: usize) -> SsoReply;
}

/// Decides pending merge conflicts; see [`crate::resolve`].
pub trait ResolveHandler: Send + Sync {
    fn resolve(&self, case: &crate::resolve::MergeCase) -> crate::resolve::MergeDecision;
}
