//! Resolve/merge negotiation.
//!
//! When a command hits conflicting file states the transport presents a
//! [`MergeCase`] and waits, synchronously, for a [`MergeDecision`]. A
//! case is either a *content* resolve (three file identities and a result
//! path) or an *action* resolve (competing actions described by
//! diagnostics) — never both. Accessors for fields the discriminant does
//! not carry return empty values rather than failing, since a case only
//! lives for the duration of one negotiation.

use crate::handler::ResolveHandler;
use depotkit_types::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A caller's (or the engine's own) answer to a merge case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeDecision {
    /// Abandon the remaining resolves of this command.
    #[default]
    Quit,
    /// Leave this file unresolved and move on.
    Skip,
    /// Accept the merged result.
    AcceptMerged,
    /// Accept the merged result with manual edits.
    AcceptEdited,
    /// Accept the incoming revision.
    AcceptTheirs,
    /// Keep the local revision.
    AcceptYours,
}

/// A content resolve: base/yours/theirs file identities and the paths of
/// the staged files, plus the engine's own suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResolve {
    pub base_name: String,
    pub your_name: String,
    pub their_name: String,
    pub base_path: String,
    pub your_path: String,
    pub their_path: String,
    pub result_path: String,
    pub hint: MergeDecision,
}

/// An action resolve: the competing actions and the kind of resolve,
/// described by server diagnostics, plus the engine's suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResolve {
    pub your_action: Diagnostic,
    pub their_action: Diagnostic,
    pub merge_action: Diagnostic,
    pub kind: Diagnostic,
    pub hint: MergeDecision,
}

/// One pending conflict, scoped to a single negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeCase {
    Content(ContentResolve),
    Action(ActionResolve),
}

impl MergeCase {
    pub fn is_content_resolve(&self) -> bool {
        matches!(self, Self::Content(_))
    }

    pub fn is_action_resolve(&self) -> bool {
        matches!(self, Self::Action(_))
    }

    /// The engine's precomputed suggestion for this case.
    pub fn hint(&self) -> MergeDecision {
        match self {
            Self::Content(c) => c.hint,
            Self::Action(a) => a.hint,
        }
    }

    pub fn base_name(&self) -> &str {
        self.content().map_or("", |c| &c.base_name)
    }

    pub fn your_name(&self) -> &str {
        self.content().map_or("", |c| &c.your_name)
    }

    pub fn their_name(&self) -> &str {
        self.content().map_or("", |c| &c.their_name)
    }

    pub fn base_path(&self) -> &str {
        self.content().map_or("", |c| &c.base_path)
    }

    pub fn your_path(&self) -> &str {
        self.content().map_or("", |c| &c.your_path)
    }

    pub fn their_path(&self) -> &str {
        self.content().map_or("", |c| &c.their_path)
    }

    pub fn result_path(&self) -> &str {
        self.content().map_or("", |c| &c.result_path)
    }

    pub fn your_action(&self) -> Option<&Diagnostic> {
        self.action().map(|a| &a.your_action)
    }

    pub fn their_action(&self) -> Option<&Diagnostic> {
        self.action().map(|a| &a.their_action)
    }

    pub fn merge_action(&self) -> Option<&Diagnostic> {
        self.action().map(|a| &a.merge_action)
    }

    pub fn resolve_kind(&self) -> Option<&Diagnostic> {
        self.action().map(|a| &a.kind)
    }

    fn content(&self) -> Option<&ContentResolve> {
        match self {
            Self::Content(c) => Some(c),
            Self::Action(_) => None,
        }
    }

    fn action(&self) -> Option<&ActionResolve> {
        match self {
            Self::Action(a) => Some(a),
            Self::Content(_) => None,
        }
    }
}

impl fmt::Display for MergeCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(a) => {
                writeln!(f, "MergeCase - Action")?;
                writeln!(f, "\tmergeAction: {}", a.merge_action)?;
                writeln!(f, "\ttheirAction: {}", a.their_action)?;
                writeln!(f, "\tyoursAction: {}", a.your_action)?;
                writeln!(f, "\ttype: {}", a.kind)?;
                write!(f, "\thint: {:?}", a.hint)
            }
            Self::Content(c) => {
                writeln!(f, "MergeCase - Content")?;
                if !c.your_name.is_empty() {
                    writeln!(f, "\tyourName: {}", c.your_name)?;
                }
                if !c.their_name.is_empty() {
                    writeln!(f, "\ttheirName: {}", c.their_name)?;
                }
                if !c.base_name.is_empty() {
                    writeln!(f, "\tbaseName: {}", c.base_name)?;
                }
                if !c.your_path.is_empty() {
                    writeln!(f, "\tyourFile: {}", c.your_path)?;
                }
                if !c.their_path.is_empty() {
                    writeln!(f, "\ttheirFile: {}", c.their_path)?;
                }
                if !c.base_path.is_empty() {
                    writeln!(f, "\tbaseFile: {}", c.base_path)?;
                }
                write!(f, "\thint: {:?}", c.hint)
            }
        }
    }
}

/// Runs one negotiation: the handler is consulted exactly once, and with
/// no handler the case auto-resolves to its own hint.
pub fn negotiate(case: &MergeCase, handler: Option<&dyn ResolveHandler>) -> MergeDecision {
    match handler {
        Some(h) => {
            let decision = h.resolve(case);
            debug!(?decision, "resolve handler answered");
            decision
        }
        None => case.hint(),
    }
}
