//! Core result-model types for depotkit.
//!
//! A command run against the server produces one ordered stream of output
//! units of mixed kinds: plain text, binary payloads, performance-trace
//! lines, structured records, schema-governed spec records, and diagnostic
//! messages. This crate defines those unit types and the ordered
//! collection they accumulate in.
//!
//! Everything protocol-specific (schemas, dispatch, sessions) lives in the
//! `depotkit-spec` and `depotkit-client` crates.

mod diagnostic;
mod record;
mod results;
mod unit;

pub use diagnostic::{Diagnostic, DiagnosticLine, Severity};
pub use record::SpecRecord;
pub use results::{ResultCollection, ResultKind};
pub use unit::ResultUnit;

use indexmap::IndexMap;

/// Insertion-ordered string map used for structured records, spec fields
/// and diagnostic variables. Iteration order is insertion order; callers
/// rely on this for positional field-index reconstruction.
pub type TagMap = IndexMap<String, String>;
