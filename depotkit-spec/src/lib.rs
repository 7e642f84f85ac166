//! Schema registry and form translator.
//!
//! Servers describe their structured documents ("specs" — change
//! descriptions, workspace definitions, and so on) with a declarative
//! per-type field schema, shipped as a compact wire string. This crate
//! parses those schema strings, keeps a replaceable registry of them, and
//! converts between the free-form textual document a user edits and the
//! flat, positionally-indexed [`SpecRecord`] the rest of the client works
//! with.
//!
//! [`SpecRecord`]: depotkit_types::SpecRecord

mod catalog;
mod document;
mod registry;
mod schema;

pub use document::split_key;
pub use registry::SchemaRegistry;
pub use schema::{FieldDef, FieldKind, SpecSchema};

use thiserror::Error;

/// Result type for translator operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised by schema parsing and form translation.
#[derive(Debug, Error)]
pub enum SpecError {
    /// No schema is registered for the requested document type.
    #[error("no schema registered for '{doc_type}' documents")]
    SchemaMissing { doc_type: String },

    /// The wire schema string itself could not be parsed.
    #[error("malformed schema: {0}")]
    MalformedSchema(String),

    /// A document violated its schema.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A record holds fields the renderer cannot express in a form.
    #[error("field mismatch: {0}")]
    FieldMismatch(String),
}

impl SpecError {
    pub(crate) fn schema_missing(doc_type: &str) -> Self {
        Self::SchemaMissing {
            doc_type: doc_type.to_string(),
        }
    }
}
