//! The tagged result unit produced by one command output event.

use crate::{Diagnostic, SpecRecord, TagMap};
use serde::{Deserialize, Serialize};

use crate::results::ResultKind;

/// One unit of command output, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultUnit {
    /// Plain text output.
    Text(String),
    /// Binary payload.
    Binary(Vec<u8>),
    /// A performance-trace line.
    Track(String),
    /// A plain structured key/value record.
    Record(TagMap),
    /// A schema-governed record.
    Spec(SpecRecord),
    /// A diagnostic message.
    Message(Diagnostic),
}

impl ResultUnit {
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Text(_) => ResultKind::Text,
            Self::Binary(_) => ResultKind::Binary,
            Self::Track(_) => ResultKind::Track,
            Self::Record(_) => ResultKind::Record,
            Self::Spec(_) => ResultKind::Spec,
            Self::Message(_) => ResultKind::Message,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Track(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&TagMap> {
        match self {
            Self::Record(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_spec(&self) -> Option<&SpecRecord> {
        match self {
            Self::Spec(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Diagnostic> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }
}
