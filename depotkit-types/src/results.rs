//! The ordered collection a command's output units accumulate in.

use crate::{Diagnostic, ResultUnit, Severity, SpecRecord, TagMap};
use serde::{Deserialize, Serialize};

/// Discriminant of a [`ResultUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Text,
    Binary,
    Track,
    Record,
    Spec,
    Message,
}

/// Ordered sequence of result units plus running counts per kind.
///
/// Append-only while a command runs; fully cleared between commands.
/// Arrival order is preserved across mixed kinds — a message interleaved
/// between two records reflects the server's actual reporting order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCollection {
    units: Vec<ResultUnit>,
    text_count: usize,
    binary_count: usize,
    track_count: usize,
    record_count: usize,
    spec_count: usize,
    info_count: usize,
    warn_count: usize,
    error_count: usize,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one unit, keeping the per-kind counters current.
    ///
    /// Empty-severity messages carry no content and are dropped.
    pub fn append(&mut self, unit: ResultUnit) {
        match &unit {
            ResultUnit::Text(_) => self.text_count += 1,
            ResultUnit::Binary(_) => self.binary_count += 1,
            ResultUnit::Track(_) => self.track_count += 1,
            ResultUnit::Record(_) => self.record_count += 1,
            ResultUnit::Spec(_) => self.spec_count += 1,
            ResultUnit::Message(m) => match m.severity() {
                Severity::Empty => return,
                Severity::Info => self.info_count += 1,
                Severity::Warn => self.warn_count += 1,
                Severity::Failed | Severity::Fatal => self.error_count += 1,
            },
        }
        self.units.push(unit);
    }

    pub fn append_text(&mut self, text: impl Into<String>) {
        self.append(ResultUnit::Text(text.into()));
    }

    pub fn append_binary(&mut self, data: Vec<u8>) {
        self.append(ResultUnit::Binary(data));
    }

    pub fn append_track(&mut self, line: impl Into<String>) {
        self.append(ResultUnit::Track(line.into()));
    }

    pub fn append_record(&mut self, record: TagMap) {
        self.append(ResultUnit::Record(record));
    }

    pub fn append_spec(&mut self, spec: SpecRecord) {
        self.append(ResultUnit::Spec(spec));
    }

    pub fn append_message(&mut self, message: Diagnostic) {
        self.append(ResultUnit::Message(message));
    }

    /// Releases every unit and zeroes the counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Removes the contiguous run of Track units at the tail.
    ///
    /// Used to roll back when a trace-line decomposition turns out to have
    /// misfired part-way through a text event.
    pub fn discard_trailing_track(&mut self) {
        while let Some(ResultUnit::Track(_)) = self.units.last() {
            self.units.pop();
            self.track_count -= 1;
        }
    }

    pub fn count_of(&self, kind: ResultKind) -> usize {
        match kind {
            ResultKind::Text => self.text_count,
            ResultKind::Binary => self.binary_count,
            ResultKind::Track => self.track_count,
            ResultKind::Record => self.record_count,
            ResultKind::Spec => self.spec_count,
            ResultKind::Message => self.info_count + self.warn_count + self.error_count,
        }
    }

    pub fn info_count(&self) -> usize {
        self.info_count
    }

    pub fn warn_count(&self) -> usize {
        self.warn_count
    }

    /// Number of Failed or Fatal messages.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[ResultUnit] {
        &self.units
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultUnit> {
        self.units.iter()
    }

    /// The Failed/Fatal diagnostics, in arrival order.
    pub fn failures(&self) -> impl Iterator<Item = &Diagnostic> {
        self.units
            .iter()
            .filter_map(ResultUnit::as_message)
            .filter(|m| m.is_failure())
    }

    /// The first Spec or Record unit, as a spec record.
    pub fn first_record(&self) -> Option<SpecRecord> {
        self.units.iter().find_map(|u| match u {
            ResultUnit::Spec(s) => Some(s.clone()),
            ResultUnit::Record(d) => Some(SpecRecord::from_fields(d.clone())),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a ResultUnit;
    type IntoIter = std::slice::Iter<'a, ResultUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}
