//! Diagnostic messages reported by the server alongside command output.
//!
//! A [`Diagnostic`] carries an overall severity, one or more formatted
//! lines, and a side dictionary of the named variables the server used to
//! format those lines. Each line's numeric code is a packed record whose
//! sub-fields can be decoded independently.

use crate::TagMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic, from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No message at all. Diagnostics at this level are never reported.
    #[default]
    Empty,
    /// Informational output.
    Info,
    /// A warning; the command still succeeded.
    Warn,
    /// The command failed.
    Failed,
    /// The command failed and the connection may be unusable.
    Fatal,
}

impl Severity {
    /// Decodes a severity from its wire value, saturating unknown values
    /// to `Fatal`.
    pub fn from_wire(value: u32) -> Self {
        match value {
            0 => Self::Empty,
            1 => Self::Info,
            2 => Self::Warn,
            3 => Self::Failed,
            _ => Self::Fatal,
        }
    }

    /// Whether this severity makes the enclosing command fail.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Failed => "failed",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// One formatted line of a [`Diagnostic`].
///
/// The `code` packs several sub-fields into 32 bits:
/// severity (28–31), argument count (24–27), generic category (16–23),
/// subsystem (10–15) and sub-code (0–9). The low 16 bits together form
/// the unique message id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLine {
    pub severity: Severity,
    pub code: u32,
    pub text: String,
}

impl DiagnosticLine {
    pub fn new(severity: Severity, code: u32, text: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            text: text.into(),
        }
    }

    /// Sub-code within the subsystem (bits 0–9).
    pub fn sub_code(&self) -> u32 {
        self.code & 0x3ff
    }

    /// Originating subsystem (bits 10–15).
    pub fn subsystem(&self) -> u32 {
        (self.code >> 10) & 0x3f
    }

    /// Generic error category (bits 16–23).
    pub fn generic(&self) -> u32 {
        (self.code >> 16) & 0xff
    }

    /// Number of formatting arguments (bits 24–27).
    pub fn arg_count(&self) -> u32 {
        (self.code >> 24) & 0x0f
    }

    /// Severity encoded in the code itself (bits 28–31).
    pub fn code_severity(&self) -> Severity {
        Severity::from_wire((self.code >> 28) & 0x0f)
    }

    /// Unique message id (bits 0–15).
    pub fn unique_code(&self) -> u32 {
        self.code & 0xffff
    }
}

impl fmt::Display for DiagnosticLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A diagnostic message: overall severity, formatted lines, and the named
/// variables the server supplied for programmatic inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Diagnostic {
    severity: Severity,
    lines: Vec<DiagnosticLine>,
    vars: TagMap,
}

impl Diagnostic {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            lines: Vec::new(),
            vars: TagMap::new(),
        }
    }

    /// Shorthand for a single-line Info diagnostic.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Severity::Info).with_line(Severity::Info, 0, text)
    }

    /// Shorthand for a single-line Warn diagnostic.
    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(Severity::Warn).with_line(Severity::Warn, 0, text)
    }

    /// Shorthand for a single-line Failed diagnostic.
    pub fn failed(text: impl Into<String>) -> Self {
        Self::new(Severity::Failed).with_line(Severity::Failed, 0, text)
    }

    /// Shorthand for a single-line Fatal diagnostic.
    pub fn fatal(text: impl Into<String>) -> Self {
        Self::new(Severity::Fatal).with_line(Severity::Fatal, 0, text)
    }

    /// Appends a line.
    pub fn with_line(mut self, severity: Severity, code: u32, text: impl Into<String>) -> Self {
        self.lines.push(DiagnosticLine::new(severity, code, text));
        self
    }

    /// Adds a named formatting variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn lines(&self) -> &[DiagnosticLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&DiagnosticLine> {
        self.lines.get(index)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The named variables used to format this diagnostic's lines.
    pub fn vars(&self) -> &TagMap {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether this diagnostic makes the enclosing command fail.
    pub fn is_failure(&self) -> bool {
        self.severity.is_failure()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                f.write_str("\n")?;
            }
            f.write_str(&line.text)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_code_decodes_independently() {
        // severity=3, argc=2, generic=17, subsystem=5, subcode=321
        let code: u32 = (3 << 28) | (2 << 24) | (17 << 16) | (5 << 10) | 321;
        let line = DiagnosticLine::new(Severity::Failed, code, "boom");

        assert_eq!(line.sub_code(), 321);
        assert_eq!(line.subsystem(), 5);
        assert_eq!(line.generic(), 17);
        assert_eq!(line.arg_count(), 2);
        assert_eq!(line.code_severity(), Severity::Failed);
        assert_eq!(line.unique_code(), (5 << 10) | 321);
    }

    #[test]
    fn display_joins_lines() {
        let d = Diagnostic::new(Severity::Failed)
            .with_line(Severity::Failed, 0, "first")
            .with_line(Severity::Info, 0, "second");
        assert_eq!(d.to_string(), "first\nsecond");
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Fatal > Severity::Failed);
        assert!(Severity::Failed > Severity::Warn);
        assert!(!Severity::Warn.is_failure());
        assert!(Severity::Failed.is_failure());
    }
}
