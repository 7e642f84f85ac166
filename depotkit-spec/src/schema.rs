//! Parsed per-document-type field schemas.
//!
//! The wire format packs one field per `;;`-terminated group:
//! `Tag;code:301;rq;ro;type:wlist;words:2;len:64;;`. Attributes we do not
//! act on (`fmt`, `len`, `seq`, `open`, `opt`, `z`) are accepted and
//! dropped.

use crate::{SpecError, SpecResult};
use depotkit_types::TagMap;
use serde::{Deserialize, Serialize};

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A single whitespace-delimited word (or fixed word group).
    #[default]
    Word,
    /// A single line of free text.
    Line,
    /// A multi-line text block.
    Text,
    /// A date value, formatted by the server.
    Date,
    /// A single value from a fixed set.
    Select,
    /// A repeated field whose entries are word groups.
    WordList,
    /// A repeated field whose entries are whole lines.
    LineList,
}

impl FieldKind {
    fn from_wire(name: &str) -> Option<Self> {
        match name {
            "word" => Some(Self::Word),
            "line" => Some(Self::Line),
            "text" | "bulk" => Some(Self::Text),
            "date" => Some(Self::Date),
            "select" => Some(Self::Select),
            "wlist" => Some(Self::WordList),
            "llist" => Some(Self::LineList),
            _ => None,
        }
    }

    /// Whether entries repeat and flatten to `Tag0`, `Tag1`, …
    pub fn is_list(self) -> bool {
        matches!(self, Self::WordList | Self::LineList)
    }
}

/// One field definition within a document schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Canonical tag, with the server's casing.
    pub tag: String,
    /// Numeric field code; `None` when the server ships the `NNN`
    /// placeholder for a not-yet-assigned code.
    pub code: Option<u32>,
    pub kind: FieldKind,
    pub required: bool,
    pub read_only: bool,
    /// Expected word count per entry (0 = unconstrained).
    pub words: u32,
    /// Upper word-count bound when entries may exceed `words`.
    pub max_words: u32,
    /// Value filled in when a required field is left empty. Values
    /// starting with `$` are expanded server-side and left alone here.
    pub preset: Option<String>,
    /// Allowed values for `Select` fields.
    pub values: Vec<String>,
}

impl FieldDef {
    fn parse(group: &str) -> SpecResult<Self> {
        let mut parts = group.split(';');
        let tag = parts
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SpecError::MalformedSchema(format!("empty field group '{group}'")))?;

        let mut def = Self {
            tag: tag.to_string(),
            code: None,
            kind: FieldKind::Word,
            required: false,
            read_only: false,
            words: 0,
            max_words: 0,
            preset: None,
            values: Vec::new(),
        };

        for attr in parts {
            let attr = attr.trim();
            if attr.is_empty() {
                continue;
            }
            match attr.split_once(':') {
                Some(("code", v)) => def.code = v.parse().ok(),
                Some(("type", v)) => {
                    def.kind = FieldKind::from_wire(v).ok_or_else(|| {
                        SpecError::MalformedSchema(format!("unknown field type '{v}' on '{tag}'"))
                    })?;
                }
                Some(("words", v)) => {
                    def.words = v.parse().map_err(|_| {
                        SpecError::MalformedSchema(format!("bad words count on '{tag}'"))
                    })?;
                }
                Some(("maxwords", v)) => {
                    def.max_words = v.parse().map_err(|_| {
                        SpecError::MalformedSchema(format!("bad maxwords count on '{tag}'"))
                    })?;
                }
                Some(("pre", v)) => def.preset = Some(v.to_string()),
                Some(("val", v)) => {
                    def.values = v
                        .split(['/', ','])
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                Some(_) => {} // fmt, len, seq, open, opt: presentation hints
                None => match attr {
                    "rq" => def.required = true,
                    "ro" => def.read_only = true,
                    _ => {} // z and friends
                },
            }
        }
        Ok(def)
    }

    /// Upper bound on words per entry, when constrained.
    pub fn word_limit(&self) -> u32 {
        self.max_words.max(self.words)
    }
}

/// A full document schema: the ordered field definitions of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSchema {
    fields: Vec<FieldDef>,
}

impl SpecSchema {
    /// Parses the wire schema string.
    pub fn parse(text: &str) -> SpecResult<Self> {
        let mut fields: Vec<FieldDef> = Vec::new();
        for group in text.split(";;") {
            let group = group.trim();
            if group.is_empty() {
                continue;
            }
            let def = FieldDef::parse(group)?;
            if fields.iter().any(|f| f.tag.eq_ignore_ascii_case(&def.tag)) {
                return Err(SpecError::MalformedSchema(format!(
                    "duplicate field '{}'",
                    def.tag
                )));
            }
            fields.push(def);
        }
        if fields.is_empty() {
            return Err(SpecError::MalformedSchema("no fields defined".to_string()));
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.tag.eq_ignore_ascii_case(name))
    }

    /// Maps each lowercase field name to its canonical tag, so callers can
    /// address fields case-insensitively while rendered documents keep the
    /// server's casing.
    pub fn field_names(&self) -> TagMap {
        self.fields
            .iter()
            .map(|f| (f.tag.to_ascii_lowercase(), f.tag.clone()))
            .collect()
    }
}
