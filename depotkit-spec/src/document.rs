//! Form text ↔ flattened record conversion.
//!
//! A form is the textual document a user edits:
//!
//! ```text
//! Client: my-workspace
//!
//! Description:
//!     Created by sam.
//!
//! View:
//!     //depot/... //my-workspace/... ## main line
//! ```
//!
//! Parsing flattens it against the schema into a [`SpecRecord`]: single
//! fields keyed by tag, repeated fields as `Tag0`, `Tag1`, … in source
//! order, entry comments as `TagComment0`, …. Rendering reverses the
//! mapping, producing the canonical normalized form.

use crate::schema::{FieldDef, FieldKind, SpecSchema};
use crate::{SpecError, SpecResult};
use depotkit_types::{SpecRecord, TagMap};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Splits a flattened key into its base name and numeric index, working
/// backwards from the end past digits and commas: `"how1,0"` becomes
/// `("how", "1,0")`.
pub fn split_key(key: &str) -> (&str, &str) {
    let mut split = key.len();
    for (i, c) in key.char_indices().rev() {
        if c.is_ascii_digit() || c == ',' {
            split = i;
        } else {
            break;
        }
    }
    if split == 0 {
        // All digits: the key is its own base.
        (key, "")
    } else {
        key.split_at(split)
    }
}

/// Whether a parse checks the schema's constraints or only flattens.
///
/// Server output is always flattened leniently; stale defaults in a
/// server-produced form must not fail the enclosing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Validation {
    Strict,
    Lenient,
}

/// Splits an entry into words, honoring double quotes.
fn words(entry: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut in_quotes = false;
    for (i, c) in entry.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        }
        if c.is_whitespace() && !in_quotes {
            if let Some(s) = start.take() {
                out.push(&entry[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&entry[s..]);
    }
    out
}

/// Collapses whitespace runs between words to single spaces.
fn normalize_words(entry: &str) -> String {
    words(entry).join(" ")
}

enum Target<'a> {
    Single(&'a FieldDef),
    List(&'a FieldDef),
    Unknown(String),
}

/// Parses form text against a schema into a flattened record.
pub(crate) fn parse(
    schema: &SpecSchema,
    text: &str,
    validation: Validation,
) -> SpecResult<SpecRecord> {
    let mut record = SpecRecord::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current: Option<Target<'_>> = None;

    for raw in text.lines() {
        if raw.starts_with('#') {
            continue;
        }
        if raw.trim().is_empty() {
            current = None;
            continue;
        }
        if raw.starts_with([' ', '\t']) {
            let entry = raw.trim();
            match &current {
                None => {
                    return Err(SpecError::MalformedDocument(format!(
                        "indented value '{entry}' belongs to no field"
                    )));
                }
                Some(Target::Single(def)) => append_single(&mut record, def, entry)?,
                Some(Target::List(def)) => push_entry(&mut record, &mut counts, def, entry),
                Some(Target::Unknown(name)) => append_unknown(&mut record, name, entry),
            }
        } else {
            let Some((name, rest)) = raw.split_once(':') else {
                return Err(SpecError::MalformedDocument(format!(
                    "expected 'Tag:' at '{raw}'"
                )));
            };
            let name = name.trim();
            let rest = rest.trim();
            match schema.field(name) {
                Some(def) if def.kind.is_list() => {
                    if !seen.insert(def.tag.clone()) {
                        return Err(SpecError::MalformedDocument(format!(
                            "field '{}' appears twice",
                            def.tag
                        )));
                    }
                    if !rest.is_empty() {
                        push_entry(&mut record, &mut counts, def, rest);
                    }
                    current = Some(Target::List(def));
                }
                Some(def) => {
                    if !seen.insert(def.tag.clone()) {
                        return Err(SpecError::MalformedDocument(format!(
                            "field '{}' appears twice",
                            def.tag
                        )));
                    }
                    if !rest.is_empty() {
                        record.insert(def.tag.clone(), rest);
                    }
                    current = Some(Target::Single(def));
                }
                None => {
                    record.insert_extra(name, rest);
                    current = Some(Target::Unknown(name.to_string()));
                }
            }
        }
    }

    if validation == Validation::Strict {
        validate(schema, &mut record)?;
    }
    Ok(record)
}

fn append_single(record: &mut SpecRecord, def: &FieldDef, entry: &str) -> SpecResult<()> {
    if let Some(value) = record.fields_mut().get_mut(&def.tag) {
        if def.kind == FieldKind::Text {
            value.push('\n');
            value.push_str(entry);
            return Ok(());
        }
        return Err(SpecError::MalformedDocument(format!(
            "multiple values for single-value field '{}'",
            def.tag
        )));
    }
    record.insert(def.tag.clone(), entry);
    Ok(())
}

fn push_entry(
    record: &mut SpecRecord,
    counts: &mut HashMap<String, usize>,
    def: &FieldDef,
    entry: &str,
) {
    let index = counts.entry(def.tag.clone()).or_insert(0);
    let n = *index;
    *index += 1;
    let (value, comment) = match entry.split_once("##") {
        Some((v, c)) => (v.trim_end(), Some(c.trim())),
        None => (entry, None),
    };
    let value = if def.kind == FieldKind::WordList {
        normalize_words(value)
    } else {
        value.to_string()
    };
    record.insert(format!("{}{}", def.tag, n), value);
    if let Some(comment) = comment {
        record.insert(format!("{}Comment{}", def.tag, n), comment);
    }
}

fn append_unknown(record: &mut SpecRecord, name: &str, entry: &str) {
    // Unknown fields keep their raw lines joined, like a text block.
    let joined = match record.extras().get(name) {
        Some(prior) if !prior.is_empty() => format!("{prior}\n{entry}"),
        _ => entry.to_string(),
    };
    record.insert_extra(name, joined);
}

fn validate(schema: &SpecSchema, record: &mut SpecRecord) -> SpecResult<()> {
    for def in schema.fields() {
        if def.kind.is_list() {
            let limit = def.word_limit();
            if def.kind == FieldKind::WordList && (def.words > 0 || limit > 0) {
                for n in 0.. {
                    let Some(entry) = record.fields().get(&format!("{}{}", def.tag, n)) else {
                        break;
                    };
                    let count = words(entry).len() as u32;
                    if (def.words > 0 && count < def.words) || (limit > 0 && count > limit) {
                        return Err(SpecError::MalformedDocument(format!(
                            "entry '{entry}' of '{}' needs {} word(s)",
                            def.tag, def.words
                        )));
                    }
                }
            }
            if def.required && !record.fields().contains_key(&format!("{}0", def.tag)) {
                return Err(SpecError::MalformedDocument(format!(
                    "missing required field '{}'",
                    def.tag
                )));
            }
            continue;
        }

        match record.fields().get(&def.tag) {
            Some(value) => {
                if def.kind == FieldKind::Select
                    && !def.values.is_empty()
                    && !def.values.iter().any(|v| v == value)
                {
                    return Err(SpecError::MalformedDocument(format!(
                        "value '{value}' not allowed for '{}'",
                        def.tag
                    )));
                }
                if def.kind == FieldKind::Word && def.words > 0 {
                    let count = words(value).len() as u32;
                    if count < def.words || count > def.word_limit() {
                        return Err(SpecError::MalformedDocument(format!(
                            "value '{value}' of '{}' needs {} word(s)",
                            def.tag, def.words
                        )));
                    }
                }
            }
            None if def.required => match &def.preset {
                Some(preset) if !preset.starts_with('$') => {
                    record.insert(def.tag.clone(), preset.clone());
                }
                // $-presets are expanded server-side; presence is implied.
                Some(_) => {}
                None => {
                    return Err(SpecError::MalformedDocument(format!(
                        "missing required field '{}'",
                        def.tag
                    )));
                }
            },
            None => {}
        }
    }
    Ok(())
}

fn write_single(out: &mut String, tag: &str, value: &str, block: bool) {
    if block || value.contains('\n') {
        let _ = writeln!(out, "{tag}:");
        for line in value.lines() {
            let _ = writeln!(out, "\t{line}");
        }
    } else {
        let _ = writeln!(out, "{tag}:\t{value}");
    }
    out.push('\n');
}

/// Drains `Tag0`, `Tag1`, … from `fields`, returning the entries paired
/// with their comments and recording the consumed keys.
fn collect_entries<'a>(
    fields: &'a TagMap,
    tag: &str,
    consumed: &mut HashSet<String>,
) -> Vec<(&'a str, Option<&'a str>)> {
    let mut entries = Vec::new();
    for n in 0.. {
        let key = format!("{tag}{n}");
        let Some(value) = fields.get(&key) else {
            break;
        };
        consumed.insert(key);
        let comment_key = format!("{tag}Comment{n}");
        let comment = fields.get(&comment_key).map(String::as_str);
        if comment.is_some() {
            consumed.insert(comment_key);
        }
        entries.push((value.as_str(), comment));
    }
    entries
}

fn write_list(out: &mut String, tag: &str, entries: &[(&str, Option<&str>)]) {
    let _ = writeln!(out, "{tag}:");
    for (value, comment) in entries {
        match comment {
            Some(c) => {
                let _ = writeln!(out, "\t{value} ## {c}");
            }
            None => {
                let _ = writeln!(out, "\t{value}");
            }
        }
    }
    out.push('\n');
}

/// Renders a record to canonical form text.
///
/// Schema fields come first in definition order; fields outside the
/// schema (and the record's extras) follow generically so they survive a
/// render/parse cycle.
pub(crate) fn render(schema: &SpecSchema, record: &SpecRecord) -> SpecResult<String> {
    let mut out = String::new();
    let mut consumed: HashSet<String> = HashSet::new();

    for def in schema.fields() {
        if def.kind.is_list() {
            if record.fields().contains_key(&def.tag) {
                return Err(SpecError::FieldMismatch(format!(
                    "repeated field '{}' needs indexed entries ('{}0', …)",
                    def.tag, def.tag
                )));
            }
            let entries = collect_entries(record.fields(), &def.tag, &mut consumed);
            if !entries.is_empty() {
                write_list(&mut out, &def.tag, &entries);
            }
        } else if let Some(value) = record.fields().get(&def.tag) {
            consumed.insert(def.tag.clone());
            write_single(&mut out, &def.tag, value, def.kind == FieldKind::Text);
        }
    }

    for (key, value) in record.fields() {
        if consumed.contains(key) {
            continue;
        }
        let (base, index) = split_key(key);
        if let Some(def) = schema.field(base) {
            if def.kind.is_list() {
                return Err(SpecError::FieldMismatch(format!(
                    "entry '{key}' breaks the numbering of repeated field '{}'",
                    def.tag
                )));
            }
            if !index.is_empty() {
                return Err(SpecError::FieldMismatch(format!(
                    "'{key}' indexes single-value field '{}'",
                    def.tag
                )));
            }
            return Err(SpecError::FieldMismatch(format!(
                "'{key}' duplicates field '{}' with different casing",
                def.tag
            )));
        }
        if let Some(list_tag) = base.strip_suffix("Comment") {
            if schema.field(list_tag).is_some_and(|d| d.kind.is_list()) {
                return Err(SpecError::FieldMismatch(format!(
                    "comment '{key}' has no matching entry"
                )));
            }
        }
        write_single(&mut out, key, value, false);
    }

    for (key, value) in record.extras() {
        if record.fields().contains_key(key) {
            continue;
        }
        write_single(&mut out, key, value, false);
    }

    Ok(out)
}

/// Renders only the schema-known subset of an already-flattened tag map.
///
/// This is the engine-side path for converting tagged server records:
/// sentinel keys and anything else outside the schema are skipped rather
/// than rejected.
pub(crate) fn render_known(schema: &SpecSchema, fields: &TagMap) -> String {
    let mut out = String::new();
    let mut consumed = HashSet::new();

    for def in schema.fields() {
        if def.kind.is_list() {
            let entries = collect_entries(fields, &def.tag, &mut consumed);
            if !entries.is_empty() {
                write_list(&mut out, &def.tag, &entries);
            }
        } else if let Some(value) = fields.get(&def.tag) {
            write_single(&mut out, &def.tag, value, def.kind == FieldKind::Text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_key_peels_digits_and_commas() {
        assert_eq!(split_key("how1,0"), ("how", "1,0"));
        assert_eq!(split_key("View0"), ("View", "0"));
        assert_eq!(split_key("Root"), ("Root", ""));
        assert_eq!(split_key("1234"), ("1234", ""));
    }

    #[test]
    fn words_honor_quotes() {
        assert_eq!(
            words(r#""//depot/a b/..." //ws/..."#),
            vec![r#""//depot/a b/...""#, "//ws/..."]
        );
        assert_eq!(words("  a   b "), vec!["a", "b"]);
    }
}
