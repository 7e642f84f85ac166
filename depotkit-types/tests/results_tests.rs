use depotkit_types::{
    Diagnostic, ResultCollection, ResultKind, ResultUnit, Severity, SpecRecord, TagMap,
};
use pretty_assertions::assert_eq;

fn record(pairs: &[(&str, &str)]) -> TagMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn mixed_kinds_preserve_arrival_order() {
    let mut c = ResultCollection::new();
    c.append_record(record(&[("depotFile", "//depot/a")]));
    c.append_message(Diagnostic::info("opened for edit"));
    c.append_record(record(&[("depotFile", "//depot/b")]));
    c.append_message(Diagnostic::failed("no permission"));

    let kinds: Vec<ResultKind> = c.iter().map(ResultUnit::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ResultKind::Record,
            ResultKind::Message,
            ResultKind::Record,
            ResultKind::Message,
        ]
    );
    assert_eq!(c.error_count(), 1);
    assert_eq!(c.info_count(), 1);
}

#[test]
fn counts_track_each_kind() {
    let mut c = ResultCollection::new();
    c.append_text("hello");
    c.append_binary(vec![0, 1, 2]);
    c.append_track("lbr: 1");
    c.append_spec(SpecRecord::new());
    c.append_message(Diagnostic::warn("careful"));

    assert_eq!(c.count_of(ResultKind::Text), 1);
    assert_eq!(c.count_of(ResultKind::Binary), 1);
    assert_eq!(c.count_of(ResultKind::Track), 1);
    assert_eq!(c.count_of(ResultKind::Spec), 1);
    assert_eq!(c.count_of(ResultKind::Message), 1);
    assert_eq!(c.count_of(ResultKind::Record), 0);
    assert_eq!(c.len(), 5);
}

// ── Empty severity ───────────────────────────────────────────────

#[test]
fn empty_severity_messages_are_dropped() {
    let mut c = ResultCollection::new();
    c.append_message(Diagnostic::new(Severity::Empty));
    assert!(c.is_empty());
    assert_eq!(c.count_of(ResultKind::Message), 0);
}

// ── Reset ────────────────────────────────────────────────────────

#[test]
fn reset_releases_everything() {
    let mut c = ResultCollection::new();
    c.append_text("one");
    c.append_message(Diagnostic::failed("bad"));
    c.reset();

    assert!(c.is_empty());
    assert_eq!(c.error_count(), 0);
    assert_eq!(c.count_of(ResultKind::Text), 0);
}

// ── Track rollback ───────────────────────────────────────────────

#[test]
fn discard_trailing_track_removes_only_the_tail_run() {
    let mut c = ResultCollection::new();
    c.append_track("early");
    c.append_text("middle");
    c.append_track("late 1");
    c.append_track("late 2");

    c.discard_trailing_track();

    assert_eq!(c.len(), 2);
    assert_eq!(c.count_of(ResultKind::Track), 1);
    assert_eq!(c.units()[0], ResultUnit::Track("early".into()));
    assert_eq!(c.units()[1], ResultUnit::Text("middle".into()));
}

#[test]
fn discard_trailing_track_on_trackless_tail_is_a_no_op() {
    let mut c = ResultCollection::new();
    c.append_track("early");
    c.append_text("tail");
    c.discard_trailing_track();
    assert_eq!(c.len(), 2);
}

// ── Lookup helpers ───────────────────────────────────────────────

#[test]
fn first_record_finds_spec_or_plain_record() {
    let mut c = ResultCollection::new();
    c.append_text("noise");
    c.append_record(record(&[("change", "42")]));

    let r = c.first_record().expect("record present");
    assert_eq!(r.get("change"), Some("42"));
}

#[test]
fn failures_yields_failed_and_fatal_in_order() {
    let mut c = ResultCollection::new();
    c.append_message(Diagnostic::info("fine"));
    c.append_message(Diagnostic::failed("first"));
    c.append_message(Diagnostic::fatal("second"));

    let texts: Vec<String> = c.failures().map(|d| d.to_string()).collect();
    assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
}
