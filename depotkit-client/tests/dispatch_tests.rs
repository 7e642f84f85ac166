mod common;

use common::tagmap;
use depotkit_client::{CommandSink, EventSink, HandlerAction, OutputHandler};
use depotkit_spec::SchemaRegistry;
use depotkit_types::{Diagnostic, ResultKind, ResultUnit, Severity, SpecRecord, TagMap};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn sink(command: &str) -> CommandSink {
    CommandSink::new(command, Arc::new(SchemaRegistry::new()))
}

/// Counts callbacks and answers each kind with a fixed action.
#[derive(Default)]
struct Script {
    on_text: Option<HandlerAction>,
    on_stat: Option<HandlerAction>,
    on_track: Option<HandlerAction>,
    on_message: Option<HandlerAction>,
    cancel_text_at: Option<usize>,
    texts: AtomicUsize,
    stats: AtomicUsize,
    specs: AtomicUsize,
    tracks: AtomicUsize,
    messages: AtomicUsize,
}

impl OutputHandler for Script {
    fn handle_text(&self, _data: &str) -> HandlerAction {
        let seen = self.texts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.cancel_text_at == Some(seen) {
            return HandlerAction::Cancel;
        }
        self.on_text.unwrap_or_default()
    }

    fn handle_stat(&self, _record: &TagMap) -> HandlerAction {
        self.stats.fetch_add(1, Ordering::SeqCst);
        self.on_stat.unwrap_or_default()
    }

    fn handle_spec(&self, _spec: &SpecRecord) -> HandlerAction {
        self.specs.fetch_add(1, Ordering::SeqCst);
        HandlerAction::Report
    }

    fn handle_track(&self, _line: &str) -> HandlerAction {
        self.tracks.fetch_add(1, Ordering::SeqCst);
        self.on_track.unwrap_or_default()
    }

    fn handle_message(&self, _message: &Diagnostic) -> HandlerAction {
        self.messages.fetch_add(1, Ordering::SeqCst);
        self.on_message.unwrap_or_default()
    }
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn mixed_events_accumulate_in_arrival_order() {
    let mut sink = sink("fstat");
    sink.stat(tagmap(&[("depotFile", "//depot/a")]));
    sink.message(Diagnostic::info("note"));
    sink.stat(tagmap(&[("depotFile", "//depot/b")]));
    sink.message(Diagnostic::failed("denied"));

    let out = sink.finish();
    let kinds: Vec<ResultKind> = out.results.iter().map(ResultUnit::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ResultKind::Record,
            ResultKind::Message,
            ResultKind::Record,
            ResultKind::Message,
        ]
    );
    assert_eq!(out.failures.len(), 1);
    assert!(out.alive);
}

// ── Handler suppression ──────────────────────────────────────────

#[test]
fn handled_stat_keeps_records_out_of_the_collection() {
    let handler = Arc::new(Script {
        on_stat: Some(HandlerAction::Handled),
        ..Script::default()
    });
    let mut sink = sink("fstat").with_output_handler(Some(handler.clone()));

    for i in 0..4 {
        let rev = i.to_string();
        sink.stat(tagmap(&[("rev", rev.as_str())]));
    }
    sink.text("done");

    let out = sink.finish();
    assert_eq!(handler.stats.load(Ordering::SeqCst), 4);
    assert_eq!(out.results.count_of(ResultKind::Record), 0);
    assert_eq!(out.results.count_of(ResultKind::Text), 1);
}

#[test]
fn without_a_handler_everything_is_reported() {
    let mut sink = sink("print");
    sink.text("a line");
    sink.binary(&[1, 2, 3]);
    let out = sink.finish();
    assert_eq!(out.results.len(), 2);
}

// ── Cancellation ─────────────────────────────────────────────────

#[test]
fn cancel_stops_appending_but_tolerates_stragglers() {
    let handler = Arc::new(Script {
        cancel_text_at: Some(3),
        ..Script::default()
    });
    let mut sink = sink("print").with_output_handler(Some(handler.clone()));

    for i in 0..5 {
        sink.text(&format!("line {i}"));
    }
    // The transport may emit more before it polls is_alive.
    sink.stat(tagmap(&[("late", "record")]));
    sink.message(Diagnostic::failed("late failure"));
    assert!(!sink.is_alive());

    let out = sink.finish();
    assert!(!out.alive);
    assert_eq!(out.results.count_of(ResultKind::Text), 2);
    assert_eq!(out.results.count_of(ResultKind::Record), 0);
    // Dropped events never reach the handler either.
    assert_eq!(handler.texts.load(Ordering::SeqCst), 3);
    assert_eq!(handler.stats.load(Ordering::SeqCst), 0);
    // Nor the failure log.
    assert!(out.failures.is_empty());
}

// ── Track lines ──────────────────────────────────────────────────

#[test]
fn track_text_decomposes_into_track_units() {
    let mut sink = sink("sync").with_track(true);
    sink.text("--- lapse .5s\n--- rpc msgs/size 12\n--- db.rev reads 4\n");

    let out = sink.finish();
    assert_eq!(out.results.count_of(ResultKind::Track), 3);
    assert_eq!(
        out.results.units()[0],
        ResultUnit::Track("lapse .5s".into())
    );
    assert_eq!(
        out.results.units()[2],
        ResultUnit::Track("db.rev reads 4".into())
    );
}

#[test]
fn track_disabled_passes_marker_text_through() {
    let mut sink = sink("sync");
    sink.text("--- lapse .5s\n");
    let out = sink.finish();
    assert_eq!(out.results.count_of(ResultKind::Track), 0);
    assert_eq!(out.results.count_of(ResultKind::Text), 1);
}

#[test]
fn track_without_trailing_delimiter_falls_back_to_text() {
    let mut sink = sink("sync").with_track(true);
    sink.text("--- looks like track but is not");

    let out = sink.finish();
    assert_eq!(out.results.count_of(ResultKind::Track), 0);
    assert_eq!(out.results.count_of(ResultKind::Text), 1);
    assert_eq!(
        out.results.units()[0],
        ResultUnit::Text("--- looks like track but is not".into())
    );
}

#[test]
fn malformed_track_rolls_back_partial_lines() {
    let mut sink = sink("sync").with_track(true);
    // First segment parses, then an empty segment betrays the event.
    sink.text("--- lapse .5s\n\nplain tail");

    let out = sink.finish();
    assert_eq!(out.results.count_of(ResultKind::Track), 0);
    assert_eq!(out.results.count_of(ResultKind::Text), 1);
}

#[test]
fn track_rollback_discards_the_whole_trailing_run() {
    let mut sink = sink("sync").with_track(true);
    sink.text("old output");
    sink.text("--- good line\n");
    sink.text("--- bad\n\n");

    // The rollback removes the contiguous run of track lines at the
    // tail, reaching into the preceding event's lines, but never past a
    // non-track unit.
    let out = sink.finish();
    assert_eq!(out.results.count_of(ResultKind::Track), 0);
    assert_eq!(out.results.count_of(ResultKind::Text), 2);
    assert_eq!(out.results.units()[0], ResultUnit::Text("old output".into()));
}

#[test]
fn track_lines_respect_the_handler_contract() {
    let handler = Arc::new(Script {
        on_track: Some(HandlerAction::Handled),
        ..Script::default()
    });
    let mut sink = sink("sync")
        .with_track(true)
        .with_output_handler(Some(handler.clone()));
    sink.text("--- one\n--- two\n");

    let out = sink.finish();
    assert_eq!(handler.tracks.load(Ordering::SeqCst), 2);
    assert_eq!(out.results.count_of(ResultKind::Track), 0);
}

// ── Stat / spec classification ───────────────────────────────────

const WIDGET_SPECDEF: &str = "Widget;code:1;rq;;Parts;code:2;type:wlist;words:2;;";

#[test]
fn flagged_record_becomes_a_spec_unit() {
    let handler = Arc::new(Script::default());
    let mut sink = sink("widget").with_output_handler(Some(handler.clone()));
    sink.stat(tagmap(&[
        ("specdef", WIDGET_SPECDEF),
        ("specFormatted", "1"),
        ("func", "widget-Info"),
        ("Widget", "bolt"),
        ("Parts0", "head shank"),
    ]));

    let out = sink.finish();
    assert_eq!(handler.specs.load(Ordering::SeqCst), 1);
    assert_eq!(handler.stats.load(Ordering::SeqCst), 0);
    let spec = out.results.units()[0].as_spec().expect("spec unit");
    assert_eq!(spec.get("Widget"), Some("bolt"));
    assert_eq!(spec.get("Parts0"), Some("head shank"));
    assert!(!spec.contains("specdef"));
    assert!(!spec.contains("func"));
}

#[test]
fn old_style_data_form_is_parsed_with_the_shipped_schema() {
    let mut sink = sink("widget");
    sink.stat(tagmap(&[
        ("specdef", WIDGET_SPECDEF),
        ("data", "Widget:\tnut\nParts:\n\thex core\n"),
    ]));

    let out = sink.finish();
    let spec = out.results.units()[0].as_spec().expect("spec unit");
    assert_eq!(spec.get("Widget"), Some("nut"));
    assert_eq!(spec.get("Parts0"), Some("hex core"));
}

#[test]
fn unflagged_record_stays_plain_with_sentinels_stripped() {
    let mut sink = sink("fstat");
    // A specdef alone (no data, no specFormatted) does not make a form.
    sink.stat(tagmap(&[
        ("specdef", WIDGET_SPECDEF),
        ("func", "dm-Fstat"),
        ("depotFile", "//depot/a"),
    ]));

    let out = sink.finish();
    let record = out.results.units()[0].as_record().expect("plain record");
    assert_eq!(record.get("depotFile").map(String::as_str), Some("//depot/a"));
    assert!(!record.contains_key("specdef"));
    assert!(!record.contains_key("func"));
}

#[test]
fn shipped_specdef_is_registered_for_later_translation() {
    let schemas = Arc::new(SchemaRegistry::new());
    let mut sink = CommandSink::new("widget", Arc::clone(&schemas));
    sink.stat(tagmap(&[
        ("specdef", WIDGET_SPECDEF),
        ("specFormatted", "1"),
        ("Widget", "bolt"),
    ]));
    drop(sink);

    assert!(schemas.has_schema("widget"));
    let spec = schemas
        .parse_document("widget", "Widget:\tscrew\n")
        .unwrap();
    assert_eq!(spec.get("Widget"), Some("screw"));
}

#[test]
fn unparseable_data_form_reports_a_failure() {
    let mut sink = sink("widget");
    sink.stat(tagmap(&[
        ("specdef", WIDGET_SPECDEF),
        ("data", "\tindented with no tag\n"),
    ]));

    let out = sink.finish();
    assert_eq!(out.results.count_of(ResultKind::Spec), 0);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.results.error_count(), 1);
}

// ── Messages ─────────────────────────────────────────────────────

#[test]
fn empty_severity_messages_vanish() {
    let mut sink = sink("info");
    sink.message(Diagnostic::new(Severity::Empty));
    let out = sink.finish();
    assert!(out.results.is_empty());
    assert!(out.failures.is_empty());
}

#[test]
fn suppressed_failures_still_fail_the_command() {
    let handler = Arc::new(Script {
        on_message: Some(HandlerAction::Handled),
        ..Script::default()
    });
    let mut sink = sink("sync").with_output_handler(Some(handler));
    sink.message(Diagnostic::failed("must still surface"));

    let out = sink.finish();
    assert_eq!(out.results.count_of(ResultKind::Message), 0);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].to_string(), "must still surface");
}
