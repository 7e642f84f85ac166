//! Per-command output dispatch.
//!
//! A [`CommandSink`] receives one command's output events from the
//! transport, routes each through the optional output handler, and
//! accumulates the accepted units in arrival order. Cancellation is
//! cooperative: once a handler answers [`HandlerAction::Cancel`], every
//! later event is dropped without reaching the handler or the collection,
//! and the transport is expected to stop once it polls
//! [`EventSink::is_alive`].

use crate::handler::{
    HandlerAction, OutputHandler, ProgressHandler, ResolveHandler, SsoHandler, SsoReply,
};
use crate::resolve::{negotiate, MergeCase, MergeDecision};
use crate::transport::EventSink;
use depotkit_spec::SchemaRegistry;
use depotkit_types::{Diagnostic, ResultCollection, Severity, TagMap};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Marker prefix of a performance-trace text event.
const TRACK_PREFIX: &str = "--- ";

/// Keys the server attaches to flag and describe form records.
const SENTINEL_KEYS: [&str; 3] = ["specdef", "func", "specFormatted"];

/// What a finished command hands back to the session.
pub struct CommandOutput {
    pub results: ResultCollection,
    /// Failed/Fatal diagnostics seen, whether or not the handler
    /// suppressed their units.
    pub failures: Vec<Diagnostic>,
    /// False when a handler cancelled the command.
    pub alive: bool,
}

/// The event sink for one command invocation.
pub struct CommandSink {
    command: String,
    schemas: Arc<SchemaRegistry>,
    output: Option<Arc<dyn OutputHandler>>,
    progress: Option<Arc<dyn ProgressHandler>>,
    resolver: Option<Arc<dyn ResolveHandler>>,
    sso: Option<Arc<dyn SsoHandler>>,
    input: VecDeque<String>,
    track: bool,
    alive: bool,
    results: ResultCollection,
    failures: Vec<Diagnostic>,
}

impl CommandSink {
    pub fn new(command: impl Into<String>, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            command: command.into(),
            schemas,
            output: None,
            progress: None,
            resolver: None,
            sso: None,
            input: VecDeque::new(),
            track: false,
            alive: true,
            results: ResultCollection::new(),
            failures: Vec::new(),
        }
    }

    /// Enables trace-line decomposition of `"--- "`-prefixed text.
    pub fn with_track(mut self, track: bool) -> Self {
        self.track = track;
        self
    }

    pub fn with_output_handler(mut self, handler: Option<Arc<dyn OutputHandler>>) -> Self {
        self.output = handler;
        self
    }

    pub fn with_progress_handler(mut self, handler: Option<Arc<dyn ProgressHandler>>) -> Self {
        self.progress = handler;
        self
    }

    pub fn with_resolve_handler(mut self, handler: Option<Arc<dyn ResolveHandler>>) -> Self {
        self.resolver = handler;
        self
    }

    pub fn with_sso_handler(mut self, handler: Option<Arc<dyn SsoHandler>>) -> Self {
        self.sso = handler;
        self
    }

    /// Queues the input lines the command may consume.
    pub fn with_input(mut self, input: VecDeque<String>) -> Self {
        self.input = input;
        self
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn results(&self) -> &ResultCollection {
        &self.results
    }

    /// Consumes the sink after the command has finished.
    pub fn finish(self) -> CommandOutput {
        CommandOutput {
            results: self.results,
            failures: self.failures,
            alive: self.alive,
        }
    }

    /// Applies a handler verdict; returns whether to append the unit.
    fn apply(&mut self, action: HandlerAction) -> bool {
        match action {
            HandlerAction::Report => true,
            HandlerAction::Handled => false,
            HandlerAction::Cancel => {
                debug!(command = %self.command, "handler cancelled command");
                self.alive = false;
                false
            }
        }
    }

    fn dispatch_text(&mut self, data: &str) {
        let action = self
            .output
            .as_ref()
            .map_or(HandlerAction::Report, |h| h.handle_text(data));
        if self.apply(action) {
            self.results.append_text(data);
        }
    }

    /// Splits a `"--- "`-prefixed text event into trace lines. Each
    /// segment runs to the next embedded newline; the following segment
    /// starts five bytes past it, skipping the repeated marker. An empty
    /// segment, or a trailing fragment with no delimiter, means the event
    /// was not trace data after all: already-appended lines are rolled
    /// back and the whole event is dispatched as one text unit.
    fn dispatch_track(&mut self, data: &str) {
        let bytes = data.as_bytes();
        let mut p = TRACK_PREFIX.len();
        for i in p..bytes.len() {
            if bytes[i] != b'\n' {
                continue;
            }
            let segment = if i > p { data.get(p..i) } else { None };
            let Some(line) = segment else {
                self.results.discard_trailing_track();
                self.dispatch_text(data);
                return;
            };
            self.accept_track(line);
            p = i + TRACK_PREFIX.len() + 1;
        }
        if p < bytes.len() {
            // No trailing delimiter: not trace data.
            self.results.discard_trailing_track();
            self.dispatch_text(data);
        }
    }

    fn accept_track(&mut self, line: &str) {
        if !self.alive {
            return;
        }
        let action = self
            .output
            .as_ref()
            .map_or(HandlerAction::Report, |h| h.handle_track(line));
        if self.apply(action) {
            self.results.append_track(line);
        }
    }

    fn dispatch_record(&mut self, record: TagMap) {
        let action = self
            .output
            .as_ref()
            .map_or(HandlerAction::Report, |h| h.handle_stat(&record));
        if self.apply(action) {
            self.results.append_record(record);
        }
    }
}

impl EventSink for CommandSink {
    fn text(&mut self, data: &str) {
        if !self.alive {
            return;
        }
        if self.track && data.len() > TRACK_PREFIX.len() && data.starts_with(TRACK_PREFIX) {
            self.dispatch_track(data);
        } else {
            self.dispatch_text(data);
        }
    }

    fn binary(&mut self, data: &[u8]) {
        if !self.alive {
            return;
        }
        let action = self
            .output
            .as_ref()
            .map_or(HandlerAction::Report, |h| h.handle_binary(data));
        if self.apply(action) {
            self.results.append_binary(data.to_vec());
        }
    }

    fn stat(&mut self, record: TagMap) {
        if !self.alive {
            return;
        }

        // Two generations of servers flag forms differently: older ones
        // ship the form text in `data` for the client to parse, newer
        // ones ship it pre-parsed and set `specFormatted`. Either way the
        // `specdef` variable is required, and is cached for later
        // translation keyed by the command name.
        let specdef = record.get("specdef").cloned();
        let form_text = record.get("data").cloned();
        let is_form = specdef.is_some() && (form_text.is_some() || record.contains_key("specFormatted"));

        if let Some(specdef) = &specdef {
            if let Err(e) = self.schemas.register(&self.command, specdef) {
                warn!(command = %self.command, error = %e, "server schema did not parse");
            }
        }

        if is_form {
            let converted = match form_text {
                Some(text) => match self.schemas.convert_form_text(&self.command, &text, &record) {
                    Ok(spec) => Some(spec),
                    Err(e) => {
                        self.message(Diagnostic::failed(e.to_string()));
                        return;
                    }
                },
                None => self.schemas.convert_record(&self.command, &record),
            };
            if let Some(spec) = converted {
                let action = self
                    .output
                    .as_ref()
                    .map_or(HandlerAction::Report, |h| h.handle_spec(&spec));
                if self.apply(action) {
                    self.results.append_spec(spec);
                }
                return;
            }
            debug!(command = %self.command, "form record fell back to plain dispatch");
        }

        let mut plain = record;
        for key in SENTINEL_KEYS {
            plain.shift_remove(key);
        }
        self.dispatch_record(plain);
    }

    fn message(&mut self, message: Diagnostic) {
        if !self.alive || message.severity() == Severity::Empty {
            return;
        }
        // Failures drive the command's error status even when the handler
        // keeps the unit out of the collection.
        if message.is_failure() {
            self.failures.push(message.clone());
        }
        let action = self
            .output
            .as_ref()
            .map_or(HandlerAction::Report, |h| h.handle_message(&message));
        if self.apply(action) {
            self.results.append_message(message);
        }
    }

    fn resolve(&mut self, case: &MergeCase) -> MergeDecision {
        if !self.alive {
            return MergeDecision::Quit;
        }
        negotiate(case, self.resolver.as_deref())
    }

    fn sso_authorize(&mut self, vars: &TagMap, max_length: usize) -> SsoReply {
        match &self.sso {
            Some(h) => h.authorize(vars, max_length),
            None => SsoReply::skip(),
        }
    }

    fn provide_input(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn progress_begin(&mut self, kind: u32) -> bool {
        match &self.progress {
            Some(p) => {
                p.begin(kind);
                true
            }
            None => false,
        }
    }

    fn progress_describe(&mut self, description: &str, units: u32) {
        if let Some(p) = &self.progress {
            p.describe(description, units);
        }
    }

    fn progress_total(&mut self, total: u64) {
        if let Some(p) = &self.progress {
            p.total(total);
        }
    }

    fn progress_update(&mut self, position: u64) {
        if let Some(p) = &self.progress {
            p.update(position);
        }
    }

    fn progress_done(&mut self, failed: bool) {
        if let Some(p) = &self.progress {
            p.done(failed);
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}
