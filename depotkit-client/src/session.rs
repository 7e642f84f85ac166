//! The command session façade.
//!
//! A [`Session`] owns a transport, the handler registrations for its four
//! callback roles, the queued input for the next command, and the
//! session-wide track flag. One command runs at a time; issuing a second
//! while one is outstanding fails fast instead of corrupting shared
//! state.

use crate::dispatch::{CommandOutput, CommandSink};
use crate::error::{CommandFailure, RunError, RunResult};
use crate::handler::{OutputHandler, ProgressHandler, ResolveHandler, SsoHandler};
use crate::registry::{HandleId, HandlerRegistry};
use crate::transport::CommandTransport;
use depotkit_spec::SchemaRegistry;
use depotkit_types::{Diagnostic, ResultCollection, SpecRecord, TagMap};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// A client session: one connection, one command at a time.
pub struct Session<T: CommandTransport> {
    transport: T,
    schemas: Arc<SchemaRegistry>,
    handlers: Arc<HandlerRegistry>,
    output_handle: Option<HandleId>,
    progress_handle: Option<HandleId>,
    resolve_handle: Option<HandleId>,
    sso_handle: Option<HandleId>,
    input: VecDeque<String>,
    track: bool,
    running: bool,
}

impl<T: CommandTransport> Session<T> {
    /// A session over `transport`, using the process-wide schema and
    /// handler registries.
    pub fn new(transport: T) -> Self {
        Self::with_registries(transport, SchemaRegistry::shared(), HandlerRegistry::shared())
    }

    /// A session with explicit registries, for callers that want
    /// isolation from the process-wide tables.
    pub fn with_registries(
        transport: T,
        schemas: Arc<SchemaRegistry>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            transport,
            schemas,
            handlers,
            output_handle: None,
            progress_handle: None,
            resolve_handle: None,
            sso_handle: None,
            input: VecDeque::new(),
            track: false,
            running: false,
        }
    }

    pub fn connect(&mut self) -> RunResult<()> {
        self.transport.connect()?;
        Ok(())
    }

    pub fn disconnect(&mut self) -> RunResult<()> {
        self.transport.disconnect()?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    /// Whether trace-line decomposition is enabled.
    pub fn track(&self) -> bool {
        self.track
    }

    /// Enables or disables performance tracking. The protocol negotiates
    /// this at connect time, so it is locked while connected.
    pub fn set_track(&mut self, enabled: bool) -> RunResult<()> {
        if self.transport.is_connected() {
            return Err(RunError::TrackModeLocked);
        }
        self.track = enabled;
        Ok(())
    }

    // ── Handler registration ─────────────────────────────────────

    pub fn set_output_handler(&mut self, handler: Option<Arc<dyn OutputHandler>>) {
        if let Some(old) = self.output_handle.take() {
            self.handlers.unregister_output(old);
        }
        self.output_handle = handler.map(|h| self.handlers.register_output(h));
    }

    pub fn set_progress_handler(&mut self, handler: Option<Arc<dyn ProgressHandler>>) {
        if let Some(old) = self.progress_handle.take() {
            self.handlers.unregister_progress(old);
        }
        self.progress_handle = handler.map(|h| self.handlers.register_progress(h));
    }

    pub fn set_resolve_handler(&mut self, handler: Option<Arc<dyn ResolveHandler>>) {
        if let Some(old) = self.resolve_handle.take() {
            self.handlers.unregister_resolve(old);
        }
        self.resolve_handle = handler.map(|h| self.handlers.register_resolve(h));
    }

    pub fn set_sso_handler(&mut self, handler: Option<Arc<dyn SsoHandler>>) {
        if let Some(old) = self.sso_handle.take() {
            self.handlers.unregister_sso(old);
        }
        self.sso_handle = handler.map(|h| self.handlers.register_sso(h));
    }

    // ── Queued input ─────────────────────────────────────────────

    /// Replaces the queued input lines the next command may consume.
    pub fn set_input<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input = lines.into_iter().map(Into::into).collect();
    }

    pub fn append_input(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    // ── Command execution ────────────────────────────────────────

    /// Runs one command and returns its ordered result collection.
    ///
    /// A Failed/Fatal diagnostic anywhere in the output, or a transport
    /// error mid-command, comes back as [`RunError::Command`] carrying
    /// the collection, so order and partial output are never lost.
    pub fn run(&mut self, command: &str, args: &[&str]) -> RunResult<ResultCollection> {
        if self.running {
            warn!(command, "rejected nested command");
            return Err(RunError::NestedCommand);
        }
        if !self.transport.is_connected() {
            return Err(RunError::NotConnected);
        }

        debug!(command, ?args, "running command");
        let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        let mut sink = CommandSink::new(command, Arc::clone(&self.schemas))
            .with_track(self.track)
            .with_input(std::mem::take(&mut self.input))
            .with_output_handler(self.output_handle.and_then(|h| self.handlers.output(h)))
            .with_progress_handler(self.progress_handle.and_then(|h| self.handlers.progress(h)))
            .with_resolve_handler(self.resolve_handle.and_then(|h| self.handlers.resolve(h)))
            .with_sso_handler(self.sso_handle.and_then(|h| self.handlers.sso(h)));

        self.running = true;
        let run_status = self.transport.run(command, &args, &mut sink);
        self.running = false;

        let CommandOutput {
            results,
            failures,
            alive,
        } = sink.finish();

        // A cancelled command may have taken the connection down with it;
        // re-establish before the next command is allowed to proceed.
        let mut transport_error = run_status.err();
        if !alive && self.transport.dropped() {
            debug!(command, "re-establishing dropped connection after cancel");
            if let Err(e) = self.transport.disconnect() {
                debug!(error = %e, "disconnect after cancel");
            }
            if let Err(e) = self.transport.connect() {
                warn!(error = %e, "reconnect after cancel failed");
                transport_error.get_or_insert(e);
            }
        }

        if failures.is_empty() && transport_error.is_none() {
            Ok(results)
        } else {
            Err(RunError::Command(CommandFailure::new(
                results,
                failures,
                transport_error,
            )))
        }
    }

    // ── Convenience command forms ────────────────────────────────

    /// Fetches a document (`<type> -o …`) as a spec record.
    pub fn fetch(&mut self, doc_type: &str, args: &[&str]) -> RunResult<SpecRecord> {
        let mut full_args = vec!["-o"];
        full_args.extend_from_slice(args);
        let results = self.run(doc_type, &full_args)?;
        results.first_record().ok_or_else(|| RunError::MissingResult {
            command: doc_type.to_string(),
        })
    }

    /// Saves a document (`<type> -i`) rendered from `record`, returning
    /// the server's confirmation message if it sent one.
    pub fn save(
        &mut self,
        doc_type: &str,
        record: &SpecRecord,
        args: &[&str],
    ) -> RunResult<Option<Diagnostic>> {
        let form = self.schemas.render_document(doc_type, record)?;
        self.set_input([form]);
        let mut full_args = vec!["-i"];
        full_args.extend_from_slice(args);
        let results = self.run(doc_type, &full_args)?;
        Ok(first_message(&results))
    }

    /// Deletes a document (`<type> -d …`).
    pub fn delete(&mut self, doc_type: &str, args: &[&str]) -> RunResult<Option<Diagnostic>> {
        let mut full_args = vec!["-d"];
        full_args.extend_from_slice(args);
        let results = self.run(doc_type, &full_args)?;
        Ok(first_message(&results))
    }

    // ── Document translation passthroughs ────────────────────────

    pub fn parse_document(&self, doc_type: &str, form_text: &str) -> RunResult<SpecRecord> {
        Ok(self.schemas.parse_document(doc_type, form_text)?)
    }

    pub fn render_document(&self, doc_type: &str, record: &SpecRecord) -> RunResult<String> {
        Ok(self.schemas.render_document(doc_type, record)?)
    }

    pub fn field_names(&self, doc_type: &str) -> RunResult<TagMap> {
        Ok(self.schemas.field_names(doc_type)?)
    }
}

impl<T: CommandTransport> Drop for Session<T> {
    fn drop(&mut self) {
        self.set_output_handler(None);
        self.set_progress_handler(None);
        self.set_resolve_handler(None);
        self.set_sso_handler(None);
    }
}

fn first_message(results: &ResultCollection) -> Option<Diagnostic> {
    results
        .iter()
        .find_map(|u| u.as_message())
        .cloned()
}
