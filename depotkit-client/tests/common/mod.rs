//! Shared test doubles: a scripted in-memory transport.
#![allow(dead_code)] // not every test binary uses every helper

use depotkit_client::{CommandTransport, EventSink, MergeCase, MergeDecision, TransportError};
use depotkit_types::{Diagnostic, TagMap};
use std::collections::VecDeque;

pub fn tagmap(pairs: &[(&str, &str)]) -> TagMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// One step of a scripted command.
pub enum ScriptEvent {
    Text(String),
    Binary(Vec<u8>),
    Stat(TagMap),
    Message(Diagnostic),
    /// Present a merge case; the decision is recorded in `decisions`.
    Resolve(MergeCase),
    /// Pull one queued input line; recorded in `inputs_seen`.
    ReadInput,
    /// The server side drops the connection.
    Drop,
    /// The transport fails here.
    Fail(TransportError),
}

/// A transport that replays canned event scripts, one per `run` call,
/// and records everything the session does to it.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: VecDeque<Vec<ScriptEvent>>,
    connected: bool,
    dropped: bool,
    pub log: Vec<String>,
    pub runs: Vec<(String, Vec<String>)>,
    pub decisions: Vec<MergeDecision>,
    pub inputs_seen: Vec<Option<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: Vec<ScriptEvent>) -> Self {
        self.scripts.push_back(script);
        self
    }

    pub fn push_script(&mut self, script: Vec<ScriptEvent>) {
        self.scripts.push_back(script);
    }
}

impl CommandTransport for ScriptedTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        self.dropped = false;
        self.log.push("connect".to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        self.log.push("disconnect".to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn dropped(&self) -> bool {
        self.dropped
    }

    fn run(
        &mut self,
        command: &str,
        args: &[String],
        sink: &mut dyn EventSink,
    ) -> Result<(), TransportError> {
        self.log.push(format!("run {command}"));
        self.runs.push((command.to_string(), args.to_vec()));

        let script = self.scripts.pop_front().unwrap_or_default();
        let mut resolves_abandoned = false;
        for event in script {
            match event {
                ScriptEvent::Text(s) => sink.text(&s),
                ScriptEvent::Binary(b) => sink.binary(&b),
                ScriptEvent::Stat(d) => sink.stat(d),
                ScriptEvent::Message(m) => sink.message(m),
                ScriptEvent::Resolve(case) => {
                    if resolves_abandoned {
                        continue;
                    }
                    let decision = sink.resolve(&case);
                    self.decisions.push(decision);
                    if decision == MergeDecision::Quit {
                        resolves_abandoned = true;
                    }
                }
                ScriptEvent::ReadInput => {
                    let line = sink.provide_input();
                    self.inputs_seen.push(line);
                }
                ScriptEvent::Drop => {
                    self.dropped = true;
                }
                ScriptEvent::Fail(e) => return Err(e),
            }
        }
        Ok(())
    }
}
