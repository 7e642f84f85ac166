//! The seam between the session and whatever moves bytes to a server.
//!
//! The session never sees the wire. A [`CommandTransport`] runs one
//! command at a time and feeds every output event, in arrival order, into
//! the [`EventSink`] it is handed; mid-command negotiations (resolve, SSO,
//! queued input, progress) flow back through the same sink synchronously.

use crate::handler::SsoReply;
use crate::resolve::{MergeCase, MergeDecision};
use depotkit_types::{Diagnostic, TagMap};
use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No connection is established.
    #[error("not connected to a server")]
    NotConnected,

    /// The connection went away mid-command.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The peer violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Receives one command's output events and answers its negotiations.
///
/// All methods are called synchronously on the thread driving the
/// command. A transport should consult [`EventSink::is_alive`] between
/// events and stop emitting once the sink has been cancelled, though the
/// sink tolerates stragglers.
pub trait EventSink {
    /// Plain text output.
    fn text(&mut self, data: &str);

    /// Binary output.
    fn binary(&mut self, data: &[u8]);

    /// Tagged key/value output. Records flagged with the server's form
    /// markers are translated into spec records by the sink.
    fn stat(&mut self, record: TagMap);

    /// A diagnostic message.
    fn message(&mut self, message: Diagnostic);

    /// A pending conflict needing a decision before the command can
    /// continue. The returned decision is acted on immediately;
    /// [`MergeDecision::Quit`] abandons the remaining resolves of this
    /// command.
    fn resolve(&mut self, case: &MergeCase) -> MergeDecision;

    /// Single-sign-on negotiation during login.
    fn sso_authorize(&mut self, vars: &TagMap, max_length: usize) -> SsoReply;

    /// The next queued input line, when the command asks for one.
    fn provide_input(&mut self) -> Option<String>;

    /// Announces a unit of trackable work. Returns `false` when nobody
    /// is listening, letting the transport skip further progress calls.
    fn progress_begin(&mut self, kind: u32) -> bool;

    fn progress_describe(&mut self, description: &str, units: u32);

    fn progress_total(&mut self, total: u64);

    fn progress_update(&mut self, position: u64);

    fn progress_done(&mut self, failed: bool);

    /// `false` once the command has been cancelled from a handler.
    fn is_alive(&self) -> bool;
}

/// A connection to a server capable of running commands.
pub trait CommandTransport {
    fn connect(&mut self) -> Result<(), TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Whether the server side dropped the connection since the last
    /// command started.
    fn dropped(&self) -> bool;

    /// Runs one command, pushing every output event into `sink`.
    fn run(
        &mut self,
        command: &str,
        args: &[String],
        sink: &mut dyn EventSink,
    ) -> Result<(), TransportError>;
}
