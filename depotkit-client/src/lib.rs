//! Command session engine.
//!
//! A [`Session`] runs named commands against a server through a
//! [`CommandTransport`] and returns each command's output as one ordered
//! [`ResultCollection`]. Callers can intercept output in flight with an
//! [`OutputHandler`], observe progress, answer SSO challenges, and decide
//! merge conflicts — all synchronously on the command thread.
//!
//! ```no_run
//! # use depotkit_client::{Session, CommandTransport};
//! # fn demo<T: CommandTransport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(transport);
//! session.connect()?;
//! for unit in session.run("changes", &["-m", "5"])?.iter() {
//!     println!("{unit:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`ResultCollection`]: depotkit_types::ResultCollection

mod dispatch;
mod error;
mod handler;
mod registry;
mod resolve;
mod session;
mod transport;

pub use dispatch::{CommandOutput, CommandSink};
pub use error::{CommandFailure, RunError, RunResult};
pub use handler::{
    HandlerAction, OutputHandler, ProgressHandler, ResolveHandler, SsoHandler, SsoOutcome, SsoReply,
};
pub use registry::{HandleId, HandlerRegistry};
pub use resolve::{negotiate, ActionResolve, ContentResolve, MergeCase, MergeDecision};
pub use session::Session;
pub use transport::{CommandTransport, EventSink, TransportError};
