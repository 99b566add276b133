pub mod envelope;
pub mod reporter;

pub use envelope::{Envelope, EventKind, PrAction, ScmProvider};
pub use reporter::{CommitState, HttpStatusReporter, ReporterError, StatusReporter};
