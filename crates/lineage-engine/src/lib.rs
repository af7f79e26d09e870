//! Lineage Recording Engine
//!
//! The decision logic of the provenance recording path:
//!
//! - **Validation**: fixed-order lexical checks over the raw field set,
//!   short-circuiting at the first violated rule
//! - **Resolution**: human-readable service/category/event names map to
//!   stable identifiers before anything is written
//! - **Recording**: one of four insert shapes is selected from the
//!   optional proxy/data fields and executed against the store; a failed
//!   primary write is captured in an audit-shaped fallback, and a failed
//!   fallback lands in the append-only failure queue
//! - **History chains**: causally related records group under an opaque
//!   chain code; the first member of a code is its parent, later members
//!   are children
//!
//! The engine is stateless between requests. Every failure is converted
//! to a structured [`RecordOutcome`] at the boundary; nothing unwinds
//! past the recorder uncaught.
//!
//! # Examples
//!
//! ```no_run
//! use lineage_engine::{FailureQueue, Recorder};
//! use lineage_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SqliteStore::new("lineage.db")?;
//! let recorder = Recorder::new(FailureQueue::new("lineage-failures.log"));
//!
//! // let outcome = recorder.record(&mut store, raw_request);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod history;
mod queue;
mod recorder;
mod validator;

pub use history::{derive_chain_code, HistoryError, HistoryTracker};
pub use queue::FailureQueue;
pub use recorder::{OutcomeKind, OutcomeStatus, RecordOutcome, Recorder};
pub use validator::{RejectionReason, Validator};
