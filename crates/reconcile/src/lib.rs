//! Transfer reconciliation: deliver every pending document exactly once.
//!
//! This crate implements the **business logic** of docrelay. Sources,
//! transports and alert channels are capabilities supplied by the caller,
//! which keeps the loop testable with in-memory fakes.
//!
//! # Pass
//!
//! 1. **List**: snapshot the pending documents once
//! 2. **Stage**: make the document available locally
//! 3. **Check**: skip the transfer if the remote already has it
//! 4. **Send**: deliver through the transport session
//! 5. **Record**: append to the success log, then mark as processed
//!
//! The first failure in steps 1–4 aborts the pass; the scheduler reports
//! it once and the next pass retries whatever is still pending.

pub mod audit;
pub mod error;
pub mod pass;
pub mod report;
pub mod schedule;

pub use audit::{AuditLog, ErrorLogEntry, LogEntry};
pub use error::PassError;
pub use pass::{PassOutcome, Reconciler};
pub use report::FailureReporter;
pub use schedule::{Schedule, Scheduler};
