//! Process-wide run graph: run records, lifecycle transitions, wait
//! primitives (spec §4.2).
//!
//! [`RunGraph`] is a cheaply-cloneable handle onto a lock-free in-memory
//! index plus a disk-backed [`RunStore`]; every mutation is serialized
//! through a single writer task so read-modify-write sequences (a status
//! transition, a child link) are atomic without callers ever holding a
//! lock. State changes publish onto a per-run and per-parent-run
//! broadcast topic via [`bus::Bus`], which [`RunGraph::await_runs`] uses
//! to avoid busy-waiting.

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bus;
pub mod error;
pub mod graph;
pub mod record;
pub mod store;
mod writer;

pub use error::{RunGraphError, RunGraphResult};
pub use graph::{AwaitOutcome, RunGraph, WaitMode};
pub use record::{NewRunAttrs, RunEvent, RunRecord, RunStatus, TimestampMs};
pub use store::RunStore;
pub use writer::UpdateFn;
