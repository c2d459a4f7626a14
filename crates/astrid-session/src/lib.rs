//! Message model and branching session log for the Astrid agent runtime.
//!
//! A [`log::SessionLog`] is an append-only tree of [`entry::SessionEntry`]
//! nodes keyed by short hex ids, with a cursor (`leaf_id`) marking the
//! current branch tip. It is durable: [`log::SessionLog::save`] /
//! [`log::SessionLog::load`] round-trip it as line-delimited JSON.

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entry;
pub mod error;
pub mod header;
pub mod log;
pub mod message;

pub use entry::{EntryPayload, SessionEntry, SummaryDetails, ThinkingLevel};
pub use error::{SessionLogError, SessionLogResult};
pub use header::SessionHeader;
pub use log::{BuiltContext, SessionLog};
pub use message::{ContentBlock, Message, StopReason, TimestampMs, Trust, Usage};
