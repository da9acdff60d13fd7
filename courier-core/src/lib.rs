//! # courier-core
//!
//! Pure logic for Courier (no I/O, instant tests).
//!
//! This crate implements the state machines behind the messaging client
//! without any network access, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`state`] - live channel lifecycle, returning actions to execute
//! - [`conversation`] - merges history and live events into one timeline
//! - [`compose`] - outbound composition and its send phases
//!
//! The actual I/O (websocket, HTTP) is performed by `courier-client`, which
//! interprets the actions and feeds results back in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compose;
pub mod conversation;
pub mod state;

pub use compose::{Attachment, ComposeError, Composer, Draft, PendingSend, SendPhase};
pub use conversation::{
    Conversation, FailureKind, FetchTicket, HistoryOutcome, HistoryStatus, LiveOutcome,
    Reconciler, DEDUP_WINDOW, SENT_LOG_LEN,
};
pub use state::{Action, ChannelNotice, ChannelState, Event};
