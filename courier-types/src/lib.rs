//! # courier-types
//!
//! Data model and wire format types for the Courier direct-messaging client.
//!
//! This crate provides the foundational types used across all Courier crates:
//! - [`Credential`], [`UserId`], [`MessageId`] - Identity types
//! - [`Peer`], [`Message`], [`AttachmentRef`] - The conversation data model
//! - [`ChannelEvent`], [`OutboundChat`] - Live channel frames
//! - [`HistoryRecord`], [`UploadReceipt`], [`TokenGrant`] - REST payloads
//! - [`FrameError`] - Decode errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod frame;
mod ids;
mod message;
mod records;

pub use error::FrameError;
pub use frame::{ChannelEvent, OutboundChat};
pub use ids::{Credential, MessageId, UserId};
pub use message::{
    parse_timestamp, AttachmentRef, Delivery, LiveMessage, Message, MessageIdentity, Peer, PeerRef,
    ECHO_WINDOW, MEDIA_PREFIX,
};
pub use records::{ApiErrorBody, AuthRequest, HistoryRecord, TokenGrant, UploadReceipt};
