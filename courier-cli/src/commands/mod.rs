//! CLI command implementations.

pub mod account;
pub mod chat;
pub mod history;
pub mod peers;
pub mod send;
pub mod status;
