//! Matrix protocol integration for the bot.
//!
//! This module provides a complete Matrix client implementation with support for:
//! - End-to-end encryption
//! - Session persistence
//! - Real-time event synchronization with mention resolution
//! - The [`Messenger`](crate::messaging::Messenger) and
//!   [`Authorizer`](crate::messaging::Authorizer) operations used by the bot
//!
//! # Architecture
//!
//! The module is structured around the [`MatrixClient`] which coordinates:
//! - **Login**: Password login or session restore, cross-signing and recovery
//! - **Session**: The session file and SQLite store in the data directory
//! - **Sync**: Auto-join, and conversion of room messages to [`IncomingMessage`]

mod client;
mod login;
mod session;
mod sync;

use crate::calls::roster::ResolvedMentions;

pub use crate::matrix::client::MatrixClient;

/// User credentials for a Matrix account
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// User ID of the matrix account
    pub user_id: String,
    /// Password of the matrix account
    pub password: String,
    /// Passphrase to recover the matrix account secrets
    pub passphrase: String,
}

/// A text message received in a joined room.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// The message body text
    pub body: String,
    /// Room where the message was sent
    pub room_id: String,
    /// User who sent the message
    pub sender_id: String,
    /// Display name of the sender in the room
    pub sender_name: String,
    /// Event ID of the message
    pub event_id: String,
    /// Whether the room is a direct message room
    pub is_direct: bool,
    /// Users mentioned in the message, room-wide mention expanded
    pub mentions: ResolvedMentions,
}
