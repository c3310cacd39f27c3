//! Chat platform seams used by the bot.
//!
//! The bot only talks to the chat platform through these traits, so the
//! command effects can be tested with mocks. [`MatrixClient`] is the
//! production implementation.
//!
//! [`MatrixClient`]: crate::matrix::MatrixClient

use mockall::automock;

/// Message lifecycle operations on a room.
///
/// Bodies are Markdown. Failures are returned as errors, the caller decides
/// whether to log them or to go on.
#[automock]
pub trait Messenger {
    /// Sends a message and returns its event ID.
    async fn send_markdown(&self, room_id: &str, body: &str) -> anyhow::Result<String>;
    /// Replaces the content of a previously sent message.
    async fn edit_markdown(&self, room_id: &str, event_id: &str, body: &str)
    -> anyhow::Result<()>;
    /// Redacts a message.
    async fn redact(&self, room_id: &str, event_id: &str, reason: &str) -> anyhow::Result<()>;
    /// Sends a reply to the message `event_id` sent by `sender_id`.
    async fn send_reply(
        &self,
        room_id: &str,
        sender_id: &str,
        event_id: &str,
        body: &str,
    ) -> anyhow::Result<()>;
}

/// Decides who may manage calls in a room.
#[automock]
pub trait Authorizer {
    /// Whether `user_id` may open, change and end calls in `room_id`.
    async fn can_manage_calls(&self, room_id: &str, user_id: &str) -> bool;
}
