//! Bot command parsing and response formatting.
//!
//! This module provides the complete command processing pipeline for roll calls.
//!
//! # Overview
//!
//! 1. **Parsing** - Converting Matrix messages into structured [`command::Command`] enums
//!    through a fixed alias table
//! 2. **Validation** - Room context and permission checks, in the order each command expects
//! 3. **Execution** - Routing commands to handlers that mutate the [`CallStore`](crate::calls::CallStore)
//! 4. **Response** - Markdown replies and display message updates described by a [`CommandResult`]
//!
//! # Architecture
//!
//! ```text
//! Matrix Message
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Commander  │  ← parse() + parse_command()
//! └─────────────┘
//!      │
//!      ├── parse() ─────────────► command::Command
//!      │
//!      └── parse_command() ─────► Action Handlers ─────► CallStore
//!                                   - handle_open
//!                                   - handle_add
//!                                   - handle_refresh
//!                                   - handle_close
//!                                   - handle_log
//!                                   - handle_roll
//!                                   - handle_help
//!                                        │
//!                                        ▼
//!                                 ┌────────────────────┐
//!                                 │  CommandResult     │
//!                                 │  - response (MD)   │
//!                                 │  - display update  │
//!                                 │  - delete command  │
//!                                 └────────────────────┘
//! ```
//!
//! # Commands
//!
//! | Aliases | Arguments | Description |
//! |---------|-----------|-------------|
//! | `call`, `callfor` | `<title> [text...] [+NPC...]` | Start a roll call |
//! | `calladd`, `addtocall` | `[+NPC...]` | Add mentioned users and NPCs |
//! | `calldone`, `endcall`, `callend` | None | End the call and print the results |
//! | `callrefresh`, `refreshcall` | None | Post the call again at the bottom of the room |
//! | `calllog` | None | Print the roll history of the call |
//! | `roll`, `r` | `<dice> [+NPC]` | Roll dice, recorded in the active call |
//! | `callhelp` | None | Display help information |
//!
//! Users are added by mentioning them in the command message. A room-wide
//! mention adds every member of the room.
//!
//! # Error Handling
//!
//! - **Silent Errors** ([`CommandParseError::NotForBot`]): regular chat or
//!   commands of other bots
//! - **User Errors** ([`CommandParseError::InvalidCommand`]): invalid arguments,
//!   answered with a usage message
//!
//! Precondition failures (no active call, missing permission, direct message
//! room) are part of the [`CommandResult`] response.

use crate::calls::roster::ResolvedMentions;

mod actions;
mod command;
mod commander;
mod markdown_response;

pub use crate::commands::commander::Commander;

/// Runtime context for command execution.
///
/// Built by the bot for each parsed command, from the Matrix event and the
/// room state.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Matrix room ID where the command was issued
    pub room_id: String,
    /// Matrix user ID of the command issuer
    pub user_id: String,
    /// Display name of the command issuer in the room
    pub user_name: String,
    /// Whether the room is a direct message room
    pub is_direct: bool,
    /// Whether the issuer is allowed to manage calls in the room
    pub can_manage: bool,
    /// Users and groups mentioned in the command message
    pub mentions: ResolvedMentions,
}

/// Change to apply to the display message of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayUpdate {
    /// Send a new display message and record its ID in the call
    Post {
        /// ID of the call the display belongs to
        call_id: u64,
        /// Markdown body of the display
        body: String,
    },
    /// Replace the content of the existing display message
    Edit {
        /// Event ID of the display message
        message_id: String,
        /// Markdown body of the display
        body: String,
    },
    /// Delete the previous display message, then behave like [`DisplayUpdate::Post`]
    Repost {
        /// ID of the call the display belongs to
        call_id: u64,
        /// Event ID of the display message to delete, if any
        previous: Option<String>,
        /// Markdown body of the display
        body: String,
    },
}

/// Result of command execution.
///
/// Handlers apply call changes through the store and describe the messaging
/// side effects here. The caller sends the messages.
///
/// # Examples
///
/// ```ignore
/// let result = CommandResult::reply("There is not currently a roll call active.".to_string());
/// assert!(result.display.is_none());
/// assert!(!result.delete_command);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Markdown-formatted message to send to the room
    pub response: Option<String>,
    /// Update of the call display message
    pub display: Option<DisplayUpdate>,
    /// Whether the command message should be redacted afterwards
    pub delete_command: bool,
}

impl CommandResult {
    /// A plain reply, leaving the command message in place.
    pub fn reply(response: String) -> Self {
        CommandResult {
            response: Some(response),
            display: None,
            delete_command: false,
        }
    }
}

/// Errors that can occur during command parsing.
///
/// # Variants
///
/// * `NotForBot` - Message is not a command or not one of ours.
///   Should be handled silently without responding to the user.
///
/// * `InvalidCommand` - Command arguments are invalid.
///   Contains a user-friendly error message to display.
#[derive(Debug)]
pub enum CommandParseError {
    /// Message is not for this bot (silent error)
    NotForBot,
    /// Invalid command syntax with error message
    InvalidCommand(String),
}
