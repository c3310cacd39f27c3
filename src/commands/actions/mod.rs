//! Command action handlers.
//!
//! Individual handler functions for each bot command. Each handler receives a
//! [`CommandContext`](crate::commands::CommandContext) and the
//! [`CallStore`](crate::calls::CallStore), checks the preconditions of the
//! command in its own order, and returns a
//! [`CommandResult`](crate::commands::CommandResult).
//!
//! # Handler Pattern
//!
//! Handlers follow a consistent pattern:
//! 1. Check the preconditions (active call, permission)
//! 2. Apply the change through one atomic store operation
//! 3. Return a result with the Markdown response and the display update
//!
//! # Available Handlers
//!
//! - [`handle_open`] - Start a roll call
//! - [`handle_add`] - Add participants and NPCs to the active call
//! - [`handle_refresh`] - Post the active call again
//! - [`handle_close`] - End the active call and rank its rolls
//! - [`handle_log`] - Print the roll history of the active call
//! - [`handle_roll`] - Roll dice and record the result in the active call
//! - [`handle_help`] - Display help information
//!
//! # Side Effects
//!
//! Handlers never send messages. A failed precondition only produces a
//! response and leaves both the store and the command message untouched.

mod add;
mod call_log;
mod close;
mod help;
mod open;
mod refresh;
mod roll;

pub use crate::commands::actions::{
    add::handle_add, call_log::handle_log, close::handle_close, help::handle_help,
    open::handle_open, refresh::handle_refresh, roll::handle_roll,
};

use crate::{
    calls::Call,
    commands::{DisplayUpdate, markdown_response::format_call},
};

/// Updates the existing display message of a call, or posts one if the call
/// has none recorded.
fn update_display(call: &Call) -> DisplayUpdate {
    let body = format_call(call);
    match &call.message {
        Some(message_id) => DisplayUpdate::Edit {
            message_id: message_id.clone(),
            body,
        },
        None => DisplayUpdate::Post {
            call_id: call.id,
            body,
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_display_posts_without_message() {
        let call = Call::new("!room:example.com", "Initiative!", "", vec![], vec![]);
        assert!(matches!(update_display(&call), DisplayUpdate::Post { .. }));
    }

    #[test]
    fn test_update_display_edits_existing_message() {
        let mut call = Call::new("!room:example.com", "Initiative!", "", vec![], vec![]);
        call.message = Some("$display".to_string());

        assert_eq!(
            update_display(&call),
            DisplayUpdate::Edit {
                message_id: "$display".to_string(),
                body: "### Initiative!".to_string(),
            }
        );
    }
}
