//! Call opening command handler.
//!
//! Starts a roll call in the room. Mentioned users, including every member
//! behind a room-wide mention, are called, and `+Name` tokens become NPCs.
//!
//! # Validation
//!
//! Permission is checked first, then the room must not already have an
//! active call.

use log::debug;

use crate::{
    calls::{CallStore, roster::flatten_mentions},
    commands::{
        CommandContext, CommandResult, DisplayUpdate,
        command::Intent,
        markdown_response::{format_call, format_call_error, format_permission_error},
    },
};

/// Opens a call and asks for its display message to be posted.
pub async fn handle_open(
    context: &CommandContext,
    store: &CallStore,
    title: &str,
    text: &str,
    npcs: &[String],
    prefix: char,
) -> CommandResult {
    debug!(
        "handling open command from {} in room {}",
        context.user_id, context.room_id
    );

    if !context.can_manage {
        return CommandResult::reply(format_permission_error(Intent::Open));
    }

    let mentions = flatten_mentions(&context.mentions);
    match store
        .open(&context.room_id, title, text, mentions, npcs.to_vec())
        .await
    {
        Ok(call) => CommandResult {
            response: None,
            display: Some(DisplayUpdate::Post {
                call_id: call.id,
                body: format_call(&call),
            }),
            delete_command: true,
        },
        Err(e) => CommandResult::reply(format_call_error(&e, prefix)),
    }
}
