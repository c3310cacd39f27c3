//! Roster addition command handler.
//!
//! Adds mentioned users and `+Name` NPCs to the active call of the room.
//! Participants already called and NPCs already listed are skipped.

use log::debug;

use crate::{
    calls::{CallError, CallStore, roster::flatten_mentions},
    commands::{
        CommandContext, CommandResult,
        actions::update_display,
        command::Intent,
        markdown_response::{format_call_error, format_permission_error},
    },
};

/// Merges the new roster entries and asks for the display to be updated.
pub async fn handle_add(
    context: &CommandContext,
    store: &CallStore,
    npcs: &[String],
    prefix: char,
) -> CommandResult {
    debug!(
        "handling add command from {} in room {}",
        context.user_id, context.room_id
    );

    if store.find_active(&context.room_id).await.is_none() {
        return CommandResult::reply(format_call_error(&CallError::NoActiveCall, prefix));
    }
    if !context.can_manage {
        return CommandResult::reply(format_permission_error(Intent::Add));
    }

    let mentions = flatten_mentions(&context.mentions);
    match store
        .add_roster(&context.room_id, mentions, npcs.to_vec())
        .await
    {
        Ok(call) => CommandResult {
            response: None,
            display: Some(update_display(&call)),
            delete_command: true,
        },
        // The call was closed between the check and the update
        Err(e) => CommandResult::reply(format_call_error(&e, prefix)),
    }
}
