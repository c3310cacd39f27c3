//! Call closing command handler.
//!
//! Ends the active call of the room and replies with every roll, highest
//! first. The display message is left in place as a record of the call.

use log::debug;

use crate::{
    calls::{CallError, CallStore},
    commands::{
        CommandContext, CommandResult,
        command::Intent,
        markdown_response::{format_call_error, format_permission_error, format_results},
    },
};

pub async fn handle_close(
    context: &CommandContext,
    store: &CallStore,
    prefix: char,
) -> CommandResult {
    debug!(
        "handling close command from {} in room {}",
        context.user_id, context.room_id
    );

    if store.find_active(&context.room_id).await.is_none() {
        return CommandResult::reply(format_call_error(&CallError::NoActiveCall, prefix));
    }
    if !context.can_manage {
        return CommandResult::reply(format_permission_error(Intent::Close));
    }

    match store.close(&context.room_id).await {
        Ok(results) => CommandResult {
            response: Some(format_results(&results)),
            display: None,
            delete_command: true,
        },
        Err(e) => CommandResult::reply(format_call_error(&e, prefix)),
    }
}
