//! Call refresh command handler.
//!
//! Posts the display message of the active call again, so it shows at the
//! bottom of a busy room. The previous display message is deleted.

use log::debug;

use crate::{
    calls::{CallError, CallStore},
    commands::{
        CommandContext, CommandResult, DisplayUpdate,
        command::Intent,
        markdown_response::{format_call, format_call_error, format_permission_error},
    },
};

pub async fn handle_refresh(
    context: &CommandContext,
    store: &CallStore,
    prefix: char,
) -> CommandResult {
    debug!("handling refresh command in room {}", context.room_id);

    if store.find_active(&context.room_id).await.is_none() {
        return CommandResult::reply(format_call_error(&CallError::NoActiveCall, prefix));
    }
    if !context.can_manage {
        return CommandResult::reply(format_permission_error(Intent::Refresh));
    }

    match store.refresh(&context.room_id).await {
        Ok(call) => CommandResult {
            response: None,
            display: Some(DisplayUpdate::Repost {
                call_id: call.id,
                previous: call.message.clone(),
                body: format_call(&call),
            }),
            delete_command: true,
        },
        Err(e) => CommandResult::reply(format_call_error(&e, prefix)),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::commands::actions::test_utils::{ROOM, create_test_context, create_test_store};

    #[tokio::test]
    async fn test_handle_refresh_reposts_display() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;
        let call = store.open(ROOM, "Initiative!", "", vec![], vec![]).await.unwrap();
        store.set_message(ROOM, call.id, "$old").await.unwrap();

        let result = handle_refresh(&create_test_context(true), &store, '!').await;

        assert!(result.response.is_none());
        assert!(result.delete_command);
        assert_eq!(
            result.display,
            Some(DisplayUpdate::Repost {
                call_id: call.id,
                previous: Some("$old".to_string()),
                body: "### Initiative!".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_handle_refresh_without_active_call() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;

        let result = handle_refresh(&create_test_context(true), &store, '!').await;

        assert_eq!(
            result,
            CommandResult::reply("There is not currently a roll call active.".to_string())
        );
    }

    #[tokio::test]
    async fn test_handle_refresh_without_permission() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;
        store.open(ROOM, "Initiative!", "", vec![], vec![]).await.unwrap();

        let result = handle_refresh(&create_test_context(false), &store, '!').await;

        assert_eq!(
            result,
            CommandResult::reply("You do not have permission to refresh calls.".to_string())
        );
    }
}
