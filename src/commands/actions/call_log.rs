//! Roll history command handler.
//!
//! Prints every roll of the active call in the order they were made. Anyone
//! in the room can read the history.

use log::debug;

use crate::{
    calls::CallStore,
    commands::{
        CommandContext, CommandResult,
        markdown_response::{format_call_error, format_log},
    },
};

pub async fn handle_log(context: &CommandContext, store: &CallStore, prefix: char) -> CommandResult {
    debug!("handling log command in room {}", context.room_id);

    match store.log(&context.room_id).await {
        Ok(logs) => CommandResult {
            response: Some(format_log(&logs)),
            display: None,
            delete_command: true,
        },
        Err(e) => CommandResult::reply(format_call_error(&e, prefix)),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::{
        calls::Roll,
        commands::actions::test_utils::{ROOM, create_test_context, create_test_store},
    };

    #[tokio::test]
    async fn test_handle_log_lists_rolls_in_order() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;
        store.open(ROOM, "Initiative!", "", vec![], vec![]).await.unwrap();
        store
            .record_roll(ROOM, Roll::new("Goblins", 12), "Goblins: 12".to_string())
            .await
            .unwrap();
        store
            .record_roll(ROOM, Roll::new("Al", 15), "Al: 15".to_string())
            .await
            .unwrap();

        // No permission needed
        let result = handle_log(&create_test_context(false), &store, '!').await;

        assert!(result.delete_command);
        assert_eq!(result.response.as_deref(), Some("Goblins: 12\nAl: 15"));
    }

    #[tokio::test]
    async fn test_handle_log_without_rolls() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;
        store.open(ROOM, "Initiative!", "", vec![], vec![]).await.unwrap();

        let result = handle_log(&create_test_context(true), &store, '!').await;

        assert_eq!(result.response.as_deref(), Some("No rolls logged yet."));
    }

    #[tokio::test]
    async fn test_handle_log_without_active_call() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;

        let result = handle_log(&create_test_context(true), &store, '!').await;

        assert_eq!(
            result,
            CommandResult::reply("There is not currently a roll call active.".to_string())
        );
    }
}
