//! Dice roll command handler.
//!
//! Replies with the result of a roll. When the room has an active call the
//! roll is also recorded in it, under the issuer's display name or under the
//! NPC given as `+Name`, and the display message is updated.
//!
//! Rolls work without a call and in direct messages, they are just not
//! recorded anywhere.

use log::debug;

use crate::{
    calls::{CallStore, Roll},
    commands::{
        CommandContext, CommandResult,
        actions::update_display,
        markdown_response::{format_roll, format_roll_log},
    },
    dice::DiceRoll,
};

/// Records an already rolled result in the active call, if any.
pub async fn handle_roll(
    context: &CommandContext,
    store: &CallStore,
    roll: &DiceRoll,
    npc: Option<&str>,
) -> CommandResult {
    let name = npc.unwrap_or(&context.user_name);
    debug!(
        "handling roll command in room {}: {} rolled {}",
        context.room_id, name, roll.total
    );

    let response = Some(format_roll(name, roll));

    if context.is_direct {
        return CommandResult {
            response,
            display: None,
            delete_command: false,
        };
    }

    let display = match store
        .record_roll(
            &context.room_id,
            Roll::new(name, roll.total),
            format_roll_log(name, roll),
        )
        .await
    {
        Ok(call) => Some(update_display(&call)),
        Err(_) => {
            debug!("no active call in room {}, roll not recorded", context.room_id);
            None
        }
    };

    CommandResult {
        response,
        display,
        delete_command: false,
    }
}
