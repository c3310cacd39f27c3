//! Help command handler.
//!
//! Lists every command with its syntax. Works in any room, direct messages
//! included.

use log::debug;

use crate::commands::{CommandResult, markdown_response::format_help};

pub fn handle_help(prefix: char) -> CommandResult {
    debug!("handling help command");

    CommandResult::reply(format_help(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_help() {
        let result = handle_help('!');

        assert!(result.display.is_none());
        assert!(!result.delete_command);
        assert!(result.response.unwrap().contains("`!callhelp`"));
    }
}
