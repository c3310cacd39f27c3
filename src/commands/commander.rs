//! Command orchestration and execution.
//!
//! This module provides the [`Commander`] struct, which serves as the main entry point
//! for processing bot commands. It coordinates command parsing and execution, routing
//! commands to their appropriate handlers.
//!
//! # Architecture
//!
//! The Commander follows a two-phase processing model:
//!
//! 1. **Parsing Phase** - Validates and parses raw message text into structured [`Command`] enums
//! 2. **Execution Phase** - Routes parsed commands to specialized handlers that produce results
//!
//! # Flow
//!
//! ```text
//! Matrix Message → parse() → Command → parse_command() → CommandResult
//! ```
//!
//! # Examples
//!
//! ```ignore
//! let commander = Commander::new('!');
//! let store = CallStore::new("calls.json".to_string(), 50).await;
//!
//! let command = commander.parse("!callhelp").unwrap();
//! let result = commander.parse_command(&command, &context, &store).await;
//! ```

use command_parser::Parser;

use crate::{
    calls::CallStore,
    commands::{
        CommandContext, CommandParseError, CommandResult,
        actions::{
            handle_add, handle_close, handle_help, handle_log, handle_open, handle_refresh,
            handle_roll,
        },
        command::{Command, format_command_error},
        markdown_response::format_direct_message_error,
    },
};

/// Command orchestrator for parsing and executing bot commands.
///
/// The Commander is responsible for:
/// - Parsing raw message text into structured commands
/// - Rejecting call commands in direct message rooms
/// - Routing commands to appropriate handlers
/// - Converting errors into user-friendly messages
///
/// Messages that do not start with the prefix, or whose command name is not
/// one of the aliases, are silently ignored (returning
/// [`CommandParseError::NotForBot`]).
pub struct Commander {
    /// Command parser for processing user commands
    parser: Parser,
    /// Character starting every command
    prefix: char,
}

impl Commander {
    /// Creates a new Commander recognizing commands starting with `prefix`.
    ///
    /// `-` is the option prefix of the parser.
    pub fn new(prefix: char) -> Self {
        let parser = Parser::new(prefix, '-');
        Commander { parser, prefix }
    }

    /// Parses a Matrix message body into a structured command.
    ///
    /// # Returns
    ///
    /// * `Ok(Command)` - Successfully parsed and validated command
    /// * `Err(CommandParseError::NotForBot)` - Message is not a command or not one of ours
    /// * `Err(CommandParseError::InvalidCommand)` - Command arguments are invalid
    pub fn parse(&self, body: &str) -> Result<Command, CommandParseError> {
        Command::parse(&self.parser, body).map_err(|error| {
            // Return silently if the command is not for the bot
            // Otherwise, send an error message
            match format_command_error(error, self.prefix) {
                Some(message) => CommandParseError::InvalidCommand(message),
                None => CommandParseError::NotForBot,
            }
        })
    }

    /// Executes a parsed command and returns the result.
    ///
    /// Call commands are refused in direct message rooms before any store
    /// access. Roll results are drawn here, before the handler touches the
    /// store.
    ///
    /// # Command Handlers
    ///
    /// - [`Command::Open`] → [`handle_open`]
    /// - [`Command::Add`] → [`handle_add`]
    /// - [`Command::Refresh`] → [`handle_refresh`]
    /// - [`Command::Close`] → [`handle_close`]
    /// - [`Command::Log`] → [`handle_log`]
    /// - [`Command::Roll`] → [`handle_roll`]
    /// - [`Command::Help`] → [`handle_help`]
    pub async fn parse_command(
        &self,
        command: &Command,
        context: &CommandContext,
        store: &CallStore,
    ) -> CommandResult {
        if context.is_direct && command.targets_call() {
            return CommandResult::reply(format_direct_message_error());
        }

        match command {
            Command::Open { title, text, npcs } => {
                handle_open(context, store, title, text, npcs, self.prefix).await
            }
            Command::Add { npcs } => handle_add(context, store, npcs, self.prefix).await,
            Command::Refresh => handle_refresh(context, store, self.prefix).await,
            Command::Close => handle_close(context, store, self.prefix).await,
            Command::Log => handle_log(context, store, self.prefix).await,
            Command::Roll { dice, npc } => {
                let roll = dice.roll(&mut rand::thread_rng());
                handle_roll(context, store, &roll, npc.as_deref()).await
            }
            Command::Help => handle_help(self.prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::commands::{
        DisplayUpdate,
        actions::test_utils::{ROOM, create_test_context, create_test_store},
    };

    #[test]
    fn test_parse_valid_command() {
        let commander = Commander::new('!');
        assert!(matches!(commander.parse("!callhelp"), Ok(Command::Help)));
    }

    #[test]
    fn test_parse_custom_prefix() {
        let commander = Commander::new('.');
        assert!(matches!(commander.parse(".calldone"), Ok(Command::Close)));
        assert!(matches!(
            commander.parse("!calldone"),
            Err(CommandParseError::NotForBot)
        ));
    }

    #[test]
    fn test_parse_not_for_bot() {
        let commander = Commander::new('!');
        assert!(matches!(
            commander.parse("!other_bot help"),
            Err(CommandParseError::NotForBot)
        ));
        assert!(matches!(
            commander.parse("This is just a regular message"),
            Err(CommandParseError::NotForBot)
        ));
    }

    #[test]
    fn test_parse_invalid_roll() {
        let commander = Commander::new('!');
        match commander.parse("!roll dragons") {
            Err(CommandParseError::InvalidCommand(msg)) => {
                assert!(msg.contains("Invalid roll"));
            }
            _ => panic!("Expected InvalidCommand error"),
        }
    }

    #[tokio::test]
    async fn test_parse_command_rejects_call_in_direct_message() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;
        let commander = Commander::new('!');
        let mut context = create_test_context(true);
        context.is_direct = true;

        let command = commander.parse("!call Initiative!").unwrap();
        let result = commander.parse_command(&command, &context, &store).await;

        assert_eq!(
            result,
            CommandResult::reply("This command does not work in direct messages.".to_string())
        );
        assert!(store.find_active(ROOM).await.is_none());
    }

    #[tokio::test]
    async fn test_parse_command_help_in_direct_message() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;
        let commander = Commander::new('!');
        let mut context = create_test_context(false);
        context.is_direct = true;

        let result = commander
            .parse_command(&Command::Help, &context, &store)
            .await;

        assert!(result.response.unwrap().contains("Commands:"));
    }

    #[tokio::test]
    async fn test_initiative_scenario() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = create_test_store(&temp_file).await;
        let commander = Commander::new('!');
        let gm = create_test_context(true);

        let command = commander
            .parse("!callfor Initiative! Goblins attack +Goblins")
            .unwrap();
        let result = commander.parse_command(&command, &gm, &store).await;
        let Some(DisplayUpdate::Post { call_id, .. }) = result.display else {
            panic!("expected the call display to be posted");
        };
        store.set_message(ROOM, call_id, "$display").await.unwrap();

        let command = commander.parse("!roll 1d20 +Goblins").unwrap();
        let result = commander.parse_command(&command, &gm, &store).await;
        assert!(matches!(result.display, Some(DisplayUpdate::Edit { .. })));

        let command = commander.parse("!calllog").unwrap();
        let result = commander.parse_command(&command, &gm, &store).await;
        assert!(result.response.unwrap().starts_with("Goblins rolled 1d20"));

        let command = commander.parse("!endcall").unwrap();
        let result = commander.parse_command(&command, &gm, &store).await;
        assert!(
            result
                .response
                .unwrap()
                .starts_with("**Initiative!** complete!\n\n**Goblins**: `")
        );
        assert!(store.find_active(ROOM).await.is_none());

        let command = commander.parse("!calllog").unwrap();
        let result = commander.parse_command(&command, &gm, &store).await;
        assert_eq!(
            result.response.as_deref(),
            Some("There is not currently a roll call active.")
        );
    }
}
