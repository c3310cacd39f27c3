//! Command parsing and alias dispatch.
//!
//! This module converts Matrix message text into structured [`Command`] enums.
//! Command names are looked up in a fixed alias table, every alias of a
//! group leading to the same [`Intent`].

use command_parser::{Command as ParserCommand, Parser};
use log::debug;

use crate::{
    calls::roster::extract_npcs,
    commands::markdown_response::format_invalid_roll,
    dice::Dice,
};

/// What a command alias asks for.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Intent {
    Open,
    Add,
    Close,
    Refresh,
    Log,
    Roll,
    Help,
}

/// Alias table, the whole command vocabulary of the bot.
pub const ALIASES: &[(&str, Intent)] = &[
    ("call", Intent::Open),
    ("callfor", Intent::Open),
    ("calladd", Intent::Add),
    ("addtocall", Intent::Add),
    ("calldone", Intent::Close),
    ("endcall", Intent::Close),
    ("callend", Intent::Close),
    ("callrefresh", Intent::Refresh),
    ("refreshcall", Intent::Refresh),
    ("calllog", Intent::Log),
    ("roll", Intent::Roll),
    ("r", Intent::Roll),
    ("callhelp", Intent::Help),
];

/// Looks up the intent of a command name, ignoring case.
pub fn intent_for(alias: &str) -> Option<Intent> {
    let alias = alias.to_lowercase();
    ALIASES
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, intent)| *intent)
}

/// Represents a parsed bot command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a roll call
    Open {
        /// First argument
        title: String,
        /// Remaining arguments joined with spaces
        text: String,
        /// NPCs found in all the arguments
        npcs: Vec<String>,
    },
    /// Add mentioned users and NPCs to the active call
    Add {
        /// NPCs found in the arguments
        npcs: Vec<String>,
    },
    /// End the active call
    Close,
    /// Post the active call again
    Refresh,
    /// Print the roll history of the active call
    Log,
    /// Roll dice for the issuer or for an NPC
    Roll {
        /// Dice to roll
        dice: Dice,
        /// NPC rolling, the issuer when `None`
        npc: Option<String>,
    },
    /// Display help information
    Help,
}

/// Errors that can occur during command parsing.
#[derive(Debug)]
pub enum CommandParsingError {
    /// The message could not be parsed as a command
    UnableToParse,
    /// The command name is not one of our aliases
    NotForBot,
    /// The roll command has a missing or invalid dice expression
    InvalidRoll,
}

impl Command {
    /// Parses a message string into a Command.
    ///
    /// # Errors
    ///
    /// - The message is not a command - [`CommandParsingError::UnableToParse`]
    /// - The command name is not an alias of ours - [`CommandParsingError::NotForBot`]
    /// - A roll has no valid dice expression - [`CommandParsingError::InvalidRoll`]
    pub fn parse(parser: &Parser, body: &str) -> Result<Self, CommandParsingError> {
        // The parser drops the last word, so a dummy word is added at the end
        let body = body.to_string() + " dummy";

        let command = match parser.parse(&body) {
            Ok(cmd) => cmd,
            Err(_) => return Err(CommandParsingError::UnableToParse),
        };

        let Some(intent) = intent_for(&command.name) else {
            return Err(CommandParsingError::NotForBot);
        };

        debug!("parsing {:?} command: {:?}", intent, command);

        match intent {
            Intent::Open => Ok(Self::parse_open(&command)),
            Intent::Add => Ok(Command::Add {
                npcs: extract_npcs(&command.arguments),
            }),
            Intent::Close => Ok(Command::Close),
            Intent::Refresh => Ok(Command::Refresh),
            Intent::Log => Ok(Command::Log),
            Intent::Roll => Self::parse_roll(&command),
            Intent::Help => Ok(Command::Help),
        }
    }

    /// Intent behind this command.
    pub fn intent(&self) -> Intent {
        match self {
            Command::Open { .. } => Intent::Open,
            Command::Add { .. } => Intent::Add,
            Command::Close => Intent::Close,
            Command::Refresh => Intent::Refresh,
            Command::Log => Intent::Log,
            Command::Roll { .. } => Intent::Roll,
            Command::Help => Intent::Help,
        }
    }

    /// Whether the command works on the call of the room.
    ///
    /// These commands are refused in direct message rooms.
    pub fn targets_call(&self) -> bool {
        matches!(
            self.intent(),
            Intent::Open | Intent::Add | Intent::Close | Intent::Refresh | Intent::Log
        )
    }

    fn parse_open(command: &ParserCommand) -> Command {
        let arguments = &command.arguments;

        let title = arguments.first().cloned().unwrap_or_default();
        let text = arguments.iter().skip(1).cloned().collect::<Vec<String>>().join(" ");
        let npcs = extract_npcs(arguments);

        debug!(
            "parsed call command - title: {}, text: {}, npcs: {:?}",
            title, text, npcs
        );

        Command::Open { title, text, npcs }
    }

    fn parse_roll(command: &ParserCommand) -> Result<Command, CommandParsingError> {
        let Some(notation) = command.arguments.first() else {
            return Err(CommandParsingError::InvalidRoll);
        };

        let dice = notation.parse::<Dice>().map_err(|e| {
            debug!("invalid dice notation {}: {}", notation, e);
            CommandParsingError::InvalidRoll
        })?;
        let npc = extract_npcs(&command.arguments[1..]).into_iter().next();

        Ok(Command::Roll { dice, npc })
    }
}

/// Formats a command error into a user-friendly message.
///
/// Returns `None` for errors that must not produce a response, such as
/// regular chat messages or commands meant for other bots.
pub fn format_command_error(error: CommandParsingError, prefix: char) -> Option<String> {
    match error {
        CommandParsingError::InvalidRoll => Some(format_invalid_roll(prefix)),
        _ => None,
    }
}
