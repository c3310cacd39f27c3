//! Markdown response formatters for bot commands.
//!
//! This module provides functions to format bot responses in Markdown format
//! for display in Matrix chat rooms: the call display message, the results
//! of a closed call, roll summaries and the fixed error messages.

use crate::{
    calls::{Call, CallError, CallResults},
    commands::command::Intent,
    dice::DiceRoll,
};

/// Formats the help message showing available bot commands.
///
/// # Examples
///
/// ```ignore
/// let help = format_help('!');
/// assert!(help.contains("Commands:"));
/// ```
pub fn format_help(prefix: char) -> String {
    format!(
        "Commands:\n\
        - `{p}call <title> [text...] [+NPC...]`: start a roll call, mentioned users are called\n\
        - `{p}calladd [+NPC...]`: add mentioned users and NPCs to the call\n\
        - `{p}callrefresh`: post the call again at the bottom of the room\n\
        - `{p}roll <dice> [+NPC]`: roll dice, for example `{p}roll 1d20+2`\n\
        - `{p}calllog`: show every roll of the call\n\
        - `{p}calldone`: end the call and show the results\n\
        - `{p}callhelp`: show this help message\n\n\
        Mention the room to call every member. Starting, changing and ending calls requires moderator rights.",
        p = prefix
    )
}

/// Formats the rejection of a call command sent in a direct message room.
pub fn format_direct_message_error() -> String {
    "This command does not work in direct messages.".to_owned()
}

/// Formats the permission error of a call command.
///
/// The wording depends on what the user tried to do. Intents that do not
/// require permission fall back to a generic message.
pub fn format_permission_error(intent: Intent) -> String {
    match intent {
        Intent::Open => "You do not have permission to start calls.",
        Intent::Add => "You do not have permission to add mentions to calls.",
        Intent::Refresh => "You do not have permission to refresh calls.",
        Intent::Close => "You do not have permission to end calls.",
        _ => "You do not have permission to do that.",
    }
    .to_owned()
}

/// Formats a precondition failure of the call store.
pub fn format_call_error(error: &CallError, prefix: char) -> String {
    match error {
        CallError::AlreadyActive => format!(
            "You already have an active call in this room. End calls with `{}calldone`.",
            prefix
        ),
        CallError::NoActiveCall => "There is not currently a roll call active.".to_owned(),
    }
}

/// Formats the display message of a call.
///
/// Empty sections are left out, so a fresh call without participants only
/// shows its title and text.
///
/// # Examples
///
/// ```ignore
/// let call = Call::new("!room:example.com", "Initiative!", "", vec![], vec!["Goblins".to_string()]);
/// assert_eq!(format_call(&call), "### Initiative!\n\n**NPCs**: Goblins");
/// ```
pub fn format_call(call: &Call) -> String {
    let mut sections = vec![format!("### {}", call.name)];

    if !call.text.is_empty() {
        sections.push(call.text.clone());
    }

    if !call.mentions.is_empty() {
        let called = call
            .mentions
            .iter()
            .map(|m| m.name.clone())
            .collect::<Vec<String>>()
            .join(", ");
        sections.push(format!("**Called**: {}", called));
    }

    if !call.npcs.is_empty() {
        sections.push(format!("**NPCs**: {}", call.npcs.join(", ")));
    }

    if !call.rolls.is_empty() {
        let rolls = call
            .rolls
            .iter()
            .map(|r| format!("- {}: `{}`", r.name, r.roll))
            .collect::<Vec<String>>()
            .join("\n");
        sections.push(format!("**Rolls**:\n{}", rolls));
    }

    sections.join("\n\n")
}

/// Formats the results of a closed call, highest roll first.
pub fn format_results(results: &CallResults) -> String {
    let ranking = results
        .ranking
        .iter()
        .map(|r| format!("**{}**: `{}`\n", r.name, r.roll))
        .collect::<String>();

    format!("**{}** complete!\n\n{}", results.call.name, ranking)
}

/// Formats the roll history of a call, one line per roll.
pub fn format_log(logs: &[String]) -> String {
    if logs.is_empty() {
        return "No rolls logged yet.".to_owned();
    }
    logs.join("\n")
}

/// Formats the line recorded in the call log for a roll.
pub fn format_roll_log(name: &str, roll: &DiceRoll) -> String {
    format!("{} rolled {} and got {}", name, roll.dice, roll.total)
}

/// Formats the reply to a roll command.
///
/// # Examples
///
/// ```ignore
/// // Alice rolled **1d20+2**: [13] + 2 = `15`
/// let reply = format_roll("Alice", &roll);
/// ```
pub fn format_roll(name: &str, roll: &DiceRoll) -> String {
    let results = roll
        .results
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<String>>()
        .join(", ");

    let modifier = match roll.dice.modifier {
        0 => String::new(),
        m if m > 0 => format!(" + {}", m),
        m => format!(" - {}", -m),
    };

    format!(
        "{} rolled **{}**: [{}]{} = `{}`",
        name, roll.dice, results, modifier, roll.total
    )
}

/// Formats an error response for an invalid roll command.
pub fn format_invalid_roll(prefix: char) -> String {
    format!(
        "Invalid roll command. Usage: `{}roll <dice> [+NPC]`, for example `{}roll 1d20+2`",
        prefix, prefix
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calls::{Mention, Roll},
        dice::Dice,
    };

    fn create_test_call() -> Call {
        Call::new(
            "!room:example.com",
            "Initiative!",
            "Goblins attack",
            vec![
                Mention::new("@alice:example.com", "Alice"),
                Mention::new("@bob:example.com", "Bob"),
            ],
            vec!["Goblins".to_string()],
        )
    }

    fn create_test_roll(modifier: i64, results: Vec<u32>) -> DiceRoll {
        let total = results.iter().map(|r| i64::from(*r)).sum::<i64>() + modifier;
        DiceRoll {
            dice: Dice {
                count: results.len() as u32,
                sides: 20,
                modifier,
            },
            results,
            total,
        }
    }

    #[test]
    fn test_format_help() {
        let help = format_help('!');
        assert!(help.contains("Commands:"));
        assert!(help.contains("`!calldone`"));
        assert!(help.contains("`!roll <dice> [+NPC]`"));
    }

    #[test]
    fn test_format_permission_error() {
        assert_eq!(
            format_permission_error(Intent::Open),
            "You do not have permission to start calls."
        );
        assert_eq!(
            format_permission_error(Intent::Add),
            "You do not have permission to add mentions to calls."
        );
        assert_eq!(
            format_permission_error(Intent::Refresh),
            "You do not have permission to refresh calls."
        );
        assert_eq!(
            format_permission_error(Intent::Close),
            "You do not have permission to end calls."
        );
    }

    #[test]
    fn test_format_call_error() {
        assert_eq!(
            format_call_error(&CallError::AlreadyActive, '!'),
            "You already have an active call in this room. End calls with `!calldone`."
        );
        assert_eq!(
            format_call_error(&CallError::NoActiveCall, '!'),
            "There is not currently a roll call active."
        );
    }

    #[test]
    fn test_format_call() {
        let mut call = create_test_call();
        call.push_roll(Roll::new("Alice", 15), "Alice rolled 15".to_string());

        assert_eq!(
            format_call(&call),
            "### Initiative!\n\nGoblins attack\n\n**Called**: Alice, Bob\n\n**NPCs**: Goblins\n\n**Rolls**:\n- Alice: `15`"
        );
    }

    #[test]
    fn test_format_call_without_sections() {
        let call = Call::new("!room:example.com", "Initiative!", "", vec![], vec![]);
        assert_eq!(format_call(&call), "### Initiative!");
    }

    #[test]
    fn test_format_results() {
        let mut call = create_test_call();
        call.push_roll(Roll::new("Alice", 15), "Alice rolled 15".to_string());
        call.push_roll(Roll::new("Goblins", 12), "Goblins rolled 12".to_string());
        call.push_roll(Roll::new("Bob", 18), "Bob rolled 18".to_string());
        let ranking = call.ranked_rolls();
        let results = CallResults { call, ranking };

        assert_eq!(
            format_results(&results),
            "**Initiative!** complete!\n\n**Bob**: `18`\n**Alice**: `15`\n**Goblins**: `12`\n"
        );
    }

    #[test]
    fn test_format_log() {
        assert_eq!(format_log(&[]), "No rolls logged yet.");
        assert_eq!(
            format_log(&["a".to_string(), "b".to_string()]),
            "a\nb"
        );
    }

    #[test]
    fn test_format_roll() {
        assert_eq!(
            format_roll("Alice", &create_test_roll(2, vec![13])),
            "Alice rolled **1d20+2**: [13] + 2 = `15`"
        );
        assert_eq!(
            format_roll("Goblins", &create_test_roll(-1, vec![4, 9])),
            "Goblins rolled **2d20-1**: [4, 9] - 1 = `12`"
        );
        assert_eq!(
            format_roll("Bob", &create_test_roll(0, vec![7])),
            "Bob rolled **1d20**: [7] = `7`"
        );
    }

    #[test]
    fn test_format_roll_log() {
        assert_eq!(
            format_roll_log("Alice", &create_test_roll(2, vec![13])),
            "Alice rolled 1d20+2 and got 15"
        );
    }

    #[test]
    fn test_format_invalid_roll() {
        assert!(format_invalid_roll('!').starts_with("Invalid roll command."));
    }
}
