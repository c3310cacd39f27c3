//! Roll call records.
//!
//! This module provides the [`Call`] struct tracking one initiative call in a
//! Matrix room, together with the [`Mention`] and [`Roll`] entries it holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calls::roster::{merge_mentions, merge_npcs};

/// A participant called into a roll call.
///
/// `id` is the Matrix user ID and is the only key used for deduplication.
/// `name` is the display name seen when the participant was first added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Matrix user ID of the participant
    pub id: String,
    /// Display name of the participant
    pub name: String,
}

impl Mention {
    /// Creates a participant from a Matrix user ID and a display name.
    pub fn new(id: &str, name: &str) -> Self {
        Mention {
            id: id.to_owned(),
            name: name.to_owned(),
        }
    }
}

/// A roll recorded against a call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll {
    /// Who rolled: a participant display name or an NPC label
    pub name: String,
    /// Rolled value
    pub roll: i64,
}

impl Roll {
    /// Creates a roll of `roll` for the participant or NPC `name`.
    pub fn new(name: &str, roll: i64) -> Self {
        Roll {
            name: name.to_owned(),
            roll,
        }
    }
}

/// A roll call session scoped to one Matrix room.
///
/// A call is created by the `call` command and stays active until it is
/// closed by `calldone`. While it is active, participants and NPCs can be
/// added and rolls are appended to it.
///
/// # Examples
///
/// ```ignore
/// let call = Call::new("!room:example.com", "Initiative!", "Goblins attack", vec![], vec!["Goblins".to_string()]);
/// assert!(call.is_active());
/// assert!(call.message.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Identifier given by the store when the call is opened, unique across
    /// the calls of every room
    #[serde(default)]
    pub id: u64,
    /// Matrix room ID owning the call
    pub channel: String,
    /// Short title of the call
    pub name: String,
    /// Free-form description
    pub text: String,
    /// When the call was opened
    pub start: DateTime<Utc>,
    /// When the call was closed, `None` while active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Called participants, unique by ID
    pub mentions: Vec<Mention>,
    /// NPC labels, unique by exact value
    pub npcs: Vec<String>,
    /// Rolls in the order they were recorded
    pub rolls: Vec<Roll>,
    /// Roll history lines in the order they were recorded
    pub logs: Vec<String>,
    /// Event ID of the display message posted for the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Call {
    /// Creates a new active call started now.
    ///
    /// `mentions` and `npcs` are deduplicated, keeping the first occurrence.
    /// The call has no `id` until the store registers it.
    pub fn new(
        channel: &str,
        name: &str,
        text: &str,
        mentions: Vec<Mention>,
        npcs: Vec<String>,
    ) -> Self {
        let mut call = Call {
            id: 0,
            channel: channel.to_owned(),
            name: name.to_owned(),
            text: text.to_owned(),
            start: Utc::now(),
            end: None,
            mentions: Vec::new(),
            npcs: Vec::new(),
            rolls: Vec::new(),
            logs: Vec::new(),
            message: None,
        };
        call.merge_roster(mentions, npcs);
        call
    }

    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    /// Merges participants and NPCs into the roster.
    ///
    /// Participants whose ID is already present are skipped, even if their
    /// display name changed. NPCs are compared by exact value.
    pub fn merge_roster(&mut self, mentions: Vec<Mention>, npcs: Vec<String>) {
        merge_mentions(&mut self.mentions, mentions);
        merge_npcs(&mut self.npcs, npcs);
    }

    /// Appends a roll and its history line.
    pub fn push_roll(&mut self, roll: Roll, log_line: String) {
        self.rolls.push(roll);
        self.logs.push(log_line);
    }

    /// Returns the rolls sorted by value, highest first.
    ///
    /// Equal values keep the order in which they were recorded. The stored
    /// `rolls` are left untouched.
    pub fn ranked_rolls(&self) -> Vec<Roll> {
        let mut ranking = self.rolls.clone();
        ranking.sort_by(|a, b| b.roll.cmp(&a.roll));
        ranking
    }
}

/// Outcome of closing a call.
#[derive(Clone, Debug)]
pub struct CallResults {
    /// The closed call, with `end` set
    pub call: Call,
    /// Rolls sorted by value, highest first, ties in recording order
    pub ranking: Vec<Roll>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_call() -> Call {
        Call::new("!room:example.com", "Initiative!", "Goblins attack", vec![], vec![])
    }

    #[test]
    fn test_new_call_is_active_without_message() {
        let call = create_test_call();

        assert!(call.is_active());
        assert!(call.message.is_none());
        assert!(call.rolls.is_empty());
        assert!(call.logs.is_empty());
        assert_eq!(call.channel, "!room:example.com");
        assert_eq!(call.name, "Initiative!");
        assert_eq!(call.text, "Goblins attack");
    }

    #[test]
    fn test_new_call_deduplicates_roster() {
        let call = Call::new(
            "!room:example.com",
            "",
            "",
            vec![
                Mention::new("@al:example.com", "Al"),
                Mention::new("@al:example.com", "Albert"),
            ],
            vec!["Goblin".to_string(), "Goblin".to_string()],
        );

        assert_eq!(call.mentions, vec![Mention::new("@al:example.com", "Al")]);
        assert_eq!(call.npcs, vec!["Goblin".to_string()]);
    }

    #[test]
    fn test_merge_roster_keeps_existing_names() {
        let mut call = create_test_call();
        call.merge_roster(vec![Mention::new("@al:example.com", "Al")], vec![]);
        call.merge_roster(
            vec![
                Mention::new("@al:example.com", "Big Al"),
                Mention::new("@bea:example.com", "Bea"),
            ],
            vec![],
        );

        assert_eq!(
            call.mentions,
            vec![
                Mention::new("@al:example.com", "Al"),
                Mention::new("@bea:example.com", "Bea"),
            ]
        );
    }

    #[test]
    fn test_merge_roster_npcs_are_case_sensitive() {
        let mut call = create_test_call();
        call.merge_roster(vec![], vec!["Orc".to_string()]);
        call.merge_roster(vec![], vec!["orc".to_string(), "Orc".to_string()]);

        assert_eq!(call.npcs, vec!["Orc".to_string(), "orc".to_string()]);
    }

    #[test]
    fn test_push_roll_appends_roll_and_log() {
        let mut call = create_test_call();
        call.push_roll(Roll::new("Al", 12), "Al rolled 12".to_string());
        call.push_roll(Roll::new("Orc", 7), "Orc rolled 7".to_string());

        assert_eq!(call.rolls, vec![Roll::new("Al", 12), Roll::new("Orc", 7)]);
        assert_eq!(call.logs, vec!["Al rolled 12", "Orc rolled 7"]);
    }

    #[test]
    fn test_ranked_rolls_is_stable_descending() {
        let mut call = create_test_call();
        for (name, value) in [("Orc", 9), ("Al", 15), ("Goblins", 15), ("Bea", 20), ("Cy", 9)] {
            call.push_roll(Roll::new(name, value), String::new());
        }

        let names: Vec<String> = call.ranked_rolls().into_iter().map(|r| r.name).collect();

        assert_eq!(names, vec!["Bea", "Al", "Goblins", "Orc", "Cy"]);
        // Stored order is unchanged
        assert_eq!(call.rolls[0].name, "Orc");
    }

    #[test]
    fn test_ranked_rolls_with_negative_values() {
        let mut call = create_test_call();
        call.push_roll(Roll::new("Slug", -1), String::new());
        call.push_roll(Roll::new("Al", 0), String::new());

        let ranking = call.ranked_rolls();

        assert_eq!(ranking, vec![Roll::new("Al", 0), Roll::new("Slug", -1)]);
    }

    #[test]
    fn test_call_serialization_skips_unset_fields() {
        let call = create_test_call();
        let serialized = serde_json::to_string(&call).unwrap();

        assert!(!serialized.contains("\"end\""));
        assert!(!serialized.contains("\"message\""));

        let deserialized: Call = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, call);
    }
}
