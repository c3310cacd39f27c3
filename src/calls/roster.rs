//! Roster extraction from command arguments and resolved mentions.
//!
//! A roster is made of called participants ([`Mention`]) and NPC labels.
//! NPCs are written as `+Name` tokens in the command arguments. Participants
//! come from the Matrix mentions of the command message, where a room-wide
//! mention expands to every member of the room.

use std::collections::HashSet;

use log::debug;

use crate::calls::call::Mention;

/// A group mention resolved to its members.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MentionedRole {
    /// Name of the group, `room` for a room-wide mention
    pub name: String,
    /// Members of the group at the time of the message
    pub members: Vec<Mention>,
}

/// Mentions found in a command message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedMentions {
    /// Users mentioned directly
    pub users: Vec<Mention>,
    /// Groups mentioned, with their members
    pub roles: Vec<MentionedRole>,
}

/// Extracts NPC labels from command argument tokens.
///
/// Any token starting with `+` is an NPC. The `+` is removed, then a single
/// leading `"` if there is one. A trailing quote is left as is, so `+"Boss"`
/// gives `Boss"`. Labels are deduplicated, keeping the first occurrence.
pub fn extract_npcs(tokens: &[String]) -> Vec<String> {
    let mut npcs = Vec::new();

    for token in tokens {
        let Some(label) = token.strip_prefix('+') else {
            continue;
        };
        let label = label.strip_prefix('"').unwrap_or(label);
        npcs.push(label.to_owned());
    }

    merge_npcs(&mut Vec::new(), npcs)
}

/// Flattens direct and group mentions into one participant list.
///
/// Direct mentions come first, then the members of each group in order.
/// Participants are deduplicated by ID after group expansion, so a user
/// mentioned both directly and through a group appears once.
pub fn flatten_mentions(resolved: &ResolvedMentions) -> Vec<Mention> {
    for role in &resolved.roles {
        debug!("expanding @{} to {} members", role.name, role.members.len());
    }

    let all = resolved
        .users
        .iter()
        .chain(resolved.roles.iter().flat_map(|role| role.members.iter()))
        .cloned()
        .collect::<Vec<Mention>>();

    let mut mentions = Vec::new();
    merge_mentions(&mut mentions, all);
    mentions
}

/// Appends the participants whose ID is not in `existing` yet.
///
/// Returns the participants that were actually added.
pub fn merge_mentions(existing: &mut Vec<Mention>, incoming: Vec<Mention>) -> Vec<Mention> {
    let mut seen: HashSet<String> = existing.iter().map(|m| m.id.clone()).collect();
    let mut added = Vec::new();

    for mention in incoming {
        if seen.insert(mention.id.clone()) {
            existing.push(mention.clone());
            added.push(mention);
        }
    }

    added
}

/// Appends the NPC labels not in `existing` yet.
///
/// Returns the labels that were actually added.
pub fn merge_npcs(existing: &mut Vec<String>, incoming: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = existing.iter().cloned().collect();
    let mut added = Vec::new();

    for npc in incoming {
        if seen.insert(npc.clone()) {
            existing.push(npc.clone());
            added.push(npc);
        }
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_extract_npcs_plain() {
        assert_eq!(extract_npcs(&tokens(&["+Goblin"])), vec!["Goblin"]);
    }

    #[test]
    fn test_extract_npcs_only_opening_quote_is_stripped() {
        assert_eq!(extract_npcs(&tokens(&["+\"Boss\""])), vec!["Boss\""]);
    }

    #[test]
    fn test_extract_npcs_ignores_other_tokens() {
        let npcs = extract_npcs(&tokens(&["Initiative!", "You", "are", "attacked", "+Goblins", "by+Orcs"]));
        assert_eq!(npcs, vec!["Goblins"]);
    }

    #[test]
    fn test_extract_npcs_deduplicates_in_order() {
        let npcs = extract_npcs(&tokens(&["+Orc", "+Goblin", "+Orc", "+\"Goblin"]));
        assert_eq!(npcs, vec!["Orc", "Goblin"]);
    }

    #[test]
    fn test_extract_npcs_is_case_sensitive() {
        let npcs = extract_npcs(&tokens(&["+orc", "+Orc"]));
        assert_eq!(npcs, vec!["orc", "Orc"]);
    }

    #[test]
    fn test_extract_npcs_bare_plus() {
        assert_eq!(extract_npcs(&tokens(&["+"])), vec![""]);
    }

    #[test]
    fn test_flatten_mentions_collapses_role_members() {
        let resolved = ResolvedMentions {
            users: vec![Mention::new("@al:example.com", "Al")],
            roles: vec![MentionedRole {
                name: "room".to_string(),
                members: vec![
                    Mention::new("@bea:example.com", "Bea"),
                    Mention::new("@al:example.com", "Al (party)"),
                ],
            }],
        };

        assert_eq!(
            flatten_mentions(&resolved),
            vec![
                Mention::new("@al:example.com", "Al"),
                Mention::new("@bea:example.com", "Bea"),
            ]
        );
    }

    #[test]
    fn test_flatten_mentions_across_roles() {
        let resolved = ResolvedMentions {
            users: vec![],
            roles: vec![
                MentionedRole {
                    name: "party".to_string(),
                    members: vec![Mention::new("@cy:example.com", "Cy")],
                },
                MentionedRole {
                    name: "room".to_string(),
                    members: vec![
                        Mention::new("@cy:example.com", "Cy"),
                        Mention::new("@dee:example.com", "Dee"),
                    ],
                },
            ],
        };

        let ids: Vec<String> = flatten_mentions(&resolved).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["@cy:example.com", "@dee:example.com"]);
    }

    #[test]
    fn test_flatten_mentions_empty() {
        assert!(flatten_mentions(&ResolvedMentions::default()).is_empty());
    }

    #[test]
    fn test_merge_mentions_returns_added_only() {
        let mut existing = vec![Mention::new("@al:example.com", "Al")];
        let added = merge_mentions(
            &mut existing,
            vec![
                Mention::new("@al:example.com", "Al"),
                Mention::new("@bea:example.com", "Bea"),
            ],
        );

        assert_eq!(added, vec![Mention::new("@bea:example.com", "Bea")]);
        assert_eq!(existing.len(), 2);
    }

    #[test]
    fn test_merge_npcs_is_idempotent() {
        let mut existing = Vec::new();
        merge_npcs(&mut existing, vec!["Goblin".to_string()]);
        let added = merge_npcs(&mut existing, vec!["Goblin".to_string()]);

        assert!(added.is_empty());
        assert_eq!(existing, vec!["Goblin".to_string()]);
    }
}
