//! Matrix client synchronization and event handling.
//!
//! This module provides the [`MatrixSync`] struct for managing the Matrix client's
//! synchronization loop and handling real-time events from the homeserver.
//!
//! # Overview
//!
//! The [`MatrixSync::sync`] method:
//! 1. Performs an initial sync to catch up on offline events (especially invites)
//! 2. Sets up event handlers for auto-joining rooms and message processing
//! 3. Enters a continuous sync loop with automatic token persistence

use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use log::{debug, error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomMemberships, RoomState,
    config::SyncSettings,
    ruma::{
        UserId,
        api::client::filter::FilterDefinition,
        events::room::{
            member::StrippedRoomMemberEvent,
            message::{MessageType, OriginalSyncRoomMessageEvent},
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::{
    calls::{
        Mention,
        roster::{MentionedRole, ResolvedMentions},
    },
    matrix::{IncomingMessage, session::SessionStore},
};

/// Manages Matrix client synchronization and event processing.
pub struct MatrixSync {
    /// The matrix client
    client: Client,
    /// Where sync tokens are persisted
    session_store: SessionStore,
}

impl MatrixSync {
    /// Creates a new MatrixSync instance.
    ///
    /// This does not start the synchronization process; call [`MatrixSync::sync`]
    /// to begin syncing.
    pub fn new(client: &Client, session_store: &SessionStore) -> Self {
        MatrixSync {
            client: client.to_owned(),
            session_store: session_store.to_owned(),
        }
    }

    /// Starts the synchronization process and enters an infinite loop.
    ///
    /// Messages received while the bot was offline are skipped: the message
    /// handler is only registered after the initial sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync loop encounters a fatal error. Sync token
    /// persistence errors are logged and do not stop the loop.
    pub async fn sync<F>(&self, on_message: F) -> Result<()>
    where
        F: Fn(IncomingMessage) + Send + Sync + 'static,
    {
        info!("start syncing");

        // Auto join rooms when invited
        self.client.add_event_handler(auto_join_rooms);

        // Enable room members lazy-loading
        // See <https://spec.matrix.org/v1.6/client-server-api/#lazy-loading-room-members>.
        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());

        if let Some(sync_token) = self.session_store.sync_token() {
            sync_settings = sync_settings.token(sync_token);
        }

        // First sync to only get the invitations received while offline
        loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => {
                    sync_settings = sync_settings.token(response.next_batch.clone());
                    if let Err(err) = self.session_store.save_sync_token(&response.next_batch).await
                    {
                        error!("failed to persist sync token: {:?}", err);
                    }
                    break;
                }
                Err(error) => {
                    error!("an error occurred during initial sync: {error}");
                    error!("trying again…");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }

        let on_message = Arc::new(on_message);
        self.client.add_event_handler({
            let on_message = Arc::clone(&on_message);
            move |event: OriginalSyncRoomMessageEvent, room: Room, client: Client| {
                let on_message = Arc::clone(&on_message);
                async move { on_room_message(event, room, client, on_message.as_ref()).await }
            }
        });

        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;

                // Persist the token each time to be able to restore our session
                if let Err(err) = self.session_store.save_sync_token(&response.next_batch).await {
                    error!("failed to persist sync token: {:?}", err);
                }

                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }
}

/// Automatically joins rooms when the bot receives an invitation.
///
/// See <https://github.com/matrix-org/synapse/issues/4345> for why joining is
/// retried.
async fn auto_join_rooms(room_member: StrippedRoomMemberEvent, client: Client, room: Room) {
    let Some(user_id) = client.user_id() else {
        warn!("could not get user id from client");
        return;
    };

    // Ignore if the invite is not for us
    if room_member.state_key != user_id {
        return;
    }

    tokio::spawn(async move {
        info!("auto joining room {}", room.room_id());
        let mut delay = 2;

        while let Err(err) = room.join().await {
            error!(
                "failed to join room {} ({err:?}), retrying in {delay}s",
                room.room_id()
            );

            sleep(Duration::from_secs(delay)).await;
            delay *= 2;

            if delay > 3600 {
                error!("can't join room {} ({err:?})", room.room_id());
                return;
            }
        }
        info!("successfully joined room {}", room.room_id());
    });
}

/// Converts a text message of a joined room and hands it to `on_message`.
///
/// Messages of the bot itself and non-text messages are ignored.
async fn on_room_message<F>(
    event: OriginalSyncRoomMessageEvent,
    room: Room,
    client: Client,
    on_message: &F,
) where
    F: Fn(IncomingMessage) + Send + Sync + 'static,
{
    if room.state() != RoomState::Joined {
        return;
    }
    let own_user_id = client.user_id().map(|id| id.to_owned());
    if is_own_user(&event.sender, own_user_id.as_deref()) {
        return;
    }

    let MessageType::Text(text_content) = event.content.msgtype else {
        return;
    };

    let is_direct = room.is_direct().await.unwrap_or_else(|e| {
        warn!("could not tell if room {} is direct: {:?}", room.room_id(), e);
        false
    });
    let sender_name = display_name(&room, &event.sender).await;

    let mut mentions = ResolvedMentions::default();
    if let Some(event_mentions) = &event.content.mentions {
        let mentioned = event_mentions
            .user_ids
            .iter()
            .filter(|user_id| !is_own_user(user_id, own_user_id.as_deref()));
        mentions.users = join_all(mentioned.map(|user_id| async {
            Mention::new(user_id.as_str(), &display_name(&room, user_id).await)
        }))
        .await;

        if event_mentions.room {
            mentions.roles.push(MentionedRole {
                name: "room".to_owned(),
                members: room_members(&room, own_user_id.as_deref()).await,
            });
        }
    }

    debug!(
        "message from {} in room {} with {} user mentions",
        event.sender,
        room.room_id(),
        mentions.users.len()
    );

    on_message(IncomingMessage {
        body: text_content.body,
        room_id: room.room_id().to_string(),
        sender_id: event.sender.to_string(),
        sender_name,
        event_id: event.event_id.to_string(),
        is_direct,
        mentions,
    });
}

/// Display name of a user in a room, the user ID localpart when unknown.
async fn display_name(room: &Room, user_id: &UserId) -> String {
    match room.get_member_no_sync(user_id).await {
        Ok(Some(member)) => member.name().to_owned(),
        _ => user_id.localpart().to_owned(),
    }
}

/// Joined members of a room, the bot excluded.
async fn room_members(room: &Room, own_user_id: Option<&UserId>) -> Vec<Mention> {
    match room.members(RoomMemberships::JOIN).await {
        Ok(members) => members
            .iter()
            .filter(|member| !is_own_user(member.user_id(), own_user_id))
            .map(|member| Mention::new(member.user_id().as_str(), member.name()))
            .collect(),
        Err(e) => {
            error!("failed to get members of room {}: {:?}", room.room_id(), e);
            Vec::new()
        }
    }
}

/// Whether `user_id` is the bot account.
fn is_own_user(user_id: &UserId, own_user_id: Option<&UserId>) -> bool {
    own_user_id == Some(user_id)
}

#[cfg(test)]
mod tests {
    use matrix_sdk::ruma::user_id;

    use super::*;

    #[test]
    fn test_is_own_user() {
        let bot = user_id!("@rollcall:example.com");

        assert!(is_own_user(bot, Some(bot)));
        assert!(!is_own_user(user_id!("@al:example.com"), Some(bot)));
        // Before login nobody is the bot
        assert!(!is_own_user(bot, None));
    }
}
