//! Matrix client wrapper for bot messaging and synchronization.
//!
//! This module provides a high-level [`MatrixClient`] interface that wraps the
//! Matrix SDK client. It implements the [`Messenger`] and [`Authorizer`]
//! traits the bot works with.

use std::path::Path;

use anyhow::anyhow;
use log::{debug, error, info, warn};
use matrix_sdk::{
    Client, Room,
    ruma::{
        EventId, OwnedEventId, RoomId, UserId,
        events::room::message::{
            AddMentions, ForwardThread, MessageType, ReplacementMetadata, ReplyMetadata,
            RoomMessageEventContent, RoomMessageEventContentWithoutRelation,
        },
    },
};

use crate::{
    matrix::{
        IncomingMessage, UserCredentials, login::connect, session::SessionStore,
        sync::MatrixSync,
    },
    messaging::{Authorizer, Messenger},
};

/// High-level Matrix client for bot messaging operations.
pub struct MatrixClient {
    /// Synchronization service for handling real-time events
    matrix_sync: MatrixSync,
    /// Underlying Matrix SDK client
    client: Client,
}

impl MatrixClient {
    /// Creates and initializes a new Matrix client with full encryption setup.
    ///
    /// The session stored in `data_path` is restored when there is one,
    /// otherwise the bot logs in with its password.
    ///
    /// # Errors
    ///
    /// Returns an error if the login, the session restore or the encryption
    /// setup fails.
    pub async fn new(
        user_credentials: &UserCredentials,
        data_path: &Path,
    ) -> Result<Self, anyhow::Error> {
        let session_store = SessionStore::open(data_path).await;

        let client = connect(user_credentials, &session_store)
            .await
            .inspect_err(|e| error!("failed to setup matrix client: {:?}", e))?;

        if let Err(e) = client.account().set_display_name(Some("Rollcall")).await {
            warn!("failed to set display name: {:?}", e);
        }

        let matrix_sync = MatrixSync::new(&client, &session_store);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// Starts the Matrix synchronization loop.
    ///
    /// `on_message` is invoked for each text message received in a joined
    /// room. Runs until the sync loop fails.
    pub async fn sync<F>(&self, on_message: F)
    where
        F: Fn(IncomingMessage) + Send + Sync + 'static,
    {
        match self.matrix_sync.sync(on_message).await {
            Ok(_) => info!("matrix sync ended successfully"),
            Err(e) => error!("matrix sync ended with error: {:?}", e),
        }
    }

    fn get_room(&self, room_id: &str) -> anyhow::Result<Room> {
        let room_id = RoomId::parse(room_id)?;
        self.client
            .get_room(&room_id)
            .ok_or_else(|| anyhow!("unknown room {}", room_id))
    }

    async fn send(&self, room_id: &str, content: RoomMessageEventContent) -> anyhow::Result<String> {
        let response = self.get_room(room_id)?.send(content).await?;
        Ok(response.event_id.to_string())
    }
}

impl Messenger for MatrixClient {
    async fn send_markdown(&self, room_id: &str, body: &str) -> anyhow::Result<String> {
        self.send(room_id, RoomMessageEventContent::text_markdown(body))
            .await
    }

    async fn edit_markdown(
        &self,
        room_id: &str,
        event_id: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        let event_id = OwnedEventId::try_from(event_id)?;
        let content = RoomMessageEventContentWithoutRelation::new(MessageType::text_markdown(body))
            .make_replacement(ReplacementMetadata::new(event_id, None));

        self.send(room_id, content).await?;
        Ok(())
    }

    async fn redact(&self, room_id: &str, event_id: &str, reason: &str) -> anyhow::Result<()> {
        let event_id = EventId::parse(event_id)?;
        debug!("redacting {} in room {}: {}", event_id, room_id, reason);

        self.get_room(room_id)?
            .redact(&event_id, Some(reason), None)
            .await?;
        Ok(())
    }

    async fn send_reply(
        &self,
        room_id: &str,
        sender_id: &str,
        event_id: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        let sender = UserId::parse(sender_id)?;
        let event = EventId::parse(event_id)?;

        let content = RoomMessageEventContent::text_markdown(body).make_reply_to(
            ReplyMetadata::new(&event, &sender, None),
            ForwardThread::No,
            AddMentions::No,
        );

        self.send(room_id, content).await?;
        Ok(())
    }
}

impl Authorizer for MatrixClient {
    /// Users allowed to redact the events of others manage calls, which
    /// means moderators with the default power levels.
    async fn can_manage_calls(&self, room_id: &str, user_id: &str) -> bool {
        let allowed = async {
            let room = self.get_room(room_id)?;
            let user_id = UserId::parse(user_id)?;
            anyhow::Ok(room.power_levels().await?.user_can_redact_event_of_other(&user_id))
        };

        allowed.await.unwrap_or_else(|e| {
            warn!(
                "could not read power levels of {} in room {}: {:?}",
                user_id, room_id, e
            );
            false
        })
    }
}
