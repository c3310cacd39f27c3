//! Bot module wiring Matrix messages to roll call commands.
//!
//! This module provides the main [`Bot`] implementation. It listens to Matrix
//! messages, runs the commands they contain against the [`CallStore`], and
//! applies the resulting message effects in the room.
//!
//! # Command Processing Flow
//!
//! ```text
//! Matrix Message → Parse Command → Build Context → Execute → Apply Effects
//! ```
//!
//! Applying effects means, in order:
//! 1. Posting, editing or reposting the call display message
//! 2. Sending the response
//! 3. Redacting the command message after the cleanup delay, for successful
//!    call commands
//!
//! Commands of one room are executed one at a time, up to the end of step 2.
//! A command therefore always sees the display message posted by the
//! previous one. Commands of different rooms run concurrently.
//!
//! Messaging failures are logged and never retried.

use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use log::{debug, error, warn};
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    time::sleep,
};

use crate::{
    Args,
    calls::CallStore,
    commands::{CommandContext, CommandParseError, CommandResult, Commander, DisplayUpdate},
    config::Config,
    matrix::{IncomingMessage, MatrixClient, UserCredentials},
    messaging::{Authorizer, Messenger},
};

/// Reason attached to the redaction of a replaced display message.
const REPOST_REASON: &str = "replaced by new call post";
/// Reason attached to the redaction of a processed command message.
const CLEANUP_REASON: &str = "command processed";

/// Everything needed to process a single Matrix message.
struct MessageContext {
    message: IncomingMessage,
    matrix_client: Arc<MatrixClient>,
    call_store: Arc<CallStore>,
    commander: Arc<Commander>,
    room_locks: Arc<RoomLocks>,
    cleanup_delay: Duration,
}

/// One lock per room, taken while a command of the room is executed.
#[derive(Default)]
struct RoomLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    /// Waits for the commands of `room_id` received earlier to be executed.
    async fn lock(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let room_lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(room_id.to_owned()).or_default())
        };
        room_lock.lock_owned().await
    }
}

/// Main bot structure connecting Matrix messages to roll calls.
///
/// All shared state is wrapped in `Arc` so each message can be handled in
/// its own task. The [`CallStore`] serializes the call mutations.
pub struct Bot {
    /// Matrix client for sending and receiving messages
    matrix_client: Arc<MatrixClient>,
    /// Calls of every room, loaded from the data directory
    call_store: Arc<CallStore>,
    /// Command parser and executor
    commander: Arc<Commander>,
    /// Per-room command ordering
    room_locks: Arc<RoomLocks>,
    /// Delay before a processed command message is redacted
    cleanup_delay: Duration,
}

impl Bot {
    /// Creates a new Bot from the configuration and the command line
    /// arguments.
    ///
    /// Logs in to Matrix, or restores the session stored in the data
    /// directory, and loads the calls saved there.
    ///
    /// # Errors
    ///
    /// Returns an error if the Matrix client cannot be set up.
    pub async fn new(config: Config, args: Args) -> Result<Self, anyhow::Error> {
        let data_path = Path::new(&args.data);

        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id,
                    password: config.matrix.password,
                    passphrase: config.matrix.passphrase,
                },
                data_path,
            )
            .await?,
        );

        let calls_path = data_path.join("calls.json").to_string_lossy().into_owned();
        let call_store = Arc::new(CallStore::new(calls_path, config.calls.history_size).await);

        let commander = Arc::new(Commander::new(config.calls.prefix));

        Ok(Bot {
            matrix_client,
            call_store,
            commander,
            room_locks: Arc::new(RoomLocks::default()),
            cleanup_delay: Duration::from_millis(config.calls.cleanup_delay_ms),
        })
    }

    /// Starts listening to Matrix messages. Runs until the sync loop ends.
    pub async fn start(self) {
        let matrix_client = Arc::clone(&self.matrix_client);
        let call_store = Arc::clone(&self.call_store);
        let commander = Arc::clone(&self.commander);
        let room_locks = Arc::clone(&self.room_locks);
        let cleanup_delay = self.cleanup_delay;

        let on_message = move |message: IncomingMessage| {
            Self::handle_matrix_message(MessageContext {
                message,
                matrix_client: Arc::clone(&matrix_client),
                call_store: Arc::clone(&call_store),
                commander: Arc::clone(&commander),
                room_locks: Arc::clone(&room_locks),
                cleanup_delay,
            })
        };

        self.matrix_client.sync(on_message).await;
    }

    /// Handles an incoming Matrix message in a new task, so the sync loop
    /// keeps going while messages are sent.
    fn handle_matrix_message(ctx: MessageContext) {
        tokio::spawn(async move {
            let message = &ctx.message;

            let command = match ctx.commander.parse(&message.body) {
                Ok(command) => command,
                // Return silently if the command is not for the bot
                Err(CommandParseError::NotForBot) => return,
                Err(CommandParseError::InvalidCommand(response)) => {
                    if let Err(e) = ctx
                        .matrix_client
                        .send_reply(&message.room_id, &message.sender_id, &message.event_id, &response)
                        .await
                    {
                        error!("failed to send reply: {:?}", e);
                    }
                    return;
                }
            };
            debug!("received {:?} from {}", command, message.sender_id);

            let room_guard = ctx.room_locks.lock(&message.room_id).await;

            let context = build_context(ctx.matrix_client.as_ref(), message).await;
            let result = ctx
                .commander
                .parse_command(&command, &context, &ctx.call_store)
                .await;
            let delete_command = result.delete_command;

            apply_result(ctx.matrix_client.as_ref(), &ctx.call_store, message, result).await;
            drop(room_guard);

            if delete_command {
                cleanup_command(ctx.matrix_client.as_ref(), message, ctx.cleanup_delay).await;
            }
        });
    }
}

/// Builds the command context of a message.
///
/// Permissions are only looked up for rooms where calls are allowed.
async fn build_context<A: Authorizer>(authorizer: &A, message: &IncomingMessage) -> CommandContext {
    let can_manage = !message.is_direct
        && authorizer
            .can_manage_calls(&message.room_id, &message.sender_id)
            .await;

    CommandContext {
        room_id: message.room_id.clone(),
        user_id: message.sender_id.clone(),
        user_name: message.sender_name.clone(),
        is_direct: message.is_direct,
        can_manage,
        mentions: message.mentions.clone(),
    }
}

/// Applies the display update and sends the response of a command result.
///
/// Redacting the command is left to [`cleanup_command`].
async fn apply_result<M: Messenger>(
    messenger: &M,
    store: &CallStore,
    message: &IncomingMessage,
    result: CommandResult,
) {
    let room_id = &message.room_id;

    match result.display {
        Some(DisplayUpdate::Post { call_id, body }) => {
            post_display(messenger, store, room_id, call_id, &body).await
        }
        Some(DisplayUpdate::Edit { message_id, body }) => {
            if let Err(e) = messenger.edit_markdown(room_id, &message_id, &body).await {
                error!("failed to edit call display {}: {:?}", message_id, e);
            }
        }
        Some(DisplayUpdate::Repost {
            call_id,
            previous,
            body,
        }) => {
            if let Some(previous) = previous
                && let Err(e) = messenger.redact(room_id, &previous, REPOST_REASON).await
            {
                error!("failed to delete call display {}: {:?}", previous, e);
            }
            post_display(messenger, store, room_id, call_id, &body).await;
        }
        None => {}
    }

    if let Some(response) = &result.response {
        // A reply would point to a message about to be redacted
        let sent = if result.delete_command {
            messenger.send_markdown(room_id, response).await.map(|_| ())
        } else {
            messenger
                .send_reply(room_id, &message.sender_id, &message.event_id, response)
                .await
        };
        if let Err(e) = sent {
            error!("failed to send response in room {}: {:?}", room_id, e);
        }
    }
}

/// Redacts a processed command message after `delay`.
async fn cleanup_command<M: Messenger>(messenger: &M, message: &IncomingMessage, delay: Duration) {
    sleep(delay).await;
    if let Err(e) = messenger
        .redact(&message.room_id, &message.event_id, CLEANUP_REASON)
        .await
    {
        error!("failed to delete command {}: {:?}", message.event_id, e);
    }
}

/// Sends a new display message and records it in the call `call_id`.
async fn post_display<M: Messenger>(
    messenger: &M,
    store: &CallStore,
    room_id: &str,
    call_id: u64,
    body: &str,
) {
    let message_id = match messenger.send_markdown(room_id, body).await {
        Ok(message_id) => message_id,
        Err(e) => {
            error!("failed to post call display in room {}: {:?}", room_id, e);
            return;
        }
    };

    if store.set_message(room_id, call_id, &message_id).await.is_err() {
        warn!(
            "call {} of room {} ended before its display {} was recorded",
            call_id, room_id, message_id
        );
    }
}
