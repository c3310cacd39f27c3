//! Active call store.
//!
//! This module provides the [`CallStore`] which owns every call of every room
//! and enforces the one-active-call-per-room rule. Each operation is a single
//! check-and-mutate step under one lock, followed by a write to disk.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::Mutex;

use crate::calls::{
    CallError,
    call::{Call, CallResults, Mention, Roll},
    call_loader::{CallLoader, CallRecords},
};

/// Keyed store of calls with one active call per room.
///
/// All public methods are async and take the internal lock for their whole
/// duration, so a roll cannot land between the snapshot taken by [`close`]
/// and the removal of the call from the active index.
///
/// Returned calls are snapshots. Callers render and send them without
/// holding the lock, then write the display message ID back with
/// [`set_message`], naming the call by its `id` so that a late write never
/// lands on a call opened in the meantime.
///
/// [`close`]: CallStore::close
/// [`set_message`]: CallStore::set_message
pub struct CallStore {
    /// Active and closed calls
    records: Arc<Mutex<CallRecords>>,
    /// Loader for persisting and loading calls from disk
    call_loader: CallLoader,
    /// Number of closed calls kept in the history
    history_size: usize,
}

impl CallStore {
    /// Creates a new `CallStore` and loads existing calls from disk.
    ///
    /// # Arguments
    ///
    /// * `calls_path` - Path to the JSON file where calls are persisted
    /// * `history_size` - Number of closed calls kept on disk
    pub async fn new(calls_path: String, history_size: usize) -> Self {
        let call_loader = CallLoader::new(calls_path);
        let records = Arc::new(Mutex::new(call_loader.load().await));

        CallStore {
            records,
            call_loader,
            history_size,
        }
    }

    /// Returns the active call of a room, if any.
    pub async fn find_active(&self, channel: &str) -> Option<Call> {
        self.records.lock().await.active.get(channel).cloned()
    }

    /// Opens a new call in a room.
    ///
    /// # Errors
    ///
    /// [`CallError::AlreadyActive`] if the room already has an active call.
    /// Nothing is changed in that case.
    pub async fn open(
        &self,
        channel: &str,
        name: &str,
        text: &str,
        mentions: Vec<Mention>,
        npcs: Vec<String>,
    ) -> Result<Call, CallError> {
        let mut records = self.records.lock().await;

        if records.active.contains_key(channel) {
            debug!("room {} already has an active call", channel);
            return Err(CallError::AlreadyActive);
        }

        records.last_id += 1;
        let mut call = Call::new(channel, name, text, mentions, npcs);
        call.id = records.last_id;
        records.active.insert(channel.to_owned(), call.clone());
        self.call_loader.persist(&records).await;

        info!(
            "opened call {} '{}' in room {} with {} participants and {} npcs",
            call.id,
            call.name,
            channel,
            call.mentions.len(),
            call.npcs.len()
        );

        Ok(call)
    }

    /// Adds participants and NPCs to the active call of a room.
    ///
    /// Participants already called (same ID) and NPCs already listed (same
    /// label) are skipped.
    pub async fn add_roster(
        &self,
        channel: &str,
        mentions: Vec<Mention>,
        npcs: Vec<String>,
    ) -> Result<Call, CallError> {
        self.update_active(channel, |call| {
            call.merge_roster(mentions, npcs);
            debug!(
                "call in room {} now has {} participants and {} npcs",
                channel,
                call.mentions.len(),
                call.npcs.len()
            );
        })
        .await
    }

    /// Returns the active call of a room so it can be posted again.
    ///
    /// The call itself is not modified; the new display message is recorded
    /// afterwards with [`CallStore::set_message`].
    pub async fn refresh(&self, channel: &str) -> Result<Call, CallError> {
        self.find_active(channel)
            .await
            .ok_or(CallError::NoActiveCall)
    }

    /// Records the display message of the call `call_id`.
    ///
    /// # Errors
    ///
    /// [`CallError::NoActiveCall`] if `call_id` is not the active call of the
    /// room anymore, because it was closed and possibly replaced while its
    /// display was being sent. Nothing is changed in that case.
    pub async fn set_message(
        &self,
        channel: &str,
        call_id: u64,
        message_id: &str,
    ) -> Result<Call, CallError> {
        let mut records = self.records.lock().await;

        let Some(call) = records
            .active
            .get_mut(channel)
            .filter(|call| call.id == call_id)
        else {
            debug!("call {} is not active in room {}", call_id, channel);
            return Err(CallError::NoActiveCall);
        };
        call.message = Some(message_id.to_owned());
        let call = call.clone();

        self.call_loader.persist(&records).await;

        Ok(call)
    }

    /// Appends a roll to the active call of a room.
    pub async fn record_roll(
        &self,
        channel: &str,
        roll: Roll,
        log_line: String,
    ) -> Result<Call, CallError> {
        self.update_active(channel, |call| {
            debug!("recording roll {:?} in room {}", roll, channel);
            call.push_roll(roll, log_line);
        })
        .await
    }

    /// Closes the active call of a room.
    ///
    /// The call is removed from the active index and moved to the history in
    /// the same critical section. The returned ranking sorts rolls by value,
    /// highest first, keeping recording order for equal values.
    pub async fn close(&self, channel: &str) -> Result<CallResults, CallError> {
        let mut records = self.records.lock().await;

        let Some(mut call) = records.active.remove(channel) else {
            return Err(CallError::NoActiveCall);
        };
        call.end = Some(Utc::now());

        records.closed.push(call.clone());
        let overflow = records.closed.len().saturating_sub(self.history_size);
        records.closed.drain(..overflow);

        self.call_loader.persist(&records).await;

        info!(
            "closed call '{}' in room {} with {} rolls",
            call.name,
            channel,
            call.rolls.len()
        );

        let ranking = call.ranked_rolls();
        Ok(CallResults { call, ranking })
    }

    /// Returns the roll history of the active call of a room.
    pub async fn log(&self, channel: &str) -> Result<Vec<String>, CallError> {
        self.records
            .lock()
            .await
            .active
            .get(channel)
            .map(|call| call.logs.clone())
            .ok_or(CallError::NoActiveCall)
    }

    /// Applies `update` to the active call of a room and persists the result.
    async fn update_active<F>(&self, channel: &str, update: F) -> Result<Call, CallError>
    where
        F: FnOnce(&mut Call),
    {
        let mut records = self.records.lock().await;

        let Some(call) = records.active.get_mut(channel) else {
            debug!("no active call in room {}", channel);
            return Err(CallError::NoActiveCall);
        };
        update(call);
        let call = call.clone();

        self.call_loader.persist(&records).await;

        Ok(call)
    }

    #[cfg(test)]
    async fn get_records(&self) -> CallRecords {
        self.records.lock().await.clone()
    }
}
