//! Call persistence layer for loading and saving calls to disk.
//!
//! This module provides the [`CallLoader`] for keeping calls between bot
//! restarts. The active calls and the recent history are serialized to JSON
//! and stored in a single file.

use std::collections::HashMap;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::calls::call::Call;

/// Everything persisted about calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CallRecords {
    /// Active call of each room, indexed by room ID
    #[serde(default)]
    pub active: HashMap<String, Call>,
    /// Closed calls, oldest first
    #[serde(default)]
    pub closed: Vec<Call>,
    /// Last call ID handed out
    #[serde(default)]
    pub last_id: u64,
}

/// Handles loading and persisting calls to disk.
///
/// Loading never fails: a missing or corrupted file gives empty records so
/// that the bot can always start.
///
/// # Examples
///
/// ```ignore
/// let loader = CallLoader::new("calls.json".to_string());
/// let records = loader.load().await;
/// loader.persist(&records).await;
/// ```
#[derive(Clone)]
pub struct CallLoader {
    /// Path to the JSON file where calls are stored.
    path: String,
}

impl CallLoader {
    pub fn new(path: String) -> Self {
        CallLoader { path }
    }

    /// Loads calls from disk.
    ///
    /// # Error Handling
    ///
    /// - If the file doesn't exist: logs a warning and returns empty records
    /// - If deserialization fails: logs an error and returns empty records
    pub async fn load(&self) -> CallRecords {
        let Ok(serialized_records) = fs::read_to_string(&self.path).await else {
            warn!("no persisted calls found, starting without calls");
            return CallRecords::default();
        };

        let records: CallRecords = match serde_json::from_str(&serialized_records) {
            Ok(records) => records,
            Err(e) => {
                error!("failed to deserialize persisted calls ({}), starting without calls", e);
                return CallRecords::default();
            }
        };

        info!(
            "loaded {} active calls and {} closed calls",
            records.active.len(),
            records.closed.len()
        );

        records
    }

    /// Persists the records to disk.
    ///
    /// Errors are logged and not propagated; the in-memory records stay the
    /// source of truth until the next successful write.
    pub async fn persist(&self, records: &CallRecords) {
        let serialized_records = match serde_json::to_string(records) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("failed to serialize calls: {}", e);
                return;
            }
        };

        if let Err(e) = fs::write(&self.path, &serialized_records).await {
            error!("failed to persist calls to {}: {}", self.path, e);
            return;
        }

        debug!("persisted calls");
    }
}
