//! Roll call tracking.
//!
//! This module provides everything needed to keep track of initiative calls:
//!
//! - [`Call`]: one roll call session in a Matrix room
//! - [`CallStore`]: the active call index, one active call per room
//! - `CallLoader`: loading and saving calls to disk
//! - [`roster`]: NPC and mention extraction feeding the roster of a call
//!
//! # Lifecycle
//!
//! ```text
//! open ──► add / refresh / roll ──► close
//!  ▲                                  │
//!  └──────── new call allowed ◄───────┘
//! ```
//!
//! A closed call leaves the active index and is kept in a bounded history on
//! disk. Its log is not reachable through commands anymore.
//!
//! # Example Usage
//!
//! ```ignore
//! let store = CallStore::new("calls.json".to_string(), 50).await;
//! store.open("!room:example.com", "Initiative!", "", vec![], vec!["Goblins".to_string()]).await?;
//! store.record_roll("!room:example.com", Roll::new("Goblins", 12), "Goblins rolled 12".to_string()).await?;
//! let results = store.close("!room:example.com").await?;
//! ```

mod call;
mod call_loader;
mod call_store;
pub mod roster;

use thiserror::Error;

pub use crate::calls::call::{Call, CallResults, Mention, Roll};
pub use crate::calls::call_store::CallStore;

/// Precondition failures of call operations.
///
/// Both are expected outcomes of user commands, reported back to the user
/// with a fixed message. No state is changed when one is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    /// The room already has an active call
    #[error("the room already has an active call")]
    AlreadyActive,
    /// The room has no active call
    #[error("the room has no active call")]
    NoActiveCall,
}
