//! In-memory, last-write-wins storage of pending wire records.
//!
//! One mutex guards the whole map. It is held only for the map access itself;
//! decoding, computing and network I/O all happen after the guard is dropped.
//! Entries are never evicted; they live until the process exits.

use crate::codec::WireRecord;
use crate::{Result, TransportError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Command-token addressed store with one slot per token.
#[derive(Debug, Default)]
pub struct CommandStore {
    records: Mutex<HashMap<String, WireRecord>>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the guard cannot leave the map half-written,
    // so a poisoned lock is still safe to use.
    fn records(&self) -> MutexGuard<'_, HashMap<String, WireRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `record` under `token`, discarding any previous record.
    pub fn put(&self, token: &str, record: WireRecord) {
        let replaced = self.records().insert(token.to_string(), record).is_some();
        debug!("Stored record for command {} (replaced: {})", token, replaced);
    }

    /// Fetch the latest record for `token` without removing it.
    pub fn get(&self, token: &str) -> Result<WireRecord> {
        self.records()
            .get(token)
            .cloned()
            .ok_or_else(|| TransportError::UnknownCommand {
                token: token.to_string(),
            })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.records().contains_key(token)
    }

    /// Number of tokens with a stored record.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}
