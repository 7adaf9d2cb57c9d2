//! Id-keyed queue store.
//!
//! Entries live in a map keyed by [`EntryId`] with a separate order list, so
//! every update addresses an entry by id and stays correct while other
//! entries are retried or removed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use procura_protocol::EntryStatus;

use crate::entry::{EntryId, QueueEntry};
use crate::error::StoreError;

/// Ordered collection of queue entries.
#[derive(Debug, Default)]
pub struct QueueStore {
    entries: HashMap<EntryId, QueueEntry>,
    order: Vec<EntryId>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry at the end of the queue.
    pub fn push(&mut self, entry: QueueEntry) {
        self.order.push(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &EntryId) -> Option<&QueueEntry> {
        self.entries.get(id)
    }

    /// Entries in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Cloned entries in queue order.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns `true` if a file with this name and size is already queued.
    pub fn contains_file(&self, name: &str, size: u64) -> bool {
        self.entries.values().any(|e| e.is_same_file(name, size))
    }

    /// Ids of entries the next drain may pick up, in queue order.
    pub fn eligible_ids(&self) -> Vec<EntryId> {
        self.iter()
            .filter(|e| e.status.is_eligible())
            .map(|e| e.id.clone())
            .collect()
    }

    /// Returns `true` if any entry is waiting for a drain.
    pub fn has_eligible(&self) -> bool {
        self.entries.values().any(|e| e.status.is_eligible())
    }

    /// The entry currently uploading or processing, if any.
    pub fn active(&self) -> Option<&QueueEntry> {
        self.entries.values().find(|e| e.status.is_active())
    }

    /// Moves an entry to `to`, replacing its message.
    ///
    /// Progress follows the state machine: reset to 0 when an upload starts,
    /// set to 100 on completion, frozen otherwise. Starting an upload is
    /// refused while another entry is active.
    pub fn transition(
        &mut self,
        id: &EntryId,
        to: EntryStatus,
        message: impl Into<String>,
    ) -> Result<QueueEntry, StoreError> {
        if to == EntryStatus::Uploading
            && let Some(active) = self.active()
            && active.id != *id
        {
            return Err(StoreError::AlreadyActive {
                active: active.id.clone(),
            });
        }

        let entry = self.entry_mut(id)?;
        if !entry.status.can_transition_to(to) {
            return Err(StoreError::IllegalTransition {
                id: id.clone(),
                from: entry.status,
                to,
            });
        }

        entry.status = to;
        entry.message = message.into();
        match to {
            EntryStatus::Uploading | EntryStatus::Pending => entry.progress = 0,
            EntryStatus::Completed => entry.progress = 100,
            _ => {}
        }
        Ok(entry.clone())
    }

    /// Records upload progress. Never lowers the current value.
    pub fn set_progress(&mut self, id: &EntryId, progress: u8) -> Result<QueueEntry, StoreError> {
        let entry = self.entry_mut(id)?;
        if entry.status != EntryStatus::Uploading {
            return Err(StoreError::IllegalTransition {
                id: id.clone(),
                from: entry.status,
                to: EntryStatus::Uploading,
            });
        }
        entry.progress = entry.progress.max(progress.min(100));
        Ok(entry.clone())
    }

    /// Resets a failed or cancelled entry to `Pending`, clearing progress
    /// and message.
    pub fn retry(&mut self, id: &EntryId) -> Result<QueueEntry, StoreError> {
        self.transition(id, EntryStatus::Pending, String::new())
    }

    /// Removes an entry. Entries being uploaded or processed are refused.
    pub fn remove(&mut self, id: &EntryId) -> Result<QueueEntry, StoreError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if !entry.status.is_removable() {
            return Err(StoreError::Busy {
                id: id.clone(),
                status: entry.status,
            });
        }
        self.order.retain(|o| o != id);
        self.entries
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn entry_mut(&mut self, id: &EntryId) -> Result<&mut QueueEntry, StoreError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

/// Store shared between the queue and its driver.
///
/// Every mutation is synchronous, so the lock is never held across an await
/// and can be taken from `Drop`.
pub(crate) type SharedStore = Mutex<QueueStore>;

/// Locks the shared store. A panic while holding the lock leaves the map
/// consistent, so a poisoned lock is recovered.
pub(crate) fn lock_store(store: &SharedStore) -> MutexGuard<'_, QueueStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
