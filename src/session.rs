//! Session store
//!
//! Maps client session ids to at most one pending task. Entries live in a
//! sharded map so independent sessions never wait on each other. Writers go
//! through a [`SessionLease`], which also marks the session as having a call
//! in flight until it is dropped.

use crate::protocol::TaskHandle;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("session {0} already has a call in flight")]
    InFlight(String),
}

#[derive(Debug)]
struct SessionEntry {
    pending: Option<TaskHandle>,
    in_flight: bool,
    updated_at: DateTime<Utc>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            pending: None,
            in_flight: false,
            updated_at: Utc::now(),
        }
    }
}

/// Read-only view of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub pending: Option<TaskHandle>,
    pub in_flight: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Thread-safe session store handle
#[derive(Clone, Default)]
pub struct SessionStore {
    entries: Arc<DashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the single-writer lease for a session.
    ///
    /// Fails if another call for the same session holds it.
    pub fn lease(&self, session_id: &str) -> Result<SessionLease, StoreError> {
        let mut entry = self
            .entries
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::new);
        if entry.in_flight {
            return Err(StoreError::InFlight(session_id.to_string()));
        }
        entry.in_flight = true;
        let pending = entry.pending.clone();
        drop(entry);

        Ok(SessionLease {
            entries: Arc::clone(&self.entries),
            session_id: session_id.to_string(),
            pending,
        })
    }

    /// Current pending task for a session, if any
    pub fn pending(&self, session_id: &str) -> Option<TaskHandle> {
        self.entries
            .get(session_id)
            .and_then(|entry| entry.pending.clone())
    }

    pub fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        match self.entries.get(session_id) {
            Some(entry) => SessionSnapshot {
                session_id: session_id.to_string(),
                pending: entry.pending.clone(),
                in_flight: entry.in_flight,
                updated_at: Some(entry.updated_at),
            },
            None => SessionSnapshot {
                session_id: session_id.to_string(),
                pending: None,
                in_flight: false,
                updated_at: None,
            },
        }
    }

    /// Number of sessions currently waiting on a reply
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.pending.is_some())
            .count()
    }

    /// Drop idle sessions not written since `max_age` ago. Returns how many
    /// were removed.
    pub fn expire_older_than(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        cutoff.map_or(0, |cutoff| self.expire_before(cutoff))
    }

    /// Drop idle sessions last written before `cutoff`. Sessions with a call
    /// in flight are kept.
    pub fn expire_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.in_flight || entry.updated_at >= cutoff);
        let expired = before.saturating_sub(self.entries.len());
        if expired > 0 {
            tracing::debug!(expired, cutoff = %cutoff, "Expired idle sessions");
        }
        expired
    }
}

/// Exclusive write access to one session's entry.
///
/// Mutations are written through immediately. Dropping the lease releases the
/// in-flight mark without touching the pending task, so an abandoned or
/// failed call leaves the previous suspension point in place.
pub struct SessionLease {
    entries: Arc<DashMap<String, SessionEntry>>,
    session_id: String,
    pending: Option<TaskHandle>,
}

impl SessionLease {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn pending(&self) -> Option<&TaskHandle> {
        self.pending.as_ref()
    }

    /// Overwrite the pending task; the previous one is discarded
    pub fn replace(&mut self, handle: TaskHandle) -> Option<TaskHandle> {
        self.write(Some(handle))
    }

    /// Drop the pending task, returning it
    pub fn clear(&mut self) -> Option<TaskHandle> {
        self.write(None)
    }

    fn write(&mut self, pending: Option<TaskHandle>) -> Option<TaskHandle> {
        if let Some(mut entry) = self.entries.get_mut(&self.session_id) {
            entry.pending.clone_from(&pending);
            entry.updated_at = Utc::now();
        }
        std::mem::replace(&mut self.pending, pending)
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        // The shard guard must be released before remove_if touches the same shard
        if let Some(mut entry) = self.entries.get_mut(&self.session_id) {
            entry.in_flight = false;
        }
        self.entries
            .remove_if(&self.session_id, |_, entry| {
                entry.pending.is_none() && !entry.in_flight
            });
    }
}
