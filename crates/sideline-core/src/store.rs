use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, broadcast};

use crate::errors::SidelineError;
use crate::session::{SessionMeta, SessionRecord};

/// Buffered snapshots per change feed before slow subscribers start lagging.
const CHANGE_FEED_CAPACITY: usize = 32;

/// Document-store boundary for session records.
///
/// Participant mutations are set-semantic and atomic at this boundary:
/// implementations must never require the caller to read-modify-write the
/// participant list. "Not found" is a boolean result, not an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new active record with an empty participant list.
    /// Fails if a record for `room_id` already exists.
    async fn create_session(
        &self,
        room_id: &str,
        meta: &SessionMeta,
    ) -> Result<SessionRecord, SidelineError>;

    async fn get_session(&self, room_id: &str) -> Result<Option<SessionRecord>, SidelineError>;

    /// Mark the record ended. Returns whether a record was found.
    /// Ending an already-ended session is a no-op that still returns `true`.
    async fn end_session(&self, room_id: &str) -> Result<bool, SidelineError>;

    /// All records with `is_live == true`, ordered by start time then room id.
    async fn list_active(&self) -> Result<Vec<SessionRecord>, SidelineError>;

    /// Add `participant` to the record's participant set.
    /// Returns whether a record was found; adding a token that is already
    /// present changes nothing.
    async fn add_participant(
        &self,
        room_id: &str,
        participant: &str,
    ) -> Result<bool, SidelineError>;

    /// Remove `participant` from the record's participant set.
    /// Returns whether a record was found.
    async fn remove_participant(
        &self,
        room_id: &str,
        participant: &str,
    ) -> Result<bool, SidelineError>;

    /// Change feed for one session: a snapshot of the record is delivered
    /// after every mutation. Drives the live roster and lets viewers detect
    /// the host ending the session.
    async fn subscribe(
        &self,
        room_id: &str,
    ) -> Result<broadcast::Receiver<SessionRecord>, SidelineError>;
}

#[derive(Default)]
struct Shared {
    sessions: HashMap<String, SessionRecord>,
    feeds: HashMap<String, broadcast::Sender<SessionRecord>>,
}

impl Shared {
    fn feed(&mut self, room_id: &str) -> &broadcast::Sender<SessionRecord> {
        self.feeds
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_FEED_CAPACITY).0)
    }

    fn publish(&mut self, room_id: &str) {
        if let Some(record) = self.sessions.get(room_id).cloned() {
            // No receivers is fine; the send result is irrelevant.
            let _ = self.feed(room_id).send(record);
        }
    }
}

/// In-process reference implementation of [`SessionStore`].
///
/// Every mutation happens under one lock, which is where the atomicity of
/// the set-semantic participant operations comes from.
#[derive(Default)]
pub struct MemoryStore {
    shared: Mutex<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        room_id: &str,
        meta: &SessionMeta,
    ) -> Result<SessionRecord, SidelineError> {
        let mut shared = self.shared.lock().await;
        if shared.sessions.contains_key(room_id) {
            return Err(SidelineError::Store(format!(
                "session already exists for room {room_id}"
            )));
        }
        let record = SessionRecord::new(room_id, meta, Utc::now());
        shared.sessions.insert(room_id.to_string(), record.clone());
        shared.publish(room_id);
        Ok(record)
    }

    async fn get_session(&self, room_id: &str) -> Result<Option<SessionRecord>, SidelineError> {
        let shared = self.shared.lock().await;
        Ok(shared.sessions.get(room_id).cloned())
    }

    async fn end_session(&self, room_id: &str) -> Result<bool, SidelineError> {
        let mut shared = self.shared.lock().await;
        let Some(record) = shared.sessions.get_mut(room_id) else {
            return Ok(false);
        };
        if !record.is_ended() {
            record.end(Utc::now());
            shared.publish(room_id);
        }
        Ok(true)
    }

    async fn list_active(&self) -> Result<Vec<SessionRecord>, SidelineError> {
        let shared = self.shared.lock().await;
        let mut active: Vec<SessionRecord> = shared
            .sessions
            .values()
            .filter(|r| r.is_live)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.room_id.cmp(&b.room_id))
        });
        Ok(active)
    }

    async fn add_participant(
        &self,
        room_id: &str,
        participant: &str,
    ) -> Result<bool, SidelineError> {
        let mut shared = self.shared.lock().await;
        let Some(record) = shared.sessions.get_mut(room_id) else {
            return Ok(false);
        };
        if !record.has_participant(participant) {
            record.participants.push(participant.to_string());
            shared.publish(room_id);
        }
        Ok(true)
    }

    async fn remove_participant(
        &self,
        room_id: &str,
        participant: &str,
    ) -> Result<bool, SidelineError> {
        let mut shared = self.shared.lock().await;
        let Some(record) = shared.sessions.get_mut(room_id) else {
            return Ok(false);
        };
        if record.has_participant(participant) {
            record.participants.retain(|p| p != participant);
            shared.publish(room_id);
        }
        Ok(true)
    }

    async fn subscribe(
        &self,
        room_id: &str,
    ) -> Result<broadcast::Receiver<SessionRecord>, SidelineError> {
        let mut shared = self.shared.lock().await;
        Ok(shared.feed(room_id).subscribe())
    }
}
