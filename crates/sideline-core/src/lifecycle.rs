use std::sync::Arc;

use crate::errors::SidelineError;
use crate::session::{SessionMeta, SessionRecord};
use crate::store::SessionStore;

/// Thin lifecycle wrapper over the session store.
///
/// Every operation logs and propagates the store's error unchanged; the
/// caller decides what to show the user. `create_session` performs exactly
/// one write and does not roll back if a later step of the caller's flow
/// fails, so a remote room can outlive a failed bookkeeping write.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    pub async fn create_session(
        &self,
        room_id: &str,
        meta: &SessionMeta,
    ) -> Result<SessionRecord, SidelineError> {
        let record = self.store.create_session(room_id, meta).await.map_err(|e| {
            tracing::error!("error adding session {room_id}: {e}");
            e
        })?;
        tracing::info!("session {room_id} created: {}", record.title);
        Ok(record)
    }

    /// Returns whether a record for `room_id` was found.
    pub async fn end_session(&self, room_id: &str) -> Result<bool, SidelineError> {
        let found = self.store.end_session(room_id).await.map_err(|e| {
            tracing::error!("error ending session {room_id}: {e}");
            e
        })?;
        if found {
            tracing::info!("session {room_id} ended");
        } else {
            tracing::warn!("end requested for unknown session {room_id}");
        }
        Ok(found)
    }

    pub async fn list_active_sessions(&self) -> Result<Vec<SessionRecord>, SidelineError> {
        self.store.list_active().await.map_err(|e| {
            tracing::error!("error listing active sessions: {e}");
            e
        })
    }

    /// The session a viewer joins: first in the deterministic active order.
    pub async fn earliest_active(&self) -> Result<Option<SessionRecord>, SidelineError> {
        Ok(self.list_active_sessions().await?.into_iter().next())
    }

    pub async fn add_participant(
        &self,
        room_id: &str,
        participant: &str,
    ) -> Result<bool, SidelineError> {
        self.store
            .add_participant(room_id, participant)
            .await
            .map_err(|e| {
                tracing::error!("error adding participant to {room_id}: {e}");
                e
            })
    }

    pub async fn remove_participant(
        &self,
        room_id: &str,
        participant: &str,
    ) -> Result<bool, SidelineError> {
        self.store
            .remove_participant(room_id, participant)
            .await
            .map_err(|e| {
                tracing::error!("error removing participant from {room_id}: {e}");
                e
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;
    use crate::store::MemoryStore;

    fn service() -> SessionService {
        SessionService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn full_session_lifecycle() {
        let service = service();
        let meta = SessionMeta {
            title: Some("Coaching Session".to_string()),
            coach_name: None,
        };

        let record = service.create_session("abcd-1234-wxyz", &meta).await.unwrap();
        assert_eq!(record.title, "Coaching Session");

        let active = service.list_active_sessions().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, SessionStatus::Active);
        assert!(active[0].participants.is_empty());

        assert!(service
            .add_participant("abcd-1234-wxyz", "viewer-1")
            .await
            .unwrap());
        let record = service
            .store()
            .get_session("abcd-1234-wxyz")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.participants, vec!["viewer-1"]);

        assert!(service.end_session("abcd-1234-wxyz").await.unwrap());
        let record = service
            .store()
            .get_session("abcd-1234-wxyz")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SessionStatus::Ended);
        assert!(!record.is_live);
        assert!(service.list_active_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn earliest_active_is_first_created() {
        let service = service();
        service
            .create_session("bbbb-0000-0000", &SessionMeta::default())
            .await
            .unwrap();
        service
            .create_session("aaaa-0000-0000", &SessionMeta::default())
            .await
            .unwrap();

        // Same-instant starts fall back to room id order.
        let earliest = service.earliest_active().await.unwrap().unwrap();
        let all = service.list_active_sessions().await.unwrap();
        assert_eq!(earliest.room_id, all[0].room_id);
    }

    #[tokio::test]
    async fn earliest_active_is_none_when_idle() {
        assert!(service().earliest_active().await.unwrap().is_none());
    }
}
