use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::controls::StreamControls;
use crate::errors::SidelineError;
use crate::events::{EndReason, EventEmitter, SidelineEvent, SidelineEventListener};
use crate::gate::{GateStatus, MemberProfile, MembershipStore, PremiumGate};
use crate::lifecycle::SessionService;
use crate::permissions::MediaPermissions;
use crate::presence::{AppState, ExitGuard, LeavePolicy};
use crate::provider::RoomConnector;
use crate::room::RoomSession;
use crate::roster::Roster;
use crate::store::SessionStore;

/// What came out of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { room_id: String },
    /// The premium gate blocked the member; offer the purchase flow.
    PremiumRequired,
    /// No coach is live right now.
    NoActiveSession,
}

/// Viewer-side orchestration: premium gate -> membership -> watch the feed.
///
/// Backgrounding or the back button removes this viewer's participant entry
/// only; the session stays live for everyone else.
pub struct ViewerController {
    service: SessionService,
    gate: PremiumGate,
    connector: Arc<dyn RoomConnector>,
    session: RoomSession,
    emitter: EventEmitter,
    profile: MemberProfile,
    room_id: Arc<StdMutex<Option<String>>>,
    guard: Arc<Mutex<Option<Arc<ExitGuard>>>>,
    watch_task: Mutex<Option<JoinHandle<()>>>,
}

impl ViewerController {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
        members: Arc<dyn MembershipStore>,
        connector: Arc<dyn RoomConnector>,
        profile: MemberProfile,
    ) -> Result<Self, SidelineError> {
        config.ensure_auth()?;
        let emitter = EventEmitter::new();
        Ok(Self {
            service: SessionService::new(store),
            gate: PremiumGate::new(members),
            connector,
            session: RoomSession::new(emitter.clone()),
            emitter,
            profile,
            room_id: Arc::new(StdMutex::new(None)),
            guard: Arc::new(Mutex::new(None)),
            watch_task: Mutex::new(None),
        })
    }

    pub fn add_listener(&self, listener: Arc<dyn SidelineEventListener>) {
        self.emitter.add_listener(listener);
    }

    /// Viewers join receive-only.
    pub fn controls(&self) -> StreamControls {
        self.session.controls(false, false)
    }

    pub fn current_room_id(&self) -> Option<String> {
        self.room_id.lock().unwrap().clone()
    }

    /// Membership check backing the gate modal.
    pub async fn check_premium(&self) -> Result<GateStatus, SidelineError> {
        self.gate.check(&self.profile.access_token).await
    }

    /// "Buy now" from the gate modal; admits on success.
    pub async fn purchase(&self) -> Result<GateStatus, SidelineError> {
        self.gate.purchase(&self.profile).await
    }

    /// Join the earliest active session as this member.
    pub async fn join(
        &self,
        permissions: &MediaPermissions,
    ) -> Result<JoinOutcome, SidelineError> {
        permissions.ensure()?;
        if self.current_room_id().is_some() {
            return Err(SidelineError::Room("already joined".to_string()));
        }
        if self.check_premium().await? == GateStatus::Blocked {
            return Ok(JoinOutcome::PremiumRequired);
        }

        let Some(record) = self.service.earliest_active().await? else {
            return Ok(JoinOutcome::NoActiveSession);
        };
        let room_id = record.room_id.clone();

        // The session can end between the listing and this write.
        if !self
            .service
            .add_participant(&room_id, &self.profile.member_token)
            .await?
        {
            return Ok(JoinOutcome::NoActiveSession);
        }

        self.session.connect(self.connector.as_ref(), &room_id).await?;

        *self.room_id.lock().unwrap() = Some(room_id.clone());
        *self.guard.lock().await = Some(Arc::new(ExitGuard::new(
            self.service.clone(),
            LeavePolicy::RemoveParticipant,
            Some(room_id.clone()),
            Some(self.profile.member_token.clone()),
            None,
        )));

        self.spawn_session_watch(&room_id).await?;
        Ok(JoinOutcome::Joined { room_id })
    }

    /// Leave the stream deliberately.
    pub async fn leave(&self) -> Result<bool, SidelineError> {
        let Some(guard) = self.guard.lock().await.clone() else {
            return Ok(false);
        };
        let fired = guard.leave().await?;
        if fired {
            self.finish().await;
        }
        Ok(fired)
    }

    /// Hardware back button routes to the same idempotent leave.
    pub async fn on_back_pressed(&self) -> Result<bool, SidelineError> {
        let Some(guard) = self.guard.lock().await.clone() else {
            return Ok(false);
        };
        let fired = guard.on_back_pressed().await?;
        if fired {
            self.finish().await;
        }
        Ok(fired)
    }

    /// App lifecycle transition; active-to-background leaves the stream.
    pub async fn on_app_state_change(&self, next: AppState) -> Result<bool, SidelineError> {
        let Some(guard) = self.guard.lock().await.clone() else {
            return Ok(false);
        };
        let fired = guard.on_app_state_change(next).await?;
        if fired {
            self.finish().await;
        }
        Ok(fired)
    }

    async fn finish(&self) {
        let room_id = self.room_id.lock().unwrap().take();
        if let Some(task) = self.watch_task.lock().await.take() {
            task.abort();
        }
        self.guard.lock().await.take();
        self.session.disconnect().await;
        if room_id.is_some() {
            self.emitter
                .emit(SidelineEvent::ParticipantLeft(self.profile.member_token.clone()));
        }
    }

    /// Watch the session record: roster changes feed the UI, and the record
    /// flipping to ended means the host closed the stream. Snapshots that
    /// arrive after this device moved on are dropped.
    async fn spawn_session_watch(&self, room_id: &str) -> Result<(), SidelineError> {
        let mut feed = self.service.store().subscribe(room_id).await?;

        // Seed the roster from the current record so the first snapshot
        // diff does not re-announce everyone already present.
        let mut roster = Roster::new();
        roster.set_local_token(self.profile.member_token.clone());
        if let Some(record) = self.service.store().get_session(room_id).await? {
            roster.apply_snapshot(&record.participants);
            self.emitter
                .emit(SidelineEvent::RosterChanged(record.participants));
        }

        let emitter = self.emitter.clone();
        let session = self.session.clone();
        let current = self.room_id.clone();
        let guard_slot = self.guard.clone();
        let expected = room_id.to_string();

        let task = tokio::spawn(async move {
            while let Ok(snapshot) = feed.recv().await {
                if current.lock().unwrap().as_deref() != Some(expected.as_str()) {
                    break;
                }

                if snapshot.is_ended() {
                    tracing::info!("session {expected} ended by the host");
                    if let Some(guard) = guard_slot.lock().await.take() {
                        if let Err(e) = guard.leave().await {
                            tracing::warn!("cleanup after remote end failed: {e}");
                        }
                    }
                    current.lock().unwrap().take();
                    session.disconnect().await;
                    emitter.emit(SidelineEvent::SessionEnded {
                        room_id: expected.clone(),
                        reason: EndReason::EndedByHost,
                    });
                    break;
                }

                let diff = roster.apply_snapshot(&snapshot.participants);
                if diff.is_empty() {
                    continue;
                }
                for token in diff.joined {
                    emitter.emit(SidelineEvent::ParticipantJoined(token));
                }
                for token in diff.left {
                    emitter.emit(SidelineEvent::ParticipantLeft(token));
                }
                emitter.emit(SidelineEvent::RosterChanged(snapshot.participants));
            }
        });
        *self.watch_task.lock().await = Some(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::MemoryMembershipStore;
    use crate::session::{SessionMeta, SessionStatus};
    use crate::store::MemoryStore;
    use crate::test_helpers::{CapturingListener, FakeConnector, eventually};

    struct Fixture {
        controller: ViewerController,
        store: Arc<MemoryStore>,
        connector: Arc<FakeConnector>,
        listener: Arc<CapturingListener>,
    }

    fn profile() -> MemberProfile {
        MemberProfile {
            access_token: "access-1".to_string(),
            member_token: "viewer-1".to_string(),
            name: None,
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let connector = Arc::new(FakeConnector::new());
        let controller = ViewerController::new(
            &ClientConfig::new("test-token"),
            store.clone(),
            Arc::new(MemoryMembershipStore::new()),
            connector.clone(),
            profile(),
        )
        .unwrap();
        let listener = CapturingListener::new();
        controller.add_listener(listener.clone());
        Fixture {
            controller,
            store,
            connector,
            listener,
        }
    }

    async fn seed_session(store: &Arc<MemoryStore>) -> String {
        store
            .create_session("abcd-1234-wxyz", &SessionMeta::default())
            .await
            .unwrap();
        "abcd-1234-wxyz".to_string()
    }

    #[tokio::test]
    async fn gate_blocks_non_members() {
        let f = fixture();
        let room_id = seed_session(&f.store).await;

        let outcome = f
            .controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();
        assert_eq!(outcome, JoinOutcome::PremiumRequired);

        // Nothing was joined or written.
        let record = f.store.get_session(&room_id).await.unwrap().unwrap();
        assert!(record.participants.is_empty());
        assert!(f.connector.connected_room_ids().is_empty());
    }

    #[tokio::test]
    async fn purchase_admits_without_restart() {
        let f = fixture();
        let room_id = seed_session(&f.store).await;

        assert_eq!(f.controller.check_premium().await.unwrap(), GateStatus::Blocked);
        assert_eq!(f.controller.purchase().await.unwrap(), GateStatus::Admitted);

        let outcome = f
            .controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            JoinOutcome::Joined {
                room_id: room_id.clone()
            }
        );

        let record = f.store.get_session(&room_id).await.unwrap().unwrap();
        assert_eq!(record.participants, vec!["viewer-1"]);
        assert_eq!(record.status, SessionStatus::Active);
        assert_eq!(f.connector.connected_room_ids(), vec![room_id]);
    }

    #[tokio::test]
    async fn second_join_is_rejected_while_connected() {
        let f = fixture();
        let room_id = seed_session(&f.store).await;
        f.controller.purchase().await.unwrap();
        f.controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();

        let err = f
            .controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap_err();
        assert!(matches!(err, SidelineError::Room(_)));

        // One connection, still alive; the record lists the viewer once.
        assert_eq!(f.connector.connected_room_ids(), vec![room_id.clone()]);
        assert!(!f.connector.last_room().unwrap().has_left());
        let record = f.store.get_session(&room_id).await.unwrap().unwrap();
        assert_eq!(record.participants, vec!["viewer-1"]);

        // After leaving, a fresh join is allowed again.
        assert!(f.controller.leave().await.unwrap());
        let outcome = f
            .controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Joined { room_id });
    }

    #[tokio::test]
    async fn no_active_session_outcome() {
        let f = fixture();
        f.controller.purchase().await.unwrap();
        let outcome = f
            .controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();
        assert_eq!(outcome, JoinOutcome::NoActiveSession);
    }

    #[tokio::test]
    async fn backgrounding_removes_only_this_viewer() {
        let f = fixture();
        let room_id = seed_session(&f.store).await;
        f.store.add_participant(&room_id, "viewer-2").await.unwrap();
        f.controller.purchase().await.unwrap();
        f.controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();

        assert!(
            f.controller
                .on_app_state_change(AppState::Background)
                .await
                .unwrap()
        );

        let record = f.store.get_session(&room_id).await.unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Active);
        assert_eq!(record.participants, vec!["viewer-2"]);
        assert!(f.connector.last_room().unwrap().has_left());

        // Second trigger is a no-op.
        assert!(
            !f.controller
                .on_app_state_change(AppState::Background)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn leave_and_back_button_share_one_removal() {
        let f = fixture();
        let room_id = seed_session(&f.store).await;
        f.controller.purchase().await.unwrap();
        f.controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();

        assert!(f.controller.leave().await.unwrap());
        assert!(!f.controller.on_back_pressed().await.unwrap());

        let record = f.store.get_session(&room_id).await.unwrap().unwrap();
        assert!(record.participants.is_empty());
    }

    #[tokio::test]
    async fn host_ending_is_detected_remotely() {
        let f = fixture();
        let room_id = seed_session(&f.store).await;
        f.controller.purchase().await.unwrap();
        f.controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();

        f.store.end_session(&room_id).await.unwrap();

        assert!(
            eventually(|| f.listener.any(|e| matches!(
                e,
                SidelineEvent::SessionEnded {
                    reason: EndReason::EndedByHost,
                    ..
                }
            )))
            .await
        );
        assert!(eventually(|| f.controller.current_room_id().is_none()).await);
        assert!(f.connector.last_room().unwrap().has_left());
    }

    #[tokio::test]
    async fn roster_updates_flow_to_listeners() {
        let f = fixture();
        let room_id = seed_session(&f.store).await;
        f.controller.purchase().await.unwrap();
        f.controller
            .join(&MediaPermissions::granted())
            .await
            .unwrap();

        f.store.add_participant(&room_id, "viewer-2").await.unwrap();
        assert!(
            eventually(|| f
                .listener
                .any(|e| matches!(e, SidelineEvent::ParticipantJoined(t) if t == "viewer-2")))
            .await
        );

        // The viewer is never announced to itself.
        assert!(f.listener.events().iter().all(|e| {
            !matches!(e, SidelineEvent::ParticipantJoined(t) if t == "viewer-1")
        }));
    }
}
