use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::controls::StreamControls;
use crate::errors::SidelineError;
use crate::events::{EndReason, EventEmitter, SidelineEvent, SidelineEventListener};
use crate::lifecycle::SessionService;
use crate::permissions::MediaPermissions;
use crate::presence::{AppState, ExitGuard, LeavePolicy};
use crate::provider::{RoomConnector, RoomProvider};
use crate::room::RoomSession;
use crate::roster::Roster;
use crate::session::SessionMeta;
use crate::store::SessionStore;

/// Coach-side orchestration: create room -> record session -> go live.
///
/// Backgrounding or the back button while live ends the whole session, not
/// just this device's membership; that asymmetry with the viewer flow is
/// deliberate.
pub struct BroadcastController {
    service: SessionService,
    provider: Arc<dyn RoomProvider>,
    connector: Arc<dyn RoomConnector>,
    session: RoomSession,
    emitter: EventEmitter,
    room_id: Arc<StdMutex<Option<String>>>,
    guard: Arc<Mutex<Option<Arc<ExitGuard>>>>,
    roster_task: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastController {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn RoomProvider>,
        connector: Arc<dyn RoomConnector>,
    ) -> Result<Self, SidelineError> {
        config.ensure_auth()?;
        let emitter = EventEmitter::new();
        Ok(Self {
            service: SessionService::new(store),
            provider,
            connector,
            session: RoomSession::new(emitter.clone()),
            emitter,
            room_id: Arc::new(StdMutex::new(None)),
            guard: Arc::new(Mutex::new(None)),
            roster_task: Mutex::new(None),
        })
    }

    pub fn add_listener(&self, listener: Arc<dyn SidelineEventListener>) {
        self.emitter.add_listener(listener);
    }

    /// Broadcasters publish with mic and camera on.
    pub fn controls(&self) -> StreamControls {
        self.session.controls(true, true)
    }

    pub fn current_room_id(&self) -> Option<String> {
        self.room_id.lock().unwrap().clone()
    }

    /// Start the live stream. Returns the room id the viewers will join.
    ///
    /// The session record write is not rolled back if joining the room
    /// fails afterwards; the remote room already exists at that point and
    /// the error is surfaced to the caller as-is.
    pub async fn go_live(
        &self,
        meta: &SessionMeta,
        permissions: &MediaPermissions,
    ) -> Result<String, SidelineError> {
        permissions.ensure()?;
        if self.current_room_id().is_some() {
            return Err(SidelineError::Room("already live".to_string()));
        }

        let room_id = self.provider.create_room().await?;
        self.service.create_session(&room_id, meta).await?;
        self.session.connect(self.connector.as_ref(), &room_id).await?;

        *self.room_id.lock().unwrap() = Some(room_id.clone());
        *self.guard.lock().await = Some(Arc::new(ExitGuard::new(
            self.service.clone(),
            LeavePolicy::EndSession,
            Some(room_id.clone()),
            None,
            None,
        )));

        self.spawn_roster_watch(&room_id).await?;
        self.emitter.emit(SidelineEvent::SessionStarted {
            room_id: room_id.clone(),
        });
        Ok(room_id)
    }

    /// "End live": close the session record and leave the room.
    /// Returns whether the record was found, like the store does.
    pub async fn end(&self) -> Result<bool, SidelineError> {
        let Some(room_id) = self.current_room_id() else {
            return Ok(false);
        };
        let found = self.service.end_session(&room_id).await?;
        self.finish(EndReason::HostEnded).await;
        Ok(found)
    }

    /// Hardware back button while live ends the session.
    pub async fn on_back_pressed(&self) -> Result<bool, SidelineError> {
        let Some(guard) = self.guard.lock().await.clone() else {
            return Ok(false);
        };
        let fired = guard.on_back_pressed().await?;
        if fired {
            self.finish(EndReason::HostEnded).await;
        }
        Ok(fired)
    }

    /// App lifecycle transition; active-to-background ends the session.
    pub async fn on_app_state_change(&self, next: AppState) -> Result<bool, SidelineError> {
        let Some(guard) = self.guard.lock().await.clone() else {
            return Ok(false);
        };
        let fired = guard.on_app_state_change(next).await?;
        if fired {
            self.finish(EndReason::Backgrounded).await;
        }
        Ok(fired)
    }

    /// Local teardown once the session record is closed.
    async fn finish(&self, reason: EndReason) {
        let room_id = self.room_id.lock().unwrap().take();
        if let Some(task) = self.roster_task.lock().await.take() {
            task.abort();
        }
        self.guard.lock().await.take();
        self.session.disconnect().await;
        if let Some(room_id) = room_id {
            self.emitter
                .emit(SidelineEvent::SessionEnded { room_id, reason });
        }
    }

    /// Follow the record's change feed to keep the viewer roster current.
    /// Snapshots arriving after this device moved on are dropped.
    async fn spawn_roster_watch(&self, room_id: &str) -> Result<(), SidelineError> {
        let mut feed = self.service.store().subscribe(room_id).await?;
        let emitter = self.emitter.clone();
        let current = self.room_id.clone();
        let expected = room_id.to_string();

        let task = tokio::spawn(async move {
            let mut roster = Roster::new();
            while let Ok(snapshot) = feed.recv().await {
                if current.lock().unwrap().as_deref() != Some(expected.as_str()) {
                    break;
                }
                if snapshot.is_ended() {
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
        *self.roster_task.lock().await = Some(task);
        Ok(())
    }
}
