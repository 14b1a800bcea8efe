use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::SidelineError;
use crate::lifecycle::SessionService;

/// Host application lifecycle state, as reported by the platform shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

/// What leaving means for this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeavePolicy {
    /// Broadcaster device: backgrounding ends the whole session.
    EndSession,
    /// Viewer device: backgrounding removes this participant only.
    RemoveParticipant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Joined,
    Leaving,
    Left,
}

pub type LeaveCallback = Arc<dyn Fn() + Send + Sync>;

/// Fires the leave side effect exactly once per joined session.
///
/// The hardware back button and an active-to-background app transition both
/// route here; whichever arrives first wins the Joined -> Leaving flip and
/// the other becomes a no-op. If the store mutation fails the state reverts
/// to Joined so the user can retry manually.
pub struct ExitGuard {
    service: SessionService,
    policy: LeavePolicy,
    room_id: Option<String>,
    participant: Option<String>,
    state: Mutex<PresenceState>,
    app_state: Mutex<AppState>,
    on_left: Option<LeaveCallback>,
}

impl ExitGuard {
    pub fn new(
        service: SessionService,
        policy: LeavePolicy,
        room_id: Option<String>,
        participant: Option<String>,
        on_left: Option<LeaveCallback>,
    ) -> Self {
        Self {
            service,
            policy,
            room_id,
            participant,
            state: Mutex::new(PresenceState::Joined),
            app_state: Mutex::new(AppState::Active),
            on_left,
        }
    }

    pub fn state(&self) -> PresenceState {
        *self.state.lock().unwrap()
    }

    /// Hardware back button. Returns whether this call performed the leave.
    pub async fn on_back_pressed(&self) -> Result<bool, SidelineError> {
        self.leave().await
    }

    /// App lifecycle transition. Only active-to-background fires the leave.
    pub async fn on_app_state_change(&self, next: AppState) -> Result<bool, SidelineError> {
        let previous = {
            let mut current = self.app_state.lock().unwrap();
            std::mem::replace(&mut *current, next)
        };
        if previous == AppState::Active && next == AppState::Background {
            self.leave().await
        } else {
            Ok(false)
        }
    }

    /// Apply the leave policy once: store mutation, then the caller-supplied
    /// callback, then settle in `Left`. Returns whether this call did it.
    pub async fn leave(&self) -> Result<bool, SidelineError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != PresenceState::Joined {
                return Ok(false);
            }
            *state = PresenceState::Leaving;
        }

        // Missing identifiers mean there is nothing to tell the store; the
        // callback still runs so navigation can proceed.
        if let Some(room_id) = &self.room_id {
            let result = match self.policy {
                LeavePolicy::EndSession => self.service.end_session(room_id).await,
                LeavePolicy::RemoveParticipant => match &self.participant {
                    Some(participant) => {
                        self.service.remove_participant(room_id, participant).await
                    }
                    None => Ok(false),
                },
            };
            if let Err(e) = result {
                tracing::error!("error during leave handling: {e}");
                *self.state.lock().unwrap() = PresenceState::Joined;
                return Err(e);
            }
        }

        if let Some(callback) = &self.on_left {
            callback();
        }
        *self.state.lock().unwrap() = PresenceState::Left;
        Ok(true)
    }
}
