//! Shared doubles for controller and controls tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::SidelineError;
use crate::events::{SidelineEvent, SidelineEventListener};
use crate::provider::{RoomConnector, RoomEvent, RoomHandle};

/// Room double recording control calls and echoing lifecycle events.
pub(crate) struct FakeRoom {
    mic_calls: Mutex<Vec<bool>>,
    camera_calls: Mutex<Vec<bool>>,
    left: AtomicBool,
    events: Mutex<Option<mpsc::UnboundedSender<RoomEvent>>>,
}

impl FakeRoom {
    pub(crate) fn new() -> Self {
        Self {
            mic_calls: Mutex::new(Vec::new()),
            camera_calls: Mutex::new(Vec::new()),
            left: AtomicBool::new(false),
            events: Mutex::new(None),
        }
    }

    fn with_events(sender: mpsc::UnboundedSender<RoomEvent>) -> Self {
        let room = Self::new();
        *room.events.lock().unwrap() = Some(sender);
        room
    }

    pub(crate) fn mic_calls(&self) -> Vec<bool> {
        self.mic_calls.lock().unwrap().clone()
    }

    pub(crate) fn camera_calls(&self) -> Vec<bool> {
        self.camera_calls.lock().unwrap().clone()
    }

    pub(crate) fn has_left(&self) -> bool {
        self.left.load(Ordering::SeqCst)
    }

    pub(crate) fn push_error(&self, message: &str) {
        if let Some(sender) = self.events.lock().unwrap().as_ref() {
            let _ = sender.send(RoomEvent::Error(message.to_string()));
        }
    }
}

#[async_trait]
impl RoomHandle for FakeRoom {
    async fn leave(&self) -> Result<(), SidelineError> {
        self.left.store(true, Ordering::SeqCst);
        if let Some(sender) = self.events.lock().unwrap().as_ref() {
            let _ = sender.send(RoomEvent::Left);
        }
        Ok(())
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SidelineError> {
        self.mic_calls.lock().unwrap().push(enabled);
        Ok(())
    }

    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SidelineError> {
        self.camera_calls.lock().unwrap().push(enabled);
        Ok(())
    }
}

/// Connector double that joins immediately and keeps every handle around
/// for assertions.
#[derive(Default)]
pub(crate) struct FakeConnector {
    rooms: Mutex<Vec<(String, Arc<FakeRoom>)>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connected_room_ids(&self) -> Vec<String> {
        self.rooms.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    pub(crate) fn last_room(&self) -> Option<Arc<FakeRoom>> {
        self.rooms.lock().unwrap().last().map(|(_, room)| room.clone())
    }
}

#[async_trait]
impl RoomConnector for FakeConnector {
    async fn connect(
        &self,
        room_id: &str,
    ) -> Result<(Arc<dyn RoomHandle>, mpsc::UnboundedReceiver<RoomEvent>), SidelineError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let room = Arc::new(FakeRoom::with_events(tx.clone()));
        let _ = tx.send(RoomEvent::Joined);
        self.rooms
            .lock()
            .unwrap()
            .push((room_id.to_string(), room.clone()));
        Ok((room, rx))
    }
}

/// Listener capturing every emitted event for later inspection.
#[derive(Default)]
pub(crate) struct CapturingListener {
    events: Mutex<Vec<SidelineEvent>>,
}

impl CapturingListener {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn events(&self) -> Vec<SidelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn any(&self, predicate: impl Fn(&SidelineEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(|e| predicate(e))
    }
}

impl SidelineEventListener for CapturingListener {
    fn on_event(&self, event: SidelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Poll `cond` until it holds or half a second has gone by.
pub(crate) async fn eventually<F>(mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
