use std::sync::Arc;

/// Events emitted by the core to host-shell listeners.
#[derive(Debug, Clone)]
pub enum SidelineEvent {
    ConnectionStateChanged(ConnectionState),
    SessionStarted { room_id: String },
    SessionEnded { room_id: String, reason: EndReason },
    ParticipantJoined(String), // participant token
    ParticipantLeft(String),   // participant token
    RosterChanged(Vec<String>),
    MicrophoneToggled(bool),
    CameraToggled(bool),
    RoomError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a session stopped being live on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The coach pressed "end live".
    HostEnded,
    /// The broadcaster app went to the background.
    Backgrounded,
    /// A viewer observed the session record flip to ended.
    EndedByHost,
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait SidelineEventListener: Send + Sync {
    fn on_event(&self, event: SidelineEvent);
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn SidelineEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(std::sync::RwLock::new(Vec::new())),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SidelineEventListener>) {
        self.listeners.write().unwrap().push(listener);
    }

    pub fn emit(&self, event: SidelineEvent) {
        let listeners = self.listeners.read().unwrap();
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
