use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::controls::StreamControls;
use crate::errors::SidelineError;
use crate::events::{ConnectionState, EventEmitter, SidelineEvent};
use crate::provider::{RoomConnector, RoomEvent, RoomHandle};

/// Manages the lifecycle of one room connection.
///
/// Owns the SDK handle slot and the event loop mapping room callbacks to
/// core events. Controllers layer session bookkeeping on top.
#[derive(Clone)]
pub struct RoomSession {
    handle: Arc<Mutex<Option<Arc<dyn RoomHandle>>>>,
    emitter: EventEmitter,
    connection_state: Arc<Mutex<ConnectionState>>,
    event_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RoomSession {
    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            handle: Arc::new(Mutex::new(None)),
            emitter,
            connection_state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            event_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Create media controls bound to this connection.
    pub fn controls(&self, mic_enabled: bool, camera_enabled: bool) -> StreamControls {
        StreamControls::new(
            self.handle.clone(),
            self.emitter.clone(),
            mic_enabled,
            camera_enabled,
        )
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.connection_state.lock().await.clone()
    }

    /// Join the room through the connector and start the event loop.
    pub async fn connect(
        &self,
        connector: &dyn RoomConnector,
        room_id: &str,
    ) -> Result<(), SidelineError> {
        self.set_connection_state(ConnectionState::Connecting).await;

        let (handle, events) = match connector.connect(room_id).await {
            Ok(pair) => pair,
            Err(e) => {
                self.set_connection_state(ConnectionState::Disconnected)
                    .await;
                return Err(e);
            }
        };

        *self.handle.lock().await = Some(handle);

        let emitter = self.emitter.clone();
        let connection_state = self.connection_state.clone();
        let handle_slot = self.handle.clone();
        let task = tokio::spawn(async move {
            Self::event_loop(events, emitter, connection_state, handle_slot).await;
        });
        *self.event_task.lock().await = Some(task);

        Ok(())
    }

    /// Leave the room and stop the event loop.
    pub async fn disconnect(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.leave().await {
                tracing::warn!("error leaving room: {e}");
            }
        }
        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }
        self.set_connection_state(ConnectionState::Disconnected)
            .await;
    }

    async fn set_connection_state(&self, state: ConnectionState) {
        *self.connection_state.lock().await = state.clone();
        self.emitter
            .emit(SidelineEvent::ConnectionStateChanged(state));
    }

    async fn event_loop(
        mut events: mpsc::UnboundedReceiver<RoomEvent>,
        emitter: EventEmitter,
        connection_state: Arc<Mutex<ConnectionState>>,
        handle_slot: Arc<Mutex<Option<Arc<dyn RoomHandle>>>>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::Joined => {
                    *connection_state.lock().await = ConnectionState::Connected;
                    emitter.emit(SidelineEvent::ConnectionStateChanged(
                        ConnectionState::Connected,
                    ));
                }

                RoomEvent::Left => {
                    tracing::info!("room connection closed");
                    *connection_state.lock().await = ConnectionState::Disconnected;
                    emitter.emit(SidelineEvent::ConnectionStateChanged(
                        ConnectionState::Disconnected,
                    ));
                    *handle_slot.lock().await = None;
                    break;
                }

                RoomEvent::Error(message) => {
                    tracing::warn!("room error: {message}");
                    emitter.emit(SidelineEvent::RoomError(message));
                }
            }
        }

        tracing::info!("room event loop ended");
    }
}
