use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::SidelineError;
use crate::events::{EventEmitter, SidelineEvent};
use crate::provider::RoomHandle;

/// Controls for local media (microphone, camera) in a joined room.
///
/// Holds the local enabled flags and forwards toggles to the SDK handle.
/// Broadcasters start with both enabled; viewers join receive-only.
pub struct StreamControls {
    handle: Arc<Mutex<Option<Arc<dyn RoomHandle>>>>,
    emitter: EventEmitter,
    mic_enabled: Arc<Mutex<bool>>,
    camera_enabled: Arc<Mutex<bool>>,
}

impl StreamControls {
    pub fn new(
        handle: Arc<Mutex<Option<Arc<dyn RoomHandle>>>>,
        emitter: EventEmitter,
        mic_enabled: bool,
        camera_enabled: bool,
    ) -> Self {
        Self {
            handle,
            emitter,
            mic_enabled: Arc::new(Mutex::new(mic_enabled)),
            camera_enabled: Arc::new(Mutex::new(camera_enabled)),
        }
    }

    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SidelineError> {
        let handle = self.handle.lock().await;
        let handle = handle
            .as_ref()
            .ok_or_else(|| SidelineError::Room("not connected".into()))?;
        handle.set_microphone_enabled(enabled).await?;

        *self.mic_enabled.lock().await = enabled;
        tracing::info!("microphone enabled: {enabled}");
        self.emitter.emit(SidelineEvent::MicrophoneToggled(enabled));
        Ok(())
    }

    pub async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SidelineError> {
        let handle = self.handle.lock().await;
        let handle = handle
            .as_ref()
            .ok_or_else(|| SidelineError::Room("not connected".into()))?;
        handle.set_camera_enabled(enabled).await?;

        *self.camera_enabled.lock().await = enabled;
        tracing::info!("camera enabled: {enabled}");
        self.emitter.emit(SidelineEvent::CameraToggled(enabled));
        Ok(())
    }

    /// Flip the microphone; returns the new state.
    pub async fn toggle_microphone(&self) -> Result<bool, SidelineError> {
        let next = !*self.mic_enabled.lock().await;
        self.set_microphone_enabled(next).await?;
        Ok(next)
    }

    /// Flip the camera; returns the new state.
    pub async fn toggle_camera(&self) -> Result<bool, SidelineError> {
        let next = !*self.camera_enabled.lock().await;
        self.set_camera_enabled(next).await?;
        Ok(next)
    }

    pub async fn is_microphone_enabled(&self) -> bool {
        *self.mic_enabled.lock().await
    }

    pub async fn is_camera_enabled(&self) -> bool {
        *self.camera_enabled.lock().await
    }
}
