use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::errors::SidelineError;

/// Callbacks delivered by a live room connection, in arrival order.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Joined,
    Left,
    Error(String),
}

/// Creates remote rooms. `create_room` returns the provider-assigned
/// opaque room id, which becomes the canonical session key.
#[async_trait]
pub trait RoomProvider: Send + Sync {
    async fn create_room(&self) -> Result<String, SidelineError>;
}

/// Joins a room and hands back a control handle plus the event stream.
///
/// Shaped after SDK connect calls that return `(connection, events)`; the
/// receiver ends when the connection is gone.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(
        &self,
        room_id: &str,
    ) -> Result<(Arc<dyn RoomHandle>, mpsc::UnboundedReceiver<RoomEvent>), SidelineError>;
}

/// Control surface of a joined room. Media itself never crosses this
/// boundary; the SDK owns capture, transport and rendering.
#[async_trait]
pub trait RoomHandle: Send + Sync {
    async fn leave(&self) -> Result<(), SidelineError>;
    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SidelineError>;
    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SidelineError>;
}

/// Validate a provider-assigned room id.
/// Format: three dash-separated groups of 4 lowercase alphanumerics.
pub fn validate_room_id(input: &str) -> Result<String, SidelineError> {
    let candidate = input.trim();
    let re = regex::Regex::new(r"^[a-z0-9]{4}-[a-z0-9]{4}-[a-z0-9]{4}$").unwrap();
    if re.is_match(candidate) {
        Ok(candidate.to_string())
    } else {
        Err(SidelineError::InvalidRoomId(format!(
            "unexpected room id format: '{candidate}'"
        )))
    }
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    #[serde(rename = "roomId")]
    room_id: String,
}

/// Room creation against the provider's REST API.
pub struct HttpRoomProvider {
    client: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl HttpRoomProvider {
    pub fn new(config: &ClientConfig) -> Result<Self, SidelineError> {
        config.ensure_auth()?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }
}

#[async_trait]
impl RoomProvider for HttpRoomProvider {
    async fn create_room(&self) -> Result<String, SidelineError> {
        let url = format!("{}/v2/rooms", self.base_url);
        tracing::info!("creating room via {url}");

        let resp = self
            .client
            .post(&url)
            .header("authorization", &self.auth_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| SidelineError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SidelineError::Room(format!(
                "room API returned status {}",
                resp.status()
            )));
        }

        let data: CreateRoomResponse = resp
            .json()
            .await
            .map_err(|e| SidelineError::Room(format!("invalid room API response: {e}")))?;

        validate_room_id(&data.room_id)
    }
}

/// Offline provider minting local room ids. Useful for tests and for
/// running the flows without provider credentials.
#[derive(Default)]
pub struct LocalRoomProvider;

impl LocalRoomProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RoomProvider for LocalRoomProvider {
    async fn create_room(&self) -> Result<String, SidelineError> {
        let hex = Uuid::new_v4().simple().to_string();
        validate_room_id(&format!("{}-{}-{}", &hex[..4], &hex[4..8], &hex[8..12]))
    }
}
