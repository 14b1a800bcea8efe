use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback title when the coach starts a stream without one.
pub const DEFAULT_TITLE: &str = "Coaching Session";
/// Fallback coach display name.
pub const DEFAULT_COACH_NAME: &str = "Coach";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
}

/// Caller-supplied metadata for a new session. Missing fields fall back
/// to the stock title and coach name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub coach_name: Option<String>,
}

impl SessionMeta {
    pub fn title_or_default(&self) -> String {
        self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    pub fn coach_name_or_default(&self) -> String {
        self.coach_name
            .clone()
            .unwrap_or_else(|| DEFAULT_COACH_NAME.to_string())
    }
}

/// Bookkeeping document mirroring a room's lifecycle and participant list.
///
/// The room id assigned by the provider is the canonical key: every read
/// and write path addresses the record by `room_id`, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub room_id: String,
    pub title: String,
    pub coach_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub is_live: bool,
    pub status: SessionStatus,
    pub participants: Vec<String>,
}

impl SessionRecord {
    /// A fresh active record with an empty participant list.
    pub fn new(room_id: &str, meta: &SessionMeta, started_at: DateTime<Utc>) -> Self {
        Self {
            room_id: room_id.to_string(),
            title: meta.title_or_default(),
            coach_name: meta.coach_name_or_default(),
            started_at,
            ended_at: None,
            is_live: true,
            status: SessionStatus::Active,
            participants: Vec::new(),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    /// Close the record. Keeps the first end timestamp if called twice.
    pub fn end(&mut self, ended_at: DateTime<Utc>) {
        if self.ended_at.is_none() {
            self.ended_at = Some(ended_at);
        }
        self.is_live = false;
        self.status = SessionStatus::Ended;
    }

    pub fn has_participant(&self, participant: &str) -> bool {
        self.participants.iter().any(|p| p == participant)
    }
}
