use thiserror::Error;

#[derive(Debug, Error)]
pub enum SidelineError {
    #[error("store error: {0}")]
    Store(String),
    #[error("room error: {0}")]
    Room(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid room id: {0}")]
    InvalidRoomId(String),
}
