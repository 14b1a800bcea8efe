use crate::errors::SidelineError;

/// Outcome of the platform's camera/microphone permission prompts.
///
/// The prompts themselves are host-shell territory; the core only ever sees
/// the result and refuses to start a flow without both grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPermissions {
    pub camera: bool,
    pub microphone: bool,
}

impl MediaPermissions {
    pub fn granted() -> Self {
        Self {
            camera: true,
            microphone: true,
        }
    }

    pub fn ensure(&self) -> Result<(), SidelineError> {
        if self.camera && self.microphone {
            Ok(())
        } else {
            Err(SidelineError::PermissionDenied(
                "camera and microphone permissions are required".to_string(),
            ))
        }
    }
}
