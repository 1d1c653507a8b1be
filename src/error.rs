use thiserror::Error;

/// Failure reported by one of the external collaborators. The engine logs these
/// and keeps the round running; they never reach the player.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("speech engine failed: {0}")]
    Speech(String),
    #[error("cue '{cue}' failed to play: {reason}")]
    Cue { cue: String, reason: String },
    #[error("progress report failed: {0}")]
    Progress(String),
}

impl CollaboratorError {
    pub fn progress(err: anyhow::Error) -> Self {
        CollaboratorError::Progress(format!("{err:#}"))
    }
}
