use thiserror::Error;

/// Everything that can go wrong while talking to the pet.
///
/// Chat failures become the displayed transcript and only a missing key is
/// returned as this type. Capture and transcription failures are always returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompanionError {
    #[error("microphone permission was denied")]
    PermissionDenied,

    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("endpoint error: {0}")]
    Endpoint(String),

    #[error("no recognizable speech in the recording")]
    NoRecognizableSpeech,

    #[error("no recording in progress")]
    NotRecording,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("audio device error: {0}")]
    Audio(String),

    #[error("a chat request is already in flight")]
    Busy,

    #[error("the companion has not been named yet")]
    Unnamed,

    #[error("message is empty")]
    EmptyMessage,

    #[error("speech input is not enabled for this session")]
    SpeechDisabled,
}

impl CompanionError {
    /// Pulls a `CompanionError` back out of an `anyhow` chain, if one was raised at a trait seam.
    pub fn find_in(err: &anyhow::Error) -> Option<&CompanionError> {
        err.chain().find_map(|cause| cause.downcast_ref::<CompanionError>())
    }
}

pub type Result<T> = std::result::Result<T, CompanionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn finds_error_behind_context() {
        let err: anyhow::Error = Err::<(), _>(CompanionError::ConfigurationMissing(
            "GROQ_API_KEY".to_string(),
        ))
        .context("chat request failed")
        .unwrap_err();

        assert_eq!(
            CompanionError::find_in(&err),
            Some(&CompanionError::ConfigurationMissing(
                "GROQ_API_KEY".to_string()
            ))
        );
    }

    #[test]
    fn plain_errors_are_not_classified() {
        let err = anyhow::anyhow!("connection reset");
        assert!(CompanionError::find_in(&err).is_none());
    }
}
