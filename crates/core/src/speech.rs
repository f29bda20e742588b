use crate::error::{CompanionError, Result};
use crate::transcriber::Transcriber;
use std::sync::Arc;
use std::time::Instant;

/// A platform microphone that can be asked for permission and started.
pub trait Recorder: Send + Sync {
    /// Requests microphone access if it has not been granted yet. `false` means refused.
    fn request_permission(&self) -> bool;

    /// Opens an input stream and starts recording.
    fn start(&self) -> anyhow::Result<Box<dyn ActiveRecording>>;
}

/// A recording in progress.
pub trait ActiveRecording: Send {
    /// Closes the stream and returns the captured audio as 16 kHz mono 16-bit WAV bytes.
    fn finish(self: Box<Self>) -> anyhow::Result<Vec<u8>>;
}

/// The owned handle for one start-to-stop recording.
pub struct CaptureSession {
    recording: Box<dyn ActiveRecording>,
    started_at: Instant,
}

impl CaptureSession {
    pub fn new(recording: Box<dyn ActiveRecording>) -> Self {
        Self {
            recording,
            started_at: Instant::now(),
        }
    }

    /// Stops the recording. Runs on the blocking pool since it joins the capture thread.
    pub async fn finish(self) -> Result<Vec<u8>> {
        let elapsed = self.started_at.elapsed();
        let recording = self.recording;
        let wav = tokio::task::spawn_blocking(move || recording.finish())
            .await
            .map_err(|e| CompanionError::Audio(format!("capture task failed: {e}")))?
            .map_err(|e| CompanionError::Audio(format!("{e:#}")))?;
        tracing::debug!(
            "Capture finished after {:.1}s, {} bytes of WAV",
            elapsed.as_secs_f32(),
            wav.len()
        );
        Ok(wav)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
}

/// Idle -> Recording -> Idle, with transcription on the way back to Idle.
pub struct SpeechCapture {
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    active: Option<CaptureSession>,
}

impl SpeechCapture {
    pub fn new(recorder: Arc<dyn Recorder>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            recorder,
            transcriber,
            active: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        if self.active.is_some() {
            CaptureState::Recording
        } else {
            CaptureState::Idle
        }
    }

    pub fn start_capture(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Err(CompanionError::AlreadyRecording);
        }
        if !self.recorder.request_permission() {
            tracing::warn!("Microphone permission denied");
            return Err(CompanionError::PermissionDenied);
        }

        let recording = self
            .recorder
            .start()
            .map_err(|e| CompanionError::Audio(format!("{e:#}")))?;
        self.active = Some(CaptureSession::new(recording));
        tracing::info!("Recording started");
        Ok(())
    }

    /// Stops the current recording and returns its transcript.
    ///
    /// The adapter is Idle again once this returns, whether or not transcription succeeded.
    pub async fn stop_capture(&mut self) -> Result<String> {
        let session = self.active.take().ok_or(CompanionError::NotRecording)?;
        let wav = session.finish().await?;

        let text = self.transcriber.transcribe(wav).await.map_err(|e| {
            tracing::error!("Transcription failed: {:#}", e);
            match CompanionError::find_in(&e) {
                Some(known) => known.clone(),
                None => CompanionError::Endpoint(format!("{e:#}")),
            }
        })?;

        match text.map(|t| t.trim().to_string()) {
            Some(text) if !text.is_empty() => {
                tracing::info!("Recognised: \"{}\"", text);
                Ok(text)
            }
            _ => Err(CompanionError::NoRecognizableSpeech),
        }
    }

    /// Discards the current recording without transcribing it.
    ///
    /// Dropping the session stops the stream. Returns `false` when Idle.
    pub fn cancel_capture(&mut self) -> bool {
        match self.active.take() {
            Some(session) => {
                drop(session);
                tracing::info!("Recording discarded");
                true
            }
            None => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeRecorder;
    use super::*;
    use crate::transcriber::MockTranscriber;
    use std::sync::atomic::Ordering;

    fn transcriber_returning(text: Option<&'static str>) -> Arc<MockTranscriber> {
        let mut mock = MockTranscriber::new();
        mock.expect_transcribe()
            .returning(move |_wav| {
                Box::pin(async move { Ok::<_, anyhow::Error>(text.map(str::to_string)) })
            });
        Arc::new(mock)
    }

    #[tokio::test]
    async fn start_then_stop_returns_transcript() {
        let recorder = Arc::new(FakeRecorder::granted());
        let mut mock = MockTranscriber::new();
        mock.expect_transcribe()
            .withf(|wav| wav.starts_with(b"RIFF"))
            .returning(|_wav| {
                Box::pin(async { Ok::<_, anyhow::Error>(Some("  let's play  ".to_string())) })
            })
            .once();
        let mut capture = SpeechCapture::new(recorder.clone(), Arc::new(mock));

        capture.start_capture().unwrap();
        assert_eq!(capture.state(), CaptureState::Recording);

        let text = capture.stop_capture().await.unwrap();
        assert_eq!(text, "let's play");
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(recorder.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_while_idle_is_rejected() {
        let mut capture = SpeechCapture::new(
            Arc::new(FakeRecorder::granted()),
            Arc::new(MockTranscriber::new()),
        );
        assert_eq!(
            capture.stop_capture().await,
            Err(CompanionError::NotRecording)
        );
    }

    #[test]
    fn second_start_does_not_replace_the_first() {
        let recorder = Arc::new(FakeRecorder::granted());
        let mut capture = SpeechCapture::new(recorder.clone(), Arc::new(MockTranscriber::new()));

        capture.start_capture().unwrap();
        assert_eq!(capture.start_capture(), Err(CompanionError::AlreadyRecording));
        assert_eq!(recorder.started.load(Ordering::SeqCst), 1);
        assert_eq!(capture.state(), CaptureState::Recording);
    }

    #[test]
    fn denied_permission_stays_idle() {
        let recorder = Arc::new(FakeRecorder::denied());
        let mut capture = SpeechCapture::new(recorder.clone(), Arc::new(MockTranscriber::new()));

        assert_eq!(capture.start_capture(), Err(CompanionError::PermissionDenied));
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(recorder.started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn device_failure_is_an_audio_error() {
        let recorder = Arc::new(FakeRecorder {
            fail_start: true,
            ..FakeRecorder::granted()
        });
        let mut capture = SpeechCapture::new(recorder, Arc::new(MockTranscriber::new()));

        assert!(matches!(capture.start_capture(), Err(CompanionError::Audio(_))));
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn empty_transcript_is_no_recognizable_speech() {
        let mut capture =
            SpeechCapture::new(Arc::new(FakeRecorder::granted()), transcriber_returning(None));
        capture.start_capture().unwrap();
        assert_eq!(
            capture.stop_capture().await,
            Err(CompanionError::NoRecognizableSpeech)
        );
        assert_eq!(capture.state(), CaptureState::Idle);

        let mut capture = SpeechCapture::new(
            Arc::new(FakeRecorder::granted()),
            transcriber_returning(Some("   ")),
        );
        capture.start_capture().unwrap();
        assert_eq!(
            capture.stop_capture().await,
            Err(CompanionError::NoRecognizableSpeech)
        );
    }

    #[tokio::test]
    async fn upload_failure_is_an_endpoint_error() {
        let mut mock = MockTranscriber::new();
        mock.expect_transcribe()
            .returning(|_wav| {
                Box::pin(async {
                    Err::<Option<String>, _>(anyhow::anyhow!("503 Service Unavailable"))
                })
            });
        let mut capture = SpeechCapture::new(Arc::new(FakeRecorder::granted()), Arc::new(mock));

        capture.start_capture().unwrap();
        let err = capture.stop_capture().await.unwrap_err();
        assert!(matches!(err, CompanionError::Endpoint(ref msg) if msg.contains("503")));
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn missing_speech_credentials_are_not_wrapped() {
        let mut mock = MockTranscriber::new();
        mock.expect_transcribe()
            .returning(|_wav| {
                Box::pin(async {
                    Err::<Option<String>, _>(
                        anyhow::Error::new(CompanionError::ConfigurationMissing(
                            "AZURE_SPEECH_API_KEY or AZURE_SPEECH_REGION".to_string(),
                        ))
                        .context("transcription failed"),
                    )
                })
            })
            .once();
        let mut capture = SpeechCapture::new(Arc::new(FakeRecorder::granted()), Arc::new(mock));

        capture.start_capture().unwrap();
        assert_eq!(
            capture.stop_capture().await,
            Err(CompanionError::ConfigurationMissing(
                "AZURE_SPEECH_API_KEY or AZURE_SPEECH_REGION".to_string()
            ))
        );
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn cancel_discards_without_uploading() {
        let recorder = Arc::new(FakeRecorder::granted());
        // No expectations: an upload would panic.
        let mut capture = SpeechCapture::new(recorder.clone(), Arc::new(MockTranscriber::new()));

        assert!(!capture.cancel_capture());

        capture.start_capture().unwrap();
        assert!(capture.cancel_capture());
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(recorder.finished.load(Ordering::SeqCst), 0);
        assert_eq!(
            capture.stop_capture().await,
            Err(CompanionError::NotRecording)
        );
    }
}
