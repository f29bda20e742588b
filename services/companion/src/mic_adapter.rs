use kiko_core::speech::{ActiveRecording, Recorder};
use kiko_native_utils::capture::{MicRecorder, MicRecording};

/// Connects the speech capture adapter to the local microphone.
///
/// Desktop hosts have no permission prompt, so access counts as granted
/// whenever the chosen input device can be found.
pub struct MicrophoneAdapter {
    recorder: MicRecorder,
}

impl MicrophoneAdapter {
    pub fn new(input_device: Option<String>) -> Self {
        Self {
            recorder: MicRecorder::new(input_device),
        }
    }
}

impl Recorder for MicrophoneAdapter {
    fn request_permission(&self) -> bool {
        self.recorder.has_input_device()
    }

    fn start(&self) -> anyhow::Result<Box<dyn ActiveRecording>> {
        let recording = self.recorder.start()?;
        Ok(Box::new(MicCapture(recording)))
    }
}

struct MicCapture(MicRecording);

impl ActiveRecording for MicCapture {
    fn finish(self: Box<Self>) -> anyhow::Result<Vec<u8>> {
        self.0.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_refused() {
        let adapter = MicrophoneAdapter::new(Some("no such microphone 3f9a".to_string()));
        assert!(!adapter.request_permission());
        assert!(adapter.start().is_err());
    }
}
