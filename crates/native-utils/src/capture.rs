use crate::audio::{self, CapturedAudio};
use crate::device;
use anyhow::Context;
use cpal::traits::{DeviceTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

/// Opens microphone recordings on a named or default input device.
#[derive(Debug, Clone, Default)]
pub struct MicRecorder {
    device_name: Option<String>,
}

impl MicRecorder {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    pub fn has_input_device(&self) -> bool {
        match &self.device_name {
            Some(name) => device::get_or_default_input(Some(name)).is_ok(),
            None => device::has_input_device(),
        }
    }

    /// Starts recording on a dedicated thread, since cpal streams cannot move between threads.
    ///
    /// Returns once the stream is playing, or with the error that kept it from opening.
    pub fn start(&self) -> anyhow::Result<MicRecording> {
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let device_name = self.device_name.clone();

        let worker = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_capture(device_name, ready_tx, stop_rx))
            .context("Failed to spawn capture thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(MicRecording {
                stop_tx: Some(stop_tx),
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(anyhow::anyhow!("Capture thread exited before the stream started"))
            }
        }
    }
}

/// A microphone stream that is currently recording.
pub struct MicRecording {
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<anyhow::Result<CapturedAudio>>>,
}

impl MicRecording {
    /// Stops the stream and returns the raw device samples.
    pub fn stop(mut self) -> anyhow::Result<CapturedAudio> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        let worker = self
            .worker
            .take()
            .context("Recording was already stopped")?;
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("Capture thread panicked"))?
    }

    /// Stops the stream and encodes what was heard as 16 kHz mono 16-bit WAV.
    pub fn finish(self) -> anyhow::Result<Vec<u8>> {
        let captured = self.stop()?;
        tracing::debug!(
            "Captured {:.1}s at {}hz, {}ch",
            captured.duration_secs(),
            captured.sample_rate,
            captured.channels
        );
        captured.into_speech_wav()
    }
}

impl Drop for MicRecording {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

fn run_capture(
    device_name: Option<String>,
    ready_tx: mpsc::Sender<anyhow::Result<()>>,
    stop_rx: mpsc::Receiver<()>,
) -> anyhow::Result<CapturedAudio> {
    let opened = open_stream(device_name.as_deref());
    let (stream, mut consumer, sample_rate, channels) = match opened {
        Ok(opened) => {
            let _ = ready_tx.send(Ok(()));
            opened
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return Ok(CapturedAudio::default());
        }
    };

    // Either an explicit stop or the handle being dropped ends the recording.
    let _ = stop_rx.recv();
    drop(stream);

    let samples: Vec<f32> = consumer.pop_iter().collect();
    Ok(CapturedAudio {
        samples,
        sample_rate,
        channels,
    })
}

type OpenedStream = (cpal::Stream, ringbuf::HeapCons<f32>, u32, u16);

fn open_stream(device_name: Option<&str>) -> anyhow::Result<OpenedStream> {
    let input = device::get_or_default_input(device_name)
        .context("Failed to get audio input device")?;
    tracing::info!(
        "Using input device: {:?}",
        input.name().unwrap_or_else(|_| "<unnamed>".to_string())
    );

    let input_config = input
        .default_input_config()
        .context("Failed to get default input config")?;
    let stream_config: cpal::StreamConfig = input_config.config();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    tracing::debug!("Input stream config: {:?}", &stream_config);

    let (mut producer, consumer) = audio::capture_buffer(sample_rate, channels).split();

    let mut overflowed = false;
    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let pushed = producer.push_slice(data);
        if pushed < data.len() && !overflowed {
            overflowed = true;
            tracing::warn!(
                "Recording reached {}s, dropping further audio",
                audio::MAX_CAPTURE_SECS
            );
        }
    };

    let stream = input
        .build_input_stream(
            &stream_config,
            input_data_fn,
            move |err| tracing::error!("An error occurred on input stream: {}", err),
            None,
        )
        .context("Failed to build input stream")?;
    stream.play().context("Failed to start input stream")?;

    Ok((stream, consumer, sample_rate, channels))
}
