use anyhow::Context;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;

/// Sample rate of the WAV sent for transcription.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;
pub const SPEECH_CHANNELS: u16 = 1;
pub const SPEECH_BITS_PER_SAMPLE: u16 = 16;
/// Longest recording kept, in seconds of device audio.
pub const MAX_CAPTURE_SECS: usize = 60;

const RESAMPLE_CHUNK_SIZE: usize = 1024;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits a slice of audio samples into a vector of vectors, where each inner vector has a fixed chunk size.
/// If a chunk is smaller than the `chunk_size`, it is padded with zeros.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Creates the heap ring buffer a capture stream writes into.
pub fn capture_buffer(sample_rate: u32, channels: u16) -> HeapRb<f32> {
    HeapRb::new(sample_rate as usize * channels as usize * MAX_CAPTURE_SECS)
}

/// Averages interleaved frames down to a single channel.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resamples a mono signal, trimming the zero padding of the last chunk.
pub fn resample_mono(samples: &[f32], in_rate: u32, out_rate: u32) -> anyhow::Result<Vec<f32>> {
    if in_rate == out_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = create_resampler(in_rate as f64, out_rate as f64, RESAMPLE_CHUNK_SIZE)?;
    let expected = (samples.len() as f64 * out_rate as f64 / in_rate as f64).round() as usize;
    let mut out = Vec::with_capacity(expected + RESAMPLE_CHUNK_SIZE);
    for chunk in split_for_chunks(samples, RESAMPLE_CHUNK_SIZE) {
        let resampled = resampler
            .process(&[chunk.as_slice()], None)
            .context("Failed to resample captured audio")?;
        if let Some(channel) = resampled.first() {
            out.extend_from_slice(channel);
        }
    }
    out.truncate(expected);
    Ok(out)
}

/// Converts a slice of f32 samples to a vector of i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Writes 16-bit mono PCM into an in-memory WAV file.
pub fn encode_wav(pcm16: &[i16], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: SPEECH_CHANNELS,
        sample_rate,
        bits_per_sample: SPEECH_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in pcm16 {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Interleaved device samples captured from one input stream.
#[derive(Debug, Clone, Default)]
pub struct CapturedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl CapturedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }

    /// Downmixes, resamples to 16 kHz and encodes as a 16-bit mono WAV.
    pub fn into_speech_wav(self) -> anyhow::Result<Vec<u8>> {
        let mono = downmix_to_mono(&self.samples, self.channels as usize);
        let resampled = resample_mono(&mono, self.sample_rate, SPEECH_SAMPLE_RATE)?;
        encode_wav(&convert_f32_to_i16(&resampled), SPEECH_SAMPLE_RATE)
    }
}
