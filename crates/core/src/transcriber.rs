use crate::error::CompanionError;
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const DEFAULT_SPEECH_LANGUAGE: &str = "en-US";
const WAV_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";

#[async_trait]
#[cfg_attr(test, automock)]
pub trait Transcriber: Send + Sync {
    /// Uploads a WAV recording and returns the recognised text, if any.
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Option<String>>;
}

/// Body returned by the Azure short-audio recognition endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecognitionResult {
    #[serde(default)]
    pub recognition_status: Option<String>,
    #[serde(default)]
    pub display_text: Option<String>,
}

impl RecognitionResult {
    pub fn into_text(self) -> Option<String> {
        self.display_text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

/// Azure Speech short-audio REST client.
pub struct AzureSpeechClient {
    client: Client,
    api_key: Option<SecretString>,
    region: Option<String>,
    language: String,
}

impl AzureSpeechClient {
    /// Missing credentials are accepted here and reported on the first upload.
    pub fn new(api_key: Option<SecretString>, region: Option<String>, language: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            region,
            language,
        }
    }

    pub fn endpoint(region: &str, language: &str) -> String {
        format!(
            "https://{region}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1?language={language}"
        )
    }
}

#[async_trait]
impl Transcriber for AzureSpeechClient {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Option<String>> {
        let (Some(api_key), Some(region)) = (self.api_key.as_ref(), self.region.as_deref()) else {
            return Err(CompanionError::ConfigurationMissing(
                "AZURE_SPEECH_API_KEY or AZURE_SPEECH_REGION".to_string(),
            )
            .into());
        };

        let endpoint = Self::endpoint(region, &self.language);
        tracing::debug!("Uploading {} bytes of audio to {}", wav.len(), endpoint);

        let result = self
            .client
            .post(&endpoint)
            .header("Ocp-Apim-Subscription-Key", api_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, WAV_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, "application/json")
            .body(wav)
            .send()
            .await
            .context("Audio upload could not be sent")?
            .error_for_status()
            .context("Speech endpoint returned an error status")?
            .json::<RecognitionResult>()
            .await
            .context("Speech endpoint returned an unexpected body")?;

        tracing::debug!("Recognition status: {:?}", result.recognition_status);
        Ok(result.into_text())
    }
}
