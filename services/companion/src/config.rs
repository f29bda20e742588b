//! Application Configuration Module
//!
//! Loads the companion's settings from environment variables (and a `.env`
//! file when present) into a single struct handed to `main`.

use kiko_core::chat::DEFAULT_CHAT_MODEL;
use kiko_core::transcriber::DEFAULT_SPEECH_LANGUAGE;
use secrecy::SecretString;
use std::env;
use std::fmt;
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// The version reported by the app, assembled from `APP_*_VERSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Default for AppVersion {
    fn default() -> Self {
        Self {
            major: 1,
            minor: 0,
            patch: 0,
        }
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub groq_api_key: Option<SecretString>,
    pub azure_speech_api_key: Option<SecretString>,
    pub azure_speech_region: Option<String>,
    /// Overrides the chat endpoint's base URL.
    pub api_url: Option<String>,
    pub chat_model: String,
    pub speech_language: String,
    pub app_version: AppVersion,
    pub prompts_dir: PathBuf,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GROQ_API_KEY`: Key for the chat endpoint. Needed before the first action.
    // *   `AZURE_SPEECH_API_KEY` / `AZURE_SPEECH_REGION`: Needed before the first transcription.
    // *   `API_URL`: (Optional) Base URL of an OpenAI-compatible chat endpoint. Defaults to Groq.
    // *   `CHAT_MODEL`: (Optional) Defaults to "llama3-8b-8192".
    // *   `SPEECH_LANGUAGE`: (Optional) Defaults to "en-US".
    // *   `APP_MAJOR_VERSION`, `APP_MINOR_VERSION`, `APP_PATCH_VERSION`: (Optional) Default to 1.0.0.
    // *   `PROMPTS_DIR`: (Optional) Directory of prompt overrides. Defaults to "prompts".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let log_level_str = get("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidValue {
                var: "RUST_LOG".to_string(),
                value: log_level_str.clone(),
            })?;

        let defaults = AppVersion::default();
        let version_part = |var: &str, default: u32| -> Result<u32, ConfigError> {
            match get(var) {
                None => Ok(default),
                Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                    var: var.to_string(),
                    value,
                }),
            }
        };
        let app_version = AppVersion {
            major: version_part("APP_MAJOR_VERSION", defaults.major)?,
            minor: version_part("APP_MINOR_VERSION", defaults.minor)?,
            patch: version_part("APP_PATCH_VERSION", defaults.patch)?,
        };

        Ok(Self {
            groq_api_key: get("GROQ_API_KEY").map(SecretString::from),
            azure_speech_api_key: get("AZURE_SPEECH_API_KEY").map(SecretString::from),
            azure_speech_region: get("AZURE_SPEECH_REGION"),
            api_url: get("API_URL"),
            chat_model: get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            speech_language: get("SPEECH_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_SPEECH_LANGUAGE.to_string()),
            app_version,
            prompts_dir: PathBuf::from(
                get("PROMPTS_DIR").unwrap_or_else(|| DEFAULT_PROMPTS_DIR.to_string()),
            ),
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert!(config.groq_api_key.is_none());
        assert!(config.azure_speech_api_key.is_none());
        assert!(config.azure_speech_region.is_none());
        assert!(config.api_url.is_none());
        assert_eq!(config.chat_model, "llama3-8b-8192");
        assert_eq!(config.speech_language, "en-US");
        assert_eq!(config.app_version.to_string(), "1.0.0");
        assert_eq!(config.prompts_dir, PathBuf::from("prompts"));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("AZURE_SPEECH_API_KEY", "azure_test"),
            ("AZURE_SPEECH_REGION", "westeurope"),
            ("API_URL", "http://localhost:8080/v1"),
            ("CHAT_MODEL", "llama-3.1-8b-instant"),
            ("SPEECH_LANGUAGE", "en-GB"),
            ("APP_MAJOR_VERSION", "2"),
            ("APP_MINOR_VERSION", "4"),
            ("APP_PATCH_VERSION", "1"),
            ("PROMPTS_DIR", "/etc/kiko/prompts"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(
            config.groq_api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("gsk_test".to_string())
        );
        assert_eq!(
            config
                .azure_speech_api_key
                .as_ref()
                .map(|k| k.expose_secret().to_string()),
            Some("azure_test".to_string())
        );
        assert_eq!(config.azure_speech_region.as_deref(), Some("westeurope"));
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(config.chat_model, "llama-3.1-8b-instant");
        assert_eq!(config.speech_language, "en-GB");
        assert_eq!(config.app_version.to_string(), "2.4.1");
        assert_eq!(config.prompts_dir, PathBuf::from("/etc/kiko/prompts"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let config =
            Config::from_lookup(lookup_from(&[("GROQ_API_KEY", "   "), ("API_URL", "")])).unwrap();
        assert!(config.groq_api_key.is_none());
        assert!(config.api_url.is_none());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("RUST_LOG", "chatty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "RUST_LOG".to_string(),
                value: "chatty".to_string()
            }
        );
    }

    #[test]
    fn bad_version_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("APP_MINOR_VERSION", "two")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "APP_MINOR_VERSION"));
    }
}
