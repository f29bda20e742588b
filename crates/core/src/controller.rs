use crate::chat::{ChatEndpoint, ChatMessage};
use crate::error::{CompanionError, Result};
use crate::mood;
use crate::prompts::PromptBook;
use crate::session_state::SessionState;
use crate::speech::SpeechCapture;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A user gesture that reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Feed,
    Play,
    Sleep,
    Clean,
    Love,
    Send,
    Speak,
}

impl Action {
    /// The canned care actions shown as buttons.
    pub const CARE: [Action; 5] = [
        Action::Feed,
        Action::Play,
        Action::Sleep,
        Action::Clean,
        Action::Love,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Feed => "feed",
            Action::Play => "play",
            Action::Sleep => "sleep",
            Action::Clean => "clean",
            Action::Love => "love",
            Action::Send => "send",
            Action::Speak => "speak",
        }
    }

    /// `Send` and `Speak` have no canned prompt and need the user's own words.
    pub fn requires_text(self) -> bool {
        matches!(self, Action::Send | Action::Speak)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feed" => Ok(Action::Feed),
            "play" => Ok(Action::Play),
            "sleep" => Ok(Action::Sleep),
            "clean" => Ok(Action::Clean),
            "love" => Ok(Action::Love),
            "send" => Ok(Action::Send),
            "speak" => Ok(Action::Speak),
            other => Err(anyhow::anyhow!("unknown action: {other}")),
        }
    }
}

/// Drives one pet session: naming, actions, mood and voice input.
///
/// State sits behind an async mutex that is released while the chat call is in
/// flight, so front-ends can render `is_loading` in the meantime.
pub struct CompanionController {
    state: Mutex<SessionState>,
    chat: Arc<dyn ChatEndpoint>,
    prompts: PromptBook,
    speech: Option<Mutex<SpeechCapture>>,
}

impl CompanionController {
    pub fn new(chat: Arc<dyn ChatEndpoint>, prompts: PromptBook) -> Self {
        Self {
            state: Mutex::new(SessionState::new()),
            chat,
            prompts,
            speech: None,
        }
    }

    /// Enables voice input for this session.
    pub fn with_speech(mut self, speech: SpeechCapture) -> Self {
        self.speech = Some(Mutex::new(speech));
        self
    }

    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = Mutex::new(state);
        self
    }

    pub fn speech_enabled(&self) -> bool {
        self.speech.is_some()
    }

    pub fn prompts(&self) -> &PromptBook {
        &self.prompts
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Completes the one-time naming step. Blank names and renames are ignored.
    pub async fn set_name(&self, text: &str) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_naming() {
            tracing::debug!("Ignoring rename, companion is already '{}'", state.companion_name);
            return false;
        }
        let name = text.trim();
        if name.is_empty() {
            return false;
        }

        state.companion_name = name.to_string();
        state.last_response_text = self.prompts.greeting(name);
        tracing::info!("Companion named '{}'", name);
        true
    }

    pub async fn set_input(&self, text: &str) {
        self.state.lock().await.current_input_text = text.to_string();
    }

    /// Sends the current input as free text, clearing it before the call goes out.
    pub async fn send(&self) -> Result<()> {
        let (input, messages, name) = {
            let mut state = self.state.lock().await;
            if state.is_recording {
                return Err(CompanionError::Busy);
            }
            Self::check_ready(&state)?;
            let input = std::mem::take(&mut state.current_input_text);
            let text = Some(input.as_str()).filter(|t| !t.trim().is_empty());
            let (messages, name) = self.begin_action(&mut state, Action::Send, text)?;
            (input, messages, name)
        };
        self.complete_action(Action::Send, Some(&input), messages, name)
            .await
    }

    /// Runs one action against the chat endpoint.
    ///
    /// Endpoint failures end up in `last_response_text` and return `Ok`. Errors are
    /// returned only when no call was made (`Unnamed`, `Busy`, `EmptyMessage`) or a
    /// credential is missing (`ConfigurationMissing`). While a recording is open the
    /// microphone owns the next turn, so typed actions are `Busy` too.
    pub async fn perform_action(&self, action: Action, explicit_text: Option<&str>) -> Result<()> {
        let text = explicit_text.filter(|t| !t.trim().is_empty());

        let (messages, name) = {
            let mut state = self.state.lock().await;
            if state.is_recording {
                return Err(CompanionError::Busy);
            }
            self.begin_action(&mut state, action, text)?
        };
        self.complete_action(action, text, messages, name).await
    }

    /// Guards, remembers and marks the session loading. Called with the state lock held.
    fn begin_action(
        &self,
        state: &mut SessionState,
        action: Action,
        text: Option<&str>,
    ) -> Result<(Vec<ChatMessage>, String)> {
        Self::check_ready(state)?;
        if action.requires_text() && text.is_none() {
            return Err(CompanionError::EmptyMessage);
        }

        if let Some(text) = text {
            state.memory.remember_from(text);
        }
        state.is_loading = true;

        let name = state.companion_name.clone();
        let user_turn = match text {
            Some(text) => text.to_string(),
            None => self.prompts.action(&name, action.as_str()),
        };
        let messages = vec![
            ChatMessage::system(self.prompts.persona(&name)),
            ChatMessage::user(user_turn),
        ];
        Ok((messages, name))
    }

    async fn complete_action(
        &self,
        action: Action,
        text: Option<&str>,
        messages: Vec<ChatMessage>,
        name: String,
    ) -> Result<()> {
        tracing::info!("Action '{}' sent to {}", action, name);
        let outcome = self.chat.complete(messages).await;

        let mut state = self.state.lock().await;
        state.is_loading = false;
        match outcome {
            Ok(content) => {
                state.last_response_text = content.unwrap_or_else(|| {
                    tracing::warn!("Chat endpoint returned no content");
                    self.prompts.fallback(&name)
                });
                state.mood.apply(&mood::deltas_for(action, text));
                tracing::debug!(
                    "Mood after '{}': happiness {}, love {}",
                    action,
                    state.happiness(),
                    state.love()
                );
                Ok(())
            }
            Err(e) => {
                if let Some(CompanionError::ConfigurationMissing(what)) = CompanionError::find_in(&e)
                {
                    tracing::error!("Cannot reach the chat endpoint: {} is not configured", what);
                    return Err(CompanionError::ConfigurationMissing(what.clone()));
                }
                tracing::warn!("Chat request failed: {:#}", e);
                state.last_response_text = self.prompts.error(&name, &format!("{e:#}"));
                Ok(())
            }
        }
    }

    pub async fn start_listening(&self) -> Result<()> {
        let speech = self.speech.as_ref().ok_or(CompanionError::SpeechDisabled)?;
        Self::check_ready(&*self.state.lock().await)?;

        speech.lock().await.start_capture()?;
        self.state.lock().await.is_recording = true;
        Ok(())
    }

    /// Stops listening, then talks to the pet with whatever was said.
    ///
    /// Capture and transcription errors are returned and leave the transcript alone.
    /// `is_recording` stays set until the spoken turn has been handed to the chat
    /// endpoint, so no typed action can take its place in between.
    pub async fn stop_listening(&self) -> Result<String> {
        let speech = self.speech.as_ref().ok_or(CompanionError::SpeechDisabled)?;
        Self::check_ready(&*self.state.lock().await)?;

        let transcript = speech.lock().await.stop_capture().await;

        let (transcript, messages, name) = {
            let mut state = self.state.lock().await;
            state.is_recording = false;
            let transcript = transcript?;
            let (messages, name) = self.begin_action(&mut state, Action::Speak, Some(&transcript))?;
            (transcript, messages, name)
        };

        self.complete_action(Action::Speak, Some(&transcript), messages, name)
            .await?;
        Ok(transcript)
    }

    /// Drops an open recording without uploading it. Returns whether one was open.
    pub async fn cancel_listening(&self) -> bool {
        let Some(speech) = self.speech.as_ref() else {
            return false;
        };
        let cancelled = speech.lock().await.cancel_capture();
        self.state.lock().await.is_recording = false;
        cancelled
    }

    fn check_ready(state: &SessionState) -> Result<()> {
        if state.is_naming() {
            return Err(CompanionError::Unnamed);
        }
        if state.is_loading {
            return Err(CompanionError::Busy);
        }
        Ok(())
    }
}
