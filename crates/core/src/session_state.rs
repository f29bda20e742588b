use crate::memory::MemoryStore;
use crate::mood::Mood;

/// Everything the front-end renders for one pet, for one process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub companion_name: String,
    pub mood: Mood,
    pub last_response_text: String,
    pub is_loading: bool,
    pub current_input_text: String,
    pub is_recording: bool,
    pub memory: MemoryStore,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mood(mood: Mood) -> Self {
        Self {
            mood,
            ..Self::default()
        }
    }

    /// True until a name has been accepted; pet UI stays hidden meanwhile.
    pub fn is_naming(&self) -> bool {
        self.companion_name.is_empty()
    }

    pub fn happiness(&self) -> u8 {
        self.mood.happiness.value()
    }

    pub fn love(&self) -> u8 {
        self.mood.love.value()
    }
}
