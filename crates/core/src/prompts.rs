use std::collections::HashMap;

pub const DEFAULT_PERSONA: &str =
    "You are {name}, a playful pet responding dynamically. Be cute, caring, and informative.";
pub const DEFAULT_ACTION: &str = "The user chose to {action}. How does {name} react?";
pub const DEFAULT_GREETING: &str =
    "Hi! I'm {name}! Thanks for giving me a name. What should we do first?";
pub const DEFAULT_FALLBACK: &str = "No response from {name}";
pub const DEFAULT_ERROR: &str = "Error fetching {name}'s response: {error}";
pub const DEFAULT_THINKING: &str = "{name} is thinking...";

/// The templates used to talk to the model and to fill the transcript.
///
/// Placeholders: `{name}`, `{action}` and `{error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBook {
    pub persona: String,
    pub action: String,
    pub greeting: String,
    pub fallback: String,
    pub error: String,
    pub thinking: String,
}

impl Default for PromptBook {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            action: DEFAULT_ACTION.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            fallback: DEFAULT_FALLBACK.to_string(),
            error: DEFAULT_ERROR.to_string(),
            thinking: DEFAULT_THINKING.to_string(),
        }
    }
}

impl PromptBook {
    /// Builds a book from the defaults, replacing any template named in `overrides`.
    ///
    /// Keys are template names (`persona`, `action`, ...). Unknown keys are logged and skipped.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut book = Self::default();
        for (key, template) in overrides {
            let template = template.trim().to_string();
            if template.is_empty() {
                tracing::warn!("Prompt override '{}' is empty, keeping the default", key);
                continue;
            }
            match key.as_str() {
                "persona" => book.persona = template,
                "action" => book.action = template,
                "greeting" => book.greeting = template,
                "fallback" => book.fallback = template,
                "error" => book.error = template,
                "thinking" => book.thinking = template,
                other => tracing::warn!("Ignoring unknown prompt override '{}'", other),
            }
        }
        book
    }

    pub fn persona(&self, name: &str) -> String {
        self.persona.replace("{name}", name)
    }

    pub fn action(&self, name: &str, action: &str) -> String {
        self.action
            .replace("{action}", action)
            .replace("{name}", name)
    }

    pub fn greeting(&self, name: &str) -> String {
        self.greeting.replace("{name}", name)
    }

    pub fn fallback(&self, name: &str) -> String {
        self.fallback.replace("{name}", name)
    }

    pub fn error(&self, name: &str, error: &str) -> String {
        self.error
            .replace("{name}", name)
            .replace("{error}", error)
    }

    pub fn thinking(&self, name: &str) -> String {
        self.thinking.replace("{name}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_with_name() {
        let book = PromptBook::default();
        assert_eq!(
            book.persona("Kiko"),
            "You are Kiko, a playful pet responding dynamically. Be cute, caring, and informative."
        );
        assert_eq!(
            book.action("Kiko", "feed"),
            "The user chose to feed. How does Kiko react?"
        );
        assert_eq!(book.fallback("Kiko"), "No response from Kiko");
        assert_eq!(
            book.error("Kiko", "timed out"),
            "Error fetching Kiko's response: timed out"
        );
        assert_eq!(book.thinking("Mochi"), "Mochi is thinking...");
    }

    #[test]
    fn overrides_replace_only_known_templates() {
        let mut overrides = HashMap::new();
        overrides.insert("persona".to_string(), "You are {name}, a sleepy cat.\n".to_string());
        overrides.insert("greeting".to_string(), "   ".to_string());
        overrides.insert("unknown".to_string(), "whatever".to_string());

        let book = PromptBook::with_overrides(&overrides);
        assert_eq!(book.persona("Tama"), "You are Tama, a sleepy cat.");
        assert_eq!(book.greeting, DEFAULT_GREETING);
        assert_eq!(book.action, DEFAULT_ACTION);
    }
}
