use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static MEMORY_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)my (.+) is (.+)").expect("memory phrase regex is valid"));

/// Facts the user has told the pet, keyed by the lowercased phrase after "my".
///
/// Entries are only ever inserted or overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: &str) {
        let key = key.to_lowercase();
        if let Some(previous) = self.entries.insert(key.clone(), value.to_string()) {
            tracing::debug!("Memory '{}' overwritten (was '{}')", key, previous);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key, for display.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// Stores a "my X is Y" phrase from `text`, returning the key it was stored under.
    pub fn remember_from(&mut self, text: &str) -> Option<String> {
        let (key, value) = extract_fact(text)?;
        self.put(&key, &value);
        tracing::info!("Remembered '{}' = '{}'", key, value);
        Some(key)
    }
}

/// Matches "my (key) is (value)" anywhere in `text`, case-insensitively.
pub fn extract_fact(text: &str) -> Option<(String, String)> {
    let caps = MEMORY_PHRASE.captures(text)?;
    Some((caps[1].to_lowercase(), caps[2].to_string()))
}
