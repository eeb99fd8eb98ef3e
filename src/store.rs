use std::collections::HashMap;
use tracing::debug;

/// Translation annotations keyed by token text.
///
/// Identical tokens share one entry. An entry exists only while its
/// annotation is non-empty after trimming.
#[derive(Debug, Clone, Default)]
pub struct TranslationStore {
    entries: HashMap<String, String>,
}

impl TranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Store the trimmed annotation, or clear the entry when it trims to nothing.
    pub fn set(&mut self, token: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.delete(token);
            return;
        }
        debug!("Stored translation for '{}': {}", token, text);
        self.entries.insert(token.to_string(), text.to_string());
    }

    pub fn delete(&mut self, token: &str) {
        if self.entries.remove(token).is_some() {
            debug!("Removed translation for '{}'", token);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
