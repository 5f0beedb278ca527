use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Locale dictionary loaded for one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Locale {
    pub name: String,
    /// Translation key -> message.
    pub keys: HashMap<String, String>,
    /// Source literal -> message.
    pub messages: HashMap<String, String>,
    /// Messages exposed to client scripts through the head injection.
    pub script_messages: HashMap<String, String>,
    /// Named format patterns for `s:trans-fmt`; `%s` stands for the text.
    pub formats: HashMap<String, String>,
}

impl Locale {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_key(mut self, key: &str, message: &str) -> Self {
        self.keys.insert(key.to_string(), message.to_string());
        self
    }

    pub fn with_message(mut self, literal: &str, message: &str) -> Self {
        self.messages.insert(literal.to_string(), message.to_string());
        self
    }

    pub fn with_format(mut self, name: &str, pattern: &str) -> Self {
        self.formats.insert(name.to_string(), pattern.to_string());
        self
    }

    /// Look up `literal`: a `keys` entry that differs from the literal wins,
    /// then `messages`. `None` means the literal stays as is.
    pub fn lookup(&self, key: Option<&str>, literal: &str) -> Option<&str> {
        if let Some(message) = key.and_then(|k| self.keys.get(k)) {
            if message != literal {
                return Some(message);
            }
        }
        self.messages.get(literal).map(String::as_str)
    }

    pub fn format(&self, name: &str, text: &str) -> String {
        match self.formats.get(name) {
            Some(pattern) => pattern.replace("%s", text),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_precedence() {
        let locale = Locale::new("fr-fr")
            .with_key("greeting", "Bonjour")
            .with_message("Hello", "Salut");
        assert_eq!(locale.lookup(Some("greeting"), "Hello"), Some("Bonjour"));
        assert_eq!(locale.lookup(Some("missing"), "Hello"), Some("Salut"));
        assert_eq!(locale.lookup(None, "Hello"), Some("Salut"));
        assert_eq!(locale.lookup(None, "Bye"), None);
    }

    #[test]
    fn test_key_equal_to_literal_falls_through() {
        let locale = Locale::new("en-us")
            .with_key("greeting", "Hello")
            .with_message("Hello", "Hi");
        assert_eq!(locale.lookup(Some("greeting"), "Hello"), Some("Hi"));
    }

    #[test]
    fn test_format_and_json() {
        let locale = Locale::from_json(r#"{"name":"de-de","formats":{"price":"%s €"}}"#).unwrap();
        assert_eq!(locale.format("price", "12"), "12 €");
        assert_eq!(locale.format("date", "today"), "today");
    }
}
