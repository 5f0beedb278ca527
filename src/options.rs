use serde::{Deserialize, Serialize};

/// Per-render option set.
///
/// Deserializes from the camelCase JSON blob the page server passes along,
/// e.g. `{"editor": true, "disableCache": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Authoring mode: keep hidden branches and loop templates, flagged.
    #[serde(alias = "editor")]
    pub authoring: bool,
    pub preview: bool,
    /// Request mode: output goes straight to a browser.
    pub request: bool,
    pub debug: bool,
    pub disable_cache: bool,
    /// Rendering a component fragment; no body data injection.
    pub component: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl RenderOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn authoring() -> Self {
        Self {
            authoring: true,
            ..Self::default()
        }
    }

    pub fn request() -> Self {
        Self {
            request: true,
            ..Self::default()
        }
    }

    /// Output meant for direct client consumption; the Finalizer runs.
    pub fn is_client_output(&self) -> bool {
        !self.authoring && (self.request || self.preview)
    }

    /// Debug implies a disabled cache.
    pub fn cache_disabled(&self) -> bool {
        self.disable_cache || self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_accepts_editor_alias() {
        let options = RenderOptions::from_json(r#"{"editor": true, "disableCache": true}"#).unwrap();
        assert!(options.authoring);
        assert!(options.disable_cache);
        assert!(!options.request);
        assert!(!options.is_client_output());
    }

    #[test]
    fn test_debug_disables_cache() {
        let options = RenderOptions::from_json(r#"{"debug": true, "preview": true}"#).unwrap();
        assert!(options.cache_disabled());
        assert!(options.is_client_output());
    }
}
