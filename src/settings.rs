use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::SettingsError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum SearchEngine {
    #[default]
    DuckDuckGo,
    Google,
    Bing,
    Brave,
}

impl SearchEngine {
    pub fn query_url(&self, query: &str) -> String {
        let q = urlencoding::encode(query);
        match self {
            Self::DuckDuckGo => format!("https://duckduckgo.com/?q={}", q),
            Self::Google => format!("https://google.com/search?q={}", q),
            Self::Bing => format!("https://bing.com/search?q={}", q),
            Self::Brave => format!("https://search.brave.com/search?q={}", q),
        }
    }
}

/// Tuning for the awesome bar and its providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestionSettings {
    /// Cap on the merged list across all providers.
    pub max_suggestions: usize,
    /// Cap on search-engine suggestions alone.
    pub search_limit: usize,
    /// Drop suggestions whose text equals the typed input verbatim.
    pub filter_exact_match: bool,
    pub provider_timeout_ms: u64,
    /// Clipboard suggestion only shows while the input is empty.
    pub clipboard_requires_empty_text: bool,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            max_suggestions: 20,
            search_limit: 5,
            filter_exact_match: true,
            provider_timeout_ms: 1500,
            clipboard_requires_empty_text: true,
        }
    }
}

impl SuggestionSettings {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub homepage: String,
    pub search_engine: SearchEngine,
    pub https_only: bool,
    pub suggestions: SuggestionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            homepage: "https://duckduckgo.com".to_string(),
            search_engine: SearchEngine::default(),
            https_only: true,
            suggestions: SuggestionSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("[Settings] Failed to parse settings: {}, returning defaults", e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("[Settings] Failed to read file: {}, returning defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to tmp, then rename, so a crash never leaves a half-written file.
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(tmp_path, path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SearchEngine::DuckDuckGo, "https://duckduckgo.com/?q=rust%20lang")]
    #[case(SearchEngine::Google, "https://google.com/search?q=rust%20lang")]
    #[case(SearchEngine::Bing, "https://bing.com/search?q=rust%20lang")]
    #[case(SearchEngine::Brave, "https://search.brave.com/search?q=rust%20lang")]
    fn test_query_url(#[case] engine: SearchEngine, #[case] expected: &str) {
        assert_eq!(engine.query_url("rust lang"), expected);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.search_engine = SearchEngine::Brave;
        settings.suggestions.max_suggestions = 7;
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path), settings);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(&dir.path().join("nope.json")), Settings::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "https_only": false, "suggestions": { "search_limit": 2 } }"#).unwrap();

        let settings = Settings::load(&path);
        assert!(!settings.https_only);
        assert_eq!(settings.suggestions.search_limit, 2);
        assert_eq!(settings.suggestions.max_suggestions, 20);
        assert!(settings.suggestions.filter_exact_match);
    }
}
