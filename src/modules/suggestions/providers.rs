// The suggestion sources registered on the browsing screen's awesome bar.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Suggestion, SuggestionAction, SuggestionProvider};
use crate::error::ProviderError;
use crate::history::HistoryStorage;
use crate::modules::navigation::looks_like_url;
use crate::modules::store::BrowserStore;
use crate::settings::SearchEngine;

/// Remote search-suggestion endpoint.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn suggestions(&self, query: &str) -> Result<Vec<String>, String>;
}

pub trait Clipboard: Send + Sync {
    fn text(&self) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedTab {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedDevice {
    pub name: String,
    pub tabs: Vec<SyncedTab>,
}

/// Tabs open on the user's other devices.
#[async_trait]
pub trait SyncedTabsStorage: Send + Sync {
    async fn synced_tabs(&self) -> Result<Vec<SyncedDevice>, String>;
}

fn matches(text: &str, fields: &[&str]) -> bool {
    let needle = text.trim().to_lowercase();
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

pub struct SearchSuggestionProvider {
    client: Arc<dyn SearchClient>,
    engine: SearchEngine,
    limit: usize,
}

impl SearchSuggestionProvider {
    pub const ID: &'static str = "search";

    pub fn new(client: Arc<dyn SearchClient>, engine: SearchEngine, limit: usize) -> Self {
        Self { client, engine, limit }
    }
}

#[async_trait]
impl SuggestionProvider for SearchSuggestionProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn on_input_changed(&self, text: &str) -> Result<Vec<Suggestion>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let chips = self.client.suggestions(text).await.map_err(|message| ProviderError::Backend {
            provider: Self::ID,
            message,
        })?;

        Ok(chips
            .into_iter()
            .take(self.limit)
            .enumerate()
            .map(|(rank, chip)| Suggestion {
                provider_id: Self::ID,
                id: format!("search:{}", chip),
                title: chip.clone(),
                description: None,
                action: SuggestionAction::Search(self.engine.query_url(&chip)),
                text: chip,
                score: (self.limit - rank) as i64,
            })
            .collect())
    }
}

/// Open tabs other than the one being shown.
pub struct SessionSuggestionProvider {
    store: Arc<BrowserStore>,
}

impl SessionSuggestionProvider {
    pub const ID: &'static str = "sessions";

    pub fn new(store: Arc<BrowserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SuggestionProvider for SessionSuggestionProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn on_input_changed(&self, text: &str) -> Result<Vec<Suggestion>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let state = self.store.state();
        let selected = state.selected_session_id.as_deref();

        Ok(state
            .sessions
            .iter()
            .filter(|s| Some(s.id.as_str()) != selected && !s.private)
            .filter(|s| matches(text, &[&s.url, &s.title]))
            .map(|s| Suggestion {
                provider_id: Self::ID,
                id: format!("session:{}", s.id),
                title: if s.title.is_empty() { s.url.clone() } else { s.title.clone() },
                description: Some(s.url.clone()),
                text: s.url.clone(),
                action: SuggestionAction::SelectTab(s.id.clone()),
                score: 0,
            })
            .collect())
    }
}

pub struct HistorySuggestionProvider {
    storage: Arc<dyn HistoryStorage>,
    limit: usize,
}

impl HistorySuggestionProvider {
    pub const ID: &'static str = "history";
    pub const DEFAULT_LIMIT: usize = 20;

    pub fn new(storage: Arc<dyn HistoryStorage>, limit: usize) -> Self {
        Self { storage, limit }
    }
}

#[async_trait]
impl SuggestionProvider for HistorySuggestionProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn on_input_changed(&self, text: &str) -> Result<Vec<Suggestion>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let matches = self.storage.search(text, self.limit).await.map_err(|message| {
            ProviderError::Backend {
                provider: Self::ID,
                message,
            }
        })?;

        Ok(matches
            .into_iter()
            .map(|m| Suggestion {
                provider_id: Self::ID,
                id: format!("history:{}", m.url),
                title: if m.title.is_empty() { m.url.clone() } else { m.title },
                description: Some(m.url.clone()),
                action: SuggestionAction::LoadUrl(m.url.clone()),
                text: m.url,
                score: m.score as i64,
            })
            .collect())
    }
}

/// Offers a copied link.
pub struct ClipboardSuggestionProvider {
    clipboard: Arc<dyn Clipboard>,
    requires_empty_text: bool,
}

impl ClipboardSuggestionProvider {
    pub const ID: &'static str = "clipboard";

    pub fn new(clipboard: Arc<dyn Clipboard>, requires_empty_text: bool) -> Self {
        Self {
            clipboard,
            requires_empty_text,
        }
    }
}

#[async_trait]
impl SuggestionProvider for ClipboardSuggestionProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn on_input_changed(&self, text: &str) -> Result<Vec<Suggestion>, ProviderError> {
        if self.requires_empty_text && !text.is_empty() {
            return Ok(Vec::new());
        }
        let Some(copied) = self.clipboard.text() else {
            return Ok(Vec::new());
        };
        let copied = copied.trim().to_string();
        if !looks_like_url(&copied) {
            return Ok(Vec::new());
        }

        Ok(vec![Suggestion {
            provider_id: Self::ID,
            id: "clipboard".to_string(),
            title: "Link you copied".to_string(),
            description: Some(copied.clone()),
            action: SuggestionAction::LoadUrl(copied.clone()),
            text: copied,
            score: 0,
        }])
    }
}

pub struct SyncedTabsSuggestionProvider {
    storage: Arc<dyn SyncedTabsStorage>,
}

impl SyncedTabsSuggestionProvider {
    pub const ID: &'static str = "synced-tabs";

    pub fn new(storage: Arc<dyn SyncedTabsStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl SuggestionProvider for SyncedTabsSuggestionProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn on_input_changed(&self, text: &str) -> Result<Vec<Suggestion>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let devices = self.storage.synced_tabs().await.map_err(|message| ProviderError::Backend {
            provider: Self::ID,
            message,
        })?;

        Ok(devices
            .iter()
            .flat_map(|device| device.tabs.iter().map(move |tab| (device, tab)))
            .filter(|(_, tab)| matches(text, &[&tab.url, &tab.title]))
            .map(|(device, tab)| Suggestion {
                provider_id: Self::ID,
                id: format!("synced:{}:{}", device.name, tab.url),
                title: tab.title.clone(),
                description: Some(device.name.clone()),
                text: tab.url.clone(),
                action: SuggestionAction::AddTab(tab.url.clone()),
                score: 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{MemoryClipboard, MemorySyncedTabs, StaticSearchClient};
    use crate::history::HistoryStore;
    use crate::state::{BrowserState, SessionState};
    use rstest::rstest;

    #[tokio::test]
    async fn test_search_provider_limits_and_builds_search_urls() {
        let client = Arc::new(StaticSearchClient::new([("ru", vec!["rust", "ruby", "rugby", "run"])]));
        let provider = SearchSuggestionProvider::new(client, SearchEngine::DuckDuckGo, 2);

        let suggestions = provider.on_input_changed("ru").await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].text, "rust");
        assert_eq!(
            suggestions[0].action,
            SuggestionAction::Search("https://duckduckgo.com/?q=rust".into())
        );
        assert!(suggestions[0].score > suggestions[1].score);
        assert!(provider.on_input_changed("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_backend_failure_is_reported() {
        let client = Arc::new(StaticSearchClient::failing("503"));
        let provider = SearchSuggestionProvider::new(client, SearchEngine::Google, 5);
        let err = provider.on_input_changed("ru").await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Backend {
                provider: "search",
                message: "503".into()
            }
        );
    }

    #[tokio::test]
    async fn test_session_provider_skips_selected_and_private() {
        let mut private = SessionState::new("p", "https://rust-private.org/");
        private.private = true;
        let store = Arc::new(BrowserStore::new(BrowserState {
            sessions: vec![
                SessionState::new("a", "https://rust-lang.org/"),
                SessionState::new("b", "https://docs.rs/").with_title("Rust docs"),
                SessionState::new("c", "https://example.com/"),
                private,
            ],
            selected_session_id: Some("a".into()),
        }));

        let suggestions = SessionSuggestionProvider::new(store).on_input_changed("RUST").await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "Rust docs");
        assert_eq!(suggestions[0].action, SuggestionAction::SelectTab("b".into()));
    }

    #[tokio::test]
    async fn test_history_provider_keeps_storage_ranking() {
        let history = Arc::new(HistoryStore::new());
        history.record_visit("https://example.com/foo", Some("Example"), false);
        history.record_visit("https://foo.org", None, true);

        let provider = HistorySuggestionProvider::new(history, HistorySuggestionProvider::DEFAULT_LIMIT);
        let suggestions = provider.on_input_changed("foo").await.unwrap();
        let urls: Vec<_> = suggestions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(urls, vec!["https://foo.org/", "https://example.com/foo"]);
        // Untitled entries fall back to the url
        assert_eq!(suggestions[0].title, "https://foo.org/");
    }

    #[rstest]
    #[case(Some("https://copied.org/page"), "", true, true)]
    #[case(Some("https://copied.org/page"), "co", true, false)]
    #[case(Some("https://copied.org/page"), "co", false, true)]
    #[case(Some("not a link at all"), "", true, false)]
    #[case(None, "", true, false)]
    #[tokio::test]
    async fn test_clipboard_provider(
        #[case] copied: Option<&str>,
        #[case] text: &str,
        #[case] requires_empty_text: bool,
        #[case] offered: bool,
    ) {
        let clipboard = Arc::new(MemoryClipboard::new(copied));
        let provider = ClipboardSuggestionProvider::new(clipboard, requires_empty_text);
        let suggestions = provider.on_input_changed(text).await.unwrap();
        assert_eq!(!suggestions.is_empty(), offered);
        if offered {
            assert_eq!(suggestions[0].action, SuggestionAction::LoadUrl("https://copied.org/page".into()));
        }
    }

    #[tokio::test]
    async fn test_synced_tabs_provider_describes_device() {
        let storage = Arc::new(MemorySyncedTabs::new(vec![SyncedDevice {
            name: "Laptop".into(),
            tabs: vec![
                SyncedTab { title: "Crates".into(), url: "https://crates.io/".into() },
                SyncedTab { title: "News".into(), url: "https://news.org/".into() },
            ],
        }]));

        let suggestions = SyncedTabsSuggestionProvider::new(storage).on_input_changed("crate").await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].description.as_deref(), Some("Laptop"));
        assert_eq!(suggestions[0].action, SuggestionAction::AddTab("https://crates.io/".into()));
    }
}
