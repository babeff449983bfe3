// In-memory stand-ins for the host UI and its collaborators. Used by the demo
// binary and by tests; each one records what it was asked to do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::modules::engine::{Bitmap, EngineView};
use crate::modules::reader::ReaderControls;
use crate::modules::suggestions::providers::{Clipboard, SearchClient, SyncedDevice, SyncedTabsStorage};
use crate::modules::suggestions::{Suggestion, SuggestionDisplay};
use crate::modules::toolbar::{ToolbarDisplay, ToolbarView};

/// Engine view that renders a blank page.
#[derive(Default)]
pub struct HeadlessEngineView {
    captures: AtomicUsize,
    reflow: AtomicBool,
}

impl HeadlessEngineView {
    pub const THUMBNAIL_SIZE: u32 = 4;

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn reflow_enabled(&self) -> bool {
        self.reflow.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineView for HeadlessEngineView {
    async fn capture_thumbnail(&self) -> Option<Bitmap> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let side = Self::THUMBNAIL_SIZE;
        Some(Bitmap {
            width: side,
            height: side,
            bytes: vec![0xff; (side * side * 4) as usize],
        })
    }

    fn set_reader_reflow(&self, enabled: bool) {
        log::debug!("[Headless] Reader reflow {}", if enabled { "on" } else { "off" });
        self.reflow.store(enabled, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingToolbar {
    renders: Mutex<Vec<ToolbarDisplay>>,
}

impl RecordingToolbar {
    pub fn last(&self) -> Option<ToolbarDisplay> {
        self.renders.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl ToolbarView for RecordingToolbar {
    fn render(&self, display: &ToolbarDisplay) {
        self.renders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(display.clone());
    }
}

#[derive(Default)]
pub struct RecordingReaderControls {
    action: AtomicBool,
    appearance_button: AtomicBool,
    controls: AtomicBool,
    mutations: AtomicUsize,
}

impl RecordingReaderControls {
    pub fn action_visible(&self) -> bool {
        self.action.load(Ordering::SeqCst)
    }

    pub fn appearance_button_visible(&self) -> bool {
        self.appearance_button.load(Ordering::SeqCst)
    }

    /// Number of UI mutations received so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn set(&self, flag: &AtomicBool, value: bool) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        flag.store(value, Ordering::SeqCst);
    }
}

impl ReaderControls for RecordingReaderControls {
    fn set_action_visible(&self, visible: bool) {
        self.set(&self.action, visible);
    }

    fn set_appearance_button_visible(&self, visible: bool) {
        self.set(&self.appearance_button, visible);
    }

    fn show_controls(&self) {
        self.set(&self.controls, true);
    }

    fn hide_controls(&self) {
        self.set(&self.controls, false);
    }

    fn controls_visible(&self) -> bool {
        self.controls.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingSuggestionDisplay {
    shown: Mutex<Vec<Vec<Suggestion>>>,
    clears: AtomicUsize,
}

impl RecordingSuggestionDisplay {
    /// Every list displayed, oldest first.
    pub fn shown(&self) -> Vec<Vec<Suggestion>> {
        self.shown.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl SuggestionDisplay for RecordingSuggestionDisplay {
    fn display(&self, suggestions: &[Suggestion]) {
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(suggestions.to_vec());
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new(text: Option<&str>) -> Self {
        Self {
            text: Mutex::new(text.map(str::to_string)),
        }
    }

    pub fn copy(&self, text: &str) {
        *self.text.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.to_string());
    }
}

impl Clipboard for MemoryClipboard {
    fn text(&self) -> Option<String> {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Search client answering from a fixed table of query prefixes.
pub struct StaticSearchClient {
    answers: HashMap<String, Vec<String>>,
    failure: Option<String>,
}

impl StaticSearchClient {
    pub fn new<'a>(answers: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>) -> Self {
        Self {
            answers: answers
                .into_iter()
                .map(|(query, chips)| {
                    (
                        query.to_lowercase(),
                        chips.into_iter().map(str::to_string).collect(),
                    )
                })
                .collect(),
            failure: None,
        }
    }

    /// A client whose every request fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            answers: HashMap::new(),
            failure: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl SearchClient for StaticSearchClient {
    async fn suggestions(&self, query: &str) -> Result<Vec<String>, String> {
        if let Some(message) = &self.failure {
            return Err(message.clone());
        }
        let query = query.trim().to_lowercase();
        // Longest known prefix of the query
        let answer = self
            .answers
            .iter()
            .filter(|(known, _)| query.starts_with(known.as_str()))
            .max_by_key(|(known, _)| known.len())
            .map(|(_, chips)| chips.clone());
        Ok(answer.unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemorySyncedTabs {
    devices: Vec<SyncedDevice>,
}

impl MemorySyncedTabs {
    pub fn new(devices: Vec<SyncedDevice>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl SyncedTabsStorage for MemorySyncedTabs {
    async fn synced_tabs(&self) -> Result<Vec<SyncedDevice>, String> {
        Ok(self.devices.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_search_client_uses_longest_prefix() {
        let client = StaticSearchClient::new([("r", vec!["reddit"]), ("ru", vec!["rust", "ruby"])]);
        assert_eq!(client.suggestions("Rus").await.unwrap(), vec!["rust", "ruby"]);
        assert_eq!(client.suggestions("re").await.unwrap(), vec!["reddit"]);
        assert!(client.suggestions("x").await.unwrap().is_empty());
    }

    #[test]
    fn test_clipboard_copy_replaces_text() {
        let clipboard = MemoryClipboard::new(None);
        assert!(clipboard.text().is_none());
        clipboard.copy("https://a.org");
        assert_eq!(clipboard.text().as_deref(), Some("https://a.org"));
    }
}
