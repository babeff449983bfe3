// Awesome bar: fans a query out to every suggestion provider and merges the
// answers into one list for the input surface.

pub mod providers;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::task::JoinHandle;

use crate::error::ProviderError;
use crate::modules::feature::{AttachToken, ViewBoundFeature, ViewRef};
use crate::modules::use_cases::UseCases;
use crate::settings::SuggestionSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionAction {
    LoadUrl(String),
    /// Load an already-built search URL.
    Search(String),
    SelectTab(String),
    AddTab(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub provider_id: &'static str,
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Full text compared against the input for exact-match filtering.
    pub text: String,
    pub action: SuggestionAction,
    pub score: i64,
}

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// Suggestions for `text`, in this provider's own ranking order.
    async fn on_input_changed(&self, text: &str) -> Result<Vec<Suggestion>, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub max_suggestions: usize,
    pub filter_exact_match: bool,
    pub provider_timeout: Duration,
}

impl From<&SuggestionSettings> for AggregatorConfig {
    fn from(settings: &SuggestionSettings) -> Self {
        Self {
            max_suggestions: settings.max_suggestions,
            filter_exact_match: settings.filter_exact_match,
            provider_timeout: settings.provider_timeout(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::from(&SuggestionSettings::default())
    }
}

pub struct SuggestionAggregator {
    providers: Vec<Arc<dyn SuggestionProvider>>,
    config: AggregatorConfig,
}

impl SuggestionAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            providers: Vec::new(),
            config,
        }
    }

    /// Registers `provider`. Registration order is display order.
    pub fn add_provider(&mut self, provider: Arc<dyn SuggestionProvider>) -> &mut Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Queries every provider concurrently and merges what comes back.
    ///
    /// A provider that errors or exceeds the timeout is left out of this
    /// merge; the rest are kept in registration order, each in its own order.
    pub async fn query(&self, text: &str) -> Vec<Suggestion> {
        let timeout = self.config.provider_timeout;
        let queries = self.providers.iter().map(|provider| async move {
            match tokio::time::timeout(timeout, provider.on_input_changed(text)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: provider.id(),
                    after: timeout,
                }),
            }
        });

        let mut merged = Vec::new();
        for result in join_all(queries).await {
            match result {
                Ok(suggestions) => merged.extend(suggestions),
                Err(e) => log::warn!("[AwesomeBar] Skipping provider: {}", e),
            }
        }

        if self.config.filter_exact_match {
            merged.retain(|s| s.text != text);
        }
        merged.truncate(self.config.max_suggestions);
        merged
    }
}

/// The list under the address bar.
pub trait SuggestionDisplay: Send + Sync {
    fn display(&self, suggestions: &[Suggestion]);
    fn clear(&self);
}

/// Connects the aggregator to the input surface.
///
/// Every input change starts a new query generation; only the newest
/// generation's result reaches the display.
pub struct AwesomeBarFeature {
    aggregator: Arc<SuggestionAggregator>,
    display: Arc<dyn SuggestionDisplay>,
    use_cases: Arc<UseCases>,
    session_id: Option<String>,
    generation: Arc<AtomicU64>,
    token: AttachToken,
}

impl AwesomeBarFeature {
    pub fn new(
        aggregator: Arc<SuggestionAggregator>,
        display: Arc<dyn SuggestionDisplay>,
        use_cases: Arc<UseCases>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            aggregator,
            display,
            use_cases,
            session_id,
            generation: Arc::new(AtomicU64::new(0)),
            token: AttachToken::new(),
        }
    }

    /// Starts a query for `text` without waiting for it. The task resolves to
    /// whether its result was displayed.
    pub fn on_input_changed(&self, text: &str) -> JoinHandle<bool> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = self.generation.clone();
        let aggregator = self.aggregator.clone();
        let display = self.display.clone();
        let token = self.token.clone();
        let text = text.to_string();

        tokio::spawn(async move {
            let suggestions = aggregator.query(&text).await;
            if !token.is_attached() || latest.load(Ordering::SeqCst) != generation {
                log::debug!("[AwesomeBar] Dropping superseded results for '{}'", text);
                return false;
            }
            display.display(&suggestions);
            true
        })
    }

    /// Input lost focus or was cleared: supersede anything in flight.
    pub fn on_input_cancelled(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.token.is_attached() {
            self.display.clear();
        }
    }

    pub fn on_suggestion_clicked(&self, suggestion: &Suggestion) -> bool {
        log::info!("[AwesomeBar] {} suggestion picked: {}", suggestion.provider_id, suggestion.title);
        let handled = match &suggestion.action {
            SuggestionAction::LoadUrl(url) | SuggestionAction::Search(url) => self
                .use_cases
                .session
                .load_url(self.session_id.as_deref(), url)
                .is_some(),
            SuggestionAction::SelectTab(id) => self.use_cases.tabs.select_tab(id),
            SuggestionAction::AddTab(url) => {
                self.use_cases.tabs.add_tab(url, true);
                true
            }
        };
        self.on_input_cancelled();
        handled
    }
}

impl ViewBoundFeature for AwesomeBarFeature {
    const NAME: &'static str = "awesome-bar";

    fn attach(&mut self, _view: &ViewRef) {
        self.token.attach();
    }

    fn detach(&mut self) {
        self.token.revoke();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
