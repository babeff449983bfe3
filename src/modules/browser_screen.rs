// The browsing screen: owns one handle per view-bound feature and binds them
// all to the screen's lifecycle once its views exist.

use std::sync::{Arc, Mutex};

use crate::error::{BindingError, NavigationError, ScreenError};
use crate::history::HistoryStorage;
use crate::modules::engine::EngineView;
use crate::modules::feature::{FeatureHandle, Lifecycle, ViewBoundFeature, ViewRef};
use crate::modules::reader::{ReaderControls, ReaderViewFeature};
use crate::modules::screens::{Navigator, ReplaceRequest, ScreenDescriptor, BROWSER_TAG, TABS_TRAY_TAG};
use crate::modules::store::BrowserStore;
use crate::modules::suggestions::providers::{
    Clipboard, ClipboardSuggestionProvider, HistorySuggestionProvider, SearchClient,
    SearchSuggestionProvider, SessionSuggestionProvider, SyncedTabsStorage, SyncedTabsSuggestionProvider,
};
use crate::modules::suggestions::{AggregatorConfig, AwesomeBarFeature, SuggestionAggregator, SuggestionDisplay};
use crate::modules::telemetry::{MeasurementSink, StartupTimeFeedback};
use crate::modules::thumbnails::{ThumbnailFeature, ThumbnailStorage};
use crate::modules::toolbar::{ShowTabs, TabsToolbarFeature, ToolbarView};
use crate::modules::use_cases::UseCases;
use crate::settings::Settings;

/// Application-wide collaborators the screen's features are built from.
pub struct Components {
    pub store: Arc<BrowserStore>,
    pub settings: Arc<Settings>,
    pub use_cases: Arc<UseCases>,
    pub history: Arc<dyn HistoryStorage>,
    pub search_client: Arc<dyn SearchClient>,
    pub clipboard: Arc<dyn Clipboard>,
    pub synced_tabs: Arc<dyn SyncedTabsStorage>,
    pub thumbnails: Arc<ThumbnailStorage>,
    pub telemetry: Arc<dyn MeasurementSink>,
}

impl Components {
    pub fn new(
        store: Arc<BrowserStore>,
        settings: Arc<Settings>,
        history: Arc<dyn HistoryStorage>,
        search_client: Arc<dyn SearchClient>,
        clipboard: Arc<dyn Clipboard>,
        synced_tabs: Arc<dyn SyncedTabsStorage>,
        telemetry: Arc<dyn MeasurementSink>,
    ) -> Self {
        Self {
            use_cases: Arc::new(UseCases::new(store.clone(), settings.clone())),
            store,
            settings,
            history,
            search_client,
            clipboard,
            synced_tabs,
            thumbnails: Arc::new(ThumbnailStorage::default()),
            telemetry,
        }
    }

    /// Suggestion sources in display order.
    fn aggregator(&self) -> SuggestionAggregator {
        let suggestions = &self.settings.suggestions;
        let mut aggregator = SuggestionAggregator::new(AggregatorConfig::from(suggestions));
        aggregator
            .add_provider(Arc::new(SearchSuggestionProvider::new(
                self.search_client.clone(),
                self.settings.search_engine.clone(),
                suggestions.search_limit,
            )))
            .add_provider(Arc::new(SessionSuggestionProvider::new(self.store.clone())))
            .add_provider(Arc::new(HistorySuggestionProvider::new(
                self.history.clone(),
                HistorySuggestionProvider::DEFAULT_LIMIT,
            )))
            .add_provider(Arc::new(ClipboardSuggestionProvider::new(
                self.clipboard.clone(),
                suggestions.clipboard_requires_empty_text,
            )))
            .add_provider(Arc::new(SyncedTabsSuggestionProvider::new(self.synced_tabs.clone())));
        aggregator
    }
}

/// Views the features attach to. `root` must be in the hierarchy for the
/// screen to compose at all.
pub struct ScreenViews {
    pub root: ViewRef,
    pub toolbar: ViewRef,
    pub engine: ViewRef,
    pub awesome_bar: ViewRef,
}

/// UI surfaces the features drive.
pub struct ScreenSurfaces {
    pub toolbar: Arc<dyn ToolbarView>,
    pub suggestions: Arc<dyn SuggestionDisplay>,
    pub engine_view: Arc<dyn EngineView>,
    pub reader_controls: Arc<dyn ReaderControls>,
}

/// Outcome of composing the screen's features.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ComposeReport {
    pub bound: Vec<&'static str>,
    pub failed: Vec<(&'static str, BindingError)>,
}

impl ComposeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<F: ViewBoundFeature>(&mut self, result: Result<(), BindingError>) {
        match result {
            Ok(()) => self.bound.push(F::NAME),
            Err(e) => {
                log::error!("[BrowserScreen] Failed to bind {}: {}", F::NAME, e);
                self.failed.push((F::NAME, e));
            }
        }
    }
}

pub struct BrowserScreen {
    session_id: Option<String>,
    thumbnails: FeatureHandle<ThumbnailFeature>,
    reader: FeatureHandle<ReaderViewFeature>,
    toolbar: FeatureHandle<TabsToolbarFeature>,
    awesome_bar: FeatureHandle<AwesomeBarFeature>,
    components: Option<Arc<Components>>,
    owner: Option<Arc<Lifecycle>>,
}

impl BrowserScreen {
    pub const TAG: &'static str = BROWSER_TAG;

    /// A screen for `session_id`, or for whichever session is selected.
    pub fn create(session_id: Option<String>) -> Self {
        Self {
            session_id,
            thumbnails: FeatureHandle::new(),
            reader: FeatureHandle::new(),
            toolbar: FeatureHandle::new(),
            awesome_bar: FeatureHandle::new(),
            components: None,
            owner: None,
        }
    }

    /// The navigator request that shows a browsing screen.
    pub fn request(session_id: Option<String>) -> ReplaceRequest {
        ReplaceRequest::new(ScreenDescriptor::Browser { session_id }, Self::TAG)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn thumbnails(&self) -> &FeatureHandle<ThumbnailFeature> {
        &self.thumbnails
    }

    pub fn reader(&self) -> &FeatureHandle<ReaderViewFeature> {
        &self.reader
    }

    pub fn toolbar(&self) -> &FeatureHandle<TabsToolbarFeature> {
        &self.toolbar
    }

    pub fn awesome_bar(&self) -> &FeatureHandle<AwesomeBarFeature> {
        &self.awesome_bar
    }

    /// Binds every feature to `owner`. A root view outside the hierarchy
    /// fails the whole screen; any other binding failure is logged, reported
    /// and leaves the remaining features bound.
    pub fn on_view_created(
        &mut self,
        views: &ScreenViews,
        surfaces: &ScreenSurfaces,
        components: Arc<Components>,
        owner: &Arc<Lifecycle>,
        navigator: Arc<Mutex<Navigator>>,
    ) -> Result<ComposeReport, ScreenError> {
        if !views.root.is_in_hierarchy() {
            log::error!("[BrowserScreen] Root view '{}' missing, not composing", views.root.id());
            return Err(ScreenError::MissingView(views.root.id().to_string()));
        }

        let c = &components;
        let mut report = ComposeReport::default();

        report.record::<ThumbnailFeature>(self.thumbnails.set(
            ThumbnailFeature::new(surfaces.engine_view.clone(), c.store.clone(), c.thumbnails.clone()),
            owner,
            &views.engine,
        ));

        report.record::<ReaderViewFeature>(self.reader.set(
            ReaderViewFeature::new(
                c.store.clone(),
                surfaces.engine_view.clone(),
                surfaces.reader_controls.clone(),
                c.use_cases.reader.clone(),
            ),
            owner,
            &views.engine,
        ));

        report.record::<TabsToolbarFeature>(self.toolbar.set(
            TabsToolbarFeature::new(
                surfaces.toolbar.clone(),
                self.session_id.clone(),
                c.store.clone(),
                show_tabs_trigger(navigator),
            ),
            owner,
            &views.toolbar,
        ));

        report.record::<AwesomeBarFeature>(self.awesome_bar.set(
            AwesomeBarFeature::new(
                Arc::new(c.aggregator()),
                surfaces.suggestions.clone(),
                c.use_cases.clone(),
                self.session_id.clone(),
            ),
            owner,
            &views.awesome_bar,
        ));

        log::info!(
            "[BrowserScreen] Composed for {}: {} bound, {} failed",
            self.session_id.as_deref().unwrap_or("selected session"),
            report.bound.len(),
            report.failed.len()
        );
        self.components = Some(components);
        self.owner = Some(owner.clone());
        Ok(report)
    }

    fn is_live(&self) -> bool {
        self.owner.as_ref().is_some_and(|o| !o.is_destroyed())
    }

    /// Reader view gets first refusal, then the session's own history.
    /// Returns false when the host should pop the screen instead.
    pub fn on_back_pressed(&self) -> bool {
        if !self.is_live() {
            return false;
        }
        if self.reader.on_back_pressed() {
            return true;
        }
        let Some(components) = &self.components else {
            return false;
        };
        let state = components.store.state();
        match state.find_custom_or_selected(self.session_id.as_deref()) {
            Some(session) if session.can_go_back() => components.use_cases.session.go_back(&session.id),
            _ => false,
        }
    }

    /// Shows the tab overview. This ends the screen, so the trigger runs
    /// outside the toolbar handle.
    pub fn show_tabs(&self) -> bool {
        let Some(action) = self.toolbar.with_feature(|t| t.show_tabs_action()) else {
            return false;
        };
        action();
        true
    }

    pub fn submit_startup_feedback(&self, feedback: &StartupTimeFeedback) -> bool {
        match &self.components {
            Some(components) => feedback.submit(components.telemetry.as_ref()),
            None => false,
        }
    }
}

fn show_tabs_trigger(navigator: Arc<Mutex<Navigator>>) -> ShowTabs {
    Arc::new(move || {
        let mut navigator = navigator.lock().unwrap_or_else(|e| e.into_inner());
        let request = ReplaceRequest::new(ScreenDescriptor::TabsTray, TABS_TRAY_TAG);
        if let Err(e) = navigator.replace(request) {
            log::error!("[BrowserScreen] Could not show tabs: {}", e);
        }
    })
}

/// Shows a browsing screen in `navigator` and returns its lifecycle.
pub fn open_browser(
    navigator: &Mutex<Navigator>,
    session_id: Option<String>,
) -> Result<Arc<Lifecycle>, NavigationError> {
    navigator
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .replace(BrowserScreen::request(session_id))
}
