// Headless run of the browsing screen: composes it against recording
// surfaces, types into the awesome bar, opens the tab overview and comes back.
//
// Usage: browser-screen [settings.json]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use browser_screen_lib::headless::{
    HeadlessEngineView, MemoryClipboard, MemorySyncedTabs, RecordingReaderControls,
    RecordingSuggestionDisplay, RecordingToolbar, StaticSearchClient,
};
use browser_screen_lib::history::HistoryStore;
use browser_screen_lib::modules::browser_screen::{
    open_browser, BrowserScreen, Components, ScreenSurfaces, ScreenViews,
};
use browser_screen_lib::modules::feature::View;
use browser_screen_lib::modules::screens::{Navigator, ScreenDescriptor};
use browser_screen_lib::modules::store::BrowserStore;
use browser_screen_lib::modules::suggestions::providers::{SyncedDevice, SyncedTab};
use browser_screen_lib::modules::telemetry::{LogSink, StartupTimeFeedback};
use browser_screen_lib::settings::Settings;
use browser_screen_lib::state::{BrowserState, SessionState};

fn views() -> ScreenViews {
    ScreenViews {
        root: View::new("browser"),
        toolbar: View::new("toolbar"),
        engine: View::new("engine"),
        awesome_bar: View::new("awesome-bar"),
    }
}

fn components(settings: Settings) -> Arc<Components> {
    let store = Arc::new(BrowserStore::new(BrowserState {
        sessions: vec![
            SessionState::new("tab-1", settings.homepage.clone()).with_title("Start"),
            SessionState::new("tab-2", "https://docs.rs/").with_title("Docs.rs"),
        ],
        selected_session_id: Some("tab-1".to_string()),
    }));

    let history = Arc::new(HistoryStore::new());
    history.record_visit("https://doc.rust-lang.org/book/", Some("The Rust Book"), true);
    history.record_visit("https://docs.rs/tokio", Some("tokio - Rust"), false);

    let synced = MemorySyncedTabs::new(vec![SyncedDevice {
        name: "Laptop".to_string(),
        tabs: vec![SyncedTab {
            title: "Dotfiles".to_string(),
            url: "https://github.com/dotfiles".to_string(),
        }],
    }]);

    Arc::new(Components::new(
        store,
        Arc::new(settings),
        history,
        Arc::new(StaticSearchClient::new([("do", vec!["docker", "docs", "dotnet"])])),
        Arc::new(MemoryClipboard::new(Some("https://crates.io/"))),
        Arc::new(synced),
        Arc::new(LogSink),
    ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    browser_screen_lib::init_logging();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&PathBuf::from(path)),
        None => Settings::default(),
    };
    let components = components(settings);
    let navigator = Arc::new(Mutex::new(Navigator::new()));

    let toolbar = Arc::new(RecordingToolbar::default());
    let display = Arc::new(RecordingSuggestionDisplay::default());
    let surfaces = ScreenSurfaces {
        toolbar: toolbar.clone(),
        suggestions: display.clone(),
        engine_view: Arc::new(HeadlessEngineView::default()),
        reader_controls: Arc::new(RecordingReaderControls::default()),
    };

    let owner = match open_browser(&navigator, None) {
        Ok(owner) => owner,
        Err(e) => {
            log::error!("Could not open the browsing screen: {}", e);
            return;
        }
    };
    let mut screen = BrowserScreen::create(None);
    let report = match screen.on_view_created(&views(), &surfaces, components.clone(), &owner, navigator.clone()) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Screen failed to compose: {}", e);
            return;
        }
    };
    log::info!("Bound features: {:?}", report.bound);
    if let Some(shown) = toolbar.last() {
        log::info!("Toolbar: {} ({} tabs)", shown.url, shown.tab_count);
    }

    if let Some(query) = screen.awesome_bar().with_feature(|bar| bar.on_input_changed("do")) {
        match query.await {
            Ok(true) => {}
            Ok(false) => log::warn!("Query result was superseded"),
            Err(e) => log::error!("Query task failed: {}", e),
        }
    }
    for suggestion in display.shown().last().into_iter().flatten() {
        log::info!("  [{}] {} -> {:?}", suggestion.provider_id, suggestion.title, suggestion.action);
    }

    let mut feedback = StartupTimeFeedback::default();
    feedback.select(5);
    screen.submit_startup_feedback(&feedback);

    screen.show_tabs();
    let back_owner = {
        let mut navigator = navigator.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = navigator.current() {
            log::info!("Now showing {}", current.tag);
        }
        navigator.back()
    };
    let Some(back_owner) = back_owner else {
        log::warn!("Nothing to go back to");
        return;
    };

    let session_id = navigator
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .current()
        .and_then(|entry| match &entry.descriptor {
            ScreenDescriptor::Browser { session_id } => Some(session_id.clone()),
            _ => None,
        })
        .flatten();
    let mut restored = BrowserScreen::create(session_id);
    match restored.on_view_created(&views(), &surfaces, components, &back_owner, navigator.clone()) {
        Ok(report) => log::info!("Browser restored with {} features", report.bound.len()),
        Err(e) => log::error!("Restored screen failed to compose: {}", e),
    }
}
