// Named mutations of the session store. Features never dispatch directly;
// they go through these, which keeps every write path in one place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::modules::navigation::smart_parse_url;
use crate::modules::store::{BrowserAction, BrowserStore};
use crate::settings::Settings;
use crate::state::SessionState;

#[derive(Clone)]
pub struct SessionUseCases {
    store: Arc<BrowserStore>,
    settings: Arc<Settings>,
}

impl SessionUseCases {
    pub fn new(store: Arc<BrowserStore>, settings: Arc<Settings>) -> Self {
        Self { store, settings }
    }

    /// Loads typed input in `session_id`, or the selected session when absent.
    /// Returns the URL that was loaded, or None when there is no such session.
    pub fn load_url(&self, session_id: Option<&str>, input: &str) -> Option<String> {
        let state = self.store.state();
        let session = state.find_custom_or_selected(session_id)?;
        let url = smart_parse_url(input, &self.settings);
        self.store.dispatch(BrowserAction::LoadUrl {
            session_id: session.id.clone(),
            url: url.clone(),
        });
        Some(url)
    }

    pub fn reload(&self, session_id: &str) -> bool {
        self.store.dispatch(BrowserAction::Reload { session_id: session_id.to_string() })
    }

    pub fn go_back(&self, session_id: &str) -> bool {
        self.store.dispatch(BrowserAction::GoBack { session_id: session_id.to_string() })
    }

    pub fn go_forward(&self, session_id: &str) -> bool {
        self.store.dispatch(BrowserAction::GoForward { session_id: session_id.to_string() })
    }

    // --- Engine reports ---

    pub fn page_loaded(&self, session_id: &str) -> bool {
        self.store.dispatch(BrowserAction::PageLoaded { session_id: session_id.to_string() })
    }

    pub fn update_title(&self, session_id: &str, title: &str) -> bool {
        self.store.dispatch(BrowserAction::UpdateTitle {
            session_id: session_id.to_string(),
            title: title.to_string(),
        })
    }

    pub fn set_readerable(&self, session_id: &str, readerable: bool) -> bool {
        self.store.dispatch(BrowserAction::UpdateReaderable {
            session_id: session_id.to_string(),
            readerable,
        })
    }
}

pub struct TabsUseCases {
    store: Arc<BrowserStore>,
    next_id: AtomicU64,
}

impl TabsUseCases {
    pub fn new(store: Arc<BrowserStore>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add_tab(&self, url: &str, select: bool) -> String {
        let id = self.unused_id();
        let mut session = SessionState::new(id.clone(), url);
        session.loading = true;
        self.store.dispatch(BrowserAction::AddSession { session, select });
        log::info!("[Tabs] Added tab {} for {}", id, url);
        id
    }

    pub fn select_tab(&self, session_id: &str) -> bool {
        self.store.dispatch(BrowserAction::SelectSession { session_id: session_id.to_string() })
    }

    pub fn remove_tab(&self, session_id: &str) -> bool {
        self.store.dispatch(BrowserAction::RemoveSession { session_id: session_id.to_string() })
    }

    fn unused_id(&self) -> String {
        let state = self.store.state();
        loop {
            let id = format!("tab-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
            if state.find_session(&id).is_none() {
                return id;
            }
        }
    }
}

#[derive(Clone)]
pub struct ReaderUseCases {
    store: Arc<BrowserStore>,
}

impl ReaderUseCases {
    pub fn new(store: Arc<BrowserStore>) -> Self {
        Self { store }
    }

    pub fn show_reader_view(&self, session_id: &str) -> bool {
        self.set_active(session_id, true)
    }

    pub fn hide_reader_view(&self, session_id: &str) -> bool {
        self.set_active(session_id, false)
    }

    fn set_active(&self, session_id: &str, active: bool) -> bool {
        self.store.dispatch(BrowserAction::UpdateReaderActive {
            session_id: session_id.to_string(),
            active,
        })
    }
}

/// Every store mutation available to the screen's features.
pub struct UseCases {
    pub session: SessionUseCases,
    pub tabs: TabsUseCases,
    pub reader: ReaderUseCases,
}

impl UseCases {
    pub fn new(store: Arc<BrowserStore>, settings: Arc<Settings>) -> Self {
        Self {
            session: SessionUseCases::new(store.clone(), settings),
            tabs: TabsUseCases::new(store.clone()),
            reader: ReaderUseCases::new(store),
        }
    }
}
