// Binds the toolbar to the session the screen displays: url, title,
// back/forward availability and the tab counter. Read-only on the store.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::modules::feature::{AttachToken, ViewBoundFeature, ViewRef};
use crate::modules::store::{observe, BrowserStore};
use crate::state::BrowserState;

/// What the toolbar shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolbarDisplay {
    pub url: String,
    pub title: String,
    pub loading: bool,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub tab_count: usize,
}

impl ToolbarDisplay {
    /// Resolves the displayed session and builds the toolbar state for it.
    ///
    /// A session id that no longer resolves gives the default display. The
    /// tab counter still reflects the store, counting tabs that share the
    /// displayed session's privateness (normal tabs when nothing resolves).
    pub fn from_state(state: &BrowserState, session_id: Option<&str>) -> Self {
        let session = state.find_custom_or_selected(session_id);
        let private = session.map(|s| s.private).unwrap_or(false);
        let tab_count = state.sessions.iter().filter(|s| s.private == private).count();

        match session {
            Some(session) => Self {
                url: session.url.clone(),
                title: session.title.clone(),
                loading: session.loading,
                can_go_back: session.can_go_back(),
                can_go_forward: session.can_go_forward(),
                tab_count,
            },
            None => Self {
                tab_count,
                ..Self::default()
            },
        }
    }
}

/// The toolbar surface.
pub trait ToolbarView: Send + Sync {
    fn render(&self, display: &ToolbarDisplay);
}

pub type ShowTabs = Arc<dyn Fn() + Send + Sync>;

pub struct TabsToolbarFeature {
    toolbar: Arc<dyn ToolbarView>,
    session_id: Option<String>,
    store: Arc<BrowserStore>,
    show_tabs: ShowTabs,
    token: AttachToken,
    task: Option<JoinHandle<()>>,
}

impl TabsToolbarFeature {
    pub fn new(
        toolbar: Arc<dyn ToolbarView>,
        session_id: Option<String>,
        store: Arc<BrowserStore>,
        show_tabs: ShowTabs,
    ) -> Self {
        Self {
            toolbar,
            session_id,
            store,
            show_tabs,
            token: AttachToken::new(),
            task: None,
        }
    }

    /// The "show all tabs" action. Callers invoke it outside the feature's
    /// handle, since showing tabs ends this screen's lifetime.
    pub fn show_tabs_action(&self) -> ShowTabs {
        self.show_tabs.clone()
    }
}

impl ViewBoundFeature for TabsToolbarFeature {
    const NAME: &'static str = "tabs-toolbar";

    fn attach(&mut self, _view: &ViewRef) {
        self.token.attach();
        let toolbar = self.toolbar.clone();
        let session_id = self.session_id.clone();
        let mut last: Option<ToolbarDisplay> = None;

        self.task = Some(observe(&self.store, self.token.clone(), move |state| {
            let display = ToolbarDisplay::from_state(state, session_id.as_deref());
            if last.as_ref() == Some(&display) {
                return;
            }
            toolbar.render(&display);
            last = Some(display);
        }));
    }

    fn detach(&mut self) {
        self.token.revoke();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
