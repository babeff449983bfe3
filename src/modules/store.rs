// Observable session store: the single mutable resource on the screen.
// Reads are lock-free snapshots; writes go through dispatch() and the pure reducer.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::modules::feature::AttachToken;
use crate::state::{BrowserState, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserAction {
    AddSession { session: SessionState, select: bool },
    RemoveSession { session_id: String },
    SelectSession { session_id: String },
    LoadUrl { session_id: String, url: String },
    GoBack { session_id: String },
    GoForward { session_id: String },
    Reload { session_id: String },
    PageLoaded { session_id: String },
    UpdateTitle { session_id: String, title: String },
    UpdateReaderable { session_id: String, readerable: bool },
    UpdateReaderActive { session_id: String, active: bool },
}

/// Applies `action` to `state`, returning the next state.
pub fn reduce(state: &BrowserState, action: &BrowserAction) -> BrowserState {
    let mut next = state.clone();
    match action {
        BrowserAction::AddSession { session, select } => {
            if next.find_session(&session.id).is_some() {
                return next;
            }
            next.sessions.push(session.clone());
            if *select || next.selected_session_id.is_none() {
                next.selected_session_id = Some(session.id.clone());
            }
        }
        BrowserAction::RemoveSession { session_id } => {
            let Some(position) = next.sessions.iter().position(|s| &s.id == session_id) else {
                return next;
            };
            next.sessions.remove(position);
            if next.selected_session_id.as_ref() == Some(session_id) {
                // Select the neighbour that slid into place, or the new last one
                next.selected_session_id = next
                    .sessions
                    .get(position)
                    .or_else(|| next.sessions.last())
                    .map(|s| s.id.clone());
            }
        }
        BrowserAction::SelectSession { session_id } => {
            if next.find_session(session_id).is_some() {
                next.selected_session_id = Some(session_id.clone());
            }
        }
        BrowserAction::LoadUrl { session_id, url } => update_session(&mut next, session_id, |s| {
            s.history.truncate(s.history_index + 1);
            s.history.push(url.clone());
            s.history_index = s.history.len() - 1;
            start_navigation(s);
        }),
        BrowserAction::GoBack { session_id } => update_session(&mut next, session_id, |s| {
            if s.can_go_back() {
                s.history_index -= 1;
                start_navigation(s);
            }
        }),
        BrowserAction::GoForward { session_id } => update_session(&mut next, session_id, |s| {
            if s.can_go_forward() {
                s.history_index += 1;
                start_navigation(s);
            }
        }),
        BrowserAction::Reload { session_id } => {
            update_session(&mut next, session_id, |s| s.loading = true)
        }
        BrowserAction::PageLoaded { session_id } => update_session(&mut next, session_id, |s| {
            if s.loading {
                s.loading = false;
                s.load_count += 1;
            }
        }),
        BrowserAction::UpdateTitle { session_id, title } => {
            update_session(&mut next, session_id, |s| s.title = title.clone())
        }
        BrowserAction::UpdateReaderable { session_id, readerable } => {
            update_session(&mut next, session_id, |s| {
                s.reader.readerable = *readerable;
                if !readerable {
                    s.reader.active = false;
                }
            })
        }
        BrowserAction::UpdateReaderActive { session_id, active } => {
            update_session(&mut next, session_id, |s| {
                if !active || s.reader.readerable {
                    s.reader.active = *active;
                }
            })
        }
    }
    next
}

fn update_session(state: &mut BrowserState, session_id: &str, f: impl FnOnce(&mut SessionState)) {
    if let Some(session) = state.sessions.iter_mut().find(|s| s.id == session_id) {
        f(session);
    }
}

fn start_navigation(session: &mut SessionState) {
    session.url = session.history[session.history_index].clone();
    session.loading = true;
    session.reader = Default::default();
}

pub struct BrowserStore {
    // Lock-free reader for features and providers
    snapshot: ArcSwap<BrowserState>,
    notifier: watch::Sender<Arc<BrowserState>>,
    dispatch_lock: Mutex<()>,
}

impl BrowserStore {
    pub fn new(initial: BrowserState) -> Self {
        let initial = Arc::new(initial);
        let (notifier, _) = watch::channel(initial.clone());
        Self {
            snapshot: ArcSwap::new(initial),
            notifier,
            dispatch_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> Arc<BrowserState> {
        self.snapshot.load_full()
    }

    /// Runs `action` through the reducer and notifies observers when the
    /// state actually changed. Returns whether it did.
    pub fn dispatch(&self, action: BrowserAction) -> bool {
        let _guard = self.dispatch_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.snapshot.load_full();
        let next = reduce(&current, &action);
        if next == *current {
            log::debug!("[Store] {:?} left state unchanged", action);
            return false;
        }

        let next = Arc::new(next);
        self.snapshot.store(next.clone());
        self.notifier.send_replace(next);
        true
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<BrowserState>> {
        self.notifier.subscribe()
    }
}

impl Default for BrowserStore {
    fn default() -> Self {
        Self::new(BrowserState::default())
    }
}

/// Calls `on_state` with the current state right away, then again for every
/// change, for as long as `token` stays attached.
///
/// The initial call happens synchronously so a feature's UI is populated
/// before `attach` returns. Later calls run on a spawned task; a state that
/// arrives after the token was revoked is dropped.
pub fn observe<F>(store: &BrowserStore, token: AttachToken, mut on_state: F) -> JoinHandle<()>
where
    F: FnMut(&BrowserState) + Send + 'static,
{
    let mut rx = store.subscribe();
    let initial = rx.borrow_and_update().clone();
    if token.is_attached() {
        on_state(&initial);
    }

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if !token.is_attached() {
                break;
            }
            on_state(&state);
        }
    })
}
