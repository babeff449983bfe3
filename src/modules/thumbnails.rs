// Page thumbnails for the tab overview.
// Captures the selected session whenever a page finishes loading.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::modules::engine::{Bitmap, EngineView};
use crate::modules::feature::{AttachToken, ViewBoundFeature, ViewRef};
use crate::modules::store::{observe, BrowserStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub url: String,
    pub bitmap: Bitmap,
    pub captured_at: DateTime<Utc>,
}

/// Latest thumbnail per session id.
#[derive(Default)]
pub struct ThumbnailStorage {
    thumbnails: DashMap<String, Thumbnail>,
}

impl ThumbnailStorage {
    pub fn save(&self, session_id: &str, thumbnail: Thumbnail) {
        self.thumbnails.insert(session_id.to_string(), thumbnail);
    }

    pub fn load(&self, session_id: &str) -> Option<Thumbnail> {
        self.thumbnails.get(session_id).map(|t| t.value().clone())
    }

    pub fn remove(&self, session_id: &str) {
        self.thumbnails.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.thumbnails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }
}

pub struct ThumbnailFeature {
    engine_view: Arc<dyn EngineView>,
    store: Arc<BrowserStore>,
    storage: Arc<ThumbnailStorage>,
    token: AttachToken,
    task: Option<JoinHandle<()>>,
}

impl ThumbnailFeature {
    pub fn new(
        engine_view: Arc<dyn EngineView>,
        store: Arc<BrowserStore>,
        storage: Arc<ThumbnailStorage>,
    ) -> Self {
        Self {
            engine_view,
            store,
            storage,
            token: AttachToken::new(),
            task: None,
        }
    }

    /// Captures the selected session now, outside the load-finished trigger.
    pub fn request_screenshot(&self) -> Option<JoinHandle<()>> {
        if !self.token.is_attached() {
            return None;
        }
        let state = self.store.state();
        let session = state.selected_session()?;
        Some(spawn_capture(
            self.engine_view.clone(),
            self.storage.clone(),
            self.token.clone(),
            session.id.clone(),
            session.url.clone(),
        ))
    }
}

/// Runs one capture off the observer loop. A result that arrives after the
/// feature detached is dropped.
fn spawn_capture(
    engine_view: Arc<dyn EngineView>,
    storage: Arc<ThumbnailStorage>,
    token: AttachToken,
    session_id: String,
    url: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bitmap = engine_view.capture_thumbnail().await;
        if !token.is_attached() {
            log::debug!("[Thumbnails] Discarding late capture for {}", session_id);
            return;
        }
        match bitmap {
            Some(bitmap) => {
                log::info!("[Thumbnails] Captured {}x{} for {}", bitmap.width, bitmap.height, url);
                storage.save(
                    &session_id,
                    Thumbnail {
                        url,
                        bitmap,
                        captured_at: Utc::now(),
                    },
                );
            }
            None => log::debug!("[Thumbnails] Nothing rendered for {}", session_id),
        }
    })
}

impl ViewBoundFeature for ThumbnailFeature {
    const NAME: &'static str = "thumbnails";

    fn attach(&mut self, _view: &ViewRef) {
        self.token.attach();
        let engine_view = self.engine_view.clone();
        let storage = self.storage.clone();
        let token = self.token.clone();
        // (session id, completed loads) of the selected session at the previous change
        let mut last: Option<(String, u64)> = None;

        self.task = Some(observe(&self.store, self.token.clone(), move |state| {
            let Some(session) = state.selected_session() else {
                last = None;
                return;
            };
            let finished_loading = matches!(
                &last,
                Some((id, loads)) if *id == session.id && session.load_count > *loads
            );
            last = Some((session.id.clone(), session.load_count));

            if finished_loading {
                spawn_capture(
                    engine_view.clone(),
                    storage.clone(),
                    token.clone(),
                    session.id.clone(),
                    session.url.clone(),
                );
            }
        }));
    }

    fn detach(&mut self) {
        self.token.revoke();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEngineView;
    use crate::modules::feature::{settle, FeatureHandle, Lifecycle, View};
    use crate::modules::store::BrowserAction;
    use crate::state::{BrowserState, SessionState};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn loading_store() -> Arc<BrowserStore> {
        let mut session = SessionState::new("a", "https://a.org/");
        session.loading = true;
        Arc::new(BrowserStore::new(BrowserState {
            sessions: vec![session, SessionState::new("b", "https://b.org/")],
            selected_session_id: Some("a".to_string()),
        }))
    }

    /// Engine view whose capture waits until released.
    struct GatedEngineView {
        gate: Notify,
        captures: AtomicUsize,
    }

    #[async_trait]
    impl EngineView for GatedEngineView {
        async fn capture_thumbnail(&self) -> Option<Bitmap> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Some(Bitmap { width: 1, height: 1, bytes: vec![0] })
        }

        fn set_reader_reflow(&self, _enabled: bool) {}
    }

    #[tokio::test]
    async fn test_captures_when_page_finishes_loading() {
        let store = loading_store();
        let storage = Arc::new(ThumbnailStorage::default());
        let engine = Arc::new(HeadlessEngineView::default());
        let owner = Lifecycle::new();
        let handle = FeatureHandle::new();

        handle
            .set(ThumbnailFeature::new(engine.clone(), store.clone(), storage.clone()), &owner, &View::new("root"))
            .unwrap();
        // Attaching alone captures nothing
        settle().await;
        assert!(storage.is_empty());

        store.dispatch(BrowserAction::PageLoaded { session_id: "a".into() });
        settle().await;

        let thumbnail = storage.load("a").unwrap();
        assert_eq!(thumbnail.url, "https://a.org/");
        assert_eq!(engine.capture_count(), 1);

        // A title update is not a load transition
        store.dispatch(BrowserAction::UpdateTitle { session_id: "a".into(), title: "A".into() });
        settle().await;
        assert_eq!(engine.capture_count(), 1);
    }

    #[tokio::test]
    async fn test_load_finishing_before_observer_runs_is_captured() {
        let store = Arc::new(BrowserStore::new(BrowserState {
            sessions: vec![SessionState::new("a", "https://a.org/")],
            selected_session_id: Some("a".to_string()),
        }));
        let storage = Arc::new(ThumbnailStorage::default());
        let engine = Arc::new(HeadlessEngineView::default());
        let owner = Lifecycle::new();
        let handle = FeatureHandle::new();
        handle
            .set(ThumbnailFeature::new(engine.clone(), store.clone(), storage.clone()), &owner, &View::new("root"))
            .unwrap();

        // Both land before the observer task gets to run
        store.dispatch(BrowserAction::LoadUrl { session_id: "a".into(), url: "https://b.org/".into() });
        store.dispatch(BrowserAction::PageLoaded { session_id: "a".into() });
        settle().await;

        assert_eq!(engine.capture_count(), 1);
        assert_eq!(storage.load("a").unwrap().url, "https://b.org/");
    }

    #[tokio::test]
    async fn test_switching_tabs_is_not_a_load_transition() {
        let store = loading_store();
        let storage = Arc::new(ThumbnailStorage::default());
        let engine = Arc::new(HeadlessEngineView::default());
        let owner = Lifecycle::new();
        let handle = FeatureHandle::new();
        handle
            .set(ThumbnailFeature::new(engine.clone(), store.clone(), storage.clone()), &owner, &View::new("root"))
            .unwrap();

        store.dispatch(BrowserAction::SelectSession { session_id: "b".into() });
        settle().await;
        assert_eq!(engine.capture_count(), 0);
    }

    #[tokio::test]
    async fn test_late_capture_after_detach_is_discarded() {
        let store = loading_store();
        let storage = Arc::new(ThumbnailStorage::default());
        let engine = Arc::new(GatedEngineView {
            gate: Notify::new(),
            captures: AtomicUsize::new(0),
        });
        let owner = Lifecycle::new();
        let handle = FeatureHandle::new();
        handle
            .set(ThumbnailFeature::new(engine.clone(), store.clone(), storage.clone()), &owner, &View::new("root"))
            .unwrap();

        store.dispatch(BrowserAction::PageLoaded { session_id: "a".into() });
        settle().await;
        assert_eq!(engine.captures.load(Ordering::SeqCst), 1);

        owner.destroy();
        engine.gate.notify_one();
        settle().await;
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_request_screenshot_only_while_attached() {
        let store = loading_store();
        let storage = Arc::new(ThumbnailStorage::default());
        let engine = Arc::new(HeadlessEngineView::default());
        let owner = Lifecycle::new();
        let handle = FeatureHandle::new();
        handle
            .set(ThumbnailFeature::new(engine.clone(), store.clone(), storage.clone()), &owner, &View::new("root"))
            .unwrap();

        let capture = handle.with_feature(|f| f.request_screenshot()).flatten().unwrap();
        capture.await.unwrap();
        assert!(storage.load("a").is_some());

        owner.destroy();
        assert!(handle.with_feature(|f| f.request_screenshot()).is_none());
    }
}
