// Reader view integration: the toolbar reader action, the appearance button
// and controls bar, and the engine's paragraph reflow.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::modules::engine::EngineView;
use crate::modules::feature::{AttachToken, ViewBoundFeature, ViewRef};
use crate::modules::store::{observe, BrowserStore};
use crate::modules::use_cases::ReaderUseCases;
use crate::state::ReaderState;

/// Reader-mode UI surfaces.
pub trait ReaderControls: Send + Sync {
    /// The reader action in the toolbar.
    fn set_action_visible(&self, visible: bool);
    /// The floating appearance button shown while reading.
    fn set_appearance_button_visible(&self, visible: bool);
    /// The appearance controls bar.
    fn show_controls(&self);
    fn hide_controls(&self);
    fn controls_visible(&self) -> bool;
}

pub struct ReaderViewFeature {
    store: Arc<BrowserStore>,
    engine_view: Arc<dyn EngineView>,
    controls: Arc<dyn ReaderControls>,
    use_cases: ReaderUseCases,
    token: AttachToken,
    task: Option<JoinHandle<()>>,
}

impl ReaderViewFeature {
    pub fn new(
        store: Arc<BrowserStore>,
        engine_view: Arc<dyn EngineView>,
        controls: Arc<dyn ReaderControls>,
        use_cases: ReaderUseCases,
    ) -> Self {
        Self {
            store,
            engine_view,
            controls,
            use_cases,
            token: AttachToken::new(),
            task: None,
        }
    }

    /// The toolbar reader action: enters reader view, or leaves it when active.
    pub fn toggle_reader_view(&self) -> bool {
        let state = self.store.state();
        let Some(session) = state.selected_session() else {
            return false;
        };
        if session.reader.active {
            self.use_cases.hide_reader_view(&session.id)
        } else {
            self.use_cases.show_reader_view(&session.id)
        }
    }

    pub fn show_appearance_controls(&self) {
        let state = self.store.state();
        if state.selected_session().is_some_and(|s| s.reader.active) {
            self.controls.show_controls();
        }
    }
}

fn apply_reader_state(
    controls: &dyn ReaderControls,
    engine_view: &dyn EngineView,
    last: Option<&ReaderState>,
    reader: &ReaderState,
) {
    if last.map(|l| l.readerable) != Some(reader.readerable) {
        controls.set_action_visible(reader.readerable);
    }
    if last.map(|l| l.active) != Some(reader.active) {
        engine_view.set_reader_reflow(reader.active);
        controls.set_appearance_button_visible(reader.active);
        if !reader.active && controls.controls_visible() {
            controls.hide_controls();
        }
    }
}

impl ViewBoundFeature for ReaderViewFeature {
    const NAME: &'static str = "reader-view";

    fn attach(&mut self, _view: &ViewRef) {
        self.token.attach();
        let controls = self.controls.clone();
        let engine_view = self.engine_view.clone();
        let mut last: Option<ReaderState> = None;

        self.task = Some(observe(&self.store, self.token.clone(), move |state| {
            let reader = state
                .selected_session()
                .map(|s| s.reader.clone())
                .unwrap_or_default();
            if last.as_ref() == Some(&reader) {
                return;
            }
            apply_reader_state(controls.as_ref(), engine_view.as_ref(), last.as_ref(), &reader);
            last = Some(reader);
        }));
    }

    fn detach(&mut self) {
        self.token.revoke();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Closes the controls bar first, then reader view itself.
    fn on_back_pressed(&mut self) -> bool {
        if self.controls.controls_visible() {
            self.controls.hide_controls();
            return true;
        }
        let state = self.store.state();
        match state.selected_session() {
            Some(session) if session.reader.active => self.use_cases.hide_reader_view(&session.id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessEngineView, RecordingReaderControls};
    use crate::modules::feature::{settle, FeatureHandle, Lifecycle, View};
    use crate::modules::store::BrowserAction;
    use crate::state::{BrowserState, SessionState};

    struct Fixture {
        store: Arc<BrowserStore>,
        engine: Arc<HeadlessEngineView>,
        controls: Arc<RecordingReaderControls>,
        owner: Arc<Lifecycle>,
        handle: FeatureHandle<ReaderViewFeature>,
    }

    fn attached() -> Fixture {
        let store = Arc::new(BrowserStore::new(BrowserState {
            sessions: vec![SessionState::new("a", "https://a.org/article")],
            selected_session_id: Some("a".to_string()),
        }));
        let engine = Arc::new(HeadlessEngineView::default());
        let controls = Arc::new(RecordingReaderControls::default());
        let owner = Lifecycle::new();
        let handle = FeatureHandle::new();
        let feature = ReaderViewFeature::new(
            store.clone(),
            engine.clone(),
            controls.clone(),
            ReaderUseCases::new(store.clone()),
        );
        handle.set(feature, &owner, &View::new("root")).unwrap();
        Fixture { store, engine, controls, owner, handle }
    }

    fn readerable(store: &BrowserStore, readerable: bool) {
        store.dispatch(BrowserAction::UpdateReaderable { session_id: "a".into(), readerable });
    }

    #[tokio::test]
    async fn test_availability_toggles_action() {
        let f = attached();
        assert!(!f.controls.action_visible());

        readerable(&f.store, true);
        settle().await;
        assert!(f.controls.action_visible());

        readerable(&f.store, false);
        settle().await;
        assert!(!f.controls.action_visible());
    }

    #[tokio::test]
    async fn test_toggle_reflows_content() {
        let f = attached();
        readerable(&f.store, true);
        settle().await;

        assert!(f.handle.with_feature(|r| r.toggle_reader_view()).unwrap());
        settle().await;
        assert!(f.engine.reflow_enabled());
        assert!(f.controls.appearance_button_visible());

        assert!(f.handle.with_feature(|r| r.toggle_reader_view()).unwrap());
        settle().await;
        assert!(!f.engine.reflow_enabled());
        assert!(!f.controls.appearance_button_visible());
    }

    #[tokio::test]
    async fn test_back_press_closes_controls_then_reader() {
        let f = attached();
        assert!(!f.handle.on_back_pressed());

        readerable(&f.store, true);
        f.handle.with_feature(|r| r.toggle_reader_view());
        settle().await;
        f.handle.with_feature(|r| r.show_appearance_controls());
        assert!(f.controls.controls_visible());

        assert!(f.handle.on_back_pressed());
        assert!(!f.controls.controls_visible());
        assert!(f.store.state().selected_session().unwrap().reader.active);

        assert!(f.handle.on_back_pressed());
        settle().await;
        assert!(!f.store.state().selected_session().unwrap().reader.active);
        assert!(!f.engine.reflow_enabled());

        assert!(!f.handle.on_back_pressed());
    }

    #[tokio::test]
    async fn test_late_availability_change_after_detach_is_ignored() {
        let f = attached();
        f.owner.destroy();
        let mutations = f.controls.mutation_count();

        readerable(&f.store, true);
        settle().await;
        assert_eq!(f.controls.mutation_count(), mutations);
        assert!(!f.controls.action_visible());
    }
}
