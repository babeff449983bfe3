// Lifetime-scoped feature binding.
//
// A FeatureHandle owns one feature, attaches it to a view once, and detaches it
// exactly once when the lifetime owner (the screen's Lifecycle) is destroyed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::BindingError;

/// A node of the screen's view hierarchy.
#[derive(Debug)]
pub struct View {
    id: String,
    in_hierarchy: AtomicBool,
}

pub type ViewRef = Arc<View>;

impl View {
    /// Creates a view that is already part of the hierarchy.
    pub fn new(id: impl Into<String>) -> ViewRef {
        Arc::new(Self {
            id: id.into(),
            in_hierarchy: AtomicBool::new(true),
        })
    }

    /// Creates a view that has not been added to any hierarchy yet.
    pub fn detached(id: impl Into<String>) -> ViewRef {
        let view = Self::new(id);
        view.remove_from_hierarchy();
        view
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_in_hierarchy(&self) -> bool {
        self.in_hierarchy.load(Ordering::SeqCst)
    }

    pub fn add_to_hierarchy(&self) {
        self.in_hierarchy.store(true, Ordering::SeqCst);
    }

    pub fn remove_from_hierarchy(&self) {
        self.in_hierarchy.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Initialized,
    Created,
    Destroyed,
}

type DestroyObserver = Box<dyn FnOnce() + Send>;

/// Identifies one registered destroy observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverKey(u64);

struct LifecycleInner {
    state: LifecycleState,
    on_destroy: Vec<(ObserverKey, DestroyObserver)>,
    next_key: u64,
}

/// The lifetime owner of a screen.
///
/// Observers registered with [`Lifecycle::on_destroy`] run once, in
/// registration order, when the lifecycle is destroyed.
pub struct Lifecycle {
    inner: Mutex<LifecycleInner>,
}

impl Lifecycle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(LifecycleInner {
                state: LifecycleState::Initialized,
                on_destroy: Vec::new(),
                next_key: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    pub fn create(&self) {
        let mut inner = self.lock();
        if inner.state == LifecycleState::Initialized {
            inner.state = LifecycleState::Created;
        }
    }

    /// Registers `observer` to run on destroy. Returns None, dropping the
    /// observer, when the lifecycle is already destroyed.
    pub fn on_destroy(&self, observer: DestroyObserver) -> Option<ObserverKey> {
        let mut inner = self.lock();
        if inner.state == LifecycleState::Destroyed {
            return None;
        }
        let key = ObserverKey(inner.next_key);
        inner.next_key += 1;
        inner.on_destroy.push((key, observer));
        Some(key)
    }

    /// Drops a pending observer without running it. False when it already
    /// ran or was removed.
    pub fn remove_observer(&self, key: ObserverKey) -> bool {
        let mut inner = self.lock();
        let before = inner.on_destroy.len();
        inner.on_destroy.retain(|(k, _)| *k != key);
        inner.on_destroy.len() != before
    }

    pub fn pending_observers(&self) -> usize {
        self.lock().on_destroy.len()
    }

    /// Ends the lifetime. Idempotent.
    pub fn destroy(&self) {
        let observers = {
            let mut inner = self.lock();
            if inner.state == LifecycleState::Destroyed {
                return;
            }
            inner.state = LifecycleState::Destroyed;
            std::mem::take(&mut inner.on_destroy)
        };

        // Outside the lock: observers may query this lifecycle
        for (_, observer) in observers {
            observer();
        }
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Lifecycle")
            .field("state", &inner.state)
            .field("pending_observers", &inner.on_destroy.len())
            .finish()
    }
}

/// Shared "still attached" flag handed to a feature's asynchronous work.
///
/// Anything that completes after the feature detached checks this before
/// touching UI state.
#[derive(Debug, Clone, Default)]
pub struct AttachToken(Arc<AtomicBool>);

impl AttachToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_attached(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A UI behaviour that lives for as long as its screen's view does.
pub trait ViewBoundFeature: Send + 'static {
    const NAME: &'static str;

    /// Becomes interactive on `view`. Runs synchronously inside
    /// [`FeatureHandle::set`].
    fn attach(&mut self, view: &ViewRef);

    /// Stops all observation. Called at most once.
    fn detach(&mut self);

    /// Gives the feature a chance to consume a back press.
    fn on_back_pressed(&mut self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unattached,
    Attached,
    Detached,
}

struct HandleInner<F> {
    feature: Option<F>,
    view: Weak<View>,
    state: AttachState,
    // Our destroy observer on the owner, removed again on a manual detach
    registration: Option<(Weak<Lifecycle>, ObserverKey)>,
}

/// Owns a feature for the lifetime of one (view, lifecycle) pairing.
pub struct FeatureHandle<F: ViewBoundFeature> {
    inner: Arc<Mutex<HandleInner<F>>>,
}

impl<F: ViewBoundFeature> Default for FeatureHandle<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ViewBoundFeature> FeatureHandle<F> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleInner {
                feature: None,
                view: Weak::new(),
                state: AttachState::Unattached,
                registration: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HandleInner<F>> {
        lock_inner(&self.inner)
    }

    /// Attaches `feature` to `view` and arranges for it to detach when
    /// `owner` is destroyed.
    pub fn set(&self, mut feature: F, owner: &Arc<Lifecycle>, view: &ViewRef) -> Result<(), BindingError> {
        let mut inner = self.lock();
        match inner.state {
            AttachState::Attached => return Err(BindingError::AlreadyAttached { feature: F::NAME }),
            AttachState::Detached => return Err(BindingError::HandleDetached { feature: F::NAME }),
            AttachState::Unattached => {}
        }
        if !view.is_in_hierarchy() {
            return Err(BindingError::ViewNotInHierarchy {
                view: view.id().to_string(),
            });
        }

        // The owner holds only a weak reference, so it never keeps the feature alive
        let weak = Arc::downgrade(&self.inner);
        let key = owner.on_destroy(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                detach_inner(&inner);
            }
        }));
        let Some(key) = key else {
            return Err(BindingError::OwnerDestroyed { feature: F::NAME });
        };

        feature.attach(view);
        inner.feature = Some(feature);
        inner.view = Arc::downgrade(view);
        inner.state = AttachState::Attached;
        inner.registration = Some((Arc::downgrade(owner), key));
        log::debug!("[Feature] {} attached to view '{}'", F::NAME, view.id());
        Ok(())
    }

    /// Detaches the feature if attached. Idempotent; no effect before attach.
    pub fn detach(&self) {
        detach_inner(&self.inner);
    }

    pub fn state(&self) -> AttachState {
        self.lock().state
    }

    pub fn is_attached(&self) -> bool {
        self.state() == AttachState::Attached
    }

    /// The bound view, while both the binding and the view are alive.
    pub fn view(&self) -> Option<ViewRef> {
        self.lock().view.upgrade()
    }

    pub fn on_back_pressed(&self) -> bool {
        let mut inner = self.lock();
        match (inner.state, inner.feature.as_mut()) {
            (AttachState::Attached, Some(feature)) => feature.on_back_pressed(),
            _ => false,
        }
    }

    /// Runs `f` against the attached feature.
    ///
    /// The handle stays locked while `f` runs, so `f` must not end the
    /// owner's lifetime.
    pub fn with_feature<R>(&self, f: impl FnOnce(&mut F) -> R) -> Option<R> {
        let mut inner = self.lock();
        if inner.state != AttachState::Attached {
            return None;
        }
        inner.feature.as_mut().map(f)
    }
}

fn lock_inner<F>(inner: &Mutex<HandleInner<F>>) -> MutexGuard<'_, HandleInner<F>> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

fn detach_inner<F: ViewBoundFeature>(inner: &Mutex<HandleInner<F>>) {
    let (feature, registration) = {
        let mut guard = lock_inner(inner);
        if guard.state != AttachState::Attached {
            return;
        }
        guard.state = AttachState::Detached;
        guard.view = Weak::new();
        (guard.feature.take(), guard.registration.take())
    };

    // No-op when the owner is the one tearing us down
    if let Some((owner, key)) = registration {
        if let Some(owner) = owner.upgrade() {
            owner.remove_observer(key);
        }
    }

    if let Some(mut feature) = feature {
        feature.detach();
        log::debug!("[Feature] {} detached", F::NAME);
    }
}

/// Lets spawned observer tasks run to quiescence on the test runtime.
#[cfg(test)]
pub(crate) async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
