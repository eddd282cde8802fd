// ============================================================================
// spark-groups - Listener Scope
//
// Own subscriptions so they can be revoked together.
// ============================================================================
//
// A ListenerScope is the teardown handle for everything a grouping makes:
// every subscription it holds is revoked exactly once when the scope stops.
//
// Key features:
// - adopt(subscription) - Take ownership of a subscription
// - run(fn) - Execute function with this scope active
// - stop() - Revoke all subscriptions, run cleanups, stop children
// - Nested scopes (scopes created inside run() are stopped with the parent)
// - Detached scopes (opt out of parent collection)
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::reactivity::subscription::Subscription;

// =============================================================================
// THREAD-LOCAL SCOPE STATE
// =============================================================================

thread_local! {
    /// Currently active scope (if any)
    static ACTIVE_SCOPE: RefCell<Option<Rc<ListenerScopeInner>>> = const { RefCell::new(None) };
}

fn get_active_scope() -> Option<Rc<ListenerScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.borrow().clone())
}

/// Set the active scope, returning the previous one
fn set_active_scope(scope: Option<Rc<ListenerScopeInner>>) -> Option<Rc<ListenerScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.replace(scope))
}

/// Restores the previously active scope, also on unwind.
struct ActiveScopeGuard {
    prev: Option<Option<Rc<ListenerScopeInner>>>,
}

impl Drop for ActiveScopeGuard {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            set_active_scope(prev);
        }
    }
}

// =============================================================================
// CLEANUP TYPE
// =============================================================================

/// Cleanup function type for scope disposal
pub type ScopeCleanupFn = Box<dyn FnOnce()>;

// =============================================================================
// LISTENER SCOPE INNER
// =============================================================================

pub struct ListenerScopeInner {
    /// Cleared by the first stop()
    active: Cell<bool>,

    subscriptions: RefCell<Vec<Subscription>>,

    /// Cleanup functions to run on stop
    cleanups: RefCell<Vec<ScopeCleanupFn>>,

    parent: RefCell<Option<Weak<ListenerScopeInner>>>,

    children: RefCell<Vec<Rc<ListenerScopeInner>>>,

    /// Self-reference for run() and for detaching from the parent
    self_weak: RefCell<Weak<ListenerScopeInner>>,
}

impl ListenerScopeInner {
    fn new(detached: bool) -> Rc<Self> {
        let parent = if detached { None } else { get_active_scope() };

        let scope = Rc::new(Self {
            active: Cell::new(true),
            subscriptions: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: RefCell::new(parent.as_ref().map(Rc::downgrade)),
            children: RefCell::new(Vec::new()),
            self_weak: RefCell::new(Weak::new()),
        });

        *scope.self_weak.borrow_mut() = Rc::downgrade(&scope);

        // A stopped parent cannot adopt; the child stays standalone
        if let Some(parent_scope) = parent.filter(|p| p.is_active()) {
            parent_scope.children.borrow_mut().push(scope.clone());
        }

        scope
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        if !self.active.get() {
            return None;
        }

        let self_rc = self.self_weak.borrow().upgrade()?;

        let _guard = ActiveScopeGuard {
            prev: Some(set_active_scope(Some(self_rc))),
        };
        Some(f())
    }

    /// Revoke everything. Idempotent; re-entrant calls return immediately.
    pub fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }

        let subscriptions: Vec<_> = self.subscriptions.borrow_mut().drain(..).collect();
        let revoked = subscriptions.iter().filter(|s| s.unsubscribe()).count();

        // Reverse order for proper nesting
        let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
        let cleanup_count = cleanups.len();
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }

        let children: Vec<_> = self.children.borrow_mut().drain(..).collect();
        let child_count = children.len();
        for child in children {
            child.stop();
        }

        // Detach from the parent
        let parent = self.parent.borrow_mut().take().and_then(|w| w.upgrade());
        if let Some(parent) = parent {
            let self_ptr = self as *const Self;
            let removed = {
                let mut siblings = parent.children.borrow_mut();
                siblings
                    .iter()
                    .position(|s| Rc::as_ptr(s) == self_ptr)
                    .map(|index| siblings.remove(index))
            };
            drop(removed);
        }

        debug!(
            subscriptions = revoked,
            cleanups = cleanup_count,
            children = child_count,
            "listener scope stopped"
        );
    }

    /// Take ownership of a subscription. Revoked at once if already stopped.
    pub fn adopt(&self, subscription: Subscription) {
        if self.active.get() {
            self.subscriptions.borrow_mut().push(subscription);
        } else {
            subscription.unsubscribe();
        }
    }

    /// Register a cleanup. Runs at once if already stopped.
    pub fn add_cleanup(&self, cleanup: ScopeCleanupFn) {
        if self.active.get() {
            self.cleanups.borrow_mut().push(cleanup);
        } else {
            cleanup();
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }
}

impl Drop for ListenerScopeInner {
    fn drop(&mut self) {
        if self.active.get() {
            self.stop();
        }
    }
}

// =============================================================================
// LISTENER SCOPE (Public wrapper)
// =============================================================================

/// Owns subscriptions and cleanups and revokes them together.
///
/// # Example
///
/// ```
/// use spark_groups::{CloseSignal, ListenerScope};
///
/// let signal = CloseSignal::new();
/// let scope = ListenerScope::new();
///
/// scope.adopt(signal.on_close(|| {}));
/// assert_eq!(signal.listener_count(), 1);
///
/// scope.stop();
/// assert_eq!(signal.listener_count(), 0);
///
/// // Stopping again is a no-op
/// scope.stop();
/// ```
#[derive(Clone)]
pub struct ListenerScope {
    inner: Rc<ListenerScopeInner>,
}

impl ListenerScope {
    fn from_inner(inner: Rc<ListenerScopeInner>) -> Self {
        Self { inner }
    }

    /// Create a scope. If another scope is running, the new scope becomes its
    /// child and is stopped along with it.
    pub fn new() -> Self {
        Self::from_inner(ListenerScopeInner::new(false))
    }

    /// Create a scope that no parent will stop.
    pub fn detached() -> Self {
        Self::from_inner(ListenerScopeInner::new(true))
    }

    /// Whether the scope is still active (not stopped)
    pub fn active(&self) -> bool {
        self.inner.is_active()
    }

    /// Run a function with this scope active.
    ///
    /// Scopes created during execution become children of this one.
    /// Returns None if the scope has been stopped.
    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        self.inner.run(f)
    }

    /// Stop the scope.
    ///
    /// - All adopted subscriptions are revoked
    /// - All cleanup callbacks are run (in reverse order)
    /// - All child scopes are stopped
    ///
    /// After stopping, `run()` returns None, and anything adopted later is
    /// revoked immediately.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn adopt(&self, subscription: Subscription) {
        self.inner.adopt(subscription);
    }

    pub fn add_cleanup<F: FnOnce() + 'static>(&self, cleanup: F) {
        self.inner.add_cleanup(Box::new(cleanup));
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.subscription_count()
    }

    pub fn child_count(&self) -> usize {
        self.inner.child_count()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ListenerScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ListenerScope {
    fn drop(&mut self) {
        // Auto-stop if this is the last strong reference
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.stop();
        }
    }
}

impl std::fmt::Debug for ListenerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerScope")
            .field("active", &self.active())
            .field("subscriptions", &self.subscription_count())
            .field("children", &self.child_count())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Get the currently running scope, if any.
pub fn current_scope() -> Option<ListenerScope> {
    get_active_scope().map(ListenerScope::from_inner)
}

/// Register a cleanup on the currently running scope.
///
/// Does nothing outside of a scope's `run()`.
pub fn on_dispose<F: FnOnce() + 'static>(f: F) {
    if let Some(scope) = get_active_scope() {
        scope.add_cleanup(Box::new(f));
    } else {
        debug!("on_dispose() called outside of a listener scope");
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::close::CloseSignal;

    #[test]
    fn stop_revokes_adopted_subscriptions() {
        let signal = CloseSignal::new();
        let scope = ListenerScope::new();

        scope.adopt(signal.on_close(|| {}));
        scope.adopt(signal.on_close(|| {}));
        assert_eq!(scope.subscription_count(), 2);
        assert_eq!(signal.listener_count(), 2);

        scope.stop();
        assert!(!scope.active());
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn adopt_after_stop_revokes_immediately() {
        let signal = CloseSignal::new();
        let scope = ListenerScope::new();
        scope.stop();

        scope.adopt(signal.on_close(|| {}));
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn current_scope_only_inside_run() {
        assert!(current_scope().is_none());

        let scope = ListenerScope::new();
        let inside = scope.run(|| current_scope().is_some_and(|s| s.ptr_eq(&scope)));

        assert_eq!(inside, Some(true));
        assert!(current_scope().is_none());
    }

    #[test]
    fn stopped_scope_run_returns_none() {
        let scope = ListenerScope::new();
        scope.stop();
        assert_eq!(scope.run(|| 42), None);
    }

    #[test]
    fn cleanups_run_in_reverse_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let scope = ListenerScope::new();

        scope.run(|| {
            for n in 1..=3 {
                let order = order.clone();
                on_dispose(move || order.borrow_mut().push(n));
            }
        });

        scope.stop();
        assert_eq!(*order.borrow(), vec![3, 2, 1]);
    }

    #[test]
    fn children_stop_with_parent() {
        let signal = CloseSignal::new();
        let parent = ListenerScope::new();

        let child = parent
            .run(|| {
                let child = ListenerScope::new();
                child.adopt(signal.on_close(|| {}));
                child
            })
            .unwrap();

        assert_eq!(parent.child_count(), 1);
        parent.stop();

        assert!(!child.active());
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn stopped_child_leaves_parent() {
        let parent = ListenerScope::new();
        let child = parent.run(ListenerScope::new).unwrap();

        assert_eq!(parent.child_count(), 1);
        child.stop();
        assert_eq!(parent.child_count(), 0);
        assert!(parent.active());
    }

    #[test]
    fn detached_scope_survives_parent() {
        let parent = ListenerScope::new();
        let detached = parent.run(ListenerScope::detached).unwrap();

        parent.stop();
        assert!(detached.active());
    }

    #[test]
    fn drop_of_last_handle_stops() {
        let signal = CloseSignal::new();
        {
            let scope = ListenerScope::new();
            scope.adopt(signal.on_close(|| {}));
            let clone = scope.clone();
            drop(clone);
            assert_eq!(signal.listener_count(), 1);
        }
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn stop_from_inside_cleanup_is_harmless() {
        let scope = ListenerScope::new();
        let again = scope.clone();
        scope.add_cleanup(move || again.stop());
        scope.stop();
        assert!(!scope.active());
    }
}
