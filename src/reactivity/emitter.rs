// ============================================================================
// spark-groups - Emitter
//
// Listener registry with synchronous, snapshot-based dispatch.
// ============================================================================
//
// Every observable in the crate (ordered collections, subset views, close
// signals) owns one `Emitter`. Dispatch collects the matching listeners first
// and calls them afterwards, so a handler may freely subscribe, unsubscribe,
// or mutate other collections while the event is in flight:
//
// - Listeners added during a dispatch do not see that event
// - Listeners removed during a dispatch are skipped if not yet reached
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::core::context::DispatchGuard;
use crate::core::types::ListenerId;
use crate::reactivity::subscription::Subscription;

// =============================================================================
// EVENT TRAIT
// =============================================================================

/// An event that can be filtered by kind.
pub trait Event: 'static {
    type Kind: Copy + Eq + Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

// =============================================================================
// ANY EMITTER (type-erased)
// =============================================================================

/// Type-erased view of an emitter, so subscriptions to different event types
/// can live in the same scope.
pub trait AnyEmitter {
    /// Remove a listener. Returns false if it was already gone.
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Whether a listener is still registered
    fn has_listener(&self, id: ListenerId) -> bool;

    /// Number of registered listeners
    fn listener_count(&self) -> usize;

    /// Label used in logs
    fn label(&self) -> &'static str;
}

// =============================================================================
// LISTENER
// =============================================================================

struct Listener<E: Event> {
    id: ListenerId,
    /// None listens to every kind
    kind: Option<E::Kind>,
    /// Cleared on removal so an in-flight snapshot skips it
    active: Cell<bool>,
    handler: Box<dyn Fn(&E)>,
}

impl<E: Event> Listener<E> {
    fn matches(&self, kind: E::Kind) -> bool {
        self.kind.is_none_or(|k| k == kind)
    }
}

// =============================================================================
// EMITTER INNER
// =============================================================================

pub struct EmitterInner<E: Event> {
    label: &'static str,
    listeners: RefCell<Vec<Rc<Listener<E>>>>,
    next_id: Cell<u64>,
}

impl<E: Event> EmitterInner<E> {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    fn allocate_id(&self) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ListenerId(id)
    }
}

impl<E: Event> AnyEmitter for EmitterInner<E> {
    fn remove_listener(&self, id: ListenerId) -> bool {
        // Release the borrow before the handler drops: its captures may
        // unsubscribe from this same emitter.
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners
                .iter()
                .position(|l| l.id == id)
                .map(|index| listeners.remove(index))
        };
        match removed {
            Some(listener) => {
                listener.active.set(false);
                true
            }
            None => false,
        }
    }

    fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|l| l.id == id)
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

// =============================================================================
// EMITTER (Public handle)
// =============================================================================

/// A synchronous event emitter.
///
/// Cloning yields another handle to the same listener registry.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_groups::{Emitter, Lifecycle};
///
/// let emitter: Emitter<Lifecycle> = Emitter::new("lifecycle");
/// let seen = Rc::new(Cell::new(0));
///
/// let sub = emitter.on(Lifecycle::Close, {
///     let seen = seen.clone();
///     move |_| seen.set(seen.get() + 1)
/// });
///
/// emitter.emit(&Lifecycle::Close);
/// emitter.emit(&Lifecycle::Destroy);
/// assert_eq!(seen.get(), 1);
///
/// sub.unsubscribe();
/// emitter.emit(&Lifecycle::Close);
/// assert_eq!(seen.get(), 1);
/// ```
pub struct Emitter<E: Event> {
    inner: Rc<EmitterInner<E>>,
}

impl<E: Event> Emitter<E> {
    /// Create an emitter. The label only shows up in trace logs.
    pub fn new(label: &'static str) -> Self {
        Self {
            inner: Rc::new(EmitterInner::new(label)),
        }
    }

    fn register(&self, kind: Option<E::Kind>, handler: Box<dyn Fn(&E)>) -> Subscription {
        let id = self.inner.allocate_id();
        self.inner.listeners.borrow_mut().push(Rc::new(Listener {
            id,
            kind,
            active: Cell::new(true),
            handler,
        }));
        Subscription::new(Rc::downgrade(&self.inner) as Weak<dyn AnyEmitter>, id)
    }

    /// Listen to one kind of event.
    pub fn on<F>(&self, kind: E::Kind, handler: F) -> Subscription
    where
        F: Fn(&E) + 'static,
    {
        self.register(Some(kind), Box::new(handler))
    }

    /// Listen to every event.
    pub fn on_any<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + 'static,
    {
        self.register(None, Box::new(handler))
    }

    /// Remove a listener by id. Returns false if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.remove_listener(id)
    }

    /// Remove every listener.
    pub fn clear(&self) {
        let removed: Vec<_> = self.inner.listeners.borrow_mut().drain(..).collect();
        for listener in removed {
            listener.active.set(false);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }

    /// Dispatch an event to every matching listener, in registration order.
    ///
    /// Returns the number of listeners that ran.
    pub fn emit(&self, event: &E) -> usize {
        let kind = event.kind();

        // Collect first, call after: handlers may touch the registry
        let snapshot: Vec<Rc<Listener<E>>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.matches(kind))
            .cloned()
            .collect();

        if snapshot.is_empty() {
            return 0;
        }

        let guard = DispatchGuard::enter();
        trace!(
            emitter = self.inner.label,
            ?kind,
            listeners = snapshot.len(),
            depth = guard.depth(),
            "dispatching event"
        );

        let mut delivered = 0;
        for listener in snapshot {
            if listener.active.get() {
                (listener.handler)(event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Whether two handles share a registry.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E: Event> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Event> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("label", &self.inner.label)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
