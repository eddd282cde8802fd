// ============================================================================
// spark-groups - Close Signal
// External teardown trigger for grouped collections and subset views
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use crate::reactivity::emitter::{Emitter, Event};
use crate::reactivity::subscription::Subscription;

/// Teardown notifications a close signal can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Close,
    Destroy,
}

impl Event for Lifecycle {
    type Kind = Lifecycle;

    fn kind(&self) -> Lifecycle {
        *self
    }
}

/// An event source whose `close` or `destroy` tears down whatever observes it.
///
/// Typically owned by whatever outlives the grouped collection (a screen, a
/// session, a request). Both notifications mean the same thing to observers.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_groups::CloseSignal;
///
/// let signal = CloseSignal::new();
/// let closed = Rc::new(Cell::new(0));
///
/// signal.on_close({
///     let closed = closed.clone();
///     move || closed.set(closed.get() + 1)
/// });
///
/// signal.close();
/// signal.destroy();
/// assert_eq!(closed.get(), 2);
/// ```
#[derive(Clone)]
pub struct CloseSignal {
    emitter: Emitter<Lifecycle>,
    fired: Rc<Cell<bool>>,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self {
            emitter: Emitter::new("close-signal"),
            fired: Rc::new(Cell::new(false)),
        }
    }

    /// Emit `close`.
    pub fn close(&self) {
        self.fire(Lifecycle::Close);
    }

    /// Emit `destroy`.
    pub fn destroy(&self) {
        self.fire(Lifecycle::Destroy);
    }

    fn fire(&self, event: Lifecycle) {
        self.fired.set(true);
        self.emitter.emit(&event);
    }

    /// Run `f` on either `close` or `destroy`.
    pub fn on_close<F>(&self, f: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.emitter.on_any(move |_| f())
    }

    /// Listen to one lifecycle notification only.
    pub fn on<F>(&self, kind: Lifecycle, f: F) -> Subscription
    where
        F: Fn(&Lifecycle) + 'static,
    {
        self.emitter.on(kind, f)
    }

    /// Whether `close` or `destroy` has been emitted at least once.
    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }

    pub fn listener_count(&self) -> usize {
        self.emitter.listener_count()
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CloseSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseSignal")
            .field("fired", &self.has_fired())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
