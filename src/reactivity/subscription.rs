// ============================================================================
// spark-groups - Subscription
// Revocable handle to one registered listener
// ============================================================================

use std::rc::Weak;

use crate::core::types::ListenerId;
use crate::reactivity::emitter::AnyEmitter;

/// Handle to a registered listener.
///
/// Holds the emitter weakly: a subscription never keeps its emitter alive.
/// Dropping the handle does NOT remove the listener; call `unsubscribe()` or
/// hand the subscription to a `ListenerScope`, which revokes it on stop.
pub struct Subscription {
    emitter: Weak<dyn AnyEmitter>,
    id: ListenerId,
}

impl Subscription {
    pub(crate) fn new(emitter: Weak<dyn AnyEmitter>, id: ListenerId) -> Self {
        Self { emitter, id }
    }

    /// The listener's id within its emitter.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener.
    ///
    /// Returns true if this call removed it; false if it was already removed
    /// or the emitter is gone. Safe to call any number of times.
    pub fn unsubscribe(&self) -> bool {
        match self.emitter.upgrade() {
            Some(emitter) => emitter.remove_listener(self.id),
            None => false,
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.emitter
            .upgrade()
            .is_some_and(|emitter| emitter.has_listener(self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = self.emitter.upgrade().map(|e| e.label());
        f.debug_struct("Subscription")
            .field("emitter", &label)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
