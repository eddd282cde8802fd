// ============================================================================
// spark-groups - Reactivity Module
// Event emission, revocable subscriptions, and teardown scopes
// ============================================================================

pub mod close;
pub mod emitter;
pub mod scope;
pub mod subscription;

pub use close::{CloseSignal, Lifecycle};
pub use emitter::{AnyEmitter, Emitter, Event};
pub use scope::{current_scope, on_dispose, ListenerScope, ScopeCleanupFn};
pub use subscription::Subscription;
