// ============================================================================
// spark-groups - Dispatch Context
// Thread-local state describing the event dispatch in progress
// ============================================================================

use std::cell::Cell;

// =============================================================================
// DISPATCH CONTEXT
// =============================================================================

/// Thread-local dispatch state.
///
/// Emitters enter the context around every dispatch. A handler that mutates
/// another collection triggers a nested dispatch, which shows up here as a
/// deeper level.
pub struct DispatchContext {
    /// Number of dispatches currently on the stack
    pub depth: Cell<u32>,

    /// Deepest nesting seen since the thread started
    pub max_depth: Cell<u32>,

    /// Total events dispatched on this thread
    pub dispatched: Cell<u64>,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self {
            depth: Cell::new(0),
            max_depth: Cell::new(0),
            dispatched: Cell::new(0),
        }
    }

    /// Enter a dispatch, returning the new depth
    pub fn enter(&self) -> u32 {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        if depth > self.max_depth.get() {
            self.max_depth.set(depth);
        }
        self.dispatched.set(self.dispatched.get() + 1);
        depth
    }

    /// Leave a dispatch, returning the new depth
    pub fn exit(&self) -> u32 {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        depth
    }

    pub fn get_depth(&self) -> u32 {
        self.depth.get()
    }

    pub fn get_max_depth(&self) -> u32 {
        self.max_depth.get()
    }

    pub fn get_dispatched(&self) -> u64 {
        self.dispatched.get()
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: DispatchContext = DispatchContext::new();
}

/// Access the thread-local dispatch context.
pub fn with_context<R>(f: impl FnOnce(&DispatchContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Guard that keeps the dispatch depth raised until dropped.
///
/// Dropping on unwind keeps the depth balanced when a handler panics.
pub(crate) struct DispatchGuard {
    depth: u32,
}

impl DispatchGuard {
    pub(crate) fn enter() -> Self {
        Self {
            depth: with_context(|ctx| ctx.enter()),
        }
    }

    pub(crate) fn depth(&self) -> u32 {
        self.depth
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        with_context(|ctx| ctx.exit());
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Current dispatch nesting depth (0 when no event is in flight)
pub fn dispatch_depth() -> u32 {
    with_context(|ctx| ctx.get_depth())
}

/// Whether an event is currently being dispatched on this thread
pub fn is_dispatching() -> bool {
    dispatch_depth() > 0
}

/// Total number of events dispatched on this thread
pub fn dispatched_events() -> u64 {
    with_context(|ctx| ctx.get_dispatched())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_starts_idle() {
        let ctx = DispatchContext::new();
        assert_eq!(ctx.get_depth(), 0);
        assert_eq!(ctx.get_max_depth(), 0);
        assert_eq!(ctx.get_dispatched(), 0);
    }

    #[test]
    fn enter_and_exit_nest() {
        let ctx = DispatchContext::new();

        assert_eq!(ctx.enter(), 1);
        assert_eq!(ctx.enter(), 2);
        assert_eq!(ctx.exit(), 1);
        assert_eq!(ctx.exit(), 0);

        // Never underflows
        assert_eq!(ctx.exit(), 0);

        assert_eq!(ctx.get_max_depth(), 2);
        assert_eq!(ctx.get_dispatched(), 2);
    }

    #[test]
    fn guard_restores_depth() {
        assert!(!is_dispatching());
        {
            let outer = DispatchGuard::enter();
            assert_eq!(outer.depth(), 1);
            {
                let inner = DispatchGuard::enter();
                assert_eq!(inner.depth(), 2);
                assert_eq!(dispatch_depth(), 2);
            }
            assert_eq!(dispatch_depth(), 1);
        }
        assert!(!is_dispatching());
    }

    #[test]
    fn guard_counts_dispatches() {
        let before = dispatched_events();
        drop(DispatchGuard::enter());
        drop(DispatchGuard::enter());
        assert_eq!(dispatched_events(), before + 2);
    }
}
