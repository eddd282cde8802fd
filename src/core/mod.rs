// ============================================================================
// spark-groups - Core Module
// Fundamental types, errors, and dispatch context
// ============================================================================

pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use context::{dispatch_depth, dispatched_events, is_dispatching, with_context, DispatchContext};
pub use error::{ConfigurationError, Result};
pub use types::{Comparator, GroupByFn, GroupKey, Keyed, ListenerId, Predicate};
