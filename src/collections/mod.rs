// ============================================================================
// spark-groups - Collections
// Ordered keyed collections and live filtered views over them
// ============================================================================
//
// Two building blocks for the grouping engine:
//
// 1. OrderedCollection: keyed records, insertion- or comparator-ordered,
//    announcing add/remove/change/reset
// 2. SubsetView: a predicate-filtered mirror of an OrderedCollection that
//    announces membership changes, including when it becomes empty
// ============================================================================

mod ordered;
mod subset;

pub use ordered::{CollectionEvent, CollectionEventKind, OrderedCollection};
pub use subset::{SubsetEvent, SubsetEventKind, SubsetOptions, SubsetView, WeakSubsetView};
