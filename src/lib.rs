// ============================================================================
// spark-groups - Live Grouped Views for Rust
// ============================================================================
//
// Group the records of an OrderedCollection by a key and keep the grouping
// current as records are added, removed, edited, or replaced wholesale.
// Each group owns a SubsetView of its members; groups appear with their
// first member and disappear with their last.
// ============================================================================

pub mod collections;
pub mod core;
pub mod grouping;
pub mod reactivity;

// Re-export core items at crate root for ergonomic access
pub use crate::core::context::{dispatch_depth, dispatched_events, is_dispatching, DispatchContext};
pub use crate::core::error::{ConfigurationError, Result};
pub use crate::core::types::{Comparator, GroupByFn, GroupKey, Keyed, ListenerId, Predicate};

// Re-export reactivity
pub use reactivity::close::{CloseSignal, Lifecycle};
pub use reactivity::emitter::{AnyEmitter, Emitter, Event};
pub use reactivity::scope::{current_scope, on_dispose, ListenerScope, ScopeCleanupFn};
pub use reactivity::subscription::Subscription;

// Re-export collections
pub use collections::{
    CollectionEvent, CollectionEventKind, OrderedCollection, SubsetEvent, SubsetEventKind,
    SubsetOptions, SubsetView, WeakSubsetView,
};

// Re-export grouping
pub use grouping::{
    build_grouped_collection, log_diagnostic, Diagnostic, DiagnosticSink, Group, GroupBlueprint,
    GroupEntity, GroupFactory, GroupSynchronizer, GroupedCollection, GroupingConfig,
};

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Debug, PartialEq)]
    struct Member {
        id: u32,
        club: &'static str,
    }

    impl Keyed for Member {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn member(id: u32, club: &'static str) -> Member {
        Member { id, club }
    }

    #[test]
    fn root_exports_build_a_grouping() {
        let members = OrderedCollection::from_records([
            member(1, "Penguins"),
            member(2, "Penguins"),
            member(3, "Panthers"),
        ]);
        let signal = CloseSignal::new();

        let clubs = build_grouped_collection(
            GroupingConfig::new()
                .collection(&members)
                .group_by(|m: &Member| m.club)
                .close_with(signal.clone()),
        )
        .unwrap();

        assert_eq!(clubs.keys(), vec!["Penguins", "Panthers"]);
        signal.close();
        assert!(clubs.is_closed());
    }

    #[test]
    fn grouping_events_are_observable() {
        let members = OrderedCollection::new();
        let clubs = GroupingConfig::new()
            .collection(&members)
            .group_by(|m: &Member| m.club)
            .on_diagnostic(|_| {})
            .build()
            .unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let _sub = clubs.on_any({
            let log = log.clone();
            move |event: &CollectionEvent<Group<&'static str, Member>>| {
                log.borrow_mut().push(event.kind());
            }
        });

        members.add(member(1, "Penguins"));
        members.remove(&1);

        assert_eq!(
            *log.borrow(),
            vec![CollectionEventKind::Add, CollectionEventKind::Remove]
        );
    }

    #[test]
    fn dispatch_depth_is_zero_when_idle() {
        assert_eq!(dispatch_depth(), 0);
        assert!(!is_dispatching());
    }

    #[test]
    fn grouping_inside_scope_stops_with_scope() {
        let members = OrderedCollection::from_records([member(1, "Penguins")]);
        let scope = ListenerScope::new();

        let clubs = scope
            .run(|| {
                GroupingConfig::new()
                    .collection(&members)
                    .group_by(|m: &Member| m.club)
                    .on_diagnostic(|_| {})
                    .build()
            })
            .unwrap()
            .unwrap();

        scope.stop();
        assert_eq!(members.listener_count(), 0);

        // Stopped from outside; explicit close still works
        clubs.close();
        assert!(clubs.is_closed());
    }
}
