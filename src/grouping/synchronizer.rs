// ============================================================================
// spark-groups - Group Synchronizer
// Keeps the grouping collection in step with the base collection
// ============================================================================
//
// The synchronizer only guarantees that every key has a home group and that
// drained groups go away. Membership itself is maintained by each group's
// SubsetView, which listens to the base collection on its own.
//
// The synchronizer subscribes to the base collection before any group view
// exists, so for every base event it runs first:
//
// - Add/Change: the record's group is created if missing; a new view is
//   built from the already-updated base and so already holds the record
// - Remove: the group's view still holds the record; when the view drops
//   it and drains, its Emptied notification removes the group
// - Reset: old views are stopped before they see the event, then replaced
// ============================================================================

use std::cell::Cell;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use tracing::debug;

use crate::collections::{CollectionEvent, CollectionEventKind, OrderedCollection, SubsetView};
use crate::core::types::Keyed;
use crate::grouping::diagnostic::{Diagnostic, DiagnosticSink};
use crate::grouping::group::{GroupBlueprint, GroupEntity};
use crate::reactivity::close::CloseSignal;
use crate::reactivity::scope::ListenerScope;

/// The reactive core of a grouped collection.
///
/// Owns the grouping collection and every group's view. All subscriptions it
/// makes live in one `ListenerScope`; group views are child scopes of it, so
/// `teardown()` releases everything at once.
pub struct GroupSynchronizer<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    blueprint: GroupBlueprint<T, G>,
    groups: OrderedCollection<G>,
    scope: ListenerScope,
    diagnostics: DiagnosticSink,
    closed: Cell<bool>,
    self_weak: Weak<Self>,
}

impl<T, G> GroupSynchronizer<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    /// Subscribe to the base collection (and the close signal), then
    /// populate `groups` from the base collection's current records.
    pub(crate) fn attach(
        blueprint: GroupBlueprint<T, G>,
        groups: OrderedCollection<G>,
        close_with: Option<CloseSignal>,
        diagnostics: DiagnosticSink,
    ) -> Rc<Self> {
        let sync = Rc::new_cyclic(|self_weak| Self {
            blueprint,
            groups,
            scope: ListenerScope::new(),
            diagnostics,
            closed: Cell::new(false),
            self_weak: self_weak.clone(),
        });

        sync.listen(CollectionEventKind::Add, |sync, event| {
            if let CollectionEvent::Add(record) = event {
                sync.on_add(record);
            }
        });
        sync.listen(CollectionEventKind::Change, |sync, event| {
            if let CollectionEvent::Change { current, .. } = event {
                sync.on_change(current);
            }
        });
        sync.listen(CollectionEventKind::Remove, |sync, event| {
            if let CollectionEvent::Remove(record) = event {
                sync.on_remove(record);
            }
        });
        sync.listen(CollectionEventKind::Reset, |sync, event| {
            if let CollectionEvent::Reset { current, .. } = event {
                sync.on_reset(current);
            }
        });

        match close_with {
            Some(signal) => {
                let weak = sync.self_weak.clone();
                sync.scope.adopt(signal.on_close(move || {
                    if let Some(sync) = weak.upgrade() {
                        sync.teardown();
                    }
                }));
            }
            None => sync.report(Diagnostic::MissingCloseSignal),
        }

        let records = sync.blueprint.collection.to_vec();
        sync.on_reset(&records);
        sync
    }

    fn listen(&self, kind: CollectionEventKind, handler: fn(&Self, &CollectionEvent<T>)) {
        let weak = self.self_weak.clone();
        self.scope
            .adopt(self.blueprint.collection.on(kind, move |event| {
                if let Some(sync) = weak.upgrade() {
                    handler(&sync, event);
                }
            }));
    }

    fn report(&self, diagnostic: Diagnostic) {
        (self.diagnostics)(&diagnostic);
    }

    // =========================================================================
    // HANDLERS
    // =========================================================================

    /// A record was inserted: make sure its group exists.
    pub fn on_add(&self, record: &T) {
        if self.is_closed() {
            return;
        }
        let key = self.blueprint.key_of(record);
        self.ensure_group(key);
    }

    /// A record was edited: make sure the group for its current key exists.
    ///
    /// The group it left (if any) is removed by its view draining.
    pub fn on_change(&self, record: &T) {
        self.on_add(record);
    }

    /// A record was removed: drop its group if the group's view is empty.
    ///
    /// `record` is the state before removal. A missing group is ignored.
    pub fn on_remove(&self, record: &T) {
        if self.is_closed() {
            return;
        }
        let key = self.blueprint.key_of(record);
        let Some(group) = self.groups.get(&key) else {
            return;
        };
        if group.members().is_empty() {
            self.destroy_group(&key);
        }
    }

    /// Rebuild every group from `records`.
    ///
    /// Groups are created in the order their keys first appear (the grouping
    /// collection's comparator, if any, reorders them). Previous groups are
    /// stopped first.
    pub fn on_reset(&self, records: &[T]) {
        if self.is_closed() {
            return;
        }
        let keys: IndexSet<G::Id> = records
            .iter()
            .map(|record| self.blueprint.key_of(record))
            .collect();

        let stale = self.groups.to_vec();
        for group in &stale {
            group.members().stop();
        }

        let fresh: Vec<G> = keys
            .into_iter()
            .filter_map(|key| self.create_group(key))
            .collect();

        debug!(
            released = stale.len(),
            created = fresh.len(),
            "grouping rebuilt"
        );
        self.groups.reset(fresh);
    }

    /// A group's view drained: drop the group if it is still in the grouping
    /// collection, still owns the same view, and is still empty.
    pub fn on_subset_emptied(&self, group: &G) {
        self.subset_emptied(&group.id(), group.members());
    }

    fn subset_emptied(&self, key: &G::Id, view: &SubsetView<T>) {
        if self.is_closed() {
            return;
        }
        let Some(current) = self.groups.get(key) else {
            return;
        };
        if current.members().ptr_eq(view) && view.is_empty() {
            self.destroy_group(key);
        }
    }

    // =========================================================================
    // GROUP LIFECYCLE
    // =========================================================================

    fn ensure_group(&self, key: G::Id) {
        if self.groups.contains(&key) {
            return;
        }
        if let Some(group) = self.create_group(key) {
            self.groups.add(group);
        }
    }

    /// Build a group whose view is a child of this synchronizer's scope.
    /// None once torn down.
    fn create_group(&self, key: G::Id) -> Option<G> {
        let weak = self.self_weak.clone();
        let group = self.scope.run(|| {
            self.blueprint.create_group(key, move |key, view| {
                if let Some(sync) = weak.upgrade() {
                    sync.subset_emptied(key, view);
                }
            })
        })?;
        debug!(key = ?group.id(), members = group.members().len(), "group created");
        Some(group)
    }

    fn destroy_group(&self, key: &G::Id) {
        if let Some(group) = self.groups.remove(key) {
            group.members().stop();
            debug!(key = ?key, "group destroyed");
        }
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Release every subscription made by this synchronizer and its group
    /// views. The grouping collection keeps its last contents. Idempotent.
    pub fn teardown(&self) {
        if self.closed.replace(true) {
            return;
        }
        for group in self.groups.to_vec() {
            group.members().stop();
        }
        self.scope.stop();
        debug!(groups = self.groups.len(), "grouping torn down");
    }

    /// Whether `teardown()` ran or an enclosing scope stopped this grouping.
    pub fn is_closed(&self) -> bool {
        self.closed.get() || !self.scope.active()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The grouping collection.
    pub fn groups(&self) -> &OrderedCollection<G> {
        &self.groups
    }

    /// The base collection being grouped.
    pub fn collection(&self) -> &OrderedCollection<T> {
        &self.blueprint.collection
    }

    /// Group key of a record.
    pub fn key_of(&self, record: &T) -> G::Id {
        self.blueprint.key_of(record)
    }

    /// The scope owning every subscription made for this grouping.
    pub fn scope(&self) -> &ListenerScope {
        &self.scope
    }
}

impl<T, G> Drop for GroupSynchronizer<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// TESTS
// =============================================================================
