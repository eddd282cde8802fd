// ============================================================================
// spark-groups - SubsetView
// A live, filtered view over an OrderedCollection
// ============================================================================
//
// The view keeps its own copy of the matching records and maintains it from
// the source's events:
//
// - Add:    insert if the predicate matches (idempotent by id)
// - Remove: drop if it was a member
// - Change: re-evaluate; join, leave, or update in place
// - Reset:  refilter from scratch
//
// Every transition from non-empty to empty is announced with `Emptied`,
// whatever caused it.
// ============================================================================

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::collections::ordered::{CollectionEvent, OrderedCollection};
use crate::core::types::{Comparator, Keyed, ListenerId, Predicate};
use crate::reactivity::close::CloseSignal;
use crate::reactivity::emitter::{Emitter, Event};
use crate::reactivity::scope::ListenerScope;
use crate::reactivity::subscription::Subscription;

// =============================================================================
// EVENTS
// =============================================================================

/// Membership changes of a subset view.
#[derive(Debug, Clone, PartialEq)]
pub enum SubsetEvent<T> {
    /// A record joined the view.
    Add(T),
    /// A record left the view (removed from the source, or no longer matches).
    Remove(T),
    /// A member was edited and still matches.
    Change { previous: T, current: T },
    /// The view was rebuilt from the source.
    Reset,
    /// The view went from non-empty to empty.
    Emptied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubsetEventKind {
    Add,
    Remove,
    Change,
    Reset,
    Emptied,
}

impl<T: 'static> Event for SubsetEvent<T> {
    type Kind = SubsetEventKind;

    fn kind(&self) -> SubsetEventKind {
        match self {
            SubsetEvent::Add(_) => SubsetEventKind::Add,
            SubsetEvent::Remove(_) => SubsetEventKind::Remove,
            SubsetEvent::Change { .. } => SubsetEventKind::Change,
            SubsetEvent::Reset => SubsetEventKind::Reset,
            SubsetEvent::Emptied => SubsetEventKind::Emptied,
        }
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for a subset view.
pub struct SubsetOptions<T> {
    /// Order members by this instead of by source order.
    pub comparator: Option<Comparator<T>>,

    /// Stop the view when this signal closes.
    pub close_with: Option<CloseSignal>,
}

impl<T> SubsetOptions<T> {
    pub fn new() -> Self {
        Self {
            comparator: None,
            close_with: None,
        }
    }

    pub fn comparator<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'static,
    {
        self.comparator = Some(Rc::new(compare));
        self
    }

    pub fn close_with(mut self, signal: CloseSignal) -> Self {
        self.close_with = Some(signal);
        self
    }
}

impl<T> Default for SubsetOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SubsetOptions<T> {
    fn clone(&self) -> Self {
        Self {
            comparator: self.comparator.clone(),
            close_with: self.close_with.clone(),
        }
    }
}

// =============================================================================
// SUBSET INNER
// =============================================================================

struct SubsetInner<T: Keyed + 'static> {
    source: OrderedCollection<T>,
    predicate: RefCell<Predicate<T>>,
    comparator: Option<Comparator<T>>,
    members: RefCell<IndexMap<T::Id, T>>,
    emitter: Emitter<SubsetEvent<T>>,
    /// Owns the subscriptions to the source and the close signal
    scope: ListenerScope,
}

impl<T> SubsetInner<T>
where
    T: Keyed + Clone + 'static,
{
    fn matches(&self, record: &T) -> bool {
        // Clone out so the predicate may call back into the view
        let predicate = self.predicate.borrow().clone();
        predicate(record)
    }

    fn filter_source(&self) -> IndexMap<T::Id, T> {
        let predicate = self.predicate.borrow().clone();
        let mut members: IndexMap<T::Id, T> = self
            .source
            .filter(|r| predicate(r))
            .into_iter()
            .map(|r| (r.id(), r))
            .collect();
        if let Some(compare) = &self.comparator {
            members.sort_by(|_, a, _, b| compare(a, b));
        }
        members
    }

    /// Index a new member should take.
    fn position_for(&self, record: &T) -> usize {
        let members = self.members.borrow();
        match &self.comparator {
            Some(compare) => members
                .values()
                .position(|existing| compare(record, existing) == Ordering::Less)
                .unwrap_or(members.len()),
            None => {
                let Some(source_index) = self.source.index_of(&record.id()) else {
                    return members.len();
                };
                members
                    .keys()
                    .position(|id| {
                        self.source
                            .index_of(id)
                            .is_some_and(|index| index > source_index)
                    })
                    .unwrap_or(members.len())
            }
        }
    }

    fn is_stopped(&self) -> bool {
        !self.scope.active()
    }

    fn handle(&self, event: &CollectionEvent<T>) {
        if self.is_stopped() {
            return;
        }
        match event {
            CollectionEvent::Add(record) => {
                if self.matches(record) {
                    self.insert(record);
                }
            }
            CollectionEvent::Remove(record) => self.evict(&record.id()),
            CollectionEvent::Change { current, .. } => {
                let id = current.id();
                let was_member = self.members.borrow().contains_key(&id);
                match (was_member, self.matches(current)) {
                    (false, true) => self.insert(current),
                    (true, false) => self.evict(&id),
                    (true, true) => self.replace(current),
                    (false, false) => {}
                }
            }
            CollectionEvent::Reset { .. } => self.refilter(),
        }
    }

    fn insert(&self, record: &T) {
        let id = record.id();
        if self.members.borrow().contains_key(&id) {
            return;
        }
        let index = self.position_for(record);
        self.members
            .borrow_mut()
            .shift_insert(index, id, record.clone());
        self.emitter.emit(&SubsetEvent::Add(record.clone()));
    }

    fn evict(&self, id: &T::Id) {
        let removed = self.members.borrow_mut().shift_remove(id);
        let Some(record) = removed else {
            return;
        };
        self.emitter.emit(&SubsetEvent::Remove(record));
        if self.members.borrow().is_empty() && !self.is_stopped() {
            self.emitter.emit(&SubsetEvent::Emptied);
        }
    }

    fn replace(&self, current: &T) {
        let id = current.id();
        // Re-place even without a comparator: the edit may have moved it in
        // a sorted source
        let Some(previous) = self.members.borrow_mut().shift_remove(&id) else {
            return;
        };
        let index = self.position_for(current);
        self.members
            .borrow_mut()
            .shift_insert(index, id, current.clone());
        self.emitter.emit(&SubsetEvent::Change {
            previous,
            current: current.clone(),
        });
    }

    fn refilter(&self) {
        let members = self.filter_source();
        let previous = self.members.replace(members);
        self.emitter.emit(&SubsetEvent::Reset);
        if !previous.is_empty() && self.members.borrow().is_empty() && !self.is_stopped() {
            self.emitter.emit(&SubsetEvent::Emptied);
        }
    }

    fn stop(&self) {
        self.scope.stop();
        self.emitter.clear();
    }
}

impl<T: Keyed + 'static> Drop for SubsetInner<T> {
    fn drop(&mut self) {
        // A parent scope may still hold ours; don't wait for it
        self.scope.stop();
    }
}

// =============================================================================
// SUBSET VIEW (Public handle)
// =============================================================================

/// A live, filtered view over an ordered collection.
///
/// Members stay in source order unless a comparator is given. The view only
/// observes its source; it never mutates it.
///
/// # Example
///
/// ```
/// use spark_groups::{Keyed, OrderedCollection, SubsetOptions, SubsetView};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Task {
///     id: u32,
///     done: bool,
/// }
///
/// impl Keyed for Task {
///     type Id = u32;
///     fn id(&self) -> u32 {
///         self.id
///     }
/// }
///
/// let tasks = OrderedCollection::new();
/// tasks.add(Task { id: 1, done: false });
///
/// let open = SubsetView::new(&tasks, |t: &Task| !t.done, SubsetOptions::new());
/// assert_eq!(open.len(), 1);
///
/// tasks.update(&1, |t| t.done = true);
/// assert!(open.is_empty());
/// ```
pub struct SubsetView<T: Keyed + 'static> {
    inner: Rc<SubsetInner<T>>,
}

impl<T> SubsetView<T>
where
    T: Keyed + Clone + 'static,
{
    /// Build a view of `source` holding the records that match `predicate`.
    ///
    /// The view's scope becomes a child of the running `ListenerScope`, if
    /// any, so stopping that scope stops the view too.
    pub fn new<F>(source: &OrderedCollection<T>, predicate: F, options: SubsetOptions<T>) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Self::with_predicate(source, Rc::new(predicate), options)
    }

    /// Like `new`, with a shared predicate.
    pub fn with_predicate(
        source: &OrderedCollection<T>,
        predicate: Predicate<T>,
        options: SubsetOptions<T>,
    ) -> Self {
        let SubsetOptions {
            comparator,
            close_with,
        } = options;

        let inner = Rc::new(SubsetInner {
            source: source.clone(),
            predicate: RefCell::new(predicate),
            comparator,
            members: RefCell::new(IndexMap::new()),
            emitter: Emitter::new("subset-view"),
            scope: ListenerScope::new(),
        });
        *inner.members.borrow_mut() = inner.filter_source();

        let weak: Weak<SubsetInner<T>> = Rc::downgrade(&inner);
        inner.scope.adopt(source.on_any(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle(event);
            }
        }));

        if let Some(signal) = close_with {
            let weak = Rc::downgrade(&inner);
            inner.scope.adopt(signal.on_close(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.stop();
                }
            }));
        }

        Self { inner }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.inner.members.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.inner.members.borrow().contains_key(id)
    }

    pub fn first(&self) -> Option<T> {
        self.inner
            .members
            .borrow()
            .first()
            .map(|(_, record)| record.clone())
    }

    /// Snapshot of the members, in order.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.members.borrow().values().cloned().collect()
    }

    /// Member ids, in order.
    pub fn ids(&self) -> Vec<T::Id> {
        self.inner.members.borrow().keys().cloned().collect()
    }

    /// Visit every member, in order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T),
    {
        for record in self.inner.members.borrow().values() {
            f(record);
        }
    }

    /// Map every member, in order.
    pub fn map<R, F>(&self, f: F) -> Vec<R>
    where
        F: FnMut(&T) -> R,
    {
        self.inner.members.borrow().values().map(f).collect()
    }

    /// The collection this view filters.
    pub fn source(&self) -> &OrderedCollection<T> {
        &self.inner.source
    }

    // =========================================================================
    // CONTROL
    // =========================================================================

    /// Swap the predicate and refilter. Emits `Reset` (and `Emptied` if the
    /// view drained).
    pub fn set_predicate<F>(&self, predicate: F)
    where
        F: Fn(&T) -> bool + 'static,
    {
        if self.is_stopped() {
            return;
        }
        *self.inner.predicate.borrow_mut() = Rc::new(predicate);
        self.inner.refilter();
    }

    /// Stop following the source and drop every listener on this view.
    ///
    /// Members are frozen as they were. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    /// Whether two handles point at the same view.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the view alive.
    pub fn downgrade(&self) -> WeakSubsetView<T> {
        WeakSubsetView {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub fn on<F>(&self, kind: SubsetEventKind, handler: F) -> Subscription
    where
        F: Fn(&SubsetEvent<T>) + 'static,
    {
        self.inner.emitter.on(kind, handler)
    }

    pub fn on_any<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SubsetEvent<T>) + 'static,
    {
        self.inner.emitter.on_any(handler)
    }

    /// Run `f` whenever the view goes from non-empty to empty.
    pub fn on_emptied<F>(&self, f: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.inner.emitter.on(SubsetEventKind::Emptied, move |_| f())
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.emitter.off(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.emitter.listener_count()
    }
}

impl<T: Keyed + 'static> Clone for SubsetView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Non-owning handle to a subset view.
pub struct WeakSubsetView<T: Keyed + 'static> {
    inner: Weak<SubsetInner<T>>,
}

impl<T: Keyed + 'static> WeakSubsetView<T> {
    pub fn upgrade(&self) -> Option<SubsetView<T>> {
        self.inner.upgrade().map(|inner| SubsetView { inner })
    }
}

impl<T: Keyed + 'static> Clone for WeakSubsetView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for SubsetView<T>
where
    T: Keyed + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members = self.inner.members.borrow();
        f.debug_struct("SubsetView")
            .field("members", &members.values().collect::<Vec<_>>())
            .field("stopped", &!self.inner.scope.active())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
