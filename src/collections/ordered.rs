// ============================================================================
// spark-groups - OrderedCollection
// A keyed, ordered collection that announces every mutation
// ============================================================================

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::types::{Comparator, Keyed, ListenerId};
use crate::reactivity::emitter::{Emitter, Event};
use crate::reactivity::subscription::Subscription;

// =============================================================================
// EVENTS
// =============================================================================

/// What happened to an ordered collection.
///
/// Events are emitted after the collection has been updated, and carry
/// clones of the records involved.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent<T> {
    /// A record was inserted.
    Add(T),
    /// A record was removed. Carries its state at removal.
    Remove(T),
    /// A record was edited in place.
    Change { previous: T, current: T },
    /// The whole contents were replaced.
    Reset { previous: Vec<T>, current: Vec<T> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionEventKind {
    Add,
    Remove,
    Change,
    Reset,
}

impl<T: 'static> Event for CollectionEvent<T> {
    type Kind = CollectionEventKind;

    fn kind(&self) -> CollectionEventKind {
        match self {
            CollectionEvent::Add(_) => CollectionEventKind::Add,
            CollectionEvent::Remove(_) => CollectionEventKind::Remove,
            CollectionEvent::Change { .. } => CollectionEventKind::Change,
            CollectionEvent::Reset { .. } => CollectionEventKind::Reset,
        }
    }
}

impl<T> CollectionEvent<T> {
    /// The single record an event is about (the new state for changes).
    /// None for resets.
    pub fn record(&self) -> Option<&T> {
        match self {
            CollectionEvent::Add(record) | CollectionEvent::Remove(record) => Some(record),
            CollectionEvent::Change { current, .. } => Some(current),
            CollectionEvent::Reset { .. } => None,
        }
    }
}

// =============================================================================
// ORDERED COLLECTION
// =============================================================================

struct OrderedCollectionInner<T: Keyed + 'static> {
    items: RefCell<IndexMap<T::Id, T>>,
    comparator: RefCell<Option<Comparator<T>>>,
    emitter: Emitter<CollectionEvent<T>>,
}

/// A collection of keyed records, kept in insertion order or sorted by a
/// comparator, that emits an event for every mutation.
///
/// Cloning yields another handle to the same collection. No internal borrow
/// is held while events are emitted, so handlers may read the collection.
///
/// # Example
///
/// ```
/// use spark_groups::{Keyed, OrderedCollection};
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
/// tasks.add(Task { id: 2, done: false });
///
/// tasks.update(&1, |task| task.done = true);
/// assert_eq!(tasks.get(&1), Some(Task { id: 1, done: true }));
/// assert_eq!(tasks.ids(), vec![1, 2]);
/// ```
pub struct OrderedCollection<T: Keyed + 'static> {
    inner: Rc<OrderedCollectionInner<T>>,
}

impl<T> OrderedCollection<T>
where
    T: Keyed + Clone + 'static,
{
    /// Create an empty collection in insertion order.
    pub fn new() -> Self {
        Self::from_parts(IndexMap::new(), None)
    }

    /// Create an empty collection kept sorted by `compare`.
    pub fn with_comparator<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'static,
    {
        Self::from_parts(IndexMap::new(), Some(Rc::new(compare)))
    }

    /// Create a collection holding `records`, without emitting anything.
    ///
    /// A later record with an already-seen id replaces the earlier one.
    pub fn from_records<I: IntoIterator<Item = T>>(records: I) -> Self {
        Self::from_parts(Self::index(records), None)
    }

    fn from_parts(items: IndexMap<T::Id, T>, comparator: Option<Comparator<T>>) -> Self {
        Self {
            inner: Rc::new(OrderedCollectionInner {
                items: RefCell::new(items),
                comparator: RefCell::new(comparator),
                emitter: Emitter::new("ordered-collection"),
            }),
        }
    }

    fn index<I: IntoIterator<Item = T>>(records: I) -> IndexMap<T::Id, T> {
        records.into_iter().map(|r| (r.id(), r)).collect()
    }

    fn comparator(&self) -> Option<Comparator<T>> {
        self.inner.comparator.borrow().clone()
    }

    /// Where `item` goes under `compare`: after every item that is not
    /// greater, so equal items keep their arrival order.
    fn sorted_position(items: &IndexMap<T::Id, T>, compare: &Comparator<T>, item: &T) -> usize {
        items
            .values()
            .position(|existing| compare(item, existing) == Ordering::Less)
            .unwrap_or(items.len())
    }

    fn insert_positioned(&self, record: T) {
        let comparator = self.comparator();
        let mut items = self.inner.items.borrow_mut();
        match comparator {
            Some(compare) => {
                let index = Self::sorted_position(&items, &compare, &record);
                items.shift_insert(index, record.id(), record);
            }
            None => {
                items.insert(record.id(), record);
            }
        }
    }

    fn emit(&self, event: CollectionEvent<T>) {
        self.inner.emitter.emit(&event);
    }

    // =========================================================================
    // ORDERING
    // =========================================================================

    /// Replace the comparator and re-sort. `None` keeps the current order
    /// and goes back to appending new records.
    pub fn set_comparator(&self, comparator: Option<Comparator<T>>) {
        if let Some(compare) = &comparator {
            self.inner
                .items
                .borrow_mut()
                .sort_by(|_, a, _, b| compare(a, b));
        }
        *self.inner.comparator.borrow_mut() = comparator;
    }

    /// Whether a comparator is keeping the collection sorted.
    pub fn is_sorted(&self) -> bool {
        self.inner.comparator.borrow().is_some()
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.inner.items.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.inner.items.borrow().contains_key(id)
    }

    /// Position of a record in the collection's order.
    pub fn index_of(&self, id: &T::Id) -> Option<usize> {
        self.inner.items.borrow().get_index_of(id)
    }

    /// Record at a position.
    pub fn at(&self, index: usize) -> Option<T> {
        self.inner
            .items
            .borrow()
            .get_index(index)
            .map(|(_, record)| record.clone())
    }

    /// Snapshot of all records, in order.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().values().cloned().collect()
    }

    /// All ids, in order.
    pub fn ids(&self) -> Vec<T::Id> {
        self.inner.items.borrow().keys().cloned().collect()
    }

    /// Map every record, in order.
    ///
    /// `f` must not mutate this collection.
    pub fn map<R, F>(&self, f: F) -> Vec<R>
    where
        F: FnMut(&T) -> R,
    {
        self.inner.items.borrow().values().map(f).collect()
    }

    /// Visit every record, in order.
    ///
    /// `f` must not mutate this collection.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T),
    {
        for record in self.inner.items.borrow().values() {
            f(record);
        }
    }

    /// First record matching `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.inner
            .items
            .borrow()
            .values()
            .find(|r| predicate(r))
            .cloned()
    }

    /// All records matching `predicate`, in order.
    pub fn filter<F>(&self, mut predicate: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.inner
            .items
            .borrow()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Insert a record and emit `Add`.
    ///
    /// Returns false (and emits nothing) if a record with the same id is
    /// already present.
    pub fn add(&self, record: T) -> bool {
        if self.contains(&record.id()) {
            return false;
        }
        self.insert_positioned(record.clone());
        self.emit(CollectionEvent::Add(record));
        true
    }

    /// Insert several records, then emit one `Add` per inserted record in
    /// the order given.
    ///
    /// Every record is already present when the first `Add` is emitted.
    /// Records whose id is already present (or repeated in the batch) are
    /// skipped. Returns the number inserted.
    pub fn add_all<I: IntoIterator<Item = T>>(&self, records: I) -> usize {
        let mut inserted = Vec::new();
        for record in records {
            if self.contains(&record.id()) {
                continue;
            }
            self.insert_positioned(record.clone());
            inserted.push(record);
        }

        let count = inserted.len();
        for record in inserted {
            self.emit(CollectionEvent::Add(record));
        }
        count
    }

    /// Remove a record and emit `Remove`.
    pub fn remove(&self, id: &T::Id) -> Option<T> {
        let removed = self.inner.items.borrow_mut().shift_remove(id);
        if let Some(record) = &removed {
            self.emit(CollectionEvent::Remove(record.clone()));
        }
        removed
    }

    /// Remove several records, emitting `Remove` after each one.
    pub fn remove_all<'a, I>(&self, ids: I) -> Vec<T>
    where
        I: IntoIterator<Item = &'a T::Id>,
    {
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Edit a record in place and emit `Change`.
    ///
    /// `f` works on a copy, so it may read the collection. If `f` changes the
    /// record's id, the edit is applied as a `Remove` of the old record
    /// followed by an `Add` of the new one. Returns false, leaving the
    /// collection untouched, if `id` is absent or the new id is already taken.
    pub fn update<F>(&self, id: &T::Id, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(previous) = self.get(id) else {
            return false;
        };
        let mut current = previous.clone();
        f(&mut current);

        let new_id = current.id();
        if new_id != *id {
            if self.contains(&new_id) {
                return false;
            }
            self.remove(id);
            self.add(current);
            return true;
        }

        match self.comparator() {
            Some(compare) => {
                let mut items = self.inner.items.borrow_mut();
                items.shift_remove(id);
                let index = Self::sorted_position(&items, &compare, &current);
                items.shift_insert(index, id.clone(), current.clone());
            }
            None => {
                self.inner
                    .items
                    .borrow_mut()
                    .insert(id.clone(), current.clone());
            }
        }

        self.emit(CollectionEvent::Change { previous, current });
        true
    }

    /// Insert `record`, or overwrite the record with its id (emitting
    /// `Change`). Returns true if it was inserted.
    pub fn upsert(&self, record: T) -> bool {
        let id = record.id();
        if self.contains(&id) {
            self.update(&id, move |slot| *slot = record);
            false
        } else {
            self.add(record)
        }
    }

    /// Replace the whole contents and emit a single `Reset`.
    pub fn reset<I: IntoIterator<Item = T>>(&self, records: I) {
        let mut items = Self::index(records);
        if let Some(compare) = self.comparator() {
            items.sort_by(|_, a, _, b| compare(a, b));
        }
        let current: Vec<T> = items.values().cloned().collect();

        let previous_items = self.inner.items.replace(items);
        let previous: Vec<T> = previous_items.into_values().collect();

        self.emit(CollectionEvent::Reset { previous, current });
    }

    /// Remove everything (a reset to nothing).
    pub fn clear(&self) {
        self.reset(Vec::new());
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Listen to one kind of event.
    pub fn on<F>(&self, kind: CollectionEventKind, handler: F) -> Subscription
    where
        F: Fn(&CollectionEvent<T>) + 'static,
    {
        self.inner.emitter.on(kind, handler)
    }

    /// Listen to every event.
    pub fn on_any<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&CollectionEvent<T>) + 'static,
    {
        self.inner.emitter.on_any(handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.emitter.off(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.emitter.listener_count()
    }

    /// Whether two handles point at the same collection.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Default for OrderedCollection<T>
where
    T: Keyed + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + 'static> Clone for OrderedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for OrderedCollection<T>
where
    T: Keyed + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self.inner.items.borrow();
        f.debug_struct("OrderedCollection")
            .field("items", &items.values().collect::<Vec<_>>())
            .field("sorted", &self.inner.comparator.borrow().is_some())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
