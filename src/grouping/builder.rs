// ============================================================================
// spark-groups - Grouping Builder
// Configuration, validation, and the live grouped collection handle
// ============================================================================

use std::cmp::Ordering;
use std::ops::Deref;
use std::rc::Rc;

use crate::collections::{OrderedCollection, SubsetOptions, SubsetView};
use crate::core::error::{ConfigurationError, Result};
use crate::core::types::{Comparator, GroupByFn, GroupKey, Keyed};
use crate::grouping::diagnostic::{Diagnostic, DiagnosticSink, default_sink};
use crate::grouping::group::{Group, GroupBlueprint, GroupEntity, GroupFactory};
use crate::grouping::synchronizer::GroupSynchronizer;
use crate::reactivity::close::CloseSignal;

type GroupingCollectionFn<G> = Box<dyn FnOnce() -> OrderedCollection<G>>;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for a grouped collection.
///
/// `collection` and `group_by` are required; everything else has a default.
///
/// # Example
///
/// ```
/// use spark_groups::{CloseSignal, GroupingConfig, Keyed, OrderedCollection};
///
/// #[derive(Clone)]
/// struct Song {
///     id: u32,
///     album: &'static str,
/// }
///
/// impl Keyed for Song {
///     type Id = u32;
///     fn id(&self) -> u32 {
///         self.id
///     }
/// }
///
/// let songs = OrderedCollection::from_records([
///     Song { id: 1, album: "Blue" },
///     Song { id: 2, album: "Abbey Road" },
///     Song { id: 3, album: "Blue" },
/// ]);
/// let screen = CloseSignal::new();
///
/// let albums = GroupingConfig::new()
///     .collection(&songs)
///     .group_by(|s: &Song| s.album)
///     .comparator(|a, b| a.key().cmp(b.key()))
///     .close_with(screen.clone())
///     .build()
///     .unwrap();
///
/// assert_eq!(albums.keys(), vec!["Abbey Road", "Blue"]);
///
/// songs.remove(&2);
/// assert_eq!(albums.keys(), vec!["Blue"]);
///
/// screen.close();
/// assert!(albums.is_closed());
/// ```
pub struct GroupingConfig<T, K, G = Group<K, T>>
where
    T: Keyed + Clone + 'static,
    K: GroupKey,
    G: GroupEntity<T> + Keyed<Id = K>,
{
    collection: Option<OrderedCollection<T>>,
    group_by: Option<GroupByFn<T, K>>,
    group_factory: GroupFactory<T, G>,
    grouping_collection: Option<GroupingCollectionFn<G>>,
    comparator: Option<Comparator<G>>,
    subset_options: SubsetOptions<T>,
    close_with: Option<CloseSignal>,
    on_diagnostic: Option<DiagnosticSink>,
}

impl<T, K> GroupingConfig<T, K, Group<K, T>>
where
    T: Keyed + Clone + 'static,
    K: GroupKey,
{
    /// A config producing default `Group` entities.
    pub fn new() -> Self {
        Self::with_group_factory(Group::new)
    }
}

impl<T, K> Default for GroupingConfig<T, K, Group<K, T>>
where
    T: Keyed + Clone + 'static,
    K: GroupKey,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K, G> GroupingConfig<T, K, G>
where
    T: Keyed + Clone + 'static,
    K: GroupKey,
    G: GroupEntity<T> + Keyed<Id = K>,
{
    /// A config producing custom group entities built by `factory`.
    pub fn with_group_factory<F>(factory: F) -> Self
    where
        F: Fn(K, SubsetView<T>) -> G + 'static,
    {
        Self {
            collection: None,
            group_by: None,
            group_factory: Rc::new(factory),
            grouping_collection: None,
            comparator: None,
            subset_options: SubsetOptions::new(),
            close_with: None,
            on_diagnostic: None,
        }
    }

    /// The base collection to group. Required.
    pub fn collection(mut self, collection: &OrderedCollection<T>) -> Self {
        self.collection = Some(collection.clone());
        self
    }

    /// The grouping function. Required. Must be deterministic.
    pub fn group_by<F>(mut self, group_by: F) -> Self
    where
        F: Fn(&T) -> K + 'static,
    {
        self.group_by = Some(Rc::new(group_by));
        self
    }

    /// Replace the group entity factory.
    pub fn group_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(K, SubsetView<T>) -> G + 'static,
    {
        self.group_factory = Rc::new(factory);
        self
    }

    /// Build the grouping collection with `make` instead of an empty
    /// `OrderedCollection`. Its previous contents are replaced.
    pub fn grouping_collection<F>(mut self, make: F) -> Self
    where
        F: FnOnce() -> OrderedCollection<G> + 'static,
    {
        self.grouping_collection = Some(Box::new(make));
        self
    }

    /// Keep groups sorted by `compare`.
    pub fn comparator<F>(mut self, compare: F) -> Self
    where
        F: Fn(&G, &G) -> Ordering + 'static,
    {
        self.comparator = Some(Rc::new(compare));
        self
    }

    /// Options forwarded to every group's member view.
    pub fn subset_options(mut self, options: SubsetOptions<T>) -> Self {
        self.subset_options = options;
        self
    }

    /// Tear everything down when `signal` closes or is destroyed.
    pub fn close_with(mut self, signal: CloseSignal) -> Self {
        self.close_with = Some(signal);
        self
    }

    /// Receive diagnostics here instead of the log.
    pub fn on_diagnostic<F>(mut self, sink: F) -> Self
    where
        F: Fn(&Diagnostic) + 'static,
    {
        self.on_diagnostic = Some(Rc::new(sink));
        self
    }

    /// Validate and build. See `build_grouped_collection`.
    pub fn build(self) -> Result<GroupedCollection<T, G>> {
        build_grouped_collection(self)
    }
}

/// Build a live grouped collection.
///
/// Fails before subscribing to anything if `collection` or `group_by` is
/// missing. Without a close signal a `MissingCloseSignal` diagnostic is
/// reported and the grouping lives until closed or dropped.
pub fn build_grouped_collection<T, K, G>(
    config: GroupingConfig<T, K, G>,
) -> Result<GroupedCollection<T, G>>
where
    T: Keyed + Clone + 'static,
    K: GroupKey,
    G: GroupEntity<T> + Keyed<Id = K>,
{
    let GroupingConfig {
        collection,
        group_by,
        group_factory,
        grouping_collection,
        comparator,
        mut subset_options,
        close_with,
        on_diagnostic,
    } = config;

    let collection = collection.ok_or(ConfigurationError::MissingCollection)?;
    let group_by = group_by.ok_or(ConfigurationError::MissingGroupBy)?;

    let groups = match grouping_collection {
        Some(make) => make(),
        None => OrderedCollection::new(),
    };
    if comparator.is_some() {
        groups.set_comparator(comparator);
    }

    if subset_options.close_with.is_none() {
        subset_options.close_with = close_with.clone();
    }

    let blueprint = GroupBlueprint {
        collection,
        group_by,
        factory: group_factory,
        subset_options,
    };
    let diagnostics = on_diagnostic.unwrap_or_else(default_sink);

    Ok(GroupedCollection {
        sync: GroupSynchronizer::attach(blueprint, groups, close_with, diagnostics),
    })
}

// =============================================================================
// GROUPED COLLECTION (Public handle)
// =============================================================================

/// The live grouping: an `OrderedCollection` of group entities kept in step
/// with the base collection.
///
/// Derefs to the grouping collection for reads and event subscriptions. Do
/// not mutate it directly. Dropping the last handle tears the grouping down.
pub struct GroupedCollection<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    sync: Rc<GroupSynchronizer<T, G>>,
}

impl<T, G> GroupedCollection<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    /// The group for `key`, if any record has it.
    pub fn group(&self, key: &G::Id) -> Option<G> {
        self.sync.groups().get(key)
    }

    /// Group keys, in grouping order.
    pub fn keys(&self) -> Vec<G::Id> {
        self.sync.groups().ids()
    }

    /// The base collection being grouped.
    pub fn collection(&self) -> &OrderedCollection<T> {
        self.sync.collection()
    }

    pub fn synchronizer(&self) -> &GroupSynchronizer<T, G> {
        &self.sync
    }

    /// Release every subscription now. Idempotent.
    pub fn close(&self) {
        self.sync.teardown();
    }

    pub fn is_closed(&self) -> bool {
        self.sync.is_closed()
    }
}

impl<T, G> Deref for GroupedCollection<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    type Target = OrderedCollection<G>;

    fn deref(&self) -> &OrderedCollection<G> {
        self.sync.groups()
    }
}

impl<T, G> Clone for GroupedCollection<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    fn clone(&self) -> Self {
        Self {
            sync: self.sync.clone(),
        }
    }
}

impl<T, G> std::fmt::Debug for GroupedCollection<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedCollection")
            .field("keys", &self.keys())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
