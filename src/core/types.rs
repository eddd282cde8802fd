// ============================================================================
// spark-groups - Core Types
// Identity, key, and callback types shared by collections and groupings
// ============================================================================

use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

// =============================================================================
// GROUP KEY
// =============================================================================

/// Anything usable as a record identity or a group key.
///
/// Keys must be hashable scalars (strings, integers, enums, small tuples).
/// Blanket-implemented, so there is nothing to implement by hand.
pub trait GroupKey: Eq + Hash + Clone + Debug + 'static {}

impl<T> GroupKey for T where T: Eq + Hash + Clone + Debug + 'static {}

// =============================================================================
// KEYED
// =============================================================================

/// An item with a stable identity.
///
/// Ordered collections index their items by `id()`. For base records this is
/// the record's primary key; for group entities it is the group key.
///
/// # Example
///
/// ```
/// use spark_groups::Keyed;
///
/// #[derive(Clone)]
/// struct Member {
///     id: u32,
///     club: String,
/// }
///
/// impl Keyed for Member {
///     type Id = u32;
///
///     fn id(&self) -> u32 {
///         self.id
///     }
/// }
/// ```
pub trait Keyed {
    type Id: GroupKey;

    fn id(&self) -> Self::Id;
}

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// Orders two items; used to keep collections and views sorted.
pub type Comparator<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

/// Decides whether a record belongs to a subset view.
pub type Predicate<T> = Rc<dyn Fn(&T) -> bool>;

/// Maps a record to its group key. Must be pure and total.
pub type GroupByFn<T, K> = Rc<dyn Fn(&T) -> K>;

// =============================================================================
// LISTENER ID
// =============================================================================

/// Identity of a registered listener, unique within its emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    /// Raw numeric value (for logging).
    pub fn get(self) -> u64 {
        self.0
    }
}
