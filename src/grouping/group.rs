// ============================================================================
// spark-groups - Group Entity
// One group of a grouped collection, and the recipe that builds it
// ============================================================================

use std::rc::Rc;

use crate::collections::{OrderedCollection, SubsetOptions, SubsetView};
use crate::core::types::{GroupByFn, Keyed, Predicate};

// =============================================================================
// GROUP ENTITY TRAIT
// =============================================================================

/// An element of a grouped collection.
///
/// Its `Keyed::id()` is the group key; `members()` is the live view of the
/// records with that key. Implement this to carry extra per-group state and
/// pass a matching factory to `GroupingConfig::with_group_factory`.
pub trait GroupEntity<T>: Keyed + Clone + 'static
where
    T: Keyed + Clone + 'static,
{
    fn members(&self) -> &SubsetView<T>;
}

/// Builds a group entity from its key and member view.
pub type GroupFactory<T, G> = Rc<dyn Fn(<G as Keyed>::Id, SubsetView<T>) -> G>;

// =============================================================================
// DEFAULT GROUP
// =============================================================================

/// The default group entity: a key and its members.
///
/// # Example
///
/// ```
/// use spark_groups::{GroupingConfig, Keyed, OrderedCollection};
///
/// #[derive(Clone)]
/// struct Player {
///     id: u32,
///     club: &'static str,
/// }
///
/// impl Keyed for Player {
///     type Id = u32;
///     fn id(&self) -> u32 {
///         self.id
///     }
/// }
///
/// let players = OrderedCollection::from_records([
///     Player { id: 1, club: "Penguins" },
///     Player { id: 2, club: "Penguins" },
/// ]);
///
/// let clubs = GroupingConfig::new()
///     .collection(&players)
///     .group_by(|p: &Player| p.club)
///     .build()
///     .unwrap();
///
/// let penguins = clubs.group(&"Penguins").unwrap();
/// assert_eq!(penguins.key(), &"Penguins");
/// assert_eq!(penguins.len(), 2);
/// assert_eq!(penguins.members().ids(), vec![1, 2]);
/// ```
pub struct Group<K, T: Keyed + 'static> {
    key: K,
    members: SubsetView<T>,
}

impl<K, T> Group<K, T>
where
    T: Keyed + Clone + 'static,
{
    pub fn new(key: K, members: SubsetView<T>) -> Self {
        Self { key, members }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Live view of the records with this key.
    pub fn members(&self) -> &SubsetView<T> {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<K: Clone, T: Keyed + 'static> Clone for Group<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            members: self.members.clone(),
        }
    }
}

impl<K, T> Keyed for Group<K, T>
where
    K: crate::core::types::GroupKey,
    T: Keyed + 'static,
{
    type Id = K;

    fn id(&self) -> K {
        self.key.clone()
    }
}

impl<K, T> GroupEntity<T> for Group<K, T>
where
    K: crate::core::types::GroupKey,
    T: Keyed + Clone + 'static,
{
    fn members(&self) -> &SubsetView<T> {
        &self.members
    }
}

impl<K, T> std::fmt::Debug for Group<K, T>
where
    K: std::fmt::Debug,
    T: Keyed + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("key", &self.key)
            .field("members", &self.members)
            .finish()
    }
}

// =============================================================================
// GROUP BLUEPRINT
// =============================================================================

/// Everything needed to build a group for a given key.
pub struct GroupBlueprint<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    pub(crate) collection: OrderedCollection<T>,
    pub(crate) group_by: GroupByFn<T, G::Id>,
    pub(crate) factory: GroupFactory<T, G>,
    pub(crate) subset_options: SubsetOptions<T>,
}

impl<T, G> GroupBlueprint<T, G>
where
    T: Keyed + Clone + 'static,
    G: GroupEntity<T>,
{
    /// The membership test for one key: `group_by(record) == key`.
    pub fn predicate_for(&self, key: G::Id) -> Predicate<T> {
        let group_by = self.group_by.clone();
        Rc::new(move |record: &T| group_by(record) == key)
    }

    /// Group key of a record.
    pub fn key_of(&self, record: &T) -> G::Id {
        (self.group_by)(record)
    }

    /// Build the group for `key`.
    ///
    /// The member view is created over the base collection with the subset
    /// options (and close signal) forwarded. `on_emptied` runs with the key
    /// and the view whenever the view drains; it holds the view weakly, so
    /// the wiring never keeps a group alive.
    pub fn create_group<F>(&self, key: G::Id, on_emptied: F) -> G
    where
        F: Fn(&G::Id, &SubsetView<T>) + 'static,
    {
        let members = SubsetView::with_predicate(
            &self.collection,
            self.predicate_for(key.clone()),
            self.subset_options.clone(),
        );

        let weak = members.downgrade();
        let emptied_key = key.clone();
        // Cleared together with the view's other listeners when it stops
        let _ = members.on_emptied(move || {
            if let Some(view) = weak.upgrade() {
                on_emptied(&emptied_key, &view);
            }
        });

        (self.factory)(key, members)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Clone, Debug, PartialEq)]
    struct Card {
        id: u32,
        suit: char,
    }

    impl Keyed for Card {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn deck() -> OrderedCollection<Card> {
        OrderedCollection::from_records([
            Card { id: 1, suit: 'h' },
            Card { id: 2, suit: 's' },
            Card { id: 3, suit: 'h' },
        ])
    }

    fn blueprint(deck: &OrderedCollection<Card>) -> GroupBlueprint<Card, Group<char, Card>> {
        GroupBlueprint {
            collection: deck.clone(),
            group_by: Rc::new(|c: &Card| c.suit),
            factory: Rc::new(Group::<char, Card>::new),
            subset_options: SubsetOptions::new(),
        }
    }

    #[test]
    fn group_members_match_key() {
        let deck = deck();
        let hearts = blueprint(&deck).create_group('h', |_, _| {});

        assert_eq!(hearts.id(), 'h');
        assert_eq!(hearts.members().ids(), vec![1, 3]);
        assert_eq!(hearts.len(), 2);
    }

    #[test]
    fn emptied_callback_receives_key_and_view() {
        let deck = deck();
        let drained: Rc<RefCell<Vec<char>>> = Rc::new(RefCell::new(Vec::new()));

        let spades = blueprint(&deck).create_group('s', {
            let drained = drained.clone();
            move |key, view| {
                assert!(view.is_empty());
                drained.borrow_mut().push(*key);
            }
        });

        deck.remove(&2);
        assert!(spades.is_empty());
        assert_eq!(*drained.borrow(), vec!['s']);
    }

    #[test]
    fn emptied_wiring_does_not_keep_view_alive() {
        let deck = deck();
        let weak = {
            let group = blueprint(&deck).create_group('h', |_, _| {});
            group.members().downgrade()
        };

        assert!(weak.upgrade().is_none());
        assert_eq!(deck.listener_count(), 0);
    }

    #[test]
    fn custom_factory_is_used() {
        #[derive(Clone)]
        struct Pile {
            suit: char,
            cards: SubsetView<Card>,
            label: String,
        }

        impl Keyed for Pile {
            type Id = char;

            fn id(&self) -> char {
                self.suit
            }
        }

        impl GroupEntity<Card> for Pile {
            fn members(&self) -> &SubsetView<Card> {
                &self.cards
            }
        }

        let deck = deck();
        let plan: GroupBlueprint<Card, Pile> = GroupBlueprint {
            collection: deck.clone(),
            group_by: Rc::new(|c: &Card| c.suit),
            factory: Rc::new(|suit: char, cards: SubsetView<Card>| Pile {
                suit,
                cards,
                label: format!("pile {suit}"),
            }),
            subset_options: SubsetOptions::new(),
        };

        let pile = plan.create_group('s', |_, _| {});
        assert_eq!(pile.label, "pile s");
        assert_eq!(pile.members().len(), 1);
    }

    #[test]
    fn key_of_and_predicate_agree() {
        let deck = deck();
        let plan = blueprint(&deck);
        let is_heart = plan.predicate_for('h');

        let card = Card { id: 9, suit: 'h' };
        assert_eq!(plan.key_of(&card), 'h');
        assert!(is_heart(&card));
    }
}
