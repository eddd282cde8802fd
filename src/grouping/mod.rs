// ============================================================================
// spark-groups - Grouping
// Live group-by over an OrderedCollection
// ============================================================================
//
// A grouped collection is an OrderedCollection of group entities, one per
// distinct key, each owning a SubsetView of the records with that key.
//
// - builder:      configuration, validation, GroupedCollection handle
// - synchronizer: creates and destroys groups as the base collection changes
// - group:        the group entity and how one is built
// - diagnostic:   non-fatal conditions (missing close signal)
// ============================================================================

mod builder;
mod diagnostic;
mod group;
mod synchronizer;

pub use builder::{build_grouped_collection, GroupedCollection, GroupingConfig};
pub use diagnostic::{log_diagnostic, Diagnostic, DiagnosticSink};
pub use group::{Group, GroupBlueprint, GroupEntity, GroupFactory};
pub use synchronizer::GroupSynchronizer;
