//! Quest dependency and status resolution.
//!
//! The catalog is indexed once per refresh, stored Done/Failed progress is
//! reconciled against it, and every other status is derived on demand from the
//! prerequisite graph and the player's attributes. Mutations update memory
//! first and persist through a background writer.

pub mod attributes;
pub mod catalog;
pub mod errors;
pub mod mutation;
pub mod notify;
pub mod objectives;
pub mod progress;
pub mod reconcile;
pub mod resolver;
pub mod storage;
pub mod summary;
pub mod tracker;
pub mod types;
pub mod validation;
pub mod writer;

pub use attributes::{PlayerAttributes, PlayerProfile};
pub use catalog::{load_catalog_from_json, parse_catalog, CatalogIndex};
pub use errors::QuestError;
pub use mutation::{ChangeSet, MutationEngine};
pub use notify::{ChangeNotifier, ProgressEvent};
pub use objectives::ObjectiveTracker;
pub use progress::ProgressStore;
pub use reconcile::{reconcile, ReconcileReport};
pub use resolver::{Blocker, ResolutionGuard, StatusResolver};
pub use storage::{ProgressBackend, ProgressDb, ProgressDbBuilder};
pub use summary::{ProgressSummary, TraderSummary};
pub use tracker::QuestTracker;
pub use types::*;
pub use validation::{validate_catalog, CatalogWarning};
pub use writer::{
    start_writer, ProgressSink, RecordingSink, WriteOp, WriterConfig, WriterHandle, WriterStats,
};
