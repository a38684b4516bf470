//! `QuestTracker` owns one player's quest state: catalog index, progress
//! store, objective flags, attribute profile and the persistence writer.
//!
//! Typical lifecycle:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use questlog::quests::{
//!     load_catalog_from_json, PlayerProfile, ProgressDb, QuestTracker, WriterConfig,
//! };
//!
//! # async fn run() -> Result<(), questlog::quests::QuestError> {
//! let records = load_catalog_from_json("quests.json")?;
//! let backend = Arc::new(ProgressDb::open("data/progress")?);
//! let mut tracker =
//!     QuestTracker::open(records, backend, PlayerProfile::default(), WriterConfig::default())
//!         .await?;
//! tracker.complete("debut", true)?;
//! tracker.flush().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::quests::attributes::PlayerProfile;
use crate::quests::catalog::CatalogIndex;
use crate::quests::errors::QuestError;
use crate::quests::mutation::{ChangeSet, MutationEngine};
use crate::quests::notify::{ChangeNotifier, ProgressEvent};
use crate::quests::objectives::ObjectiveTracker;
use crate::quests::progress::ProgressStore;
use crate::quests::reconcile::{reconcile, ReconcileReport};
use crate::quests::resolver::{Blocker, StatusResolver};
use crate::quests::storage::ProgressBackend;
use crate::quests::summary::ProgressSummary;
use crate::quests::types::{QuestRecord, QuestStatus, StoredStatus};
use crate::quests::validation::{validate_catalog, CatalogWarning};
use crate::quests::writer::{start_writer, ProgressSink, WriteOp, WriterConfig, WriterHandle};

pub struct QuestTracker {
    catalog: CatalogIndex,
    progress: ProgressStore,
    objectives: ObjectiveTracker,
    player: PlayerProfile,
    writer: WriterHandle,
    notifier: Arc<ChangeNotifier>,
    last_reconcile: ReconcileReport,
}

impl QuestTracker {
    /// Load stored progress from `backend`, index `records`, reconcile the two
    /// and start the persistence writer. Must run inside a tokio runtime.
    pub async fn open(
        records: Vec<QuestRecord>,
        backend: Arc<dyn ProgressBackend>,
        player: PlayerProfile,
        writer_cfg: WriterConfig,
    ) -> Result<Self, QuestError> {
        let loader = Arc::clone(&backend);
        let (stored, flags) = tokio::task::spawn_blocking(move || {
            Ok::<_, QuestError>((loader.load_all_progress()?, loader.load_all_objectives()?))
        })
        .await
        .map_err(|e| QuestError::Internal(format!("progress load task failed: {}", e)))??;
        debug!(
            "Loaded {} progress entries and {} objective flags",
            stored.len(),
            flags.len()
        );

        let writer = start_writer(backend, writer_cfg);
        let notifier = Arc::new(ChangeNotifier::new());
        let sink: Arc<dyn ProgressSink> = Arc::new(writer.clone());
        let objectives = ObjectiveTracker::new(sink, Arc::clone(&notifier)).with_entries(flags);

        let mut tracker = Self {
            catalog: CatalogIndex::default(),
            progress: ProgressStore::from_entries(stored),
            objectives,
            player,
            writer,
            notifier,
            last_reconcile: ReconcileReport::default(),
        };
        tracker.replace_catalog(records);
        Ok(tracker)
    }

    /// Swap in a refreshed catalog and re-map stored progress onto it.
    pub fn replace_catalog(&mut self, records: Vec<QuestRecord>) -> &ReconcileReport {
        self.catalog = CatalogIndex::build(records);
        let report = reconcile(&self.catalog, &mut self.progress, &self.writer);
        if report.changed() {
            self.notifier.notify(ProgressEvent::QuestsChanged);
        }
        info!(
            "Catalog ready: {} quests, {} stored entries, {} orphans",
            self.catalog.len(),
            self.progress.len(),
            report.orphans.len()
        );
        self.last_reconcile = report;
        &self.last_reconcile
    }

    /// Re-run reconciliation against the current catalog.
    pub fn reconcile(&mut self) -> &ReconcileReport {
        let report = reconcile(&self.catalog, &mut self.progress, &self.writer);
        if report.changed() {
            self.notifier.notify(ProgressEvent::QuestsChanged);
        }
        self.last_reconcile = report;
        &self.last_reconcile
    }

    pub fn last_reconcile(&self) -> &ReconcileReport {
        &self.last_reconcile
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn objectives(&self) -> &ObjectiveTracker {
        &self.objectives
    }

    pub fn player(&self) -> &PlayerProfile {
        &self.player
    }

    /// Attributes are read on every resolution, so a new profile takes effect immediately.
    pub fn set_player(&mut self, player: PlayerProfile) {
        self.player = player;
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ProgressEvent> {
        self.notifier.subscribe()
    }

    pub fn find(&self, query: &str) -> Result<&QuestRecord, QuestError> {
        self.catalog
            .lookup(query)
            .ok_or_else(|| QuestError::NotFound(format!("quest: {}", query)))
    }

    pub fn resolver(&self) -> StatusResolver<'_> {
        StatusResolver::new(&self.catalog, &self.progress, &self.player)
    }

    pub fn status(&self, query: &str) -> Result<QuestStatus, QuestError> {
        let record = self.find(query)?;
        Ok(self.resolver().status(record))
    }

    pub fn status_all(&self) -> Vec<(&QuestRecord, QuestStatus)> {
        self.resolver().status_all()
    }

    pub fn blockers(&self, query: &str) -> Result<Vec<Blocker>, QuestError> {
        let record = self.find(query)?;
        Ok(self.resolver().blockers(record))
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::from_statuses(self.status_all())
    }

    pub fn validate(&self) -> Vec<CatalogWarning> {
        validate_catalog(&self.catalog)
    }

    pub fn complete(&mut self, query: &str, complete_prerequisites: bool) -> Result<ChangeSet, QuestError> {
        self.with_engine(|catalog, mut engine| -> Result<ChangeSet, QuestError> {
            let record = lookup(catalog, query)?;
            Ok(engine.complete(record, complete_prerequisites))
        })
    }

    pub fn fail(&mut self, query: &str) -> Result<ChangeSet, QuestError> {
        self.with_engine(|catalog, mut engine| -> Result<ChangeSet, QuestError> {
            let record = lookup(catalog, query)?;
            Ok(engine.fail(record))
        })
    }

    pub fn reset(&mut self, query: &str) -> Result<ChangeSet, QuestError> {
        self.with_engine(|catalog, mut engine| -> Result<ChangeSet, QuestError> {
            let record = lookup(catalog, query)?;
            Ok(engine.reset(record))
        })
    }

    /// Every query must resolve before anything is written.
    pub fn complete_batch(&mut self, queries: &[&str], skip_alternatives: bool) -> Result<ChangeSet, QuestError> {
        self.with_engine(|catalog, mut engine| -> Result<ChangeSet, QuestError> {
            let records = queries
                .iter()
                .map(|query| lookup(catalog, query))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(engine.complete_batch(&records, skip_alternatives))
        })
    }

    pub fn apply_changes(&mut self, changes: &[(&str, StoredStatus)]) -> Result<ChangeSet, QuestError> {
        self.with_engine(|catalog, mut engine| -> Result<ChangeSet, QuestError> {
            let resolved = changes
                .iter()
                .map(|&(query, status)| lookup(catalog, query).map(|record| (record, status)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(engine.apply_changes(&resolved))
        })
    }

    /// Flag objective `index` of a quest, mirroring it under the catalog objective id.
    pub fn set_objective(&mut self, query: &str, index: usize, completed: bool) -> Result<bool, QuestError> {
        let record = lookup(&self.catalog, query)?;
        if !record.objectives.is_empty() && index >= record.objectives.len() {
            return Err(QuestError::NotFound(format!(
                "objective {} of {}",
                index, record.normalized_name
            )));
        }
        let objective_id = record
            .objectives
            .get(index)
            .and_then(|objective| objective.id.as_deref());
        Ok(self
            .objectives
            .set_completed(&record.normalized_name, index, completed, objective_id))
    }

    /// Flag an objective by catalog id; the owning quest is looked up so both key forms stay in step.
    pub fn set_objective_by_id(&mut self, objective_id: &str, completed: bool) -> bool {
        let owner = self.catalog.records().iter().find_map(|record| {
            record
                .objectives
                .iter()
                .position(|o| {
                    o.id
                        .as_deref()
                        .is_some_and(|id| id.trim().eq_ignore_ascii_case(objective_id.trim()))
                })
                .map(|index| (record.normalized_name.as_str(), index))
        });
        let (quest, index) = owner.map_or((None, None), |(q, i)| (Some(q), Some(i)));
        self.objectives
            .set_completed_by_id(objective_id, completed, quest, index)
    }

    pub fn completed_objectives(&self, query: &str) -> Result<BTreeSet<usize>, QuestError> {
        let record = self.find(query)?;
        Ok(self.objectives.completed_objectives_for(&record.normalized_name))
    }

    pub fn clear_objectives(&mut self, query: &str) -> Result<usize, QuestError> {
        let record = lookup(&self.catalog, query)?;
        let ids: Vec<&str> = record
            .objectives
            .iter()
            .filter_map(|o| o.id.as_deref())
            .collect();
        Ok(self.objectives.clear_quest(&record.normalized_name, &ids))
    }

    /// Forget all quest and objective progress.
    pub fn clear_all(&mut self) {
        if !self.progress.is_empty() {
            self.progress.clear();
            self.writer.submit(WriteOp::ClearProgress);
            self.notifier.notify(ProgressEvent::QuestsChanged);
        }
        self.objectives.clear_all();
    }

    /// Wait for every write submitted so far to be attempted.
    pub async fn flush(&self) -> Result<(), QuestError> {
        self.writer.flush().await
    }

    pub async fn shutdown(self) -> Result<(), QuestError> {
        self.writer.flush().await?;
        self.writer.shutdown().await;
        Ok(())
    }

    fn with_engine<R>(&mut self, f: impl for<'a> FnOnce(&'a CatalogIndex, MutationEngine<'a>) -> R) -> R {
        let engine = MutationEngine::new(
            &self.catalog,
            &mut self.progress,
            &self.player,
            &self.writer,
            &self.notifier,
        );
        f(&self.catalog, engine)
    }
}

fn lookup<'a>(catalog: &'a CatalogIndex, query: &str) -> Result<&'a QuestRecord, QuestError> {
    catalog
        .lookup(query)
        .ok_or_else(|| QuestError::NotFound(format!("quest: {}", query)))
}
