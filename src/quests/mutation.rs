//! Quest Mutation Engine
//!
//! Applies completion, failure and reset commands to the [`ProgressStore`].
//! Every command accumulates its writes into one [`ChangeSet`]; the store is
//! updated first, then the set is handed to the persistence sink as a single
//! batch and one [`ProgressEvent::QuestsChanged`] is emitted. Nothing is sent
//! while a recursive completion is still walking prerequisites.

use std::collections::HashSet;

use log::{debug, info};

use crate::logutil::escape_log;
use crate::quests::attributes::PlayerAttributes;
use crate::quests::catalog::CatalogIndex;
use crate::quests::notify::{ChangeNotifier, ProgressEvent};
use crate::quests::progress::ProgressStore;
use crate::quests::resolver::{guard_key, structured_requirements, StatusResolver};
use crate::quests::types::{ProgressEntry, QuestKey, QuestRecord, QuestStatus, StoredStatus};
use crate::quests::writer::{ProgressSink, WriteOp};

/// Writes produced by one logical mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub saved: Vec<ProgressEntry>,
    /// Storage keys removed from persistence
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.saved.len() + self.deleted.len()
    }

    fn delete(&mut self, key: String) {
        if !key.is_empty() && !self.deleted.contains(&key) {
            self.deleted.push(key);
        }
    }
}

pub struct MutationEngine<'a> {
    catalog: &'a CatalogIndex,
    progress: &'a mut ProgressStore,
    player: &'a dyn PlayerAttributes,
    sink: &'a dyn ProgressSink,
    notifier: &'a ChangeNotifier,
}

impl<'a> MutationEngine<'a> {
    pub fn new(
        catalog: &'a CatalogIndex,
        progress: &'a mut ProgressStore,
        player: &'a dyn PlayerAttributes,
        sink: &'a dyn ProgressSink,
        notifier: &'a ChangeNotifier,
    ) -> Self {
        Self {
            catalog,
            progress,
            player,
            sink,
            notifier,
        }
    }

    /// Mark `record` Done, optionally completing its unmet mandatory
    /// prerequisites first, and fail its still-open alternatives.
    pub fn complete(&mut self, record: &'a QuestRecord, complete_prerequisites: bool) -> ChangeSet {
        let mut visited = HashSet::new();
        let mut changes = ChangeSet::default();
        self.complete_inner(record, complete_prerequisites, &mut visited, &mut changes);
        self.commit("complete", changes)
    }

    pub fn fail(&mut self, record: &'a QuestRecord) -> ChangeSet {
        let mut changes = ChangeSet::default();
        self.mark(record, StoredStatus::Failed, &mut changes);
        self.commit("fail", changes)
    }

    /// Forget any stored status for `record`, under every id and its name.
    pub fn reset(&mut self, record: &'a QuestRecord) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let mut removed = Vec::new();
        for id in &record.ids {
            removed.extend(self.progress.remove(&QuestKey::new(Some(id), None)));
        }
        removed.extend(
            self.progress
                .remove(&QuestKey::new(None, Some(&record.normalized_name))),
        );
        if !removed.is_empty() {
            for id in &record.ids {
                if let Some(key) = QuestKey::new(Some(id), None).id_storage_key() {
                    changes.delete(key);
                }
            }
            if let Some(key) = record.key().name_storage_key() {
                changes.delete(key);
            }
            for entry in &removed {
                for key in entry.key.storage_keys() {
                    changes.delete(key);
                }
            }
        }
        self.commit("reset", changes)
    }

    /// Mark many quests Done at once. Prerequisites are not walked.
    pub fn complete_batch(&mut self, records: &[&'a QuestRecord], skip_alternatives: bool) -> ChangeSet {
        let mut visited = HashSet::new();
        let mut changes = ChangeSet::default();
        for &record in records {
            if skip_alternatives && record.has_alternatives() {
                debug!(
                    "Batch skips '{}': it has alternatives",
                    escape_log(&record.name)
                );
                continue;
            }
            self.complete_inner(record, false, &mut visited, &mut changes);
        }
        self.commit("complete_batch", changes)
    }

    /// Apply explicit Done/Failed targets exactly as given.
    pub fn apply_changes(&mut self, changes: &[(&'a QuestRecord, StoredStatus)]) -> ChangeSet {
        let mut set = ChangeSet::default();
        for &(record, status) in changes {
            self.mark(record, status, &mut set);
        }
        self.commit("apply_changes", set)
    }

    fn complete_inner(
        &mut self,
        record: &'a QuestRecord,
        complete_prerequisites: bool,
        visited: &mut HashSet<String>,
        changes: &mut ChangeSet,
    ) {
        if !visited.insert(guard_key(record)) {
            return;
        }
        if complete_prerequisites {
            for target in self.prerequisites_to_complete(record) {
                if target.has_alternatives() {
                    debug!(
                        "Leaving prerequisite '{}' of '{}' alone: it has alternatives",
                        escape_log(&target.name),
                        escape_log(&record.name)
                    );
                    continue;
                }
                // Mandatory prerequisites end up Done even when the requirement accepts Active.
                let current = StatusResolver::new(self.catalog, self.progress, self.player)
                    .status(target);
                if current.is_terminal() {
                    continue;
                }
                self.complete_inner(target, true, visited, changes);
            }
        }
        self.mark(record, StoredStatus::Done, changes);
        self.exclude_alternatives(record, changes);
    }

    /// Mandatory prerequisites that completion can satisfy: group-0 requirements
    /// a Done quest meets, or the legacy name list.
    fn prerequisites_to_complete(&self, record: &'a QuestRecord) -> Vec<&'a QuestRecord> {
        let catalog = self.catalog;
        let own_key = guard_key(record);
        let candidates: Vec<&'a QuestRecord> = match structured_requirements(record) {
            Some(requirements) => requirements
                .iter()
                .filter(|r| r.is_mandatory() && r.accepts(QuestStatus::Done))
                .filter_map(|r| catalog.resolve_reference(&r.quest))
                .collect(),
            None => record
                .previous_quests
                .iter()
                .filter_map(|name| catalog.resolve_reference(name))
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|target| guard_key(target) != own_key)
            .collect()
    }

    fn exclude_alternatives(&mut self, record: &'a QuestRecord, changes: &mut ChangeSet) {
        let catalog = self.catalog;
        let own_key = guard_key(record);
        for reference in &record.alternatives {
            let Some(alternative) = catalog.resolve_reference(reference) else {
                debug!(
                    "Alternative '{}' of '{}' is not in the catalog",
                    escape_log(reference),
                    escape_log(&record.name)
                );
                continue;
            };
            if guard_key(alternative) == own_key {
                continue;
            }
            if self.progress.status_for(alternative).is_none() {
                self.mark(alternative, StoredStatus::Failed, changes);
            }
        }
    }

    /// Write `status` for `record` into the store and note the persisted
    /// effect, including storage keys the write made stale.
    fn mark(&mut self, record: &QuestRecord, status: StoredStatus, changes: &mut ChangeSet) {
        let key = record.key();
        let halves = [
            QuestKey::new(key.id.as_deref(), None),
            QuestKey::new(None, key.normalized_name.as_deref()),
        ];
        let prior: Vec<String> = halves
            .iter()
            .filter(|half| !half.is_empty())
            .filter_map(|half| self.progress.entry_for_key(half))
            .map(|entry| entry.key.storage_key())
            .collect();

        let Some(entry) = self.progress.set(key, status) else {
            return;
        };
        let written = entry.key.storage_key();
        for stale in prior {
            if stale != written {
                changes.delete(stale);
            }
        }
        changes.saved.retain(|e| e.key.storage_key() != written);
        changes.saved.push(entry);
    }

    fn commit(&self, op: &str, changes: ChangeSet) -> ChangeSet {
        if changes.is_empty() {
            debug!("{}: nothing changed", op);
            return changes;
        }
        if !changes.saved.is_empty() {
            self.sink
                .submit(WriteOp::SaveProgressBatch(changes.saved.clone()));
        }
        for key in &changes.deleted {
            self.sink.submit(WriteOp::DeleteProgress(key.clone()));
        }
        info!(
            "{}: {} saved, {} removed",
            op,
            changes.saved.len(),
            changes.deleted.len()
        );
        self.notifier.notify(ProgressEvent::QuestsChanged);
        changes
    }
}
