//! Re-map stored progress onto a freshly loaded catalog.
//!
//! Each entry is resolved by id, then by normalized name. A resolved entry gets
//! its key rebound to the record's current (id, name) pair; an entry that
//! resolves by neither is an orphan and is kept as is. Entries that end up
//! naming the same quest are merged, newest status first.

use std::collections::HashSet;

use log::{info, warn};

use crate::logutil::escape_log;
use crate::quests::catalog::CatalogIndex;
use crate::quests::progress::ProgressStore;
use crate::quests::types::QuestKey;
use crate::quests::writer::{ProgressSink, WriteOp};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub examined: usize,
    pub rebound: usize,
    pub merged: usize,
    pub orphans: Vec<QuestKey>,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.rebound > 0 || self.merged > 0
    }
}

pub fn reconcile(
    catalog: &CatalogIndex,
    progress: &mut ProgressStore,
    sink: &dyn ProgressSink,
) -> ReconcileReport {
    let mut report = ReconcileReport {
        examined: progress.len(),
        ..ReconcileReport::default()
    };
    let mut stale_keys: Vec<String> = Vec::new();
    let mut touched: HashSet<String> = HashSet::new();
    let mut rebound_entries = Vec::with_capacity(progress.len());

    for entry in progress.entries() {
        let mut entry = entry.clone();
        let Some(record) = catalog.resolve_key(&entry.key) else {
            warn!(
                "Orphaned progress entry {} ({:?}) no longer matches the catalog",
                escape_log(&entry.key.to_string()),
                entry.status
            );
            report.orphans.push(entry.key.clone());
            rebound_entries.push(entry);
            continue;
        };
        let previous_keys = entry.key.storage_keys();
        if entry.key.rebind(&record.key()) {
            report.rebound += 1;
            let current_keys = entry.key.storage_keys();
            stale_keys.extend(
                previous_keys
                    .into_iter()
                    .filter(|key| !current_keys.contains(key)),
            );
            touched.insert(entry.key.storage_key());
        }
        rebound_entries.push(entry);
    }

    let before = rebound_entries.len();
    let merged = ProgressStore::from_entries(rebound_entries);
    report.merged = before - merged.len();

    if !report.changed() {
        return report;
    }

    // Merging can also drop an untouched entry's key in favour of a rebound one.
    let surviving: HashSet<String> = merged
        .entries()
        .iter()
        .map(|entry| entry.key.storage_key())
        .collect();
    let saves: Vec<_> = merged
        .entries()
        .iter()
        .filter(|entry| touched.contains(&entry.key.storage_key()))
        .cloned()
        .collect();
    for entry in progress.entries() {
        let key = entry.key.storage_key();
        if !surviving.contains(&key) && !stale_keys.contains(&key) {
            stale_keys.push(key);
        }
    }
    stale_keys.retain(|key| !surviving.contains(key));
    stale_keys.sort();
    stale_keys.dedup();

    progress.replace_entries(merged.entries().to_vec());
    if !saves.is_empty() {
        sink.submit(WriteOp::SaveProgressBatch(saves));
    }
    for key in stale_keys {
        sink.submit(WriteOp::DeleteProgress(key));
    }

    info!(
        "Reconciled {} progress entries: {} rebound, {} merged, {} orphaned",
        report.examined,
        report.rebound,
        report.merged,
        report.orphans.len()
    );
    report
}
