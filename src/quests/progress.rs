//! In-memory authority for manually set quest statuses.
//!
//! Entries are addressable by catalog id or normalized name so that a catalog
//! rename does not orphan progress. Only `Done` and `Failed` are ever held here;
//! every other status is derived by the resolver.

use std::collections::HashMap;

use crate::quests::types::{fold_key, ProgressEntry, QuestKey, QuestRecord, StoredStatus};

#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    entries: Vec<ProgressEntry>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted entries. Entries that overlap on either key half are
    /// merged, the most recently updated status winning.
    pub fn from_entries(entries: Vec<ProgressEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.absorb(entry);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    /// Stored status for a catalog record: any of its ids first, then its name.
    pub fn status_for(&self, record: &QuestRecord) -> Option<StoredStatus> {
        record
            .ids
            .iter()
            .find_map(|id| self.by_id.get(&fold_key(id)))
            .or_else(|| self.by_name.get(&fold_key(&record.normalized_name)))
            .map(|&pos| self.entries[pos].status)
    }

    pub fn status_for_key(&self, key: &QuestKey) -> Option<StoredStatus> {
        self.position(key).map(|pos| self.entries[pos].status)
    }

    pub fn entry_for_key(&self, key: &QuestKey) -> Option<&ProgressEntry> {
        self.position(key).map(|pos| &self.entries[pos])
    }

    /// Record `status` for `key`. Returns the written entry, or `None` when the
    /// store already held exactly this status under this key.
    pub fn set(&mut self, key: QuestKey, status: StoredStatus) -> Option<ProgressEntry> {
        if key.is_empty() {
            return None;
        }
        let overlapping = self.overlapping(&key);
        match overlapping.as_slice() {
            [] => {
                let entry = ProgressEntry::new(key, status);
                self.entries.push(entry.clone());
                self.reindex();
                Some(entry)
            }
            [pos] => {
                let pos = *pos;
                let existing = &mut self.entries[pos];
                let key_changed = existing.key.merge(&key);
                if !key_changed && existing.status == status {
                    return None;
                }
                existing.status = status;
                existing.updated_at = chrono::Utc::now();
                let entry = existing.clone();
                if key_changed {
                    self.reindex();
                }
                Some(entry)
            }
            _ => {
                // The key bridges two entries (one by id, one by name): collapse them.
                self.remove(&key);
                let entry = ProgressEntry::new(key, status);
                self.entries.push(entry.clone());
                self.reindex();
                Some(entry)
            }
        }
    }

    /// Remove every entry matching either half of `key`.
    pub fn remove(&mut self, key: &QuestKey) -> Vec<ProgressEntry> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.key.overlaps(key));
        self.entries = kept;
        self.reindex();
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
        self.by_name.clear();
    }

    /// Replace all entries wholesale (used by reconciliation).
    pub(crate) fn replace_entries(&mut self, entries: Vec<ProgressEntry>) {
        self.entries = entries;
        self.reindex();
    }

    fn absorb(&mut self, entry: ProgressEntry) {
        let overlapping = self.overlapping(&entry.key);
        if overlapping.is_empty() {
            self.entries.push(entry);
            self.reindex();
            return;
        }
        let mut merged = entry;
        for &pos in &overlapping {
            let existing = &self.entries[pos];
            if existing.updated_at > merged.updated_at {
                merged.status = existing.status;
                merged.updated_at = existing.updated_at;
            }
            let existing_key = existing.key.clone();
            merged.key.merge(&existing_key);
        }
        let mut pos_sorted = overlapping;
        pos_sorted.sort_unstable_by(|a, b| b.cmp(a));
        for pos in pos_sorted {
            self.entries.remove(pos);
        }
        self.entries.push(merged);
        self.reindex();
    }

    fn position(&self, key: &QuestKey) -> Option<usize> {
        key.id
            .as_deref()
            .and_then(|id| self.by_id.get(&fold_key(id)))
            .or_else(|| {
                key.normalized_name
                    .as_deref()
                    .and_then(|name| self.by_name.get(&fold_key(name)))
            })
            .copied()
    }

    fn overlapping(&self, key: &QuestKey) -> Vec<usize> {
        let mut hits = Vec::with_capacity(2);
        if let Some(pos) = key.id.as_deref().and_then(|id| self.by_id.get(&fold_key(id))) {
            hits.push(*pos);
        }
        if let Some(pos) = key
            .normalized_name
            .as_deref()
            .and_then(|name| self.by_name.get(&fold_key(name)))
        {
            if !hits.contains(pos) {
                hits.push(*pos);
            }
        }
        hits
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
        for (pos, entry) in self.entries.iter().enumerate() {
            if let Some(id) = &entry.key.id {
                self.by_id.entry(fold_key(id)).or_insert(pos);
            }
            if let Some(name) = &entry.key.normalized_name {
                self.by_name.entry(fold_key(name)).or_insert(pos);
            }
        }
    }
}
