//! Objective completion flags.
//!
//! A flag lives under `"<normalized quest name>:<index>"` and, when the catalog
//! gives the objective an id, also under `"id:<objective id>"`. Both forms are
//! written and removed together. Both are case-folded, and a quest whose name
//! folds to `id` is stored under `~id` so it never shares the id namespace.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, warn};

use crate::quests::notify::{ChangeNotifier, ProgressEvent};
use crate::quests::types::{fold_key, ObjectiveEntry};
use crate::quests::writer::{ProgressSink, WriteOp};

const ID_NAMESPACE: &str = "id";

/// Quest segment of an index key. `~` never appears in a normalized name.
fn quest_segment(quest_name: &str) -> String {
    let folded = fold_key(quest_name);
    if folded == ID_NAMESPACE {
        format!("~{}", folded)
    } else {
        folded
    }
}

fn quest_prefix(quest_name: &str) -> String {
    format!("{}:", quest_segment(quest_name))
}

pub fn index_key(quest_name: &str, index: usize) -> String {
    format!("{}:{}", quest_segment(quest_name), index)
}

pub fn id_key(objective_id: &str) -> String {
    format!("{}:{}", ID_NAMESPACE, fold_key(objective_id))
}

/// Event index for objective `index`; saturates at `i32::MAX`.
fn event_index(index: usize) -> i32 {
    i32::try_from(index).unwrap_or_else(|_| {
        warn!("Objective index {} does not fit an event index", index);
        i32::MAX
    })
}

pub struct ObjectiveTracker {
    flags: HashMap<String, ObjectiveEntry>,
    sink: Arc<dyn ProgressSink>,
    notifier: Arc<ChangeNotifier>,
}

impl ObjectiveTracker {
    pub fn new(sink: Arc<dyn ProgressSink>, notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            flags: HashMap::new(),
            sink,
            notifier,
        }
    }

    /// Seed from persisted entries. Only completed flags are kept.
    pub fn with_entries(mut self, entries: Vec<ObjectiveEntry>) -> Self {
        for entry in entries.into_iter().filter(|e| e.completed) {
            self.flags.insert(entry.key.clone(), entry);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn is_completed(&self, quest_name: &str, index: usize) -> bool {
        self.flags.contains_key(&index_key(quest_name, index))
    }

    pub fn is_completed_by_id(&self, objective_id: &str) -> bool {
        self.flags.contains_key(&id_key(objective_id))
    }

    /// Completed indices for one quest (prefix scan over index-keyed flags).
    pub fn completed_objectives_for(&self, quest_name: &str) -> BTreeSet<usize> {
        let prefix = quest_prefix(quest_name);
        self.flags
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.parse::<usize>().ok())
            .collect()
    }

    /// Set the flag for objective `index` of `quest_name`, mirroring it under the
    /// objective id when one is given. Returns true if anything changed.
    pub fn set_completed(
        &mut self,
        quest_name: &str,
        index: usize,
        completed: bool,
        objective_id: Option<&str>,
    ) -> bool {
        let mut changed = self.write_flag(index_key(quest_name, index), completed);
        if let Some(id) = objective_id.filter(|id| !id.trim().is_empty()) {
            changed |= self.write_flag(id_key(id), completed);
        }
        if changed {
            self.notifier.notify(ProgressEvent::ObjectiveChanged {
                quest_key: fold_key(quest_name),
                index: event_index(index),
                completed,
            });
        }
        changed
    }

    /// Set the flag for an objective addressed by catalog id. When the owning
    /// quest and index are known the index-keyed form is kept in step too.
    pub fn set_completed_by_id(
        &mut self,
        objective_id: &str,
        completed: bool,
        quest_name: Option<&str>,
        index: Option<usize>,
    ) -> bool {
        match (quest_name, index) {
            (Some(quest), Some(index)) => {
                self.set_completed(quest, index, completed, Some(objective_id))
            }
            _ => {
                let changed = self.write_flag(id_key(objective_id), completed);
                if changed {
                    self.notifier.notify(ProgressEvent::ObjectiveIdChanged {
                        objective_id: objective_id.trim().to_string(),
                        completed,
                    });
                }
                changed
            }
        }
    }

    /// Drop every flag of one quest, including the id-keyed forms of `objective_ids`.
    pub fn clear_quest(&mut self, quest_name: &str, objective_ids: &[&str]) -> usize {
        let prefix = quest_prefix(quest_name);
        let mut doomed: Vec<String> = self
            .flags
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        doomed.extend(
            objective_ids
                .iter()
                .map(|id| id_key(id))
                .filter(|key| self.flags.contains_key(key)),
        );
        for key in &doomed {
            self.flags.remove(key);
            self.sink.submit(WriteOp::DeleteObjective(key.clone()));
        }
        if !doomed.is_empty() {
            debug!("Cleared {} objective flags for {}", doomed.len(), quest_name);
            self.notifier.notify(ProgressEvent::ObjectiveChanged {
                quest_key: fold_key(quest_name),
                index: -1,
                completed: false,
            });
        }
        doomed.len()
    }

    pub fn clear_all(&mut self) {
        if self.flags.is_empty() {
            return;
        }
        self.flags.clear();
        self.sink.submit(WriteOp::ClearObjectives);
        self.notifier.notify(ProgressEvent::ObjectivesCleared);
    }

    fn write_flag(&mut self, key: String, completed: bool) -> bool {
        if completed {
            if self.flags.contains_key(&key) {
                return false;
            }
            let entry = ObjectiveEntry::new(&key, true);
            self.sink.submit(WriteOp::SaveObjective(entry.clone()));
            self.flags.insert(key, entry);
            true
        } else if self.flags.remove(&key).is_some() {
            self.sink.submit(WriteOp::DeleteObjective(key));
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quests::writer::RecordingSink;

    fn tracker() -> (ObjectiveTracker, Arc<RecordingSink>, Arc<ChangeNotifier>) {
        let sink = Arc::new(RecordingSink::new());
        let notifier = Arc::new(ChangeNotifier::new());
        let tracker = ObjectiveTracker::new(sink.clone(), notifier.clone());
        (tracker, sink, notifier)
    }

    #[test]
    fn set_completed_writes_both_key_forms() {
        let (mut tracker, sink, _) = tracker();
        assert!(tracker.set_completed("debut", 0, true, Some("obj-1")));
        assert!(tracker.is_completed("debut", 0));
        assert!(tracker.is_completed_by_id("obj-1"));
        assert_eq!(sink.take().len(), 2);

        assert!(!tracker.set_completed("debut", 0, true, Some("obj-1")));
        assert!(sink.take().is_empty());
    }

    #[test]
    fn uncomplete_removes_both_forms() {
        let (mut tracker, sink, _) = tracker();
        tracker.set_completed("debut", 1, true, Some("obj-2"));
        sink.take();
        assert!(tracker.set_completed_by_id("obj-2", false, Some("debut"), Some(1)));
        assert!(!tracker.is_completed("debut", 1));
        assert!(!tracker.is_completed_by_id("obj-2"));
        assert_eq!(
            sink.take(),
            vec![
                WriteOp::DeleteObjective("debut:1".into()),
                WriteOp::DeleteObjective("id:obj-2".into()),
            ]
        );
    }

    #[test]
    fn completed_objectives_ignore_other_quests() {
        let (mut tracker, _, _) = tracker();
        tracker.set_completed("debut", 0, true, None);
        tracker.set_completed("debut", 2, true, None);
        tracker.set_completed("debut-part-2", 1, true, None);
        let done = tracker.completed_objectives_for("Debut");
        assert_eq!(done.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn id_only_update_notifies_by_id() {
        let (mut tracker, _, notifier) = tracker();
        let mut events = notifier.subscribe();
        tracker.set_completed_by_id("obj-9", true, None, None);
        assert_eq!(
            events.try_recv().ok(),
            Some(ProgressEvent::ObjectiveIdChanged {
                objective_id: "obj-9".into(),
                completed: true
            })
        );
    }

    #[test]
    fn clear_quest_emits_minus_one() {
        let (mut tracker, _, notifier) = tracker();
        tracker.set_completed("debut", 0, true, Some("obj-1"));
        tracker.set_completed("debut", 1, true, None);
        let mut events = notifier.subscribe();
        assert_eq!(tracker.clear_quest("debut", &["obj-1"]), 3);
        assert!(tracker.is_empty());
        assert_eq!(
            events.try_recv().ok(),
            Some(ProgressEvent::ObjectiveChanged {
                quest_key: "debut".into(),
                index: -1,
                completed: false
            })
        );
    }

    #[test]
    fn clear_all_notifies_subscribers() {
        let (mut tracker, sink, notifier) = tracker();
        tracker.set_completed("debut", 0, true, None);
        let mut events = notifier.subscribe();
        tracker.clear_all();
        assert!(tracker.is_empty());
        assert_eq!(events.try_recv().ok(), Some(ProgressEvent::ObjectivesCleared));
        assert_eq!(sink.ops().last(), Some(&WriteOp::ClearObjectives));

        // Nothing left to clear: no second event
        tracker.clear_all();
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn quest_named_id_stays_out_of_the_id_namespace() {
        let (mut tracker, _, _) = tracker();
        tracker.set_completed("Id", 3, true, None);
        tracker.set_completed_by_id("3", true, None, None);
        assert_eq!(tracker.len(), 2);
        assert_eq!(
            tracker.completed_objectives_for("id").into_iter().collect::<Vec<_>>(),
            vec![3]
        );
        assert_eq!(tracker.clear_quest("id", &[]), 1);
        assert!(tracker.is_completed_by_id("3"));
    }

    #[test]
    fn objective_ids_are_case_folded() {
        let (mut tracker, _, _) = tracker();
        tracker.set_completed("debut", 0, true, Some("OBJ-Debut-Kill"));
        assert!(tracker.is_completed_by_id("obj-debut-kill"));
        assert!(!tracker.set_completed_by_id("obj-debut-kill", true, None, None));
    }

    #[test]
    fn oversized_index_saturates_in_events() {
        let (mut tracker, _, notifier) = tracker();
        let mut events = notifier.subscribe();
        tracker.set_completed("debut", usize::MAX, true, None);
        assert!(tracker.is_completed("debut", usize::MAX));
        assert_eq!(
            events.try_recv().ok(),
            Some(ProgressEvent::ObjectiveChanged {
                quest_key: "debut".into(),
                index: i32::MAX,
                completed: true
            })
        );
    }

    #[test]
    fn seeded_entries_are_visible() {
        let (tracker, _, _) = tracker();
        let tracker = tracker.with_entries(vec![
            ObjectiveEntry::new("debut:3", true),
            ObjectiveEntry::new("debut:4", false),
        ]);
        assert!(tracker.is_completed("debut", 3));
        assert!(!tracker.is_completed("debut", 4));
        assert_eq!(tracker.len(), 1);
    }
}
