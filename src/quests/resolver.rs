//! Quest Status Resolution
//!
//! Derives a [`QuestStatus`] for a quest from stored progress, the player's
//! attributes and the prerequisite graph.
//!
//! ## Precedence
//! 1. Stored Done/Failed always wins.
//! 2. A quest already being resolved higher in the chain resolves as Active.
//! 3. Edition, then prestige: Unavailable.
//! 4. Decode count (exact match), then prerequisites: Locked.
//! 5. Player level, then Scav karma: LevelLocked.
//! 6. Otherwise Active.
//!
//! ## Cycles
//! The in-progress chain lives in a [`ResolutionGuard`] that callers pass by
//! reference. When a prerequisite lookup runs into a quest that is still on the
//! chain, the requirement edge that closes the loop is treated as satisfied, so a
//! cycle on its own never locks the quests inside it. Results that did not touch
//! the chain are memoized for the lifetime of the guard.

use log::trace;
use std::collections::{BTreeMap, HashMap};

use crate::quests::attributes::PlayerAttributes;
use crate::quests::catalog::CatalogIndex;
use crate::quests::progress::ProgressStore;
use crate::quests::types::{fold_key, PrerequisiteRequirement, QuestRecord, QuestStatus};

/// Per-call-chain resolution state: the in-progress stack plus a memo.
#[derive(Debug, Default)]
pub struct ResolutionGuard {
    stack: Vec<String>,
    memo: HashMap<String, QuestStatus>,
}

impl ResolutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no resolution is in flight.
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    fn depth_of(&self, key: &str) -> Option<usize> {
        self.stack.iter().position(|k| k == key)
    }

    fn push(&mut self, key: String) -> usize {
        self.stack.push(key);
        self.stack.len() - 1
    }

    fn pop(&mut self) {
        self.stack.pop();
    }
}

/// Status plus the shallowest in-progress frame the result depended on.
#[derive(Debug, Clone, Copy)]
struct Resolved {
    status: QuestStatus,
    low: Option<usize>,
}

impl Resolved {
    fn settled(status: QuestStatus) -> Self {
        Self { status, low: None }
    }
}

/// Why a quest is not Active.
#[derive(Debug, Clone, PartialEq)]
pub enum Blocker {
    Edition,
    Prestige { required: u32 },
    Decodes { required: u32 },
    Prerequisite { quest: String, group: u32 },
    PreviousQuest { quest: String },
    Level { required: u32 },
    ScavKarma { threshold: f64 },
}

/// Read-only status view over a catalog, progress store and attribute source.
pub struct StatusResolver<'a> {
    catalog: &'a CatalogIndex,
    progress: &'a ProgressStore,
    player: &'a dyn PlayerAttributes,
}

impl<'a> StatusResolver<'a> {
    pub fn new(
        catalog: &'a CatalogIndex,
        progress: &'a ProgressStore,
        player: &'a dyn PlayerAttributes,
    ) -> Self {
        Self {
            catalog,
            progress,
            player,
        }
    }

    /// Resolve one quest with a fresh guard.
    pub fn status(&self, record: &QuestRecord) -> QuestStatus {
        let mut guard = ResolutionGuard::new();
        let status = self.status_with(record, &mut guard);
        debug_assert!(guard.is_idle(), "resolution guard left frames behind");
        status
    }

    /// Resolve one quest inside an existing call chain.
    pub fn status_with(&self, record: &QuestRecord, guard: &mut ResolutionGuard) -> QuestStatus {
        self.resolve(record, guard).status
    }

    /// Resolve every catalog quest, sharing one memo.
    pub fn status_all(&self) -> Vec<(&'a QuestRecord, QuestStatus)> {
        let mut guard = ResolutionGuard::new();
        let catalog = self.catalog;
        catalog
            .records()
            .iter()
            .map(|record| (record, self.status_with(record, &mut guard)))
            .collect()
    }

    /// List everything currently keeping `record` from being Active.
    pub fn blockers(&self, record: &QuestRecord) -> Vec<Blocker> {
        if self.progress.status_for(record).is_some() {
            return Vec::new();
        }
        let mut blockers = Vec::new();
        if !self.edition_ok(record) {
            blockers.push(Blocker::Edition);
        }
        if let Some(required) = record.required_prestige {
            if self.player.prestige() < required {
                blockers.push(Blocker::Prestige { required });
            }
        }
        if let Some(required) = record.required_decodes {
            if self.player.decode_count() != required {
                blockers.push(Blocker::Decodes { required });
            }
        }

        let mut guard = ResolutionGuard::new();
        guard.push(guard_key(record));
        match structured_requirements(record) {
            Some(requirements) => {
                let mut unmet_by_group: BTreeMap<u32, Vec<Blocker>> = BTreeMap::new();
                let mut satisfied_groups = Vec::new();
                for requirement in requirements {
                    let Some(target) = self.catalog.resolve_reference(&requirement.quest) else {
                        continue;
                    };
                    let sub = self.resolve(target, &mut guard);
                    let cyclic = sub.low.is_some_and(|low| low == 0);
                    if cyclic || requirement.accepts(sub.status) {
                        satisfied_groups.push(requirement.group);
                    } else {
                        unmet_by_group
                            .entry(requirement.group)
                            .or_default()
                            .push(Blocker::Prerequisite {
                                quest: target.name.clone(),
                                group: requirement.group,
                            });
                    }
                }
                for (group, unmet) in unmet_by_group {
                    if group == 0 || !satisfied_groups.contains(&group) {
                        blockers.extend(unmet);
                    }
                }
            }
            None => {
                for name in &record.previous_quests {
                    let Some(target) = self.catalog.resolve_reference(name) else {
                        continue;
                    };
                    let sub = self.resolve(target, &mut guard);
                    let cyclic = sub.low.is_some_and(|low| low == 0);
                    if !cyclic && sub.status != QuestStatus::Done {
                        blockers.push(Blocker::PreviousQuest {
                            quest: target.name.clone(),
                        });
                    }
                }
            }
        }
        guard.pop();

        if self.player.level() < record.required_level {
            blockers.push(Blocker::Level {
                required: record.required_level,
            });
        }
        if let Some(threshold) = record.required_scav_karma {
            if !karma_ok(self.player.scav_karma(), threshold) {
                blockers.push(Blocker::ScavKarma { threshold });
            }
        }
        blockers
    }

    fn resolve(&self, record: &QuestRecord, guard: &mut ResolutionGuard) -> Resolved {
        if let Some(stored) = self.progress.status_for(record) {
            return Resolved::settled(stored.into());
        }

        let key = guard_key(record);
        if let Some(depth) = guard.depth_of(&key) {
            trace!("Cycle through '{}' broken at depth {}", key, depth);
            return Resolved {
                status: QuestStatus::Active,
                low: Some(depth),
            };
        }
        if let Some(&status) = guard.memo.get(&key) {
            return Resolved::settled(status);
        }

        if !self.edition_ok(record) {
            return self.remember(guard, key, QuestStatus::Unavailable);
        }
        if let Some(required) = record.required_prestige {
            if self.player.prestige() < required {
                return self.remember(guard, key, QuestStatus::Unavailable);
            }
        }
        if let Some(required) = record.required_decodes {
            if self.player.decode_count() != required {
                return self.remember(guard, key, QuestStatus::Locked);
            }
        }

        let depth = guard.push(key.clone());
        let (prerequisites_met, low) = self.prerequisites_met(record, depth, guard);
        guard.pop();

        let status = if !prerequisites_met {
            QuestStatus::Locked
        } else if self.player.level() < record.required_level {
            QuestStatus::LevelLocked
        } else if !record
            .required_scav_karma
            .map_or(true, |threshold| karma_ok(self.player.scav_karma(), threshold))
        {
            // Karma gating shares LevelLocked with the level check.
            QuestStatus::LevelLocked
        } else {
            QuestStatus::Active
        };

        // Only a subtree that never reached the chain (this frame included) is memoized.
        match low {
            None => self.remember(guard, key, status),
            Some(_) => Resolved {
                status,
                low: low.filter(|&l| l < depth),
            },
        }
    }

    fn remember(&self, guard: &mut ResolutionGuard, key: String, status: QuestStatus) -> Resolved {
        guard.memo.insert(key, status);
        Resolved::settled(status)
    }

    /// Evaluate AND/OR groups (or the legacy list). The returned low-link covers
    /// `depth` itself, so a cycle closing onto this frame is visible to the caller.
    fn prerequisites_met(
        &self,
        record: &QuestRecord,
        depth: usize,
        guard: &mut ResolutionGuard,
    ) -> (bool, Option<usize>) {
        let mut low: Option<usize> = None;

        let Some(requirements) = structured_requirements(record) else {
            for name in &record.previous_quests {
                let Some(target) = self.catalog.resolve_reference(name) else {
                    continue;
                };
                let sub = self.resolve(target, guard);
                fold_low(&mut low, depth, &sub);
                let closes_cycle = sub.low.is_some_and(|l| l <= depth);
                if !closes_cycle && sub.status != QuestStatus::Done {
                    return (false, low);
                }
            }
            return (true, low);
        };

        // group id -> (has a resolvable member, has a satisfied member)
        let mut or_groups: BTreeMap<u32, (bool, bool)> = BTreeMap::new();
        for requirement in requirements {
            let target = self.catalog.resolve_reference(&requirement.quest);
            if !requirement.is_mandatory() {
                let state = or_groups.entry(requirement.group).or_insert((false, false));
                if state.1 {
                    continue;
                }
            }
            let Some(target) = target else {
                trace!(
                    "Requirement '{}' of '{}' does not resolve; skipped",
                    requirement.quest,
                    record.normalized_name
                );
                continue;
            };
            let sub = self.resolve(target, guard);
            fold_low(&mut low, depth, &sub);
            let satisfied = requirement.accepts(sub.status) || sub.low.is_some_and(|l| l <= depth);

            if requirement.is_mandatory() {
                if !satisfied {
                    return (false, low);
                }
            } else if let Some(state) = or_groups.get_mut(&requirement.group) {
                state.0 = true;
                state.1 |= satisfied;
            }
        }

        // An OR group whose members all fail to resolve does not block.
        let groups_met = or_groups
            .values()
            .all(|&(resolvable, satisfied)| satisfied || !resolvable);
        (groups_met, low)
    }

    fn edition_ok(&self, record: &QuestRecord) -> bool {
        let required_met = record.required_editions.is_empty()
            || record
                .required_editions
                .iter()
                .any(|edition| self.player.owns_edition(edition));
        let excluded_hit = record
            .excluded_editions
            .iter()
            .any(|edition| self.player.owns_edition(edition));
        required_met && !excluded_hit
    }
}

/// Structured requirements, or `None` when the legacy name list should apply.
/// An empty structured list defers to legacy names when there are any.
pub(crate) fn structured_requirements(record: &QuestRecord) -> Option<&[PrerequisiteRequirement]> {
    match record.requirements.as_deref() {
        Some(list) if !list.is_empty() => Some(list),
        _ if !record.previous_quests.is_empty() => None,
        _ => Some(&[][..]),
    }
}

/// Fold a sub-result's low-link into `low`, keeping frames at or above `depth`.
fn fold_low(low: &mut Option<usize>, depth: usize, sub: &Resolved) {
    if let Some(l) = sub.low.filter(|&l| l <= depth) {
        *low = Some(low.map_or(l, |cur| cur.min(l)));
    }
}

/// Negative thresholds are upper bounds, everything else a lower bound.
fn karma_ok(karma: f64, threshold: f64) -> bool {
    if threshold < 0.0 {
        karma <= threshold
    } else {
        karma >= threshold
    }
}

pub(crate) fn guard_key(record: &QuestRecord) -> String {
    let id = record.primary_id();
    if id.is_empty() {
        format!("name:{}", fold_key(&record.normalized_name))
    } else {
        format!("id:{}", fold_key(id))
    }
}
