use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROGRESS_SCHEMA_VERSION: u8 = 1;
pub const OBJECTIVE_SCHEMA_VERSION: u8 = 1;

/// Reduce a display name to the lower-case kebab form used as a lookup key.
///
/// Apostrophes are dropped rather than treated as separators so that
/// "What's on the flash drive?" becomes `whats-on-the-flash-drive`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Lower-cased lookup key. Catalog lookups are case-insensitive everywhere.
pub(crate) fn fold_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Derived status of a quest for the current player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Prerequisites (or the decode count) are not satisfied
    Locked,
    /// Available to work on
    Active,
    /// Completed, persisted
    Done,
    /// Failed or excluded by an alternative, persisted
    Failed,
    /// Player level or Scav karma too low
    LevelLocked,
    /// Edition or prestige requirement not met
    Unavailable,
}

impl QuestStatus {
    pub const ALL: [QuestStatus; 6] = [
        QuestStatus::Locked,
        QuestStatus::Active,
        QuestStatus::Done,
        QuestStatus::Failed,
        QuestStatus::LevelLocked,
        QuestStatus::Unavailable,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, QuestStatus::Done | QuestStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestStatus::Locked => "locked",
            QuestStatus::Active => "active",
            QuestStatus::Done => "done",
            QuestStatus::Failed => "failed",
            QuestStatus::LevelLocked => "level-locked",
            QuestStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The only statuses that are ever written to the progress store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StoredStatus {
    Done,
    Failed,
}

impl From<StoredStatus> for QuestStatus {
    fn from(value: StoredStatus) -> Self {
        match value {
            StoredStatus::Done => QuestStatus::Done,
            StoredStatus::Failed => QuestStatus::Failed,
        }
    }
}

impl TryFrom<QuestStatus> for StoredStatus {
    type Error = crate::quests::QuestError;

    fn try_from(value: QuestStatus) -> Result<Self, Self::Error> {
        match value {
            QuestStatus::Done => Ok(StoredStatus::Done),
            QuestStatus::Failed => Ok(StoredStatus::Failed),
            other => Err(crate::quests::QuestError::InvalidStatus(other.to_string())),
        }
    }
}

/// One acceptable status named by a prerequisite requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusToken {
    Active,
    Complete,
    Failed,
}

impl StatusToken {
    /// Parse a catalog status token (case-insensitive). Unknown spellings yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "active" | "start" | "started" | "accept" | "accepted" => Some(StatusToken::Active),
            "complete" | "completed" | "done" | "finish" | "finished" => {
                Some(StatusToken::Complete)
            }
            "failed" | "fail" => Some(StatusToken::Failed),
            _ => None,
        }
    }

    /// A quest is active before it completes, so `Active` also accepts `Done`.
    pub fn satisfied_by(self, status: QuestStatus) -> bool {
        match self {
            StatusToken::Active => matches!(status, QuestStatus::Active | QuestStatus::Done),
            StatusToken::Complete => status == QuestStatus::Done,
            StatusToken::Failed => status == QuestStatus::Failed,
        }
    }
}

/// Reference to another quest that must reach one of `statuses`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteRequirement {
    /// Quest id, falling back to normalized name when the id is unknown
    pub quest: String,
    /// 0 = mandatory, N > 0 = at least one member of OR-group N
    #[serde(default)]
    pub group: u32,
    #[serde(default)]
    pub statuses: Vec<String>,
}

impl PrerequisiteRequirement {
    pub fn new(quest: &str, group: u32, statuses: &[&str]) -> Self {
        Self {
            quest: quest.to_string(),
            group,
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parsed tokens; an empty (or entirely unknown) list means "complete".
    pub fn tokens(&self) -> Vec<StatusToken> {
        let tokens: Vec<StatusToken> = self
            .statuses
            .iter()
            .filter_map(|s| StatusToken::parse(s))
            .collect();
        if tokens.is_empty() {
            vec![StatusToken::Complete]
        } else {
            tokens
        }
    }

    pub fn accepts(&self, status: QuestStatus) -> bool {
        self.tokens().iter().any(|t| t.satisfied_by(status))
    }

    pub fn is_mandatory(&self) -> bool {
        self.group == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectiveRecord {
    /// Catalog objective id, when the catalog provides one
    pub id: Option<String>,
    pub description: String,
}

impl ObjectiveRecord {
    pub fn new(description: &str) -> Self {
        Self {
            id: None,
            description: description.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

/// Immutable quest definition from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    /// Equivalent stable ids; the first one is primary
    pub ids: Vec<String>,
    pub name: String,
    pub normalized_name: String,
    /// Cross-reference id from the external quest database
    pub external_id: Option<String>,
    pub trader: Option<String>,
    pub kappa_required: bool,
    pub objectives: Vec<ObjectiveRecord>,
    /// `None` means the catalog had no structured list, so `previous_quests` applies
    pub requirements: Option<Vec<PrerequisiteRequirement>>,
    /// Legacy fallback: names that must all be Done
    pub previous_quests: Vec<String>,
    pub leads_to: Vec<String>,
    /// Mutually exclusive siblings
    pub alternatives: Vec<String>,
    pub required_level: u32,
    /// Negative: karma must be <= threshold. Positive: karma must be >= threshold.
    pub required_scav_karma: Option<f64>,
    pub required_editions: Vec<String>,
    pub excluded_editions: Vec<String>,
    pub required_prestige: Option<u32>,
    /// Exact match, not a minimum
    pub required_decodes: Option<u32>,
}

impl QuestRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            ids: vec![id.to_string()],
            name: name.to_string(),
            normalized_name: normalize_name(name),
            external_id: None,
            trader: None,
            kappa_required: false,
            objectives: Vec::new(),
            requirements: None,
            previous_quests: Vec::new(),
            leads_to: Vec::new(),
            alternatives: Vec::new(),
            required_level: 0,
            required_scav_karma: None,
            required_editions: Vec::new(),
            excluded_editions: Vec::new(),
            required_prestige: None,
            required_decodes: None,
        }
    }

    pub fn primary_id(&self) -> &str {
        self.ids.first().map(String::as_str).unwrap_or_default()
    }

    pub fn key(&self) -> QuestKey {
        QuestKey::new(Some(self.primary_id()), Some(&self.normalized_name))
    }

    pub fn has_alternatives(&self) -> bool {
        !self.alternatives.is_empty()
    }

    pub fn with_alias_id(mut self, id: &str) -> Self {
        self.ids.push(id.to_string());
        self
    }

    pub fn with_external_id(mut self, external_id: &str) -> Self {
        self.external_id = Some(external_id.to_string());
        self
    }

    pub fn with_trader(mut self, trader: &str) -> Self {
        self.trader = Some(trader.to_string());
        self
    }

    pub fn with_kappa(mut self) -> Self {
        self.kappa_required = true;
        self
    }

    pub fn with_objective(mut self, objective: ObjectiveRecord) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_requirement(mut self, requirement: PrerequisiteRequirement) -> Self {
        self.requirements
            .get_or_insert_with(Vec::new)
            .push(requirement);
        self
    }

    pub fn with_previous_quest(mut self, name: &str) -> Self {
        self.previous_quests.push(name.to_string());
        self
    }

    pub fn with_alternative(mut self, quest: &str) -> Self {
        self.alternatives.push(quest.to_string());
        self
    }

    pub fn with_required_level(mut self, level: u32) -> Self {
        self.required_level = level;
        self
    }

    pub fn with_required_scav_karma(mut self, threshold: f64) -> Self {
        self.required_scav_karma = Some(threshold);
        self
    }

    pub fn with_required_edition(mut self, edition: &str) -> Self {
        self.required_editions.push(edition.to_string());
        self
    }

    pub fn with_excluded_edition(mut self, edition: &str) -> Self {
        self.excluded_editions.push(edition.to_string());
        self
    }

    pub fn with_required_prestige(mut self, prestige: u32) -> Self {
        self.required_prestige = Some(prestige);
        self
    }

    pub fn with_required_decodes(mut self, decodes: u32) -> Self {
        self.required_decodes = Some(decodes);
        self
    }
}

/// Dual key for one quest: catalog id plus normalized name.
///
/// Either half may be missing or stale after a catalog refresh; reconciliation
/// backfills both from the resolved record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct QuestKey {
    pub id: Option<String>,
    pub normalized_name: Option<String>,
}

impl QuestKey {
    pub fn new(id: Option<&str>, normalized_name: Option<&str>) -> Self {
        let clean = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            id: clean(id),
            normalized_name: clean(normalized_name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.normalized_name.is_none()
    }

    /// True when either half names the same quest (case-insensitive).
    pub fn overlaps(&self, other: &QuestKey) -> bool {
        let same = |a: &Option<String>, b: &Option<String>| match (a, b) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        same(&self.id, &other.id) || same(&self.normalized_name, &other.normalized_name)
    }

    /// Fill in halves this key is missing. Returns true if anything changed.
    pub fn merge(&mut self, other: &QuestKey) -> bool {
        let mut changed = false;
        if self.id.is_none() && other.id.is_some() {
            self.id = other.id.clone();
            changed = true;
        }
        if self.normalized_name.is_none() && other.normalized_name.is_some() {
            self.normalized_name = other.normalized_name.clone();
            changed = true;
        }
        changed
    }

    /// Overwrite both halves with `resolved`. Returns true if anything changed.
    pub fn rebind(&mut self, resolved: &QuestKey) -> bool {
        if self == resolved {
            return false;
        }
        *self = resolved.clone();
        true
    }

    pub fn id_storage_key(&self) -> Option<String> {
        self.id.as_ref().map(|id| format!("id:{}", fold_key(id)))
    }

    pub fn name_storage_key(&self) -> Option<String> {
        self.normalized_name
            .as_ref()
            .map(|name| format!("name:{}", fold_key(name)))
    }

    /// Key the entry is written under: id-keyed when an id is known.
    pub fn storage_key(&self) -> String {
        self.id_storage_key()
            .or_else(|| self.name_storage_key())
            .unwrap_or_default()
    }

    pub fn storage_keys(&self) -> Vec<String> {
        self.id_storage_key()
            .into_iter()
            .chain(self.name_storage_key())
            .collect()
    }
}

impl fmt::Display for QuestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.id.as_deref().unwrap_or("?"),
            self.normalized_name.as_deref().unwrap_or("?")
        )
    }
}

/// Persisted manual status for one quest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEntry {
    pub key: QuestKey,
    pub status: StoredStatus,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ProgressEntry {
    pub fn new(key: QuestKey, status: StoredStatus) -> Self {
        Self {
            key,
            status,
            updated_at: Utc::now(),
            schema_version: PROGRESS_SCHEMA_VERSION,
        }
    }
}

/// Persisted objective completion flag, keyed by an objective progress key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectiveEntry {
    pub key: String,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ObjectiveEntry {
    pub fn new(key: &str, completed: bool) -> Self {
        Self {
            key: key.to_string(),
            completed,
            updated_at: Utc::now(),
            schema_version: OBJECTIVE_SCHEMA_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_produces_kebab_keys() {
        assert_eq!(normalize_name("Shootout Picnic"), "shootout-picnic");
        assert_eq!(normalize_name("Gunsmith - Part 1"), "gunsmith-part-1");
        assert_eq!(
            normalize_name("What's on the flash drive?"),
            "whats-on-the-flash-drive"
        );
        assert_eq!(normalize_name("  Debut  "), "debut");
    }

    #[test]
    fn active_token_accepts_done() {
        let req = PrerequisiteRequirement::new("intro", 0, &["Active"]);
        assert!(req.accepts(QuestStatus::Active));
        assert!(req.accepts(QuestStatus::Done));
        assert!(!req.accepts(QuestStatus::Locked));
        assert!(!req.accepts(QuestStatus::Failed));
    }

    #[test]
    fn empty_token_list_means_complete() {
        let req = PrerequisiteRequirement::new("intro", 0, &[]);
        assert!(req.accepts(QuestStatus::Done));
        assert!(!req.accepts(QuestStatus::Active));

        let req = PrerequisiteRequirement::new("intro", 0, &["bogus"]);
        assert_eq!(req.tokens(), vec![StatusToken::Complete]);
    }

    #[test]
    fn failed_tokens_are_case_insensitive() {
        let req = PrerequisiteRequirement::new("intro", 0, &["FAIL"]);
        assert!(req.accepts(QuestStatus::Failed));
        assert!(!req.accepts(QuestStatus::Done));
    }

    #[test]
    fn quest_key_merge_fills_missing_half() {
        let mut key = QuestKey::new(None, Some("debut"));
        assert!(key.merge(&QuestKey::new(Some("q1"), Some("other"))));
        assert_eq!(key.id.as_deref(), Some("q1"));
        assert_eq!(key.normalized_name.as_deref(), Some("debut"));
        assert!(!key.merge(&QuestKey::new(Some("q2"), None)));
    }

    #[test]
    fn quest_key_storage_keys_are_case_folded() {
        let key = QuestKey::new(Some("ABC"), Some("Debut"));
        assert_eq!(key.storage_key(), "id:abc");
        assert_eq!(key.storage_keys(), vec!["id:abc", "name:debut"]);
        assert_eq!(QuestKey::new(None, Some("debut")).storage_key(), "name:debut");
    }

    #[test]
    fn stored_status_rejects_derived_statuses() {
        assert!(StoredStatus::try_from(QuestStatus::Done).is_ok());
        assert!(StoredStatus::try_from(QuestStatus::Locked).is_err());
    }
}
