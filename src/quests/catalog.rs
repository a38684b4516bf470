//! Quest catalog lookup tables and JSON catalog loading.
//!
//! The catalog is replaced wholesale on every refresh; nothing here mutates a
//! record after [`CatalogIndex::build`].

use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::logutil::escape_log;
use crate::quests::errors::QuestError;
use crate::quests::types::{
    fold_key, normalize_name, ObjectiveRecord, PrerequisiteRequirement, QuestKey, QuestRecord,
};

/// O(1) lookup over an immutable quest list.
///
/// All three maps are case-insensitive and keep the first record that claimed a key.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    records: Vec<QuestRecord>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    by_external_id: HashMap<String, usize>,
    duplicate_keys: usize,
}

impl CatalogIndex {
    pub fn build(records: Vec<QuestRecord>) -> Self {
        let mut index = Self {
            records,
            ..Self::default()
        };

        for (pos, record) in index.records.iter().enumerate() {
            for id in &record.ids {
                if !claim(&mut index.by_id, id, pos) {
                    warn!(
                        "Duplicate quest id '{}' on '{}' ignored (first occurrence wins)",
                        escape_log(id),
                        escape_log(&record.name)
                    );
                    index.duplicate_keys += 1;
                }
            }
            if !claim(&mut index.by_name, &record.normalized_name, pos) {
                warn!(
                    "Duplicate quest name '{}' ignored (first occurrence wins)",
                    escape_log(&record.normalized_name)
                );
                index.duplicate_keys += 1;
            }
            if let Some(external) = &record.external_id {
                if !claim(&mut index.by_external_id, external, pos) {
                    warn!(
                        "Duplicate external id '{}' on '{}' ignored (first occurrence wins)",
                        escape_log(external),
                        escape_log(&record.name)
                    );
                    index.duplicate_keys += 1;
                }
            }
        }

        debug!(
            "Catalog index built: {} quests, {} ids, {} duplicate keys",
            index.records.len(),
            index.by_id.len(),
            index.duplicate_keys
        );
        index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[QuestRecord] {
        &self.records
    }

    /// Number of keys dropped because an earlier record already claimed them.
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }

    pub fn find_by_id(&self, id: &str) -> Option<&QuestRecord> {
        self.by_id.get(&fold_key(id)).map(|&pos| &self.records[pos])
    }

    pub fn find_by_name(&self, normalized_name: &str) -> Option<&QuestRecord> {
        self.by_name
            .get(&fold_key(normalized_name))
            .map(|&pos| &self.records[pos])
    }

    pub fn find_by_external_id(&self, external_id: &str) -> Option<&QuestRecord> {
        self.by_external_id
            .get(&fold_key(external_id))
            .map(|&pos| &self.records[pos])
    }

    /// Resolve a prerequisite/alternative reference: id first, then normalized name.
    pub fn resolve_reference(&self, reference: &str) -> Option<&QuestRecord> {
        self.find_by_id(reference)
            .or_else(|| self.find_by_name(reference))
            .or_else(|| self.find_by_name(&normalize_name(reference)))
    }

    /// Resolve a stored dual key: id first, then normalized name.
    pub fn resolve_key(&self, key: &QuestKey) -> Option<&QuestRecord> {
        key.id
            .as_deref()
            .and_then(|id| self.find_by_id(id))
            .or_else(|| {
                key.normalized_name
                    .as_deref()
                    .and_then(|name| self.find_by_name(name))
            })
    }

    /// Free-form lookup for user input: id, normalized name, display name, external id.
    pub fn lookup(&self, query: &str) -> Option<&QuestRecord> {
        self.resolve_reference(query)
            .or_else(|| self.find_by_external_id(query))
    }
}

fn claim(map: &mut HashMap<String, usize>, key: &str, pos: usize) -> bool {
    let folded = fold_key(key);
    if folded.is_empty() {
        return true;
    }
    match map.get(&folded) {
        Some(&existing) => existing == pos,
        None => {
            map.insert(folded, pos);
            true
        }
    }
}

/// Load the quest catalog from a JSON array on disk.
pub fn load_catalog_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<QuestRecord>, QuestError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let records = parse_catalog(&contents)?;
    debug!("Loaded {} quests from {}", records.len(), path.display());
    Ok(records)
}

/// Parse catalog JSON text into quest records.
pub fn parse_catalog(json: &str) -> Result<Vec<QuestRecord>, QuestError> {
    let seeds: Vec<QuestSeed> = serde_json::from_str(json)?;
    Ok(seeds.into_iter().map(QuestSeed::into_record).collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestSeed {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    ids: Vec<String>,
    name: String,
    #[serde(default)]
    normalized_name: Option<String>,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    trader: Option<String>,
    #[serde(default)]
    kappa_required: bool,
    #[serde(default)]
    objectives: Vec<ObjectiveSeed>,
    #[serde(default)]
    requirements: Option<Vec<PrerequisiteRequirement>>,
    #[serde(default)]
    previous_quests: Vec<String>,
    #[serde(default)]
    leads_to: Vec<String>,
    #[serde(default)]
    alternatives: Vec<String>,
    #[serde(default)]
    required_level: u32,
    #[serde(default)]
    required_scav_karma: Option<f64>,
    #[serde(default)]
    required_editions: Vec<String>,
    #[serde(default)]
    excluded_editions: Vec<String>,
    #[serde(default)]
    required_prestige: Option<u32>,
    #[serde(default)]
    required_decodes: Option<u32>,
}

/// Objectives come either as bare strings or `{ "id": ..., "description": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ObjectiveSeed {
    Text(String),
    Full {
        #[serde(default)]
        id: Option<String>,
        description: String,
    },
}

impl QuestSeed {
    fn into_record(self) -> QuestRecord {
        let mut ids = Vec::with_capacity(self.ids.len() + 1);
        if let Some(id) = self.id {
            ids.push(id);
        }
        for id in self.ids {
            if !ids.iter().any(|known| known.eq_ignore_ascii_case(&id)) {
                ids.push(id);
            }
        }
        let normalized_name = self
            .normalized_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| normalize_name(&self.name));

        QuestRecord {
            ids,
            name: self.name,
            normalized_name,
            external_id: self.external_id,
            trader: self.trader,
            kappa_required: self.kappa_required,
            objectives: self
                .objectives
                .into_iter()
                .map(|seed| match seed {
                    ObjectiveSeed::Text(description) => ObjectiveRecord {
                        id: None,
                        description,
                    },
                    ObjectiveSeed::Full { id, description } => ObjectiveRecord { id, description },
                })
                .collect(),
            requirements: self.requirements,
            previous_quests: self.previous_quests,
            leads_to: self.leads_to,
            alternatives: self.alternatives,
            required_level: self.required_level,
            required_scav_karma: self.required_scav_karma,
            required_editions: self.required_editions,
            excluded_editions: self.excluded_editions,
            required_prestige: self.required_prestige,
            required_decodes: self.required_decodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive() {
        let index = CatalogIndex::build(vec![QuestRecord::new("5936d90786f7742b1420ba5b", "Debut")
            .with_external_id("BSG-1")]);
        assert!(index.find_by_id("5936D90786F7742B1420BA5B").is_some());
        assert!(index.find_by_name("DEBUT").is_some());
        assert!(index.find_by_external_id("bsg-1").is_some());
        assert!(index.lookup("Debut").is_some());
    }

    #[test]
    fn first_occurrence_wins_on_duplicates() {
        let first = QuestRecord::new("q1", "Debut").with_trader("Prapor");
        let second = QuestRecord::new("q1", "Debut").with_trader("Therapist");
        let index = CatalogIndex::build(vec![first, second]);
        assert_eq!(
            index.find_by_id("q1").and_then(|r| r.trader.as_deref()),
            Some("Prapor")
        );
        assert_eq!(index.duplicate_keys(), 2);
    }

    #[test]
    fn alias_ids_resolve_to_the_same_record() {
        let index = CatalogIndex::build(vec![QuestRecord::new("q1", "Debut").with_alias_id("q1-pve")]);
        assert_eq!(
            index.find_by_id("q1-pve").map(|r| r.primary_id()),
            Some("q1")
        );
        assert_eq!(index.duplicate_keys(), 0);
    }

    #[test]
    fn resolve_key_prefers_id_then_name() {
        let index = CatalogIndex::build(vec![
            QuestRecord::new("q1", "Debut"),
            QuestRecord::new("q2", "Checking"),
        ]);
        let key = QuestKey::new(Some("q2"), Some("debut"));
        assert_eq!(index.resolve_key(&key).map(|r| r.primary_id()), Some("q2"));
        let stale = QuestKey::new(Some("gone"), Some("debut"));
        assert_eq!(index.resolve_key(&stale).map(|r| r.primary_id()), Some("q1"));
        assert!(index.resolve_key(&QuestKey::new(Some("gone"), None)).is_none());
    }

    #[test]
    fn parse_catalog_accepts_both_id_shapes() {
        let json = r#"[
            {"id": "q1", "name": "Debut", "requiredLevel": 1,
             "objectives": ["Eliminate 5 Scavs", {"id": "o2", "description": "Hand over 2 MP-133"}]},
            {"ids": ["q2", "q2-alt"], "name": "Shootout Picnic", "normalizedName": "shootout-picnic",
             "requirements": [{"quest": "q1", "group": 0, "statuses": ["complete"]}],
             "alternatives": ["q3"], "kappaRequired": true, "trader": "Prapor"}
        ]"#;
        let records = parse_catalog(json).expect("parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].normalized_name, "debut");
        assert!(records[0].requirements.is_none());
        assert_eq!(records[0].objectives[1].id.as_deref(), Some("o2"));
        assert_eq!(records[1].ids, vec!["q2", "q2-alt"]);
        assert_eq!(records[1].requirements.as_ref().map(Vec::len), Some(1));
        assert!(records[1].kappa_required);
    }

    #[test]
    fn parse_catalog_reports_malformed_json() {
        assert!(matches!(parse_catalog("{not json"), Err(QuestError::Json(_))));
    }
}
