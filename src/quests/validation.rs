//! Catalog data-quality checks.
//!
//! Nothing here changes how the index or resolver behave: duplicates still
//! resolve first-wins and dangling references are still skipped. The checks
//! only surface those cases so a bad catalog refresh can be noticed.

use std::collections::HashMap;
use std::fmt;

use crate::quests::catalog::CatalogIndex;
use crate::quests::types::{fold_key, StatusToken};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogWarning {
    DuplicateId { id: String, quest: String, first: String },
    DuplicateName { name: String, quest: String, first: String },
    DuplicateExternalId { external_id: String, quest: String, first: String },
    DanglingRequirement { quest: String, reference: String },
    DanglingPreviousQuest { quest: String, reference: String },
    DanglingAlternative { quest: String, reference: String },
    SelfReference { quest: String },
    UnknownStatusToken { quest: String, token: String },
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogWarning::DuplicateId { id, quest, first } => {
                write!(f, "id '{}' on '{}' already used by '{}'", id, quest, first)
            }
            CatalogWarning::DuplicateName { name, quest, first } => {
                write!(f, "name '{}' on '{}' already used by '{}'", name, quest, first)
            }
            CatalogWarning::DuplicateExternalId {
                external_id,
                quest,
                first,
            } => write!(
                f,
                "external id '{}' on '{}' already used by '{}'",
                external_id, quest, first
            ),
            CatalogWarning::DanglingRequirement { quest, reference } => {
                write!(f, "'{}' requires unknown quest '{}'", quest, reference)
            }
            CatalogWarning::DanglingPreviousQuest { quest, reference } => {
                write!(f, "'{}' lists unknown previous quest '{}'", quest, reference)
            }
            CatalogWarning::DanglingAlternative { quest, reference } => {
                write!(f, "'{}' lists unknown alternative '{}'", quest, reference)
            }
            CatalogWarning::SelfReference { quest } => {
                write!(f, "'{}' requires itself", quest)
            }
            CatalogWarning::UnknownStatusToken { quest, token } => {
                write!(f, "'{}' uses unknown status token '{}'", quest, token)
            }
        }
    }
}

pub fn validate_catalog(catalog: &CatalogIndex) -> Vec<CatalogWarning> {
    let mut warnings = Vec::new();
    let mut ids: HashMap<String, &str> = HashMap::new();
    let mut names: HashMap<String, &str> = HashMap::new();
    let mut external_ids: HashMap<String, &str> = HashMap::new();

    for record in catalog.records() {
        for id in &record.ids {
            if let Some(first) = first_claim(&mut ids, id, &record.name) {
                warnings.push(CatalogWarning::DuplicateId {
                    id: id.clone(),
                    quest: record.name.clone(),
                    first: first.to_string(),
                });
            }
        }
        if let Some(first) = first_claim(&mut names, &record.normalized_name, &record.name) {
            warnings.push(CatalogWarning::DuplicateName {
                name: record.normalized_name.clone(),
                quest: record.name.clone(),
                first: first.to_string(),
            });
        }
        if let Some(external) = &record.external_id {
            if let Some(first) = first_claim(&mut external_ids, external, &record.name) {
                warnings.push(CatalogWarning::DuplicateExternalId {
                    external_id: external.clone(),
                    quest: record.name.clone(),
                    first: first.to_string(),
                });
            }
        }
    }

    for record in catalog.records() {
        let own = record.key();
        for requirement in record.requirements.iter().flatten() {
            match catalog.resolve_reference(&requirement.quest) {
                None => warnings.push(CatalogWarning::DanglingRequirement {
                    quest: record.name.clone(),
                    reference: requirement.quest.clone(),
                }),
                Some(target) if target.key() == own => {
                    warnings.push(CatalogWarning::SelfReference {
                        quest: record.name.clone(),
                    })
                }
                Some(_) => {}
            }
            for token in &requirement.statuses {
                if StatusToken::parse(token).is_none() {
                    warnings.push(CatalogWarning::UnknownStatusToken {
                        quest: record.name.clone(),
                        token: token.clone(),
                    });
                }
            }
        }
        for reference in &record.previous_quests {
            if catalog.resolve_reference(reference).is_none() {
                warnings.push(CatalogWarning::DanglingPreviousQuest {
                    quest: record.name.clone(),
                    reference: reference.clone(),
                });
            }
        }
        for reference in &record.alternatives {
            if catalog.resolve_reference(reference).is_none() {
                warnings.push(CatalogWarning::DanglingAlternative {
                    quest: record.name.clone(),
                    reference: reference.clone(),
                });
            }
        }
    }

    warnings
}

/// Returns the earlier claimant when `key` is already taken by another quest.
fn first_claim<'a>(map: &mut HashMap<String, &'a str>, key: &str, quest: &'a str) -> Option<&'a str> {
    let folded = fold_key(key);
    if folded.is_empty() {
        return None;
    }
    match map.get(&folded) {
        Some(&first) if first != quest => Some(first),
        Some(_) => None,
        None => {
            map.insert(folded, quest);
            None
        }
    }
}
