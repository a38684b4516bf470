// Catalog refreshes: id changes, orphans, validation

mod common;

use questlog::quests::{
    parse_catalog, validate_catalog, CatalogIndex, PlayerProfile, QuestError, QuestRecord,
    QuestStatus,
};
use tempfile::TempDir;

/// The fixture catalog with Debut re-issued under a new id.
fn refreshed_records() -> Vec<QuestRecord> {
    common::catalog_records()
        .into_iter()
        .map(|mut record| {
            if record.normalized_name == "debut" {
                record.ids = vec!["debut-v2".to_string()];
            }
            record
        })
        .collect()
}

#[tokio::test]
async fn test_refresh_backfills_new_id_by_name() {
    let dir = TempDir::new().unwrap();
    let mut tracker = common::open_tracker(&dir, common::catalog_records(), PlayerProfile::default()).await;
    tracker.complete("debut", false).unwrap();

    let report = tracker.replace_catalog(refreshed_records()).clone();
    assert_eq!(report.rebound, 1);
    assert!(report.orphans.is_empty());

    let entry = &tracker.progress().entries()[0];
    assert_eq!(entry.key.id.as_deref(), Some("debut-v2"));
    assert_eq!(tracker.status("debut-v2").unwrap(), QuestStatus::Done);
    assert_eq!(tracker.status("Shortage").unwrap(), QuestStatus::Active);
}

#[tokio::test]
async fn test_rebound_key_is_persisted() {
    let dir = TempDir::new().unwrap();
    {
        let mut tracker =
            common::open_tracker(&dir, common::catalog_records(), PlayerProfile::default()).await;
        tracker.complete("debut", false).unwrap();
        tracker.shutdown().await.unwrap();
    }
    {
        let tracker = common::open_tracker(&dir, refreshed_records(), PlayerProfile::default()).await;
        assert_eq!(tracker.last_reconcile().rebound, 1);
        tracker.shutdown().await.unwrap();
    }

    // A third open finds the entry already keyed by the new id
    let tracker = common::open_tracker(&dir, refreshed_records(), PlayerProfile::default()).await;
    assert!(!tracker.last_reconcile().changed());
    assert_eq!(tracker.status("debut").unwrap(), QuestStatus::Done);
}

#[tokio::test]
async fn test_orphans_survive_until_catalog_fixed() {
    let dir = TempDir::new().unwrap();
    {
        let mut tracker =
            common::open_tracker(&dir, common::catalog_records(), PlayerProfile::default()).await;
        tracker.complete("Shortage", false).unwrap();
        tracker.shutdown().await.unwrap();
    }

    let without_shortage: Vec<QuestRecord> = common::catalog_records()
        .into_iter()
        .filter(|record| record.normalized_name != "shortage")
        .collect();
    {
        let tracker = common::open_tracker(&dir, without_shortage, PlayerProfile::default()).await;
        assert_eq!(tracker.last_reconcile().orphans.len(), 1);
        assert_eq!(tracker.progress().len(), 1);
        tracker.shutdown().await.unwrap();
    }

    let tracker = common::open_tracker(&dir, common::catalog_records(), PlayerProfile::default()).await;
    assert!(tracker.last_reconcile().orphans.is_empty());
    assert_eq!(tracker.status("Shortage").unwrap(), QuestStatus::Done);
}

#[test]
fn test_fixture_catalog_is_clean() {
    let catalog = CatalogIndex::build(common::catalog_records());
    assert_eq!(catalog.duplicate_keys(), 0);
    assert!(validate_catalog(&catalog).is_empty());
    assert_eq!(
        catalog.find_by_external_id("DEBUT-BSG").map(|r| r.name.as_str()),
        Some("Debut")
    );
}

#[test]
fn test_duplicate_ids_first_wins() {
    let json = r#"[
        { "id": "q1", "name": "Debut" },
        { "id": "q1", "name": "Debut (PvE)" }
    ]"#;
    let catalog = CatalogIndex::build(parse_catalog(json).unwrap());
    assert_eq!(catalog.find_by_id("Q1").unwrap().name, "Debut");
    assert_eq!(catalog.duplicate_keys(), 1);
    assert_eq!(validate_catalog(&catalog).len(), 1);
}

#[test]
fn test_malformed_catalog_is_an_error() {
    assert!(matches!(parse_catalog("{ not json"), Err(QuestError::Json(_))));
}
