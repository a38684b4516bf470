// Mutations through the tracker facade, persisted to sled

mod common;

use questlog::quests::{PlayerProfile, ProgressEvent, QuestStatus, StoredStatus};
use tempfile::TempDir;

fn veteran() -> PlayerProfile {
    PlayerProfile::default().with_level(30)
}

#[tokio::test]
async fn test_complete_pulls_in_prerequisites_and_fails_alternative() {
    let dir = TempDir::new().unwrap();
    let mut tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;

    let changes = tracker.complete("Shootout Picnic", true).unwrap();
    assert_eq!(changes.saved.len(), 4);

    assert_eq!(tracker.status("debut").unwrap(), QuestStatus::Done);
    assert_eq!(tracker.status("checking").unwrap(), QuestStatus::Done);
    assert_eq!(tracker.status("Shootout Picnic").unwrap(), QuestStatus::Done);
    assert_eq!(tracker.status("Delivery From the Past").unwrap(), QuestStatus::Failed);
    assert_eq!(tracker.status("Bad Rep Evidence").unwrap(), QuestStatus::Active);
}

#[tokio::test]
async fn test_or_group_prerequisites_are_a_user_choice() {
    let dir = TempDir::new().unwrap();
    let mut tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;

    tracker.complete("Bad Rep Evidence", true).unwrap();
    assert_eq!(tracker.status("Bad Rep Evidence").unwrap(), QuestStatus::Done);
    assert_eq!(tracker.status("Shootout Picnic").unwrap(), QuestStatus::Locked);
    assert_eq!(tracker.status("Delivery From the Past").unwrap(), QuestStatus::Locked);
}

#[tokio::test]
async fn test_repeat_complete_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;
    let mut events = tracker.subscribe();

    assert!(!tracker.complete("checking", true).unwrap().is_empty());
    assert!(tracker.complete("checking", true).unwrap().is_empty());

    assert_eq!(events.recv().await, Some(ProgressEvent::QuestsChanged));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_progress_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let mut tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;
        tracker.complete("Delivery From the Past", true).unwrap();
        tracker.fail("Shortage").unwrap();
        tracker.set_objective("debut", 1, true).unwrap();
        tracker.shutdown().await.unwrap();
    }

    let tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;
    assert_eq!(tracker.status("Delivery From the Past").unwrap(), QuestStatus::Done);
    assert_eq!(tracker.status("Shootout Picnic").unwrap(), QuestStatus::Failed);
    assert_eq!(tracker.status("Shortage").unwrap(), QuestStatus::Failed);
    assert!(tracker.objectives().is_completed("debut", 1));
    assert!(tracker.last_reconcile().orphans.is_empty());
}

#[tokio::test]
async fn test_reset_removes_persisted_entry() {
    let dir = TempDir::new().unwrap();
    {
        let mut tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;
        tracker.complete("debut", false).unwrap();
        let changes = tracker.reset("debut").unwrap();
        assert_eq!(
            changes.deleted,
            vec![
                "id:5936d90786f7742b1420ba5b".to_string(),
                "name:debut".to_string()
            ]
        );
        tracker.shutdown().await.unwrap();
    }

    let tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;
    assert_eq!(tracker.status("debut").unwrap(), QuestStatus::Active);
    assert!(tracker.progress().is_empty());
}

#[tokio::test]
async fn test_batch_and_apply_changes() {
    let dir = TempDir::new().unwrap();
    let mut tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;

    let changes = tracker
        .complete_batch(&["debut", "checking", "Shootout Picnic"], true)
        .unwrap();
    // Shootout Picnic has an alternative and is skipped
    assert_eq!(changes.saved.len(), 2);
    assert_eq!(tracker.status("Shootout Picnic").unwrap(), QuestStatus::Active);

    tracker
        .apply_changes(&[
            ("Shootout Picnic", StoredStatus::Failed),
            ("Delivery From the Past", StoredStatus::Done),
        ])
        .unwrap();
    assert_eq!(tracker.status("Shootout Picnic").unwrap(), QuestStatus::Failed);
    assert_eq!(tracker.status("Bad Rep Evidence").unwrap(), QuestStatus::Active);
}

#[tokio::test]
async fn test_summary_counts_traders_and_kappa() {
    let dir = TempDir::new().unwrap();
    let mut tracker = common::open_tracker(&dir, common::catalog_records(), veteran()).await;
    tracker.complete("checking", true).unwrap();

    let summary = tracker.summary();
    assert_eq!(summary.total, 10);
    assert_eq!(summary.count(QuestStatus::Done), 2);
    assert_eq!(summary.kappa_total, 4);
    assert_eq!(summary.kappa_done, 2);
    assert_eq!(summary.by_trader["Prapor"].done, 2);
    assert_eq!(summary.by_trader["Prapor"].total, 5);
}
