// Status resolution against the fixture catalog

mod common;

use questlog::quests::{
    Blocker, CatalogIndex, PlayerProfile, ProgressStore, QuestKey, QuestStatus, StatusResolver,
    StoredStatus,
};

fn index() -> CatalogIndex {
    CatalogIndex::build(common::catalog_records())
}

fn status_of(
    catalog: &CatalogIndex,
    progress: &ProgressStore,
    player: &PlayerProfile,
    query: &str,
) -> QuestStatus {
    let record = catalog.lookup(query).expect("quest in catalog");
    StatusResolver::new(catalog, progress, player).status(record)
}

fn mark_done(catalog: &CatalogIndex, progress: &mut ProgressStore, query: &str) {
    let record = catalog.lookup(query).expect("quest in catalog");
    progress.set(record.key(), StoredStatus::Done);
}

#[test]
fn test_fresh_profile_statuses() {
    let catalog = index();
    let progress = ProgressStore::new();
    let player = PlayerProfile::default();

    assert_eq!(status_of(&catalog, &progress, &player, "Debut"), QuestStatus::Active);
    assert_eq!(status_of(&catalog, &progress, &player, "Checking"), QuestStatus::Locked);
    assert_eq!(status_of(&catalog, &progress, &player, "Shortage"), QuestStatus::Locked);
    assert_eq!(
        status_of(&catalog, &progress, &player, "Collector's Edition"),
        QuestStatus::Unavailable
    );
    assert_eq!(
        status_of(&catalog, &progress, &player, "whats-on-the-flash-drive"),
        QuestStatus::LevelLocked
    );
}

#[test]
fn test_level_gate_after_prerequisite() {
    let catalog = index();
    let mut progress = ProgressStore::new();

    let level3 = PlayerProfile::default().with_level(3);
    assert_eq!(status_of(&catalog, &progress, &level3, "checking"), QuestStatus::Locked);

    mark_done(&catalog, &mut progress, "debut");
    assert_eq!(status_of(&catalog, &progress, &level3, "checking"), QuestStatus::LevelLocked);

    let level5 = PlayerProfile::default().with_level(5);
    assert_eq!(status_of(&catalog, &progress, &level5, "checking"), QuestStatus::Active);
}

#[test]
fn test_or_group_unlocks_with_either_branch() {
    let catalog = index();
    let player = PlayerProfile::default().with_level(10);

    let mut progress = ProgressStore::new();
    assert_eq!(
        status_of(&catalog, &progress, &player, "Bad Rep Evidence"),
        QuestStatus::Locked
    );

    mark_done(&catalog, &mut progress, "Delivery From the Past");
    assert_eq!(
        status_of(&catalog, &progress, &player, "Bad Rep Evidence"),
        QuestStatus::Active
    );

    let mut other_branch = ProgressStore::new();
    mark_done(&catalog, &mut other_branch, "Shootout Picnic");
    assert_eq!(
        status_of(&catalog, &other_branch, &player, "Bad Rep Evidence"),
        QuestStatus::Active
    );
}

#[test]
fn test_legacy_previous_quests_resolve_by_display_name() {
    let catalog = index();
    let mut progress = ProgressStore::new();
    let player = PlayerProfile::default();

    mark_done(&catalog, &mut progress, "debut");
    assert_eq!(status_of(&catalog, &progress, &player, "Shortage"), QuestStatus::Active);
}

#[test]
fn test_cycle_resolves_active_for_both_members() {
    let catalog = index();
    let progress = ProgressStore::new();
    let player = PlayerProfile::default();

    assert_eq!(status_of(&catalog, &progress, &player, "cycle-a"), QuestStatus::Active);
    assert_eq!(status_of(&catalog, &progress, &player, "cycle-b"), QuestStatus::Active);
}

#[test]
fn test_stored_status_beats_gating() {
    let catalog = index();
    let mut progress = ProgressStore::new();
    let player = PlayerProfile::default();

    progress.set(QuestKey::new(Some("edge-only"), None), StoredStatus::Failed);
    assert_eq!(
        status_of(&catalog, &progress, &player, "edge-only"),
        QuestStatus::Failed
    );
}

#[test]
fn test_karma_and_edition_gates_lift() {
    let catalog = index();
    let progress = ProgressStore::new();
    let player = PlayerProfile::default()
        .with_scav_karma(-2.0)
        .with_edition("edge-of-darkness");

    assert_eq!(
        status_of(&catalog, &progress, &player, "What's on the flash drive?"),
        QuestStatus::Active
    );
    assert_eq!(status_of(&catalog, &progress, &player, "edge-only"), QuestStatus::Active);
}

#[test]
fn test_status_all_covers_catalog() {
    let catalog = index();
    let progress = ProgressStore::new();
    let player = PlayerProfile::default();

    let all = StatusResolver::new(&catalog, &progress, &player).status_all();
    assert_eq!(all.len(), catalog.len());
    let active = all
        .iter()
        .filter(|(_, status)| *status == QuestStatus::Active)
        .count();
    // Debut plus the two loop quests
    assert_eq!(active, 3);
}

#[test]
fn test_blockers_name_missing_prerequisite_and_level() {
    let catalog = index();
    let progress = ProgressStore::new();
    let player = PlayerProfile::default();
    let record = catalog.lookup("checking").unwrap();

    let blockers = StatusResolver::new(&catalog, &progress, &player).blockers(record);
    assert_eq!(
        blockers,
        vec![
            Blocker::Prerequisite {
                quest: "Debut".into(),
                group: 0
            },
            Blocker::Level { required: 5 },
        ]
    );
}
