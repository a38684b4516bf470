//! Shared fixtures for the integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use questlog::quests::{
    load_catalog_from_json, PlayerProfile, ProgressDbBuilder, QuestRecord, QuestTracker,
    WriterConfig,
};
use tempfile::TempDir;

pub fn fixture_catalog() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("quests.json")
}

pub fn catalog_records() -> Vec<QuestRecord> {
    load_catalog_from_json(fixture_catalog()).expect("fixture catalog")
}

/// Open a tracker over `records` backed by a sled store in `dir`.
#[allow(dead_code)]
pub async fn open_tracker(dir: &TempDir, records: Vec<QuestRecord>, player: PlayerProfile) -> QuestTracker {
    let db = Arc::new(
        ProgressDbBuilder::new(dir.path().join("progress"))
            .open()
            .expect("progress db"),
    );
    QuestTracker::open(records, db, player, WriterConfig::default())
        .await
        .expect("tracker")
}
