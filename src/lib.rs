//! # Questlog - quest dependency and status tracking
//!
//! Questlog tracks a player's progress through a large, interconnected set of
//! game quests. It derives a status for every quest from an AND/OR prerequisite
//! graph, gating attributes (level, Scav karma, edition, prestige, decodes) and
//! mutually exclusive branch choices, and keeps stored progress aligned with a
//! catalog whose ids and names change between data refreshes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use questlog::config::Config;
//! use questlog::quests::{load_catalog_from_json, ProgressDb, QuestTracker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let records = load_catalog_from_json(&config.catalog.path)?;
//!     let db = Arc::new(ProgressDb::open(&config.storage.data_dir)?);
//!     let mut tracker = QuestTracker::open(
//!         records,
//!         db,
//!         config.player.clone(),
//!         config.storage.writer_config(),
//!     )
//!     .await?;
//!
//!     tracker.complete("debut", true)?;
//!     println!("{}", tracker.summary());
//!     tracker.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`quests`] - catalog index, status resolver, progress store, mutation
//!   engine, reconciler, objective tracker and sled persistence
//! - [`config`] - TOML configuration for the binary
//! - [`logutil`] - log sanitising for catalog-sourced text
//!
//! ## Data flow
//!
//! ```text
//! catalog JSON ──► CatalogIndex ──┐
//!                                 ├──► reconcile ──► StatusResolver queries
//! sled progress ──► ProgressStore ┘                  MutationEngine commands
//!                                                          │
//!                         ChangeNotifier ◄── one event ────┤
//!                         writer task ◄──── one batch ─────┘
//! ```

pub mod config;
pub mod logutil;
pub mod quests;
