use thiserror::Error;

/// Errors that can arise while loading catalogs or talking to the progress store.
///
/// Data-quality problems in the catalog (duplicate keys, dangling prerequisite
/// references) are never reported through this type; they fall back to documented
/// policy and surface as [`crate::quests::CatalogWarning`]s instead.
#[derive(Debug, Error)]
pub enum QuestError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Catalog JSON could not be parsed.
    #[error("catalog parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, catalog reads).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when a quest or record is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Only Done and Failed may be stored.
    #[error("status cannot be persisted: {0}")]
    InvalidStatus(String),

    /// Internal error (task join errors, closed channels)
    #[error("internal error: {0}")]
    Internal(String),
}
