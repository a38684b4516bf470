use serde::{Deserialize, Serialize};

/// Current player attributes, read on every status resolution.
///
/// Implementations own any caching; the resolver never holds on to values.
pub trait PlayerAttributes {
    fn level(&self) -> u32;
    fn scav_karma(&self) -> f64;
    fn owns_edition(&self, edition: &str) -> bool;
    fn prestige(&self) -> u32;
    fn decode_count(&self) -> u32;
}

/// Static attribute profile, normally loaded from the `[player]` config section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerProfile {
    pub level: u32,
    #[serde(default)]
    pub scav_karma: f64,
    #[serde(default)]
    pub editions: Vec<String>,
    #[serde(default)]
    pub prestige: u32,
    #[serde(default)]
    pub decode_count: u32,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            level: 1,
            scav_karma: 0.0,
            editions: vec!["standard".to_string()],
            prestige: 0,
            decode_count: 0,
        }
    }
}

impl PlayerProfile {
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_scav_karma(mut self, karma: f64) -> Self {
        self.scav_karma = karma;
        self
    }

    pub fn with_edition(mut self, edition: &str) -> Self {
        self.editions.push(edition.to_string());
        self
    }

    pub fn with_prestige(mut self, prestige: u32) -> Self {
        self.prestige = prestige;
        self
    }

    pub fn with_decode_count(mut self, decodes: u32) -> Self {
        self.decode_count = decodes;
        self
    }
}

impl PlayerAttributes for PlayerProfile {
    fn level(&self) -> u32 {
        self.level
    }

    fn scav_karma(&self) -> f64 {
        self.scav_karma
    }

    fn owns_edition(&self, edition: &str) -> bool {
        self.editions.iter().any(|e| e.eq_ignore_ascii_case(edition))
    }

    fn prestige(&self) -> u32 {
        self.prestige
    }

    fn decode_count(&self) -> u32 {
        self.decode_count
    }
}
