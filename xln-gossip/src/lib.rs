#![allow(dead_code)]

// In-memory entity directory. Purely advisory: no invariant of
// the core depends on it, so failures here are never fatal — `announce`
// either applies or is silently outranked by a newer timestamp.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xln_base::EntityId;

/// Opaque 3-tuple used only by the view layer to place an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64, pub f64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub name: String,
    pub position: Position,
    pub entity_public_key: String,
    pub board: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub entity_id: EntityId,
    pub metadata: ProfileMetadata,
    pub accounts: u32,
    pub timestamp: u64,
}

/// The directory mapping `entityId -> profile`.
#[derive(Clone, Debug, Default)]
pub struct Gossip {
    profiles: BTreeMap<EntityId, Profile>,
}

impl Gossip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-or-replace keyed by `entityId`. Rejected (a no-op) if the
    /// incoming profile is stale relative to what's on file.
    pub fn announce(&mut self, profile: Profile) {
        match self.profiles.get(&profile.entity_id) {
            Some(existing) if profile.timestamp < existing.timestamp => {
                tracing::debug!(
                    entity = %profile.entity_id,
                    "dropped stale gossip announce"
                );
            }
            _ => {
                self.profiles.insert(profile.entity_id, profile);
            }
        }
    }

    /// Unordered set of current profiles.
    pub fn get_profiles(&self) -> Vec<&Profile> {
        self.profiles.values().collect()
    }

    pub fn get_profile(&self, entity_id: &EntityId) -> Option<&Profile> {
        self.profiles.get(entity_id)
    }
}
