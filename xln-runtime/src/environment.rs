// The arena `xln-entity`/`xln-jurisdiction` describe but never hold a
// handle to: every replica and every
// jurisdiction lives here, addressed by key, and resolved on demand by
// the functions in `tick.rs` rather than through owning pointers between
// them. Grounded structurally on `submerge-rowdb`'s stated job of being
// the one place state actually lives, though none of its storage-engine
// content survives here (see DESIGN.md).

use std::collections::{BTreeMap, VecDeque};

use xln_admin::Config;
use xln_base::{EntityId, JurisdictionName};
use xln_entity::EntityReplica;
use xln_gossip::Gossip;
use xln_jurisdiction::{Jurisdiction, JurisdictionEvent};
use xln_vers::{History, ReplicaKey};

/// Everything a tick reads or writes. Owned flatly: no `Rc`/`Arc`, no
/// sub-struct holds a reference into another — cross-references are
/// always `ReplicaKey`/`EntityId`/`JurisdictionName` resolved back
/// through this struct's maps.
#[derive(Clone, Debug)]
pub struct Environment {
    pub xlnomies: BTreeMap<JurisdictionName, Jurisdiction>,
    pub active_xlnomy: Option<JurisdictionName>,
    pub e_replicas: BTreeMap<ReplicaKey, EntityReplica>,
    pub history: History,
    pub gossip: Gossip,
    pub last_j_event: Option<JurisdictionEvent>,
    /// `EntityTx`s whose delivery blew through the fixed-point bound this
    /// tick and so are owed delivery at the start of
    /// the next one, in the order they were produced.
    pub(crate) pending_messages: VecDeque<(EntityId, xln_entity::EntityTx)>,
    pub(crate) config: Config,
}

impl Environment {
    pub fn new(config: Config) -> Self {
        Environment {
            xlnomies: BTreeMap::new(),
            active_xlnomy: None,
            e_replicas: BTreeMap::new(),
            history: History::new(),
            gossip: Gossip::new(),
            last_j_event: None,
            pending_messages: VecDeque::new(),
            config,
        }
    }

    /// Every `ReplicaKey` presently importing `entity`. Threshold > 1
    /// quorums would have more than one signer here; single-signer
    /// replicas (the only kind this workspace exercises) always resolve
    /// to exactly zero or one.
    pub fn replica_keys_for_entity(&self, entity: EntityId) -> Vec<ReplicaKey> {
        self.e_replicas.keys().filter(|k| k.entity == entity).cloned().collect()
    }

    /// `Config` is cheap (`Copy`) and otherwise `pub(crate)` so nothing
    /// outside this crate can reach into backend dispatch directly;
    /// callers that need to build a second `Environment` with the same
    /// knobs (e.g. replay tooling) go through this instead.
    pub fn config(&self) -> Config {
        self.config
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new(Config::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_environment_has_no_xlnomies_or_replicas() {
        let env = Environment::new(Config::default());
        assert!(env.xlnomies.is_empty());
        assert!(env.e_replicas.is_empty());
        assert!(env.history.is_empty());
    }
}
