use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use xln_account::AccountMachine;
use xln_base::{Amount, EntityId, JurisdictionName, SignerId, TokenId};
use xln_codec::{hash, CanonicalEncode};
use xln_delta::Delta;
use xln_gossip::Position;

use crate::tx::EntityTx;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityState {
    /// Mirror of jurisdiction reserves for this entity, updated only by
    /// `ReserveUpdated` j_events.
    pub reserves: BTreeMap<TokenId, Amount>,
    pub accounts: BTreeMap<EntityId, AccountMachine>,
    /// Idempotence guard for §4.5.2. Entity identity is implicit (always
    /// this replica's own `entityId`), so the key is just
    /// `(blockNumber, transactionHash, tokenId)`.
    pub applied_j_events: BTreeSet<(u64, String, TokenId)>,
}

impl EntityState {
    pub fn new() -> Self {
        EntityState {
            reserves: BTreeMap::new(),
            accounts: BTreeMap::new(),
            applied_j_events: BTreeSet::new(),
        }
    }
}

impl Default for EntityState {
    fn default() -> Self {
        Self::new()
    }
}

/// Projects just the fields of an `AccountMachine` that participate in
/// consensus — not its mempool or in-flight `pendingFrame`, which are
/// local-only and would make two honest replicas' hashes diverge on
/// nothing but message timing.
struct AccountSummary<'a> {
    i_am_left: bool,
    height: u64,
    deltas: &'a BTreeMap<TokenId, Delta>,
}

impl CanonicalEncode for AccountSummary<'_> {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        self.i_am_left.canonical_encode(out);
        self.height.canonical_encode(out);
        self.deltas.canonical_encode(out);
    }
}

impl CanonicalEncode for EntityState {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        self.reserves.canonical_encode(out);
        let summaries: BTreeMap<EntityId, AccountSummary> = self
            .accounts
            .iter()
            .map(|(cp, am)| {
                (*cp, AccountSummary { i_am_left: am.i_am_left, height: am.current_frame.height, deltas: &am.deltas })
            })
            .collect();
        summaries.canonical_encode(out);
    }
}

pub fn hash_entity_state(state: &EntityState) -> [u8; 32] {
    hash(state)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityFrame {
    pub height: u64,
    pub state_hash: [u8; 32],
    pub entity_txs: Vec<EntityTx>,
}

/// `{mode: "proposer-based", threshold, validators[], shares{}, jurisdiction}`
///. Quorum `threshold > 1` is accepted as a data shape but not
/// exercised — see `xln-entity`'s DESIGN.md entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaConfig {
    pub mode: String,
    pub threshold: u64,
    pub validators: Vec<SignerId>,
    pub shares: BTreeMap<SignerId, u64>,
    pub jurisdiction: JurisdictionName,
}

impl ReplicaConfig {
    pub fn single_signer(jurisdiction: JurisdictionName, signer: SignerId) -> Self {
        let mut shares = BTreeMap::new();
        shares.insert(signer.clone(), 1);
        ReplicaConfig {
            mode: "proposer-based".to_string(),
            threshold: 1,
            validators: vec![signer],
            shares,
            jurisdiction,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityReplica {
    pub entity_id: EntityId,
    pub signer_id: SignerId,
    pub config: ReplicaConfig,
    pub is_proposer: bool,
    pub position: Position,
    pub state: EntityState,
    pub mempool: Vec<EntityTx>,
    pub current_frame: EntityFrame,
}

impl EntityReplica {
    pub fn new(
        entity_id: EntityId,
        signer_id: SignerId,
        config: ReplicaConfig,
        is_proposer: bool,
        position: Position,
    ) -> Self {
        let state = EntityState::new();
        let current_frame = EntityFrame { height: 0, state_hash: hash_entity_state(&state), entity_txs: Vec::new() };
        EntityReplica { entity_id, signer_id, config, is_proposer, position, state, mempool: Vec::new(), current_frame }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_state_hashes_deterministically() {
        let a = EntityState::new();
        let b = EntityState::new();
        assert_eq!(hash_entity_state(&a), hash_entity_state(&b));
    }
}
