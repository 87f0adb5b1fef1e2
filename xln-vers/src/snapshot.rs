// `EnvSnapshot`: the value pushed into history on every tick. A
// read-only, independently-owned projection of the `Environment` at one
// instant — deep-cloned out of whatever lives in `xln-runtime`'s
// `Environment`, never aliased, so that "mutating any field reachable
// from history[i] does not change history[j]" (§8 invariant 6) holds
// trivially rather than by convention.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xln_base::{Amount, ChannelKey, JurisdictionName, TokenId};
use xln_entity::EntityReplica;
use xln_gossip::{Position, Profile};
use xln_jurisdiction::{CollateralEntry, Contracts, EvmType, Jurisdiction, JTx};

use crate::replica_key::ReplicaKey;
use crate::wire::{RuntimeInput, TickOutcome};

/// A read-only projection of a `Jurisdiction` for `EnvSnapshot`. Same
/// fields, no mutators.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JurisdictionView {
    pub name: JurisdictionName,
    pub position: Position,
    pub block_number: u64,
    pub block_delay_ms: u64,
    pub mempool: Vec<JTx>,
    pub state_root: [u8; 32],
    pub reserves: BTreeMap<xln_base::EntityId, BTreeMap<TokenId, Amount>>,
    pub collaterals: BTreeMap<ChannelKey, BTreeMap<TokenId, CollateralEntry>>,
    pub contracts: Contracts,
    pub evm_type: EvmType,
}

impl From<&Jurisdiction> for JurisdictionView {
    fn from(j: &Jurisdiction) -> Self {
        JurisdictionView {
            name: j.name.clone(),
            position: j.position,
            block_number: j.block_number,
            block_delay_ms: j.block_delay_ms,
            mempool: j.mempool.clone(),
            state_root: j.state_root,
            reserves: j.reserves.clone(),
            collaterals: j.collaterals.clone(),
            contracts: j.contracts.clone(),
            evm_type: j.evm_type,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvSnapshot {
    pub height: u64,
    pub timestamp: u64,
    pub description: String,
    pub title: String,
    pub e_replicas: BTreeMap<ReplicaKey, EntityReplica>,
    pub j_replicas: Vec<JurisdictionView>,
    pub runtime_input: RuntimeInput,
    pub runtime_outputs: Vec<TickOutcome>,
    pub gossip: Vec<Profile>,
}

#[cfg(test)]
mod test {
    use super::*;
    use xln_jurisdiction::{EvmType, Jurisdiction};

    #[test]
    fn jurisdiction_view_is_a_snapshot_not_an_alias() {
        let mut j = Jurisdiction::new(JurisdictionName::from("j1"), EvmType::BrowserVm, 1000);
        let view = JurisdictionView::from(&j);
        j.block_number = 99;
        assert_eq!(view.block_number, 0);
    }
}
