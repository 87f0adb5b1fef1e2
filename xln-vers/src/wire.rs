// Wire shapes crossing the Runtime boundary: `RuntimeTx`,
// `EntityInput`, `RuntimeInput`, and the per-input `TickOutcome`s a tick
// reports back. Living here (not in `xln-runtime`) is what lets
// `EnvSnapshot` carry `runtimeInput`/`runtimeOutputs` without `xln-vers`
// depending on the runtime that consumes these types.

use serde::{Deserialize, Serialize};
use xln_base::{EntityId, JurisdictionName, SignerId, XlnError};
use xln_entity::{EntityTx, ReplicaConfig};
use xln_gossip::Position;
use xln_jurisdiction::EvmType;

/// How a `grid <n> [<m>] [<k>] [type=(lazy|numbered)]` scenario action (or
/// an equivalent `createXlnomy.autoGrid`) requests entities be minted: an
/// `n x m` (or just `n`) lattice, optionally chunked into `k`-sized
/// jurisdictions, using either deterministic numbered ids or lazily
/// derived ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityIdKind {
    Lazy,
    Numbered,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoGrid {
    pub n: u64,
    pub m: Option<u64>,
    pub k: Option<u64>,
    pub id_kind: EntityIdKind,
}

/// `createXlnomy`/`importReplica`. Both are
/// well-formed-input-never-fails operations at the `Environment` level
/// — `createXlnomy` inserts a fresh `Jurisdiction`,
/// `importReplica` inserts a fresh `EntityReplica` keyed by
/// `ReplicaKey{entity_id, signer_id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RuntimeTx {
    CreateXlnomy {
        name: JurisdictionName,
        evm_type: EvmType,
        rpc_url: Option<String>,
        block_time_ms: u64,
        auto_grid: Option<AutoGrid>,
    },
    ImportReplica {
        entity_id: EntityId,
        signer_id: SignerId,
        config: ReplicaConfig,
        is_proposer: bool,
        position: Position,
    },
}

/// One `entityInputs[*]` item: a batch of `EntityTx`s submitted to a
/// single (entity, signer) replica in this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityInput {
    pub entity_id: EntityId,
    pub signer_id: SignerId,
    pub entity_txs: Vec<EntityTx>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeInput {
    pub runtime_txs: Vec<RuntimeTx>,
    pub entity_inputs: Vec<EntityInput>,
}

/// Per-input result attached to a snapshot's `runtimeOutputs[]`: every
/// tick returns a list of per-input outcomes, `{ok | err{kind, ...}}`.
/// `kind`/`detail` are rendered from `XlnError::kind_name`/
/// `Display` rather than embedding the error type directly, so a snapshot
/// stays serde-round-trippable without requiring every `XlnError` payload
/// (some of which carry `Amount`/ids only, never a raw error object) to
/// also implement `Deserialize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    Ok,
    Err { kind: String, detail: String },
}

impl TickOutcome {
    pub fn from_error(error: &XlnError) -> Self {
        TickOutcome::Err { kind: error.kind_name().to_string(), detail: error.to_string() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_error_carries_the_variant_name() {
        let outcome = TickOutcome::from_error(&XlnError::DisputeActive);
        assert_eq!(outcome, TickOutcome::Err { kind: "DisputeActive".to_string(), detail: "account has an active dispute".to_string() });
    }
}
