// Per-jurisdiction batcher: a leader-less mempool of `JTx`s
// that `advance()` commits as a block, in FIFO order, recomputing a
// `stateRoot` over the jurisdiction's full reserve/collateral commit set.
// A sequence of pending writes accumulates, then commits as one unit with
// a recomputed root; see DESIGN.md.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xln_base::{sha256, Amount, ChannelKey, EntityId, JurisdictionName, TokenId, XlnError};
use xln_codec::CanonicalEncode;
use xln_gossip::Position;

use crate::event::{JurisdictionEvent, JurisdictionEventKind};
use crate::tx::JTx;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvmType {
    #[default]
    BrowserVm,
    Reth,
    Erigon,
    Monad,
}

/// Opaque on-chain addresses; `None` when no real EVM backend is wired up
/// (the default in-process `browservm` simulator has none).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contracts {
    pub depository: Option<String>,
    pub entity_provider: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralEntry {
    pub collateral: Amount,
    pub ondelta: Amount,
}

impl CollateralEntry {
    pub fn zero() -> Self {
        CollateralEntry { collateral: Amount::zero(), ondelta: Amount::zero() }
    }
}

impl CanonicalEncode for CollateralEntry {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        self.collateral.canonical_encode(out);
        self.ondelta.canonical_encode(out);
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub name: JurisdictionName,
    pub position: Position,
    pub block_number: u64,
    pub block_delay_ms: u64,
    pub mempool: Vec<JTx>,
    pub state_root: [u8; 32],
    pub reserves: BTreeMap<EntityId, BTreeMap<TokenId, Amount>>,
    pub collaterals: BTreeMap<ChannelKey, BTreeMap<TokenId, CollateralEntry>>,
    pub contracts: Contracts,
    pub evm_type: EvmType,
    pub token_registry: BTreeMap<TokenId, TokenInfo>,
    last_block_ms: u64,
}

impl Jurisdiction {
    pub fn new(name: JurisdictionName, evm_type: EvmType, block_delay_ms: u64) -> Self {
        let mut j = Jurisdiction {
            name,
            position: Position::default(),
            block_number: 0,
            block_delay_ms,
            mempool: Vec::new(),
            state_root: [0u8; 32],
            reserves: BTreeMap::new(),
            collaterals: BTreeMap::new(),
            contracts: Contracts::default(),
            evm_type,
            token_registry: BTreeMap::new(),
            last_block_ms: 0,
        };
        j.state_root = compute_state_root(&j.reserves, &j.collaterals, j.block_number);
        j
    }

    pub fn enqueue(&mut self, tx: JTx) {
        self.mempool.push(tx);
    }

    /// (a) `blockDelayMs` elapsed since the last committed block, with a
    /// non-empty mempool, is when the auto-proposer fires; (b) an explicit
    /// non-empty J-tx batch always qualifies regardless of elapsed time —
    /// the caller (`xln-runtime`) decides which case applies and calls
    /// `advance` either way.
    pub fn due_for_auto_advance(&self, now_ms: u64) -> bool {
        !self.mempool.is_empty() && now_ms.saturating_sub(self.last_block_ms) >= self.block_delay_ms
    }

    /// Commits the mempool as one block. A no-op when the mempool is
    /// empty. An invalid `JTx` anywhere in the batch rejects the whole
    /// block: `block_number` is not incremented and `mempool` is not
    /// cleared, so the same batch is retried on the next call (spec
    /// §4.6 Failure).
    pub fn advance(&mut self, now_ms: u64) -> Result<Vec<JurisdictionEvent>, XlnError> {
        if self.mempool.is_empty() {
            return Ok(Vec::new());
        }

        let next_block = self.block_number + 1;
        let mut trial_reserves = self.reserves.clone();
        let mut trial_collaterals = self.collaterals.clone();
        let mut trial_registry = self.token_registry.clone();
        let mut events = Vec::with_capacity(self.mempool.len());

        for (index, tx) in self.mempool.iter().enumerate() {
            let tx_hash = synth_tx_hash(next_block, index, tx);
            let event = apply_one(&mut trial_reserves, &mut trial_collaterals, &mut trial_registry, tx, next_block, &tx_hash, now_ms)?;
            events.push(event);
        }

        self.reserves = trial_reserves;
        self.collaterals = trial_collaterals;
        self.token_registry = trial_registry;
        self.block_number = next_block;
        self.last_block_ms = now_ms;
        self.state_root = compute_state_root(&self.reserves, &self.collaterals, self.block_number);
        self.mempool.clear();
        Ok(events)
    }
}

fn apply_one(
    reserves: &mut BTreeMap<EntityId, BTreeMap<TokenId, Amount>>,
    collaterals: &mut BTreeMap<ChannelKey, BTreeMap<TokenId, CollateralEntry>>,
    registry: &mut BTreeMap<TokenId, TokenInfo>,
    tx: &JTx,
    block_number: u64,
    tx_hash: &str,
    now_ms: u64,
) -> Result<JurisdictionEvent, XlnError> {
    match tx {
        JTx::ReserveUpdate { entity, token, amount, name, symbol, decimals } => {
            let balance = reserves.entry(*entity).or_default().entry(*token).or_insert_with(Amount::zero);
            let new_balance = &*balance + amount;
            if new_balance.is_negative() {
                return Err(XlnError::InvalidAmount { reason: "reserve update would drive a balance negative" });
            }
            *balance = new_balance.clone();

            let info = registry.entry(*token).or_insert_with(|| TokenInfo {
                name: name.clone().unwrap_or_default(),
                symbol: symbol.clone().unwrap_or_default(),
                decimals: decimals.unwrap_or(0),
            });

            Ok(JurisdictionEvent {
                kind: JurisdictionEventKind::ReserveUpdated {
                    entity: *entity,
                    token: *token,
                    new_balance,
                    name: info.name.clone(),
                    symbol: info.symbol.clone(),
                    decimals: info.decimals,
                },
                block_number,
                transaction_hash: tx_hash.to_string(),
                observed_at: now_ms,
            })
        }
        JTx::Settlement { channel, token, collateral_delta, ondelta_delta } => {
            let entry = collaterals.entry(*channel).or_default().entry(*token).or_insert_with(CollateralEntry::zero);
            let new_collateral = &entry.collateral + collateral_delta;
            if new_collateral.is_negative() {
                return Err(XlnError::InvalidAmount { reason: "settlement would drive collateral negative" });
            }
            entry.collateral = new_collateral.clone();
            entry.ondelta += ondelta_delta.clone();

            Ok(JurisdictionEvent {
                kind: JurisdictionEventKind::CollateralUpdated {
                    channel: *channel,
                    token: *token,
                    collateral: new_collateral,
                    ondelta: entry.ondelta.clone(),
                },
                block_number,
                transaction_hash: tx_hash.to_string(),
                observed_at: now_ms,
            })
        }
    }
}

fn synth_tx_hash(block_number: u64, index: usize, tx: &JTx) -> String {
    let mut bytes = Vec::new();
    tx.canonical_encode(&mut bytes);
    bytes.extend_from_slice(&block_number.to_be_bytes());
    bytes.extend_from_slice(&(index as u64).to_be_bytes());
    format!("0x{}", hex::encode(sha256(&bytes)))
}

/// `hash(canonical(reserves, collaterals, blockNumber))`.
fn compute_state_root(
    reserves: &BTreeMap<EntityId, BTreeMap<TokenId, Amount>>,
    collaterals: &BTreeMap<ChannelKey, BTreeMap<TokenId, CollateralEntry>>,
    block_number: u64,
) -> [u8; 32] {
    let mut bytes = Vec::new();
    reserves.canonical_encode(&mut bytes);
    collaterals.canonical_encode(&mut bytes);
    block_number.canonical_encode(&mut bytes);
    sha256(&bytes)
}
