// J-events: the callbacks a jurisdiction hands back to `xln-runtime` after
// a block commits. `xln-jurisdiction` never addresses
// an `EntityReplica` directly — the arena pattern keeps entity
// resolution in the runtime, which knows how to map a `ReserveUpdated`'s
// `entity` or a `CollateralUpdated`'s `channel` endpoints to replicas.

use xln_base::{Amount, ChannelKey, EntityId, TokenId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JurisdictionEventKind {
    ReserveUpdated { entity: EntityId, token: TokenId, new_balance: Amount, name: String, symbol: String, decimals: u8 },
    CollateralUpdated { channel: ChannelKey, token: TokenId, collateral: Amount, ondelta: Amount },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JurisdictionEvent {
    pub kind: JurisdictionEventKind,
    pub block_number: u64,
    pub transaction_hash: String,
    pub observed_at: u64,
}
