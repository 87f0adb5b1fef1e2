// JTx: the settlement-level transaction a jurisdiction batches.
// Every variant is a request against the jurisdiction's own reserves or
// collateral maps, applied deterministically in FIFO mempool order by
// `Jurisdiction::advance`.

use serde::{Deserialize, Serialize};
use xln_base::{Amount, ChannelKey, EntityId, TokenId};
use xln_codec::CanonicalEncode;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JTx {
    /// Moves `amount` of reserves for `entity`/`token` (signed: positive is
    /// a deposit/mint, negative a withdrawal). `name`/`symbol`/`decimals`
    /// populate the jurisdiction's token registry the first time a token
    /// is observed; later sightings may not
    /// change a token's metadata.
    ReserveUpdate {
        entity: EntityId,
        token: TokenId,
        amount: Amount,
        name: Option<String>,
        symbol: Option<String>,
        decimals: Option<u8>,
    },
    /// Moves on-chain collateral and the matching `ondelta` for the
    /// account between `channel`'s two entities, requested by the
    /// `AccountTx::SettleOnchain` that `xln-entity` turned into this.
    Settlement {
        channel: ChannelKey,
        token: TokenId,
        collateral_delta: Amount,
        ondelta_delta: Amount,
    },
}

impl CanonicalEncode for JTx {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        match self {
            JTx::ReserveUpdate { entity, token, amount, name, symbol, decimals } => {
                out.push(0);
                entity.canonical_encode(out);
                token.canonical_encode(out);
                amount.canonical_encode(out);
                name.clone().unwrap_or_default().canonical_encode(out);
                symbol.clone().unwrap_or_default().canonical_encode(out);
                decimals.unwrap_or(0).canonical_encode(out);
            }
            JTx::Settlement { channel, token, collateral_delta, ondelta_delta } => {
                out.push(1);
                channel.canonical_encode(out);
                token.canonical_encode(out);
                collateral_delta.canonical_encode(out);
                ondelta_delta.canonical_encode(out);
            }
        }
    }
}
