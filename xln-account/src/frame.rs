use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xln_base::TokenId;
use xln_codec::{hash, CanonicalEncode};
use xln_delta::Delta;

use crate::tx::AccountTx;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFrame {
    pub height: u64,
    pub state_hash: [u8; 32],
    pub account_txs: Vec<AccountTx>,
}

impl CanonicalEncode for AccountTx {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        match self {
            AccountTx::AddPayment { token, amount } => {
                out.push(0);
                token.0.canonical_encode(out);
                amount.canonical_encode(out);
            }
            AccountTx::AddCredit { token, amount } => {
                out.push(1);
                token.0.canonical_encode(out);
                amount.canonical_encode(out);
            }
            AccountTx::UpdateCreditLimit { token, new_limit } => {
                out.push(2);
                token.0.canonical_encode(out);
                new_limit.canonical_encode(out);
            }
            AccountTx::SettleOnchain { token, amount } => {
                out.push(3);
                token.0.canonical_encode(out);
                amount.canonical_encode(out);
            }
        }
    }
}

/// `stateHash` of a bilateral account: the canonical hash of its full
/// per-token delta map, independent of how the map was reached.
pub fn hash_account_state(deltas: &BTreeMap<TokenId, Delta>) -> [u8; 32] {
    hash(deltas)
}
