// AccountTx variants and their application to a token's Delta.
//
// Every variant but `SettleOnchain` mutates `Delta` directly and
// deterministically from `submitter_is_left` alone — no other context is
// read, which is what lets a receiving side replay a proposer's txs and
// recompute the same stateHash. `SettleOnchain` is the one exception: it
// only requests a jurisdiction-side change, so applying it here is a no-op
// (xln-entity is responsible for turning it into an outgoing JTx).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xln_base::{Amount, TokenId, XlnError};
use xln_delta::{derive_delta, Delta};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountTx {
    AddPayment {
        token: TokenId,
        amount: Amount,
    },
    /// Submitter raises the credit limit it extends to its counterparty by
    /// `amount` (must be non-negative; use `UpdateCreditLimit` to lower it).
    AddCredit {
        token: TokenId,
        amount: Amount,
    },
    /// Submitter sets the credit limit it extends to its counterparty to an
    /// absolute value, up or down.
    UpdateCreditLimit {
        token: TokenId,
        new_limit: Amount,
    },
    /// Requests the jurisdiction move `amount` of on-chain collateral into
    /// this channel. Inert on `Delta` until the matching `CollateralUpdated`
    /// j_event lands.
    SettleOnchain {
        token: TokenId,
        amount: Amount,
    },
}

fn entry(deltas: &mut BTreeMap<TokenId, Delta>, token: TokenId) -> &mut Delta {
    deltas.entry(token).or_insert_with(Delta::zero)
}

/// Applies one `AccountTx` to `deltas` as `submitter_is_left` would. Used
/// both to build a trial frame locally and to replay a peer's frame.
pub fn apply_account_tx(
    deltas: &mut BTreeMap<TokenId, Delta>,
    tx: &AccountTx,
    submitter_is_left: bool,
) -> Result<(), XlnError> {
    match tx {
        AccountTx::AddPayment { token, amount } => {
            if !amount.is_positive() {
                return Err(XlnError::InvalidAmount { reason: "addPayment amount must be positive" });
            }
            let d = entry(deltas, *token);
            let derived = derive_delta(d, submitter_is_left);
            if derived.out_capacity < *amount {
                return Err(XlnError::InsufficientCapacity {
                    hop: 0,
                    token: *token,
                    required: amount.clone(),
                    available: derived.out_capacity,
                });
            }
            // Raw is left-signed: a left-submitted payment decreases it, a
            // right-submitted payment increases it (xln-delta module docs).
            if submitter_is_left {
                d.offdelta -= amount.clone();
            } else {
                d.offdelta += amount.clone();
            }
            Ok(())
        }
        // A side extends credit to its counterparty, i.e. it grows the
        // counterparty's end of the number line: left extending credit
        // widens `rightCreditLimit`, right extending credit widens
        // `leftCreditLimit`.
        AccountTx::AddCredit { token, amount } => {
            if amount.is_negative() {
                return Err(XlnError::InvalidAmount { reason: "addCredit amount must be non-negative" });
            }
            let d = entry(deltas, *token);
            if submitter_is_left {
                d.right_credit_limit += amount.clone();
            } else {
                d.left_credit_limit += amount.clone();
            }
            Ok(())
        }
        AccountTx::UpdateCreditLimit { token, new_limit } => {
            if new_limit.is_negative() {
                return Err(XlnError::InvalidAmount { reason: "updateCreditLimit cannot set a negative limit" });
            }
            let d = entry(deltas, *token);
            if submitter_is_left {
                d.right_credit_limit = new_limit.clone();
            } else {
                d.left_credit_limit = new_limit.clone();
            }
            Ok(())
        }
        AccountTx::SettleOnchain { .. } => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_payment_moves_raw_delta_by_payer_sign() {
        let mut deltas = BTreeMap::new();
        deltas.insert(TokenId(1), Delta::zero());
        apply_account_tx(
            &mut deltas,
            &AccountTx::AddCredit {
                token: TokenId(1),
                amount: Amount::from(100i64),
            },
            false,
        )
        .unwrap();
        apply_account_tx(
            &mut deltas,
            &AccountTx::AddPayment {
                token: TokenId(1),
                amount: Amount::from(40i64),
            },
            true,
        )
        .unwrap();
        assert_eq!(deltas[&TokenId(1)].offdelta, Amount::from(-40i64));
    }

    #[test]
    fn add_payment_over_capacity_is_rejected() {
        let mut deltas = BTreeMap::new();
        apply_account_tx(
            &mut deltas,
            &AccountTx::AddPayment {
                token: TokenId(1),
                amount: Amount::from(1i64),
            },
            true,
        )
        .unwrap_err();
    }

    #[test]
    fn zero_amount_payment_is_rejected() {
        let mut deltas = BTreeMap::new();
        deltas.insert(TokenId(1), Delta::zero());
        let err = apply_account_tx(
            &mut deltas,
            &AccountTx::AddPayment {
                token: TokenId(1),
                amount: Amount::zero(),
            },
            true,
        )
        .unwrap_err();
        assert!(matches!(err, XlnError::InvalidAmount { .. }));
    }

    #[test]
    fn settle_onchain_does_not_touch_delta() {
        let mut deltas = BTreeMap::new();
        deltas.insert(TokenId(1), Delta::zero());
        let before = deltas.clone();
        apply_account_tx(
            &mut deltas,
            &AccountTx::SettleOnchain {
                token: TokenId(1),
                amount: Amount::from(10i64),
            },
            true,
        )
        .unwrap();
        assert_eq!(deltas, before);
    }
}
