// directPayment routing. Each hop only ever touches the
// processing entity's own `AccountMachine` with its immediate neighbor;
// the rest of the route is carried forward as a new `EntityTx` destined for
// that neighbor. This keeps `process` scoped to one entity's own state
// (it never reaches into another replica), at the cost of the multi-hop
// payment being several independent enqueues rather than one atomic
// operation — the non-atomicity is deliberate and documented rather than
// silently upgraded to something stronger.

use xln_account::AccountTx;
use xln_base::{Amount, EntityId, TokenId, XlnError};
use xln_delta::derive_delta;

use crate::state::EntityState;
use crate::tx::EntityTx;

pub struct HopOutcome {
    /// Forward the route to the next hop, if this wasn't the final one.
    pub forward: Option<EntityTx>,
}

pub fn apply_direct_payment_hop(
    state: &mut EntityState,
    self_id: EntityId,
    target: EntityId,
    token: TokenId,
    amount: Amount,
    route: Vec<EntityId>,
    description: String,
    hop_index: usize,
) -> Result<HopOutcome, XlnError> {
    if route.len() < 2 || hop_index + 1 >= route.len() {
        return Err(XlnError::InvalidRoute { reason: "route too short for the given hop index" });
    }
    if route[hop_index] != self_id {
        return Err(XlnError::InvalidRoute { reason: "route does not name this entity at hop_index" });
    }
    if !amount.is_positive() {
        return Err(XlnError::InvalidAmount { reason: "directPayment amount must be positive" });
    }

    let next = route[hop_index + 1];
    let account = state
        .accounts
        .get_mut(&next)
        .ok_or(XlnError::AccountMissing { entity: self_id, counterparty: next })?;

    let capacity = derive_delta(account.deltas.entry(token).or_insert_with(xln_delta::Delta::zero), account.i_am_left)
        .out_capacity;
    if capacity < amount {
        return Err(XlnError::InsufficientCapacity {
            hop: hop_index,
            token,
            required: amount,
            available: capacity,
        });
    }

    account.submit_local_tx(AccountTx::AddPayment { token, amount: amount.clone() })?;

    let is_final_hop = next == target || hop_index + 2 >= route.len();
    let forward = if is_final_hop {
        None
    } else {
        Some(EntityTx::DirectPayment { target, token, amount, route, description, hop_index: hop_index + 1 })
    };

    Ok(HopOutcome { forward })
}

#[cfg(test)]
mod test {
    use super::*;
    use xln_account::AccountMachine;

    fn route3() -> (EntityId, EntityId, EntityId) {
        (EntityId::numbered(1), EntityId::numbered(2), EntityId::numbered(3))
    }

    #[test]
    fn missing_account_for_next_hop_fails() {
        let (a, b, _c) = route3();
        let mut state = EntityState::new();
        let err = apply_direct_payment_hop(
            &mut state,
            a,
            b,
            TokenId(1),
            Amount::from(10i64),
            vec![a, b],
            String::new(),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, XlnError::AccountMissing { .. }));
    }

    #[test]
    fn final_hop_does_not_forward() {
        let (a, b, _c) = route3();
        let mut state = EntityState::new();
        let mut account = AccountMachine::new(b, xln_base::is_left(&a, &b));
        account.deltas.insert(TokenId(1), xln_delta::Delta { right_credit_limit: Amount::from(100i64), ..xln_delta::Delta::zero() });
        state.accounts.insert(b, account);

        let outcome = apply_direct_payment_hop(
            &mut state,
            a,
            b,
            TokenId(1),
            Amount::from(10i64),
            vec![a, b],
            String::new(),
            0,
        )
        .unwrap();
        assert!(outcome.forward.is_none());
        assert_eq!(state.accounts[&b].mempool.len(), 1);
    }

    #[test]
    fn intermediate_hop_forwards_to_next_entity() {
        let (a, b, c) = route3();
        let mut state = EntityState::new();
        let mut account = AccountMachine::new(b, xln_base::is_left(&a, &b));
        account.deltas.insert(TokenId(1), xln_delta::Delta { right_credit_limit: Amount::from(100i64), ..xln_delta::Delta::zero() });
        state.accounts.insert(b, account);

        let outcome = apply_direct_payment_hop(
            &mut state,
            a,
            c,
            TokenId(1),
            Amount::from(10i64),
            vec![a, b, c],
            String::new(),
            0,
        )
        .unwrap();
        match outcome.forward {
            Some(EntityTx::DirectPayment { hop_index, .. }) => assert_eq!(hop_index, 1),
            _ => panic!("expected a forwarded hop"),
        }
    }

    #[test]
    fn insufficient_capacity_names_the_failing_hop() {
        let (a, b, _c) = route3();
        let mut state = EntityState::new();
        state.accounts.insert(b, AccountMachine::new(b, xln_base::is_left(&a, &b)));
        let err = apply_direct_payment_hop(
            &mut state,
            a,
            b,
            TokenId(1),
            Amount::from(10i64),
            vec![a, b],
            String::new(),
            0,
        )
        .unwrap_err();
        match err {
            XlnError::InsufficientCapacity { hop, .. } => assert_eq!(hop, 0),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
