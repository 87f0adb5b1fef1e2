// EntityMachine.process: sequences incoming `EntityTx`s into a
// new `EntityFrame`, applying each to `EntityState` in submission order,
// and collects whatever this replica needs to hand back to `xln-runtime`:
// messages addressed to other entities, and settlement requests bound for
// a jurisdiction. Neither crosses here directly — per the arena pattern
//, this crate never reaches into another replica or into a
// `Jurisdiction`; it only ever resolves ids through the caller.

use xln_account::{AccountMachine, AccountOutput};
use xln_base::{is_left, Amount, EntityId, TokenId, XlnError};

use crate::jevent::{apply_collateral_update, apply_j_event};
use crate::routing::apply_direct_payment_hop;
use crate::state::{hash_entity_state, EntityFrame, EntityReplica};
use crate::tx::{AccountMessage, EntityTx, JEventKind};

/// A settlement request lowered from `EntityTx::SettleOnchain`, destined
/// for whichever jurisdiction this replica's `config.jurisdiction` names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementRequest {
    pub entity: EntityId,
    pub counterparty: EntityId,
    pub token: TokenId,
    pub amount: Amount,
}

#[derive(Clone, Debug, Default)]
pub struct ProcessOutcome {
    /// `EntityTx`s to deliver to other replicas' mempools this same tick
    ///.
    pub outgoing: Vec<(EntityId, EntityTx)>,
    pub settlement_requests: Vec<SettlementRequest>,
}

/// A hop-local or message-local failure, indexed by position in the
/// drained input batch. Recorded rather than aborting the batch: subsequent
/// entity inputs continue to execute after one fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessError {
    pub index: usize,
    pub error: XlnError,
}

/// `process(entityId, signerId, entityTxs)`. The caller has
/// already resolved `replica` from `eReplicas["entityId:signerId"]`
/// (fatal `ReplicaMissing` if absent, per spec step 1) — that lookup lives
/// in `xln-runtime`, which owns the `Environment` arena.
pub fn process(replica: &mut EntityReplica, incoming: Vec<EntityTx>) -> (ProcessOutcome, Vec<ProcessError>) {
    replica.mempool.extend(incoming);
    let drained: Vec<EntityTx> = replica.mempool.drain(..).collect();

    let mut outcome = ProcessOutcome::default();
    let mut errors = Vec::new();

    if replica.is_proposer {
        for (index, tx) in drained.iter().enumerate() {
            if let Err(error) = apply_one(replica, tx, &mut outcome) {
                if !error.is_idempotent_skip() {
                    errors.push(ProcessError { index, error });
                }
            }
        }

        auto_propose(replica, &mut outcome);
    }

    replica.current_frame = EntityFrame {
        height: replica.current_frame.height + 1,
        state_hash: hash_entity_state(&replica.state),
        entity_txs: drained,
    };

    (outcome, errors)
}

fn apply_one(replica: &mut EntityReplica, tx: &EntityTx, outcome: &mut ProcessOutcome) -> Result<(), XlnError> {
    match tx {
        EntityTx::OpenAccount { target } => open_account(replica, *target, outcome),
        EntityTx::DirectPayment { target, token, amount, route, description, hop_index } => {
            let hop = apply_direct_payment_hop(
                &mut replica.state,
                replica.entity_id,
                *target,
                *token,
                amount.clone(),
                route.clone(),
                description.clone(),
                *hop_index,
            )?;
            if let Some(forward) = hop.forward {
                let next_entity = match &forward {
                    EntityTx::DirectPayment { route, hop_index, .. } => route[*hop_index],
                    _ => unreachable!("apply_direct_payment_hop only ever forwards a DirectPayment"),
                };
                outcome.outgoing.push((next_entity, forward));
            }
            Ok(())
        }
        EntityTx::JEventTx(event) => apply_incoming_j_event(replica, event),
        EntityTx::AccountInput { from, to, message } => {
            if *to != replica.entity_id {
                // Misrouted by the caller; nothing this replica owns to update.
                return Ok(());
            }
            apply_incoming_account_message(replica, *from, message, outcome)
        }
        EntityTx::SettleOnchain { counterparty, token, amount } => {
            let account = replica
                .state
                .accounts
                .get_mut(counterparty)
                .ok_or(XlnError::AccountMissing { entity: replica.entity_id, counterparty: *counterparty })?;
            account.submit_local_tx(xln_account::AccountTx::SettleOnchain { token: *token, amount: amount.clone() })?;
            outcome.settlement_requests.push(SettlementRequest {
                entity: replica.entity_id,
                counterparty: *counterparty,
                token: *token,
                amount: amount.clone(),
            });
            Ok(())
        }
    }
}

fn open_account(replica: &mut EntityReplica, target: EntityId, outcome: &mut ProcessOutcome) -> Result<(), XlnError> {
    if replica.state.accounts.contains_key(&target) {
        return Ok(()); // openAccount is idempotent once the account exists.
    }
    let i_am_left = is_left(&replica.entity_id, &target);
    replica.state.accounts.insert(target, AccountMachine::new(target, i_am_left));
    outcome.outgoing.push((
        target,
        EntityTx::AccountInput { from: replica.entity_id, to: target, message: AccountMessage::Open },
    ));
    Ok(())
}

fn apply_incoming_j_event(replica: &mut EntityReplica, event: &crate::tx::JEvent) -> Result<(), XlnError> {
    match &event.kind {
        JEventKind::ReserveUpdated { .. } => apply_j_event(&mut replica.state, event).map(|_| ()),
        JEventKind::CollateralUpdated { channel, token, collateral, ondelta } => {
            let counterparty = if channel.left == replica.entity_id { channel.right } else { channel.left };
            apply_collateral_update(
                &mut replica.state,
                counterparty,
                *token,
                collateral.clone(),
                ondelta.clone(),
                event.block_number,
                &event.transaction_hash,
            )
        }
    }
}

fn apply_incoming_account_message(
    replica: &mut EntityReplica,
    from: EntityId,
    message: &AccountMessage,
    outcome: &mut ProcessOutcome,
) -> Result<(), XlnError> {
    let self_id = replica.entity_id;
    let account = replica
        .state
        .accounts
        .entry(from)
        .or_insert_with(|| AccountMachine::new(from, is_left(&self_id, &from)));

    match message {
        AccountMessage::Open => Ok(()), // mirror instantiated above; nothing else to do.
        AccountMessage::Propose(frame) => match account.apply_remote_propose(frame.clone())? {
            AccountOutput::Ack { height } => {
                outcome.outgoing.push((
                    from,
                    EntityTx::AccountInput { from: self_id, to: from, message: AccountMessage::Ack { height } },
                ));
                Ok(())
            }
            AccountOutput::Reject { height, reason } => {
                outcome.outgoing.push((
                    from,
                    EntityTx::AccountInput {
                        from: self_id,
                        to: from,
                        message: AccountMessage::Reject { height, reason: reason.to_string() },
                    },
                ));
                Ok(())
            }
            AccountOutput::Propose(_) => unreachable!("apply_remote_propose never replies with a counter-proposal"),
        },
        AccountMessage::Ack { height } => account.apply_remote_ack(*height),
        AccountMessage::Reject { height, .. } => account.apply_remote_reject(*height),
    }
}

/// `iAmLeft` is the default eager proposer: after a tick's own
/// local submissions land in an account's mempool, the left side proposes
/// immediately rather than waiting for a separate trigger. This is a
/// runtime scheduling policy layered on top of `AccountMachine::propose`,
/// which itself is symmetric — see `xln-account`'s DESIGN.md entry.
fn auto_propose(replica: &mut EntityReplica, outcome: &mut ProcessOutcome) {
    let self_id = replica.entity_id;
    let counterparties: Vec<EntityId> = replica.state.accounts.keys().copied().collect();
    for cp in counterparties {
        let account = replica.state.accounts.get_mut(&cp).expect("key just read from this map");
        if !account.i_am_left || account.pending_frame.is_some() || account.mempool.is_empty() {
            continue;
        }
        if let Ok(Some(frame)) = account.propose() {
            outcome.outgoing.push((
                cp,
                EntityTx::AccountInput { from: self_id, to: cp, message: AccountMessage::Propose(frame) },
            ));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::ReplicaConfig;
    use xln_base::{JurisdictionName, SignerId};
    use xln_gossip::Position;

    fn replica(index: u64) -> EntityReplica {
        let entity_id = EntityId::numbered(index);
        let signer = SignerId("s".to_string());
        let config = ReplicaConfig::single_signer(JurisdictionName::from("j1"), signer.clone());
        EntityReplica::new(entity_id, signer, config, true, Position::default())
    }

    #[test]
    fn open_account_creates_mirror_and_emits_open_message() {
        let mut alice = replica(1);
        let bob_id = EntityId::numbered(2);
        let (outcome, errors) = process(&mut alice, vec![EntityTx::OpenAccount { target: bob_id }]);
        assert!(errors.is_empty());
        assert!(alice.state.accounts.contains_key(&bob_id));
        assert_eq!(outcome.outgoing.len(), 1);
        assert_eq!(outcome.outgoing[0].0, bob_id);
        assert_eq!(alice.current_frame.height, 1);
    }

    #[test]
    fn reopening_an_existing_account_is_idempotent() {
        let mut alice = replica(1);
        let bob_id = EntityId::numbered(2);
        process(&mut alice, vec![EntityTx::OpenAccount { target: bob_id }]);
        let (outcome, errors) = process(&mut alice, vec![EntityTx::OpenAccount { target: bob_id }]);
        assert!(errors.is_empty());
        assert!(outcome.outgoing.is_empty());
        assert_eq!(alice.state.accounts.len(), 1);
    }

    #[test]
    fn non_proposer_replica_leaves_state_untouched() {
        let mut alice = replica(1);
        alice.is_proposer = false;
        let bob_id = EntityId::numbered(2);
        let (outcome, errors) = process(&mut alice, vec![EntityTx::OpenAccount { target: bob_id }]);
        assert!(errors.is_empty());
        assert!(outcome.outgoing.is_empty());
        assert!(alice.state.accounts.is_empty());
        assert_eq!(alice.current_frame.height, 1); // frame still advances, just empty of effect.
    }

    #[test]
    fn account_open_handshake_converges_both_sides() {
        let mut alice = replica(1);
        let mut bob = replica(2);
        let bob_id = bob.entity_id;
        let alice_id = alice.entity_id;

        let (outcome, _) = process(&mut alice, vec![EntityTx::OpenAccount { target: bob_id }]);
        let (outcome_b, _) = process(&mut bob, outcome.outgoing.into_iter().map(|(_, tx)| tx).collect());
        assert!(bob.state.accounts.contains_key(&alice_id));
        assert!(outcome_b.outgoing.is_empty()); // Open carries no reply.
    }
}
