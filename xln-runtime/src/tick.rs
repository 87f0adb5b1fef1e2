// `applyRuntimeInput(env, {runtimeTxs, entityInputs})`: the one
// function that advances `Environment` by exactly one tick, in five steps:
//   1. apply every `RuntimeTx` (bootstrap: new jurisdictions, new replicas)
//   2. deliver every `entityInputs[*]` to its replica via `EntityMachine::process`
//   3. drain the outgoing-message queue those produced, bounded by a
//      fixed-point iteration count (carried over to the next tick past it)
//   4. advance every jurisdiction due for a block, feeding its j_events
//      back to the entities they touch
//   5. snapshot the result and push it onto `history`
//
// An explicit `now_ms` is threaded through every call rather than read off
// the wall clock, so
// `tick`/`process` are both thin callers of this with different shaped
// `RuntimeInput`s.

use xln_base::{Amount, ChannelKey, EntityId, JurisdictionName, XlnError};
use xln_entity::{EntityReplica, EntityTx, JEvent, JEventKind};
use xln_jurisdiction::{JTx, Jurisdiction, JurisdictionEvent, JurisdictionEventKind};
use xln_vers::{EnvSnapshot, JurisdictionView, ReplicaKey, RuntimeInput, RuntimeTx, TickOutcome};

use crate::environment::Environment;

/// `tick(env, nowMs)`: the cadence driver used when nothing new
/// has arrived but jurisdictions may still be due for a block.
pub fn tick(env: &mut Environment, now_ms: u64) -> Vec<TickOutcome> {
    apply_runtime_input(env, RuntimeInput::default(), now_ms)
}

/// `process(env, entityInputs)`: a tick carrying no bootstrap
/// `runtimeTxs`, just entity work.
pub fn process(env: &mut Environment, entity_inputs: Vec<xln_vers::EntityInput>, now_ms: u64) -> Vec<TickOutcome> {
    apply_runtime_input(env, RuntimeInput { runtime_txs: Vec::new(), entity_inputs }, now_ms)
}

pub fn apply_runtime_input(env: &mut Environment, input: RuntimeInput, now_ms: u64) -> Vec<TickOutcome> {
    let mut outcomes = Vec::new();

    for tx in &input.runtime_txs {
        apply_runtime_tx(env, tx);
        outcomes.push(TickOutcome::Ok);
    }

    let mut round: Vec<(EntityId, EntityTx)> = env.pending_messages.drain(..).collect();

    for entity_input in &input.entity_inputs {
        let key = ReplicaKey::new(entity_input.entity_id, entity_input.signer_id.clone());
        match env.e_replicas.get_mut(&key) {
            None => outcomes.push(TickOutcome::from_error(&XlnError::ReplicaMissing {
                entity: entity_input.entity_id,
                signer: entity_input.signer_id.clone(),
            })),
            Some(replica) => {
                let (outcome, errors) = xln_entity::process(replica, entity_input.entity_txs.clone());
                if errors.is_empty() {
                    outcomes.push(TickOutcome::Ok);
                } else {
                    for e in errors {
                        outcomes.push(TickOutcome::from_error(&e.error));
                    }
                }
                for request in outcome.settlement_requests {
                    enqueue_settlement(env, request);
                }
                round.extend(outcome.outgoing);
            }
        }
    }

    let mut iterations = 0usize;
    while !round.is_empty() {
        if iterations >= env.config.fixed_point_iteration_bound {
            tracing::debug!(carried_over = round.len(), "fixed-point bound reached, deferring to next tick");
            env.pending_messages.extend(round);
            break;
        }
        iterations += 1;
        let mut next_round = Vec::new();
        for (target, tx) in round {
            next_round.extend(deliver(env, target, tx, &mut outcomes));
        }
        round = next_round;
    }

    let jurisdiction_names: Vec<JurisdictionName> = env.xlnomies.keys().cloned().collect();
    let mut all_events: Vec<(JurisdictionName, JurisdictionEvent)> = Vec::new();
    for name in jurisdiction_names {
        let due = env.xlnomies.get(&name).map(|j| j.due_for_auto_advance(now_ms)).unwrap_or(false);
        if !due {
            continue;
        }
        let evm_type = env.xlnomies[&name].evm_type;
        let mut backend = env.config.backend_for(evm_type);
        let jurisdiction = env.xlnomies.get_mut(&name).expect("name just read from this map");
        match backend.advance(jurisdiction, now_ms) {
            Ok(events) => all_events.extend(events.into_iter().map(|e| (name.clone(), e))),
            Err(error) => outcomes.push(TickOutcome::from_error(&error)),
        }
    }
    for (name, event) in all_events {
        deliver_j_event(env, &name, event, &mut outcomes);
    }

    push_snapshot(env, now_ms, input, outcomes.clone(), None, None);
    outcomes
}

pub(crate) fn push_snapshot(
    env: &mut Environment,
    now_ms: u64,
    input: RuntimeInput,
    outcomes: Vec<TickOutcome>,
    title: Option<String>,
    description: Option<String>,
) {
    let height = env.history.len() as u64;
    let j_replicas: Vec<JurisdictionView> = env.xlnomies.values().map(JurisdictionView::from).collect();
    let gossip = env.gossip.get_profiles().into_iter().cloned().collect();
    let snapshot = EnvSnapshot {
        height,
        timestamp: now_ms,
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        e_replicas: env.e_replicas.clone(),
        j_replicas,
        runtime_input: input,
        runtime_outputs: outcomes,
        gossip,
    };
    env.history.push(snapshot);
}

pub(crate) fn apply_runtime_tx(env: &mut Environment, tx: &RuntimeTx) {
    match tx {
        RuntimeTx::CreateXlnomy { name, evm_type, rpc_url: _, block_time_ms, auto_grid } => {
            if env.active_xlnomy.is_none() {
                env.active_xlnomy = Some(name.clone());
            }
            env.xlnomies.entry(name.clone()).or_insert_with(|| Jurisdiction::new(name.clone(), *evm_type, *block_time_ms));
            if let Some(grid) = auto_grid {
                crate::scenario::apply_auto_grid(env, name, grid);
            }
        }
        RuntimeTx::ImportReplica { entity_id, signer_id, config, is_proposer, position } => {
            let key = ReplicaKey::new(*entity_id, signer_id.clone());
            // Well-formed input never fails: a repeat
            // import is treated as a no-op rather than `DuplicateReplica`.
            env.e_replicas
                .entry(key)
                .or_insert_with(|| EntityReplica::new(*entity_id, signer_id.clone(), config.clone(), *is_proposer, *position));
        }
    }
}

fn enqueue_settlement(env: &mut Environment, request: xln_entity::SettlementRequest) {
    let Some(key) = env.replica_keys_for_entity(request.entity).into_iter().next() else {
        return; // replica vanished between the request and delivery; nothing to settle against.
    };
    let jurisdiction_name = env.e_replicas[&key].config.jurisdiction.clone();
    if let Some(jurisdiction) = env.xlnomies.get_mut(&jurisdiction_name) {
        jurisdiction.enqueue(JTx::Settlement {
            channel: ChannelKey::new(request.entity, request.counterparty),
            token: request.token,
            collateral_delta: request.amount,
            ondelta_delta: Amount::zero(),
        });
    }
}

/// Delivers one message to every replica presently importing `target`,
/// returning whatever those deliveries produced for the next round.
fn deliver(env: &mut Environment, target: EntityId, tx: EntityTx, outcomes: &mut Vec<TickOutcome>) -> Vec<(EntityId, EntityTx)> {
    let keys = env.replica_keys_for_entity(target);
    if keys.is_empty() {
        outcomes.push(TickOutcome::from_error(&XlnError::ReplicaMissing {
            entity: target,
            signer: xln_base::SignerId(String::new()),
        }));
        return Vec::new();
    }
    let mut forwarded = Vec::new();
    for key in keys {
        let replica = env.e_replicas.get_mut(&key).expect("key just resolved from this map");
        let (outcome, errors) = xln_entity::process(replica, vec![tx.clone()]);
        if errors.is_empty() {
            outcomes.push(TickOutcome::Ok);
        } else {
            for e in errors {
                outcomes.push(TickOutcome::from_error(&e.error));
            }
        }
        for request in outcome.settlement_requests {
            enqueue_settlement(env, request);
        }
        forwarded.extend(outcome.outgoing);
    }
    forwarded
}

fn deliver_j_event(env: &mut Environment, _jurisdiction: &JurisdictionName, event: JurisdictionEvent, outcomes: &mut Vec<TickOutcome>) {
    env.last_j_event = Some(event.clone());
    match event.kind.clone() {
        JurisdictionEventKind::ReserveUpdated { entity, token, new_balance, name, symbol, decimals } => {
            let tx = EntityTx::JEventTx(JEvent {
                kind: JEventKind::ReserveUpdated { entity, token, new_balance, name, symbol, decimals },
                block_number: event.block_number,
                transaction_hash: event.transaction_hash.clone(),
                observed_at: event.observed_at,
            });
            for key in env.replica_keys_for_entity(entity) {
                deliver_to_key(env, &key, tx.clone(), outcomes);
            }
        }
        JurisdictionEventKind::CollateralUpdated { channel, token, collateral, ondelta } => {
            let tx = EntityTx::JEventTx(JEvent {
                kind: JEventKind::CollateralUpdated { channel, token, collateral, ondelta },
                block_number: event.block_number,
                transaction_hash: event.transaction_hash.clone(),
                observed_at: event.observed_at,
            });
            for entity in [channel.left, channel.right] {
                for key in env.replica_keys_for_entity(entity) {
                    deliver_to_key(env, &key, tx.clone(), outcomes);
                }
            }
        }
    }
}

fn deliver_to_key(env: &mut Environment, key: &ReplicaKey, tx: EntityTx, outcomes: &mut Vec<TickOutcome>) {
    let Some(replica) = env.e_replicas.get_mut(key) else {
        return;
    };
    let (outcome, errors) = xln_entity::process(replica, vec![tx]);
    if errors.is_empty() {
        outcomes.push(TickOutcome::Ok);
    } else {
        for e in errors {
            outcomes.push(TickOutcome::from_error(&e.error));
        }
    }
    for request in outcome.settlement_requests {
        enqueue_settlement(env, request);
    }
    env.pending_messages.extend(outcome.outgoing);
}

#[cfg(test)]
mod test {
    use super::*;
    use xln_admin::Config;
    use xln_base::{EntityId as Eid, SignerId};
    use xln_entity::ReplicaConfig;
    use xln_gossip::Position;
    use xln_jurisdiction::EvmType;
    use xln_vers::EntityInput;

    fn new_env(bound: usize) -> Environment {
        Environment::new(Config::default().with_fixed_point_iteration_bound(bound))
    }

    fn import(env: &mut Environment, index: u64, jurisdiction: &JurisdictionName) {
        apply_runtime_tx(
            env,
            &RuntimeTx::ImportReplica {
                entity_id: Eid::numbered(index),
                signer_id: SignerId("s".to_string()),
                config: ReplicaConfig::single_signer(jurisdiction.clone(), SignerId("s".to_string())),
                is_proposer: true,
                position: Position::default(),
            },
        );
    }

    #[test]
    fn create_xlnomy_and_import_replica_never_fail() {
        let mut env = new_env(64);
        let name = JurisdictionName::from("j1");
        let outcomes = apply_runtime_input(
            &mut env,
            RuntimeInput {
                runtime_txs: vec![RuntimeTx::CreateXlnomy {
                    name: name.clone(),
                    evm_type: EvmType::BrowserVm,
                    rpc_url: None,
                    block_time_ms: 1000,
                    auto_grid: None,
                }],
                entity_inputs: Vec::new(),
            },
            0,
        );
        assert!(outcomes.iter().all(|o| matches!(o, TickOutcome::Ok)));
        assert_eq!(env.xlnomies.len(), 1);
        assert_eq!(env.history.len(), 1);
    }

    #[test]
    fn open_account_handshake_completes_within_one_tick() {
        let mut env = new_env(64);
        let name = JurisdictionName::from("j1");
        env.xlnomies.insert(name.clone(), Jurisdiction::new(name.clone(), EvmType::BrowserVm, 1000));
        import(&mut env, 1, &name);
        import(&mut env, 2, &name);

        let outcomes = process(
            &mut env,
            vec![EntityInput {
                entity_id: Eid::numbered(1),
                signer_id: SignerId("s".to_string()),
                entity_txs: vec![EntityTx::OpenAccount { target: Eid::numbered(2) }],
            }],
            0,
        );
        assert!(outcomes.iter().all(|o| matches!(o, TickOutcome::Ok)));
        let bob = &env.e_replicas[&ReplicaKey::new(Eid::numbered(2), SignerId("s".to_string()))];
        assert!(bob.state.accounts.contains_key(&Eid::numbered(1)));
    }

    #[test]
    fn bound_of_zero_carries_every_message_to_the_next_tick() {
        let mut env = new_env(0);
        let name = JurisdictionName::from("j1");
        env.xlnomies.insert(name.clone(), Jurisdiction::new(name.clone(), EvmType::BrowserVm, 1000));
        import(&mut env, 1, &name);
        import(&mut env, 2, &name);

        process(
            &mut env,
            vec![EntityInput {
                entity_id: Eid::numbered(1),
                signer_id: SignerId("s".to_string()),
                entity_txs: vec![EntityTx::OpenAccount { target: Eid::numbered(2) }],
            }],
            0,
        );
        let bob = &env.e_replicas[&ReplicaKey::new(Eid::numbered(2), SignerId("s".to_string()))];
        assert!(!bob.state.accounts.contains_key(&Eid::numbered(1)));
        assert_eq!(env.pending_messages.len(), 1);

        tick(&mut env, 0);
        let bob = &env.e_replicas[&ReplicaKey::new(Eid::numbered(2), SignerId("s".to_string()))];
        assert!(bob.state.accounts.contains_key(&Eid::numbered(1)));
    }

    #[test]
    fn reserve_mint_then_advance_mirrors_into_the_entity() {
        let mut env = new_env(64);
        let name = JurisdictionName::from("j1");
        env.xlnomies.insert(name.clone(), Jurisdiction::new(name.clone(), EvmType::BrowserVm, 0));
        import(&mut env, 1, &name);
        env.xlnomies.get_mut(&name).unwrap().enqueue(JTx::ReserveUpdate {
            entity: Eid::numbered(1),
            token: xln_base::TokenId(0),
            amount: Amount::from(1_000i64),
            name: Some("USD".to_string()),
            symbol: Some("USD".to_string()),
            decimals: Some(18),
        });
        tick(&mut env, 1000);
        let alice = &env.e_replicas[&ReplicaKey::new(Eid::numbered(1), SignerId("s".to_string()))];
        assert_eq!(alice.state.reserves[&xln_base::TokenId(0)], Amount::from(1_000i64));
    }
}
