// j_event application. A jurisdiction callback mutates this
// entity's own mirror of reserves/collateral; the env-level mirror
// (`xlnomies[jur].reserves`/`.collaterals`) is the caller's job
// (`xln-runtime`), since `EntityState` has no visibility into `Environment`.

use xln_base::{Amount, TokenId, XlnError};
use xln_delta::Delta;

use crate::state::EntityState;
use crate::tx::{JEvent, JEventKind};

/// What `xln-runtime` must additionally mirror into the owning
/// `Jurisdiction`/`Environment::xlnomies` after a j_event lands locally.
pub enum JEventMirror {
    Reserve { token: TokenId, new_balance: Amount },
    Collateral { channel: xln_base::ChannelKey, token: TokenId, collateral: Amount, ondelta: Amount },
}

pub fn apply_j_event(state: &mut EntityState, event: &JEvent) -> Result<JEventMirror, XlnError> {
    let key = (event.block_number, event.transaction_hash.clone(), token_of(&event.kind));
    if state.applied_j_events.contains(&key) {
        return Err(XlnError::JEventAlreadyApplied {
            block_number: event.block_number,
            transaction_hash: event.transaction_hash.clone(),
        });
    }

    let mirror = match &event.kind {
        JEventKind::ReserveUpdated { token, new_balance, .. } => {
            state.reserves.insert(*token, new_balance.clone());
            JEventMirror::Reserve { token: *token, new_balance: new_balance.clone() }
        }
        JEventKind::CollateralUpdated { channel, token, collateral, ondelta } => {
            // The j_event names the counterparty implicitly via `channel`;
            // the account we own with that peer is whichever endpoint
            // isn't our own reserve-mirror's entity. Resolved by the
            // caller, which knows which side of `channel` is "us" — here
            // we just need the one `AccountMachine` this applies to, so
            // the caller passes it pre-resolved via `apply_collateral_update`.
            let _ = (channel, token, collateral, ondelta);
            return Err(XlnError::InvalidRoute { reason: "use apply_collateral_update for CollateralUpdated" });
        }
    };

    state.applied_j_events.insert(key);
    Ok(mirror)
}

/// `CollateralUpdated` needs the specific `Delta` it targets, which lives
/// inside one of this entity's `AccountMachine`s keyed by the
/// counterparty — resolved by the caller (it knows which side of
/// `channel` corresponds to the account it's holding).
pub fn apply_collateral_update(
    state: &mut EntityState,
    counterparty: xln_base::EntityId,
    token: TokenId,
    collateral: Amount,
    ondelta: Amount,
    block_number: u64,
    transaction_hash: &str,
) -> Result<(), XlnError> {
    let key = (block_number, transaction_hash.to_string(), token);
    if state.applied_j_events.contains(&key) {
        return Err(XlnError::JEventAlreadyApplied { block_number, transaction_hash: transaction_hash.to_string() });
    }
    let account = state
        .accounts
        .get_mut(&counterparty)
        .ok_or(XlnError::AccountMissing { entity: counterparty, counterparty })?;
    let delta = account.deltas.entry(token).or_insert_with(Delta::zero);
    delta.collateral = collateral;
    delta.ondelta = ondelta;
    state.applied_j_events.insert(key);
    Ok(())
}

fn token_of(kind: &JEventKind) -> TokenId {
    match kind {
        JEventKind::ReserveUpdated { token, .. } => *token,
        JEventKind::CollateralUpdated { token, .. } => *token,
    }
}
