// EntityTx variants. `importReplica` is deliberately absent here:
// replica creation is a runtime-level bootstrap operation, not something
// an already-existing replica processes against itself. See `xln-runtime`.

use serde::{Deserialize, Serialize};
use xln_account::AccountFrame;
use xln_base::{Amount, ChannelKey, EntityId, TokenId};

/// The wire form of the bilateral account protocol, carried inside
/// `EntityTx::AccountInput`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AccountMessage {
    /// `openAccount` bootstrap: tells the peer to instantiate its mirror.
    Open,
    Propose(AccountFrame),
    Ack { height: u64 },
    Reject { height: u64, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JEventKind {
    ReserveUpdated {
        entity: EntityId,
        token: TokenId,
        new_balance: Amount,
        name: String,
        symbol: String,
        decimals: u8,
    },
    CollateralUpdated {
        channel: ChannelKey,
        token: TokenId,
        collateral: Amount,
        ondelta: Amount,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JEvent {
    pub kind: JEventKind,
    pub block_number: u64,
    pub transaction_hash: String,
    pub observed_at: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EntityTx {
    OpenAccount {
        target: EntityId,
    },
    /// `route[hop_index]` must equal the processing replica's own
    /// `entityId`; `route[hop_index + 1]` is the counterparty this hop
    /// pays. The full route travels with every hop so each intermediary
    /// can validate its position without recomputing anything (spec
    /// §4.5.1: "the route is authoritative").
    DirectPayment {
        target: EntityId,
        token: TokenId,
        amount: Amount,
        route: Vec<EntityId>,
        description: String,
        hop_index: usize,
    },
    JEventTx(JEvent),
    AccountInput {
        from: EntityId,
        to: EntityId,
        message: AccountMessage,
    },
    /// Requests that the jurisdiction move `amount` of on-chain collateral
    /// into the account held with `counterparty`.
    /// Applying this locally queues an `AccountTx::SettleOnchain` into that
    /// account's mempool; `xln-runtime` is the one that turns the request
    /// into a `JTx` and enqueues it on the owning jurisdiction, since only
    /// the runtime holds a handle to `Environment`'s jurisdictions.
    SettleOnchain {
        counterparty: EntityId,
        token: TokenId,
        amount: Amount,
    },
}
