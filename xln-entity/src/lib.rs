#![allow(dead_code)]

// Per-entity replicated state machine: sequences `EntityTx`s
// into `EntityFrame`s, maintains `EntityState`, and drives the contained
// `AccountMachine`s.

mod jevent;
mod machine;
mod routing;
mod state;
mod tx;

pub use jevent::{apply_collateral_update, apply_j_event, JEventMirror};
pub use machine::{process, ProcessError, ProcessOutcome, SettlementRequest};
pub use routing::apply_direct_payment_hop;
pub use state::{hash_entity_state, EntityFrame, EntityReplica, EntityState, ReplicaConfig};
pub use tx::{AccountMessage, EntityTx, JEvent, JEventKind};
