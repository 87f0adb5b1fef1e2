#![allow(dead_code)]

// Bilateral consensus between exactly two entities on their shared
// `Delta`s. An `AccountMachine` is the unit of replication:
// each side keeps its own copy, and the two converge by exchanging
// `AccountFrame` proposals and acks rather than through any shared state.

mod classify;
mod frame;
mod machine;
mod tx;

pub use classify::{classify_bilateral_state, BilateralState, Classification};
pub use frame::{hash_account_state, AccountFrame};
pub use machine::{AccountMachine, AccountOutput, Dispute};
pub use tx::{apply_account_tx, AccountTx};
