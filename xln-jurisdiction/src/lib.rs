#![allow(dead_code)]

// Per-jurisdiction settlement batcher: mempool of `JTx` ->
// block -> `stateRoot`, emitting `JurisdictionEvent`s that `xln-runtime`
// delivers to entities as j_events. See DESIGN.md for grounding.

mod event;
mod machine;
mod tx;

pub use event::{JurisdictionEvent, JurisdictionEventKind};
pub use machine::{CollateralEntry, Contracts, EvmType, Jurisdiction, TokenInfo};
pub use tx::JTx;
