#![allow(dead_code)]

// Snapshot/history model enabling deterministic time-travel: "versioning,
// history, undo, fork-merge" maps directly onto an append-only
// `Vec<EnvSnapshot>` plus a `timeIndex` cursor; see DESIGN.md.

mod history;
mod replica_key;
mod snapshot;
mod wire;

pub use history::History;
pub use replica_key::ReplicaKey;
pub use snapshot::{EnvSnapshot, JurisdictionView};
pub use wire::{AutoGrid, EntityIdKind, EntityInput, RuntimeInput, RuntimeTx, TickOutcome};
