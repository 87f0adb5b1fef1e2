// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system

use crate::{Amount, EntityId, JurisdictionName, SignerId, TokenId};
use std::borrow::Cow;
use std::fmt;

use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

#[derive(Debug)]
#[allow(dead_code)]
pub struct Error(DynBacktraceError);
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(err)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
        error!(target: "xln", "{:?}", err);
        let dbe = DynBacktraceError::from(err);
        Error(dbe)
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    let err = SimpleErr(msg.into());
    Error::new(err)
}

/// The full error taxonomy. Every fallible core operation fails with one
/// of these, wrapped in [`Error`] at the point it's returned so a backtrace
/// is captured and the failure is logged exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XlnError {
    // Structural
    ReplicaMissing { entity: EntityId, signer: SignerId },
    AccountMissing { entity: EntityId, counterparty: EntityId },
    JurisdictionMissing { name: JurisdictionName },
    DuplicateReplica { entity: EntityId, signer: SignerId },

    // Validation
    InvalidAmount { reason: &'static str },
    InvalidRoute { reason: &'static str },
    UnknownTxType { type_name: String },

    // Capacity
    InsufficientCapacity { hop: usize, token: TokenId, required: Amount, available: Amount },

    // Consensus
    FrameHeightMismatch { expected: u64, actual: u64 },
    FrameHashMismatch,
    Desynced { local_height: u64, peer_height: u64 },
    ConservationViolated { token: TokenId, imbalance: Amount },

    // Dispute
    DisputeActive,

    // Idempotence (non-fatal, caller should treat as a silent skip)
    JEventAlreadyApplied { block_number: u64, transaction_hash: String },

    // Fatal
    CanonicalEncodingMismatch { reason: &'static str },
    /// An `EvmType` configured for a jurisdiction has no in-process
    /// implementation here; a real RPC-backed adaptor must be supplied by
    /// the embedding host.
    BackendUnavailable { evm_type: &'static str, reason: &'static str },
}

impl XlnError {
    /// Conservation violations and codec corruption abort the tick;
    /// everything else is recoverable at the call site that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            XlnError::ConservationViolated { .. }
                | XlnError::CanonicalEncodingMismatch { .. }
                | XlnError::BackendUnavailable { .. }
        )
    }

    /// A re-delivered j_event is not an error the caller needs to see.
    pub fn is_idempotent_skip(&self) -> bool {
        matches!(self, XlnError::JEventAlreadyApplied { .. })
    }

    /// Stable machine-readable tag for the variant, independent of its
    /// payload — used to populate `TickOutcome::Err{kind, ..}` (every tick
    /// returns a list of per-input outcomes, `{ok | err{kind, ...}}`)
    /// without requiring `XlnError` itself to round-trip through serde.
    pub fn kind_name(&self) -> &'static str {
        match self {
            XlnError::ReplicaMissing { .. } => "ReplicaMissing",
            XlnError::AccountMissing { .. } => "AccountMissing",
            XlnError::JurisdictionMissing { .. } => "JurisdictionMissing",
            XlnError::DuplicateReplica { .. } => "DuplicateReplica",
            XlnError::InvalidAmount { .. } => "InvalidAmount",
            XlnError::InvalidRoute { .. } => "InvalidRoute",
            XlnError::UnknownTxType { .. } => "UnknownTxType",
            XlnError::InsufficientCapacity { .. } => "InsufficientCapacity",
            XlnError::FrameHeightMismatch { .. } => "FrameHeightMismatch",
            XlnError::FrameHashMismatch => "FrameHashMismatch",
            XlnError::Desynced { .. } => "Desynced",
            XlnError::ConservationViolated { .. } => "ConservationViolated",
            XlnError::DisputeActive => "DisputeActive",
            XlnError::JEventAlreadyApplied { .. } => "JEventAlreadyApplied",
            XlnError::CanonicalEncodingMismatch { .. } => "CanonicalEncodingMismatch",
            XlnError::BackendUnavailable { .. } => "BackendUnavailable",
        }
    }
}

impl fmt::Display for XlnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XlnError::ReplicaMissing { entity, signer } => {
                write!(f, "no replica for entity {entity} signer {signer}")
            }
            XlnError::AccountMissing { entity, counterparty } => {
                write!(f, "entity {entity} has no account with {counterparty}")
            }
            XlnError::JurisdictionMissing { name } => write!(f, "unknown jurisdiction {name}"),
            XlnError::DuplicateReplica { entity, signer } => {
                write!(f, "replica for entity {entity} signer {signer} already imported")
            }
            XlnError::InvalidAmount { reason } => write!(f, "invalid amount: {reason}"),
            XlnError::InvalidRoute { reason } => write!(f, "invalid route: {reason}"),
            XlnError::UnknownTxType { type_name } => write!(f, "unknown tx type {type_name}"),
            XlnError::InsufficientCapacity { hop, token, required, available } => write!(
                f,
                "insufficient capacity at hop {hop} for token {token}: need {required}, have {available}"
            ),
            XlnError::FrameHeightMismatch { expected, actual } => {
                write!(f, "frame height mismatch: expected {expected}, got {actual}")
            }
            XlnError::FrameHashMismatch => write!(f, "frame state hash did not match recomputation"),
            XlnError::Desynced { local_height, peer_height } => {
                write!(f, "account desynced: local height {local_height}, peer height {peer_height}")
            }
            XlnError::ConservationViolated { token, imbalance } => write!(
                f,
                "conservation violated for token {token}: imbalance {imbalance}"
            ),
            XlnError::DisputeActive => write!(f, "account has an active dispute"),
            XlnError::JEventAlreadyApplied { block_number, transaction_hash } => write!(
                f,
                "j_event already applied: block {block_number} tx {transaction_hash}"
            ),
            XlnError::CanonicalEncodingMismatch { reason } => {
                write!(f, "canonical encoding mismatch: {reason}")
            }
            XlnError::BackendUnavailable { evm_type, reason } => {
                write!(f, "evm backend {evm_type} unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for XlnError {}

#[test]
fn test_error() {
    let _err = err("test error");
}

#[test]
fn test_xln_error_fatal_classification() {
    let fatal = XlnError::ConservationViolated { token: TokenId(0), imbalance: Amount::zero() };
    assert!(fatal.is_fatal());
    let not_fatal = XlnError::DisputeActive;
    assert!(!not_fatal.is_fatal());
}
