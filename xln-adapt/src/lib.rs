#![allow(dead_code)]

// `EvmBackend` capability: the core's
// per-tick function takes this as a parameter rather than reaching for a
// hidden singleton (the source's `window.__xlnBrowserVM`). Grounded on
// `submerge-adapt`'s stated responsibility, "external system and format
// interop, adaptors" — this crate's whole job is adapting a jurisdiction's
// `evmType` into something `xln-runtime` can call without knowing whether
// it's an in-process simulator or a real RPC-backed chain.

use xln_base::XlnError;
use xln_jurisdiction::{EvmType, Jurisdiction, JurisdictionEvent};

/// Advances a jurisdiction by one block. The in-process `BrowserVm`
/// backend does this synchronously and purely (`Jurisdiction::advance`
/// already is one); a real RPC-backed chain cannot be, which is why this
/// trait's contract is synchronous only for backends that can honor it —
/// the RPC case must surface its own async boundary *outside* this call,
/// not fake synchrony by blocking here.
pub trait EvmBackend {
    fn advance(&mut self, jurisdiction: &mut Jurisdiction, now_ms: u64) -> Result<Vec<JurisdictionEvent>, XlnError>;
}

/// The default in-process simulator (spec `evmType: "browservm"`): just
/// delegates straight to `Jurisdiction::advance`, since there's no real
/// chain underneath it to adapt.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserVm;

impl EvmBackend for BrowserVm {
    fn advance(&mut self, jurisdiction: &mut Jurisdiction, now_ms: u64) -> Result<Vec<JurisdictionEvent>, XlnError> {
        jurisdiction.advance(now_ms)
    }
}

/// Stands in for `reth`/`erigon`/`monad`: every call fails clearly rather
/// than silently behaving like `BrowserVm`. A real implementation needs an
/// async RPC client wired in by the embedding host; this crate
/// does not invent one.
#[derive(Clone, Copy, Debug)]
pub struct UnsupportedRpcBackend {
    pub evm_type: EvmType,
}

impl EvmBackend for UnsupportedRpcBackend {
    fn advance(&mut self, _jurisdiction: &mut Jurisdiction, _now_ms: u64) -> Result<Vec<JurisdictionEvent>, XlnError> {
        tracing::warn!(evm_type = ?self.evm_type, "no in-process EvmBackend for this evmType");
        Err(XlnError::BackendUnavailable {
            evm_type: evm_type_name(self.evm_type),
            reason: "requires an async RPC boundary outside the core",
        })
    }
}

fn evm_type_name(evm_type: EvmType) -> &'static str {
    match evm_type {
        EvmType::BrowserVm => "browservm",
        EvmType::Reth => "reth",
        EvmType::Erigon => "erigon",
        EvmType::Monad => "monad",
    }
}

/// The `EvmType -> EvmBackend` binding table: in this workspace there is
/// exactly one real backend (`BrowserVm`), so the table degenerates to
/// this one dispatch function; `xln-admin::Config` calls through here
/// rather than re-declaring it.
pub fn backend_for(evm_type: EvmType) -> Box<dyn EvmBackend> {
    match evm_type {
        EvmType::BrowserVm => Box::new(BrowserVm),
        other => Box::new(UnsupportedRpcBackend { evm_type: other }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use xln_base::{EntityId, JurisdictionName, TokenId};

    #[test]
    fn browser_vm_advances_in_process() {
        let mut j = Jurisdiction::new(JurisdictionName::from("j1"), EvmType::BrowserVm, 0);
        j.enqueue(xln_jurisdiction::JTx::ReserveUpdate {
            entity: EntityId::numbered(1),
            token: TokenId(0),
            amount: xln_base::Amount::from(10i64),
            name: None,
            symbol: None,
            decimals: None,
        });
        let mut backend = backend_for(EvmType::BrowserVm);
        let events = backend.advance(&mut j, 0).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn unsupported_backend_fails_clearly_instead_of_pretending_to_advance() {
        let mut j = Jurisdiction::new(JurisdictionName::from("j1"), EvmType::Reth, 0);
        j.enqueue(xln_jurisdiction::JTx::ReserveUpdate {
            entity: EntityId::numbered(1),
            token: TokenId(0),
            amount: xln_base::Amount::from(10i64),
            name: None,
            symbol: None,
            decimals: None,
        });
        let mut backend = backend_for(EvmType::Reth);
        let err = backend.advance(&mut j, 0).unwrap_err();
        assert!(matches!(err, XlnError::BackendUnavailable { .. }));
        assert_eq!(j.block_number, 0); // the in-memory jurisdiction never advanced.
    }
}
