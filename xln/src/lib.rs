// The top-level crate: a thin re-export of
// whatever already lives one layer down in `xln-runtime`, so an embedding
// host (a view, a test, the scenario-runner binary in this same crate)
// never needs to know the workspace is split into a dozen members.

pub use xln_account::{classify_bilateral_state, BilateralState, Classification};
pub use xln_admin::{init_tracing, Config};
pub use xln_base::{is_left, sha256 as crypto_hash, Amount, EntityId, JurisdictionName, SignerId, TokenId, XlnError};
pub use xln_delta::{derive_delta, Delta, Derived};
pub use xln_runtime::{
    apply_runtime_input, execute_scenario, get_account_bar_visual, get_entity_short_id, get_token_info, parse_scenario,
    process, tick, AccountBarVisual, Environment, Scenario, ScenarioAction, ScenarioResult, ScenarioSection,
};
