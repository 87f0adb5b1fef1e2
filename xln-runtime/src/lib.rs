#![allow(dead_code)]

// The top-level tick and scenario executor: the one
// crate that actually owns an `Environment` and is allowed to reach across
// replicas/jurisdictions, since every other crate in the workspace resolves
// ids only through whatever arena its caller passes in — "the one place
// state actually lives".

mod api;
mod environment;
mod scenario;
mod tick;

pub use api::{get_account_bar_visual, get_entity_short_id, get_token_info, AccountBarVisual};
pub use environment::Environment;
pub use scenario::{execute_scenario, parse_scenario, Scenario, ScenarioAction, ScenarioResult, ScenarioSection};
pub use tick::{apply_runtime_input, process, tick};

// Re-exported so a consumer of this crate never needs to reach into a
// lower layer directly for the rest of the public surface.
pub use xln_account::{classify_bilateral_state, BilateralState, Classification};
pub use xln_base::{is_left, sha256 as crypto_hash};
pub use xln_delta::{derive_delta, Delta, Derived};
