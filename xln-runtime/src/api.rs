// The small set of read-only helpers that round out the runtime's public
// surface alongside `applyRuntimeInput`/`process`/`executeScenario`, even
// though most of their actual logic lives one layer down (`xln-delta`,
// `xln-account`, `xln-jurisdiction`, `xln-base`). Kept here as thin
// call-throughs so a consumer only ever needs one crate.

use xln_base::EntityId;
use xln_delta::{derive_delta, Delta};
use xln_jurisdiction::TokenInfo;

use crate::environment::Environment;

/// `getTokenInfo(env, jurisdiction, tokenId)`.
pub fn get_token_info(env: &Environment, jurisdiction: &xln_base::JurisdictionName, token: xln_base::TokenId) -> Option<TokenInfo> {
    env.xlnomies.get(jurisdiction)?.token_registry.get(&token).cloned()
}

/// `getEntityShortId(entityId)`: re-exported for API-surface
/// completeness; the real implementation is `EntityId::short`.
pub fn get_entity_short_id(entity_id: EntityId) -> String {
    entity_id.short()
}

/// Proportional bar segments for rendering an account's bilateral capacity
///: the seven
/// `deriveDelta` regions reduced to three renderable spans from the
/// caller's own point of view, each a fraction of total capacity in
/// `[0.0, 1.0]`. Returns `None` for a zero-total-capacity account (nothing
/// to render a ratio of).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccountBarVisual {
    pub own_credit_fraction: f64,
    pub collateral_fraction: f64,
    pub peer_credit_fraction: f64,
}

pub fn get_account_bar_visual(delta: &Delta, i_am_left: bool) -> Option<AccountBarVisual> {
    let derived = derive_delta(delta, i_am_left);
    let own = &derived.in_own_credit + &derived.out_own_credit;
    let collateral = &derived.in_collateral + &derived.out_collateral;
    let peer = &derived.in_peer_credit + &derived.out_peer_credit;
    let total = amount_to_f64(&own) + amount_to_f64(&collateral) + amount_to_f64(&peer);
    if total <= 0.0 {
        return None;
    }
    Some(AccountBarVisual {
        own_credit_fraction: amount_to_f64(&own) / total,
        collateral_fraction: amount_to_f64(&collateral) / total,
        peer_credit_fraction: amount_to_f64(&peer) / total,
    })
}

fn amount_to_f64(amount: &xln_base::Amount) -> f64 {
    amount.to_string().parse::<f64>().unwrap_or(0.0)
}
