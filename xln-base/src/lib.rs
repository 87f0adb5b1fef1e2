mod amount;
mod error;
mod hash;
mod ids;

pub use amount::Amount;
pub use error::{err, Error, Result, XlnError};
pub use hash::sha256;
pub use ids::{is_left, ChannelKey, EntityId, JurisdictionName, SignerId, TokenId};
