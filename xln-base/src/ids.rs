use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::sha256;

/// A 32-byte entity identifier, rendered canonically as `0x` + 64 hex
/// digits. Numbered ids are a jurisdiction-allocated index left-padded to
/// 32 bytes; lazy ids are `sha256(jurisdiction || name || nonce)`. Both
/// forms are indistinguishable at the type level, as spec'd.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub [u8; 32]);

impl EntityId {
    pub fn numbered(index: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&index.to_be_bytes());
        EntityId(bytes)
    }

    pub fn lazy(jurisdiction: &JurisdictionName, name: &str, nonce: u64) -> Self {
        let mut preimage = Vec::with_capacity(jurisdiction.0.len() + name.len() + 8);
        preimage.extend_from_slice(jurisdiction.0.as_bytes());
        preimage.extend_from_slice(name.as_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        EntityId(sha256(&preimage))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical short form used only for UI/log rendering: first and last
    /// four hex digits, e.g. `0x0000…01ab`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}

/// The single source of truth for bilateral left/right asymmetry:
/// lexicographic order over the 32-byte id. `isLeft(a, b) == !isLeft(b, a)`
/// for any distinct a, b (§8 invariant 4); ids must differ — callers never
/// ask this of an entity and itself.
pub fn is_left(a: &EntityId, b: &EntityId) -> bool {
    debug_assert_ne!(a, b, "is_left called on identical entity ids");
    a.0 < b.0
}

/// An opaque printable string naming a validator within one entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignerId(pub String);

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unsigned token identifier; `0` is the native unit of a jurisdiction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque printable jurisdiction name, used as the key into
/// `Environment::xlnomies`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JurisdictionName(pub String);

impl fmt::Display for JurisdictionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JurisdictionName {
    fn from(s: &str) -> Self {
        JurisdictionName(s.to_owned())
    }
}

/// `leftEntityId ∥ "-" ∥ rightEntityId`, left < right. Keys
/// `Jurisdiction::collaterals`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    pub left: EntityId,
    pub right: EntityId,
}

impl ChannelKey {
    /// Orders `a`/`b` into left/right regardless of call-site order.
    pub fn new(a: EntityId, b: EntityId) -> Self {
        if is_left(&a, &b) {
            ChannelKey { left: a, right: b }
        } else {
            ChannelKey { left: b, right: a }
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.left, self.right)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numbered_ids_are_left_padded() {
        let id = EntityId::numbered(1);
        assert_eq!(id.0[31], 1);
        assert!(id.0[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn lazy_ids_are_deterministic() {
        let j = JurisdictionName::from("j1");
        let a = EntityId::lazy(&j, "alice", 0);
        let b = EntityId::lazy(&j, "alice", 0);
        let c = EntityId::lazy(&j, "alice", 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn is_left_is_antisymmetric() {
        let a = EntityId::numbered(1);
        let b = EntityId::numbered(2);
        assert_ne!(is_left(&a, &b), is_left(&b, &a));
    }

    #[test]
    fn channel_key_orders_left_right() {
        let a = EntityId::numbered(5);
        let b = EntityId::numbered(2);
        let k1 = ChannelKey::new(a, b);
        let k2 = ChannelKey::new(b, a);
        assert_eq!(k1, k2);
        assert_eq!(k1.left, b);
        assert_eq!(k1.right, a);
    }

    #[test]
    fn display_renders_0x_prefixed_hex() {
        let id = EntityId::numbered(1);
        let s = format!("{id}");
        assert_eq!(s.len(), 66);
        assert!(s.starts_with("0x"));
    }
}
