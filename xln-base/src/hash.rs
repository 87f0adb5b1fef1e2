use sha2::{Digest, Sha256};

/// The one hashing primitive exposed by the core (§6 `cryptoHash`).
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
