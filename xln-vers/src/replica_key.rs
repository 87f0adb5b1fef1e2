// `eReplicas: mapping("entityId:signerId" -> EntityReplica)`,
// realised as a struct key rather than a literal formatted string so
// lookups don't allocate — `Display` still renders the
// `entityId:signerId` form for logging.

use std::fmt;

use serde::{Deserialize, Serialize};
use xln_base::{EntityId, SignerId};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaKey {
    pub entity: EntityId,
    pub signer: SignerId,
}

impl ReplicaKey {
    pub fn new(entity: EntityId, signer: SignerId) -> Self {
        ReplicaKey { entity, signer }
    }
}

impl fmt::Display for ReplicaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.signer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_matches_entity_colon_signer() {
        let key = ReplicaKey::new(EntityId::numbered(1), SignerId("s1".to_string()));
        assert!(key.to_string().ends_with(":s1"));
    }
}
