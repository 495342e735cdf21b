//! Deterministic row ids
//!
//! Row ids are derived from the seeding session, the target world, the
//! entity kind, the declared test id and its ordinal, so the engine knows
//! every primary key before writing and never reads ids back.

use testworld_core::{EntityKind, WorldId};
use uuid::Uuid;

const ID_CONTEXT: &str = "testworld seed row id v1";

/// Derives UUID-shaped row ids for one seeding session
#[derive(Debug, Clone)]
pub struct IdGenerator {
    session: i64,
    world: WorldId,
}

impl IdGenerator {
    /// Generator for `world` in the session started at `session` (unix ms)
    #[inline]
    #[must_use]
    pub fn new(session: i64, world: WorldId) -> Self {
        Self { session, world }
    }

    /// Session timestamp
    #[inline]
    #[must_use]
    pub fn session(&self) -> i64 {
        self.session
    }

    /// Id for the `ordinal`-th entity of `kind` declared as `test_id`
    #[must_use]
    pub fn id_for(&self, kind: EntityKind, test_id: &str, ordinal: usize) -> String {
        let mut hasher = blake3::Hasher::new_derive_key(ID_CONTEXT);
        hasher.update(&self.session.to_le_bytes());
        hasher.update(self.world.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(kind.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(test_id.as_bytes());
        hasher.update(&[0]);
        hasher.update(&(ordinal as u64).to_le_bytes());

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
        Uuid::new_v8(bytes).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_inputs_same_id() {
        let a = IdGenerator::new(1_700_000_000_000, WorldId::new("w"));
        let b = IdGenerator::new(1_700_000_000_000, WorldId::new("w"));
        assert_eq!(
            a.id_for(EntityKind::User, "user-alex", 0),
            b.id_for(EntityKind::User, "user-alex", 0)
        );
    }

    #[test]
    fn ids_are_uuid_v8() {
        let id = IdGenerator::new(1, WorldId::new("w")).id_for(EntityKind::Chat, "c", 3);
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 8);
    }

    #[test]
    fn every_input_separates_ids() {
        let base = IdGenerator::new(1, WorldId::new("w"));
        let ids: HashSet<String> = [
            base.id_for(EntityKind::User, "u", 0),
            base.id_for(EntityKind::User, "u", 1),
            base.id_for(EntityKind::User, "v", 0),
            base.id_for(EntityKind::Artifact, "u", 0),
            IdGenerator::new(2, WorldId::new("w")).id_for(EntityKind::User, "u", 0),
            IdGenerator::new(1, WorldId::new("x")).id_for(EntityKind::User, "u", 0),
        ]
        .into_iter()
        .collect();
        assert_eq!(ids.len(), 6);
    }
}
