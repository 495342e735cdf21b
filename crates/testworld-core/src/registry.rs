//! World registry
//!
//! Static catalog of [`WorldDefinition`]s plus synchronous structural
//! validation. No I/O happens here; fixture files are checked by the
//! validator crate.

use crate::catalog;
use crate::error::{RegistryError, StructuralError};
use crate::types::{EntityKind, WorldDefinition, WorldId};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Catalog of world definitions, in registration order
#[derive(Debug, Clone, Default)]
pub struct WorldRegistry {
    worlds: IndexMap<WorldId, WorldDefinition>,
}

impl WorldRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the compiled-in catalog
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for def in catalog::builtin_worlds() {
            registry.worlds.insert(def.id.clone(), def);
        }
        registry
    }

    /// Build registry from definitions
    ///
    /// # Errors
    /// - `RegistryError::DuplicateWorld` if two definitions share an id
    pub fn from_definitions(
        defs: impl IntoIterator<Item = WorldDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Register a definition
    ///
    /// Structure is not checked here; call [`WorldRegistry::validate`]
    /// before seeding.
    ///
    /// # Errors
    /// - `RegistryError::DuplicateWorld` if the id is taken
    pub fn register(&mut self, def: WorldDefinition) -> Result<(), RegistryError> {
        if self.worlds.contains_key(&def.id) {
            return Err(RegistryError::DuplicateWorld(def.id));
        }
        self.worlds.insert(def.id.clone(), def);
        Ok(())
    }

    /// Look up definition
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WorldDefinition> {
        self.worlds.get(id)
    }

    /// Look up definition or fail
    ///
    /// # Errors
    /// - `RegistryError::UnknownWorld` if absent
    pub fn require(&self, id: &str) -> Result<&WorldDefinition, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::UnknownWorld(WorldId::new(id)))
    }

    /// Validate world structure
    ///
    /// # Errors
    /// - `RegistryError::UnknownWorld` if absent
    /// - `RegistryError::Structural` carrying every finding
    pub fn validate(&self, id: &str) -> Result<&WorldDefinition, RegistryError> {
        let def = self.require(id)?;
        let errors = check_structure(def);
        if errors.is_empty() {
            Ok(def)
        } else {
            tracing::warn!(world = %def.id, errors = errors.len(), "world failed structural validation");
            Err(RegistryError::Structural {
                world: def.id.clone(),
                errors,
            })
        }
    }

    /// Check whether id is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.worlds.contains_key(id)
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &WorldId> {
        self.worlds.keys()
    }

    /// Registered definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &WorldDefinition> {
        self.worlds.values()
    }

    /// Number of registered worlds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

/// Collect every structural defect of a definition
///
/// Findings are ordered: missing users, duplicate test ids (users,
/// artifacts, chats), then dangling owners (artifacts, chats). An empty
/// result means the world may be seeded.
#[must_use]
pub fn check_structure(def: &WorldDefinition) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    let world = &def.id;

    if def.users.is_empty() {
        errors.push(StructuralError::NoUsers {
            world: world.clone(),
        });
    }

    duplicates(
        world,
        EntityKind::User,
        def.users.iter().map(|u| u.test_id.as_str()),
        &mut errors,
    );
    duplicates(
        world,
        EntityKind::Artifact,
        def.artifacts.iter().map(|a| a.test_id.as_str()),
        &mut errors,
    );
    duplicates(
        world,
        EntityKind::Chat,
        def.chats.iter().map(|c| c.test_id.as_str()),
        &mut errors,
    );

    let owners: HashSet<&str> = def.users.iter().map(|u| u.test_id.as_str()).collect();
    let owned = def
        .artifacts
        .iter()
        .map(|a| (EntityKind::Artifact, &a.test_id, &a.owner_id))
        .chain(
            def.chats
                .iter()
                .map(|c| (EntityKind::Chat, &c.test_id, &c.owner_id)),
        );
    for (entity, test_id, owner_id) in owned {
        if !owners.contains(owner_id.as_str()) {
            errors.push(StructuralError::DanglingOwner {
                world: world.clone(),
                entity,
                test_id: test_id.clone(),
                owner_id: owner_id.clone(),
            });
        }
    }

    errors
}

fn duplicates<'a>(
    world: &WorldId,
    entity: EntityKind,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<StructuralError>,
) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in ids {
        if !seen.insert(id) && reported.insert(id) {
            errors.push(StructuralError::DuplicateTestId {
                world: world.clone(),
                entity,
                test_id: id.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactKind, WorldArtifact, WorldChat, WorldUser};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn one_user_world() -> WorldDefinition {
        WorldDefinition::new("w", "W").with_user(WorldUser::new("u1", "User One"))
    }

    #[test]
    fn valid_world_has_no_errors() {
        let def = one_user_world()
            .with_artifact(WorldArtifact::new("a1", "A", ArtifactKind::Text, "u1"))
            .with_chat(WorldChat::new("c1", "C", "u1"));
        assert!(check_structure(&def).is_empty());
    }

    #[test]
    fn zero_users_is_structural_error() {
        let def = WorldDefinition::new("w", "W");
        assert_eq!(
            check_structure(&def),
            vec![StructuralError::NoUsers {
                world: WorldId::new("w")
            }]
        );
    }

    #[test]
    fn duplicate_user_reported_once() {
        let def = one_user_world()
            .with_user(WorldUser::new("u1", "Again"))
            .with_user(WorldUser::new("u1", "Thrice"));
        let errors = check_structure(&def);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            StructuralError::DuplicateTestId { entity: EntityKind::User, test_id, .. } if test_id == "u1"
        ));
    }

    #[test]
    fn dangling_artifact_owner_names_artifact() {
        let def = one_user_world().with_artifact(WorldArtifact::new(
            "doc-orphan",
            "Orphan",
            ArtifactKind::Text,
            "user-missing",
        ));
        let errors = check_structure(&def);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].test_id(), Some("doc-orphan"));
        assert!(errors[0].to_string().contains("user-missing"));
    }

    #[test]
    fn dangling_chat_owner_detected() {
        let def = one_user_world().with_chat(WorldChat::new("c1", "C", "ghost"));
        assert!(matches!(
            check_structure(&def).as_slice(),
            [StructuralError::DanglingOwner { entity: EntityKind::Chat, .. }]
        ));
    }

    #[test]
    fn register_rejects_duplicate_world() {
        let mut registry = WorldRegistry::new();
        registry.register(one_user_world()).unwrap();
        assert!(matches!(
            registry.register(one_user_world()),
            Err(RegistryError::DuplicateWorld(_))
        ));
    }

    #[test]
    fn validate_unknown_world_fails() {
        let registry = WorldRegistry::new();
        assert!(matches!(
            registry.validate("nope"),
            Err(RegistryError::UnknownWorld(_))
        ));
    }

    #[test]
    fn builtin_catalog_is_structurally_valid() {
        let registry = WorldRegistry::builtin();
        assert!(!registry.is_empty());
        for id in registry.ids() {
            assert!(registry.validate(id.as_str()).is_ok(), "world {id} invalid");
        }
    }

    fn arb_world() -> impl Strategy<Value = WorldDefinition> {
        let users = prop::collection::vec("u[0-4]", 0..5);
        let owners = prop::collection::vec("u[0-6]", 0..6);
        (users, owners).prop_map(|(users, owners)| {
            let mut def = WorldDefinition::new("prop", "Prop");
            for u in users {
                def = def.with_user(WorldUser::new(u.clone(), u));
            }
            for (i, owner) in owners.into_iter().enumerate() {
                def = def.with_artifact(WorldArtifact::new(
                    format!("a{i}"),
                    "A",
                    ArtifactKind::Text,
                    owner,
                ));
            }
            def
        })
    }

    proptest! {
        #[test]
        fn valid_iff_unique_users_and_resolved_owners(def in arb_world()) {
            let ids: Vec<_> = def.users.iter().map(|u| u.test_id.as_str()).collect();
            let unique: HashSet<_> = ids.iter().copied().collect();
            let expected = !ids.is_empty()
                && unique.len() == ids.len()
                && def.artifacts.iter().all(|a| unique.contains(a.owner_id.as_str()));
            prop_assert_eq!(check_structure(&def).is_empty(), expected);
        }
    }
}
