//! World definition types
//!
//! A [`WorldDefinition`] is an immutable catalog entry describing the seed
//! data of one logical world: its users, the artifacts they own, and their
//! chats. Definitions are pure data; seeding and validation live elsewhere.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a world
///
/// Used both for catalog entries and for the world tag persisted on every
/// world-scoped row. `None` in a tag position means production.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(String);

impl WorldId {
    /// Create world id from string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WorldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for WorldId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for WorldId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kinds of world-scoped entities, in seeding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Seeded user
    User,
    /// Authored artifact (document, code, sheet, site)
    Artifact,
    /// Chat session
    Chat,
    /// Chat message
    Message,
    /// Suggestion attached to an artifact (never seeded, only cleaned up)
    Suggestion,
}

impl EntityKind {
    /// Deletion order for cleanup: dependents before the rows they reference
    pub const CLEANUP_ORDER: [EntityKind; 5] = [
        EntityKind::Message,
        EntityKind::Suggestion,
        EntityKind::Artifact,
        EntityKind::Chat,
        EntityKind::User,
    ];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Artifact => "artifact",
            EntityKind::Chat => "chat",
            EntityKind::Message => "message",
            EntityKind::Suggestion => "suggestion",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a seeded user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular author
    #[default]
    User,
    /// Administrator
    Admin,
    /// Read-only guest
    Guest,
}

/// Kind of authored artifact
///
/// Drives placeholder synthesis for missing content and format checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Prose document (markdown)
    #[default]
    Text,
    /// Source code
    Code,
    /// Spreadsheet (CSV)
    Sheet,
    /// Site definition (JSON with blocks and metadata)
    Site,
    /// Image reference
    Image,
}

impl ArtifactKind {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Text => "text",
            ArtifactKind::Code => "code",
            ArtifactKind::Sheet => "sheet",
            ArtifactKind::Site => "site",
            ArtifactKind::Image => "image",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User declared by a world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldUser {
    /// Identifier unique within the world
    pub test_id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Role
    pub role: UserRole,
}

impl WorldUser {
    /// Create user with a derived email address
    #[must_use]
    pub fn new(test_id: impl Into<String>, name: impl Into<String>) -> Self {
        let test_id = test_id.into();
        let email = format!("{test_id}@testworld.local");
        Self {
            test_id,
            name: name.into(),
            email,
            role: UserRole::User,
        }
    }

    /// With role
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    /// With explicit email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }
}

/// Artifact declared by a world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldArtifact {
    /// Identifier unique within the world
    pub test_id: String,
    /// Title
    pub title: String,
    /// Kind
    pub kind: ArtifactKind,
    /// Owning user's test id
    pub owner_id: String,
    /// Content file, relative to the world's fixture directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl WorldArtifact {
    /// Create artifact without content file
    #[must_use]
    pub fn new(
        test_id: impl Into<String>,
        title: impl Into<String>,
        kind: ArtifactKind,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            title: title.into(),
            kind,
            owner_id: owner_id.into(),
            content_path: None,
            tags: Vec::new(),
        }
    }

    /// With content file
    #[inline]
    #[must_use]
    pub fn with_content(mut self, path: impl Into<String>) -> Self {
        self.content_path = Some(path.into());
        self
    }

    /// With tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Chat declared by a world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldChat {
    /// Identifier unique within the world
    pub test_id: String,
    /// Title
    pub title: String,
    /// Owning user's test id
    pub owner_id: String,
    /// Message fixture, relative to the world's fixture directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_path: Option<String>,
}

impl WorldChat {
    /// Create chat without messages
    #[must_use]
    pub fn new(
        test_id: impl Into<String>,
        title: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            title: title.into(),
            owner_id: owner_id.into(),
            messages_path: None,
        }
    }

    /// With message fixture
    #[inline]
    #[must_use]
    pub fn with_messages(mut self, path: impl Into<String>) -> Self {
        self.messages_path = Some(path.into());
        self
    }
}

/// Per-world settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSettings {
    /// Remove the world's rows when its worker is released
    pub auto_cleanup: bool,
    /// Feature flags enabled for requests in this world
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            auto_cleanup: true,
            feature_flags: BTreeMap::new(),
        }
    }
}

/// Immutable catalog entry describing one world's seed data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDefinition {
    /// World id; also the fixture directory name
    pub id: WorldId,
    /// Human-readable name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Declared users
    #[serde(default)]
    pub users: Vec<WorldUser>,
    /// Declared artifacts
    #[serde(default)]
    pub artifacts: Vec<WorldArtifact>,
    /// Declared chats
    #[serde(default)]
    pub chats: Vec<WorldChat>,
    /// Other worlds this one builds on
    #[serde(default)]
    pub dependencies: Vec<WorldId>,
    /// Settings
    #[serde(default)]
    pub settings: WorldSettings,
}

impl WorldDefinition {
    /// Create empty definition
    #[must_use]
    pub fn new(id: impl Into<WorldId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            users: Vec::new(),
            artifacts: Vec::new(),
            chats: Vec::new(),
            dependencies: Vec::new(),
            settings: WorldSettings::default(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With user
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user: WorldUser) -> Self {
        self.users.push(user);
        self
    }

    /// With artifact
    #[inline]
    #[must_use]
    pub fn with_artifact(mut self, artifact: WorldArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// With chat
    #[inline]
    #[must_use]
    pub fn with_chat(mut self, chat: WorldChat) -> Self {
        self.chats.push(chat);
        self
    }

    /// With dependency on another world
    #[inline]
    #[must_use]
    pub fn with_dependency(mut self, world: impl Into<WorldId>) -> Self {
        self.dependencies.push(world.into());
        self
    }

    /// With feature flag
    #[inline]
    #[must_use]
    pub fn with_feature(mut self, flag: impl Into<String>, enabled: bool) -> Self {
        self.settings.feature_flags.insert(flag.into(), enabled);
        self
    }

    /// Keep rows after release
    #[inline]
    #[must_use]
    pub fn without_auto_cleanup(mut self) -> Self {
        self.settings.auto_cleanup = false;
        self
    }

    /// Find user by test id
    #[must_use]
    pub fn user(&self, test_id: &str) -> Option<&WorldUser> {
        self.users.iter().find(|u| u.test_id == test_id)
    }

    /// Whether any declared user is an administrator
    #[must_use]
    pub fn has_admin(&self) -> bool {
        self.users.iter().any(|u| u.role == UserRole::Admin)
    }

    /// All fixture paths referenced by this world, artifacts first
    pub fn fixture_paths(&self) -> impl Iterator<Item = &str> {
        self.artifacts
            .iter()
            .filter_map(|a| a.content_path.as_deref())
            .chain(self.chats.iter().filter_map(|c| c.messages_path.as_deref()))
    }
}
