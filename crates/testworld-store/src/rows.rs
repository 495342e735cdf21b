//! Persisted world-scoped rows
//!
//! Every row carries a nullable world tag (`None` = production) and its
//! foreign keys. [`Row`] ties each row type to its [`EntityKind`] and to the
//! [`RowBatch`] variant used for bulk writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use testworld_core::{ArtifactKind, EntityKind, UserRole, WorldId};

/// Access to a row's world tag
pub trait WorldScoped {
    /// Primary key
    fn id(&self) -> &str;
    /// World tag, `None` for production
    fn world_id(&self) -> Option<&WorldId>;
    /// Replace world tag
    fn set_world_id(&mut self, world: Option<WorldId>);
}

/// A row type stored in one table
pub trait Row: WorldScoped + Clone + Send + Sync + 'static {
    /// Table this row lives in
    const KIND: EntityKind;

    /// Wrap rows for a bulk write
    fn into_batch(rows: Vec<Self>) -> RowBatch;

    /// Unwrap rows from a batch of the matching kind
    fn from_batch(batch: RowBatch) -> Option<Vec<Self>>;
}

/// Seeded or production user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub world_id: Option<WorldId>,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Create untagged user row
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            world_id: None,
            name: name.into(),
            email: email.into(),
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }
}

/// Authored artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub id: String,
    pub world_id: Option<WorldId>,
    pub owner_id: String,
    pub title: String,
    pub kind: ArtifactKind,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRow {
    /// Create untagged artifact row
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        kind: ArtifactKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            world_id: None,
            owner_id: owner_id.into(),
            title: title.into(),
            kind,
            content: content.into(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Chat session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRow {
    pub id: String,
    pub world_id: Option<WorldId>,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl ChatRow {
    /// Create untagged chat row
    #[must_use]
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            world_id: None,
            owner_id: owner_id.into(),
            title: title.into(),
            created_at: Utc::now(),
        }
    }
}

/// One part of a chat message in the current parts-based shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Plain text
    Text { text: String },
    /// Tool call and (optionally) its result
    ToolInvocation {
        #[serde(rename = "toolInvocation")]
        tool_invocation: Value,
    },
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub world_id: Option<WorldId>,
    pub chat_id: String,
    pub role: String,
    pub parts: Vec<MessagePart>,
    pub ordinal: u32,
    pub created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Create untagged message row
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        role: impl Into<String>,
        parts: Vec<MessagePart>,
        ordinal: u32,
    ) -> Self {
        Self {
            id: id.into(),
            world_id: None,
            chat_id: chat_id.into(),
            role: role.into(),
            parts,
            ordinal,
            created_at: Utc::now(),
        }
    }
}

/// Edit suggestion attached to an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRow {
    pub id: String,
    pub world_id: Option<WorldId>,
    pub artifact_id: String,
    pub original_text: String,
    pub suggested_text: String,
    pub created_at: DateTime<Utc>,
}

impl SuggestionRow {
    /// Create untagged suggestion row
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        artifact_id: impl Into<String>,
        original_text: impl Into<String>,
        suggested_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            world_id: None,
            artifact_id: artifact_id.into(),
            original_text: original_text.into(),
            suggested_text: suggested_text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Rows of one kind for a bulk write or a select result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowBatch {
    Users(Vec<UserRow>),
    Artifacts(Vec<ArtifactRow>),
    Chats(Vec<ChatRow>),
    Messages(Vec<MessageRow>),
    Suggestions(Vec<SuggestionRow>),
}

impl RowBatch {
    /// Empty batch of a kind
    #[must_use]
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::User => Self::Users(Vec::new()),
            EntityKind::Artifact => Self::Artifacts(Vec::new()),
            EntityKind::Chat => Self::Chats(Vec::new()),
            EntityKind::Message => Self::Messages(Vec::new()),
            EntityKind::Suggestion => Self::Suggestions(Vec::new()),
        }
    }

    /// Table the batch belongs to
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Users(_) => EntityKind::User,
            Self::Artifacts(_) => EntityKind::Artifact,
            Self::Chats(_) => EntityKind::Chat,
            Self::Messages(_) => EntityKind::Message,
            Self::Suggestions(_) => EntityKind::Suggestion,
        }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Users(rows) => rows.len(),
            Self::Artifacts(rows) => rows.len(),
            Self::Chats(rows) => rows.len(),
            Self::Messages(rows) => rows.len(),
            Self::Suggestions(rows) => rows.len(),
        }
    }

    /// Whether the batch is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Primary keys with world tags, in batch order
    #[must_use]
    pub fn keys(&self) -> Vec<(&str, Option<&WorldId>)> {
        fn keys_of<R: WorldScoped>(rows: &[R]) -> Vec<(&str, Option<&WorldId>)> {
            rows.iter().map(|r| (r.id(), r.world_id())).collect()
        }
        match self {
            Self::Users(rows) => keys_of(rows),
            Self::Artifacts(rows) => keys_of(rows),
            Self::Chats(rows) => keys_of(rows),
            Self::Messages(rows) => keys_of(rows),
            Self::Suggestions(rows) => keys_of(rows),
        }
    }

    /// Primary keys in batch order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.keys().into_iter().map(|(id, _)| id.to_string()).collect()
    }
}

macro_rules! impl_row {
    ($row:ty, $kind:expr, $variant:ident) => {
        impl WorldScoped for $row {
            #[inline]
            fn id(&self) -> &str {
                &self.id
            }

            #[inline]
            fn world_id(&self) -> Option<&WorldId> {
                self.world_id.as_ref()
            }

            #[inline]
            fn set_world_id(&mut self, world: Option<WorldId>) {
                self.world_id = world;
            }
        }

        impl Row for $row {
            const KIND: EntityKind = $kind;

            fn into_batch(rows: Vec<Self>) -> RowBatch {
                RowBatch::$variant(rows)
            }

            fn from_batch(batch: RowBatch) -> Option<Vec<Self>> {
                match batch {
                    RowBatch::$variant(rows) => Some(rows),
                    _ => None,
                }
            }
        }
    };
}

impl_row!(UserRow, EntityKind::User, Users);
impl_row!(ArtifactRow, EntityKind::Artifact, Artifacts);
impl_row!(ChatRow, EntityKind::Chat, Chats);
impl_row!(MessageRow, EntityKind::Message, Messages);
impl_row!(SuggestionRow, EntityKind::Suggestion, Suggestions);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_roundtrips_through_row_trait() {
        let rows = vec![ChatRow::new("c1", "u1", "A"), ChatRow::new("c2", "u1", "B")];
        let batch = ChatRow::into_batch(rows.clone());
        assert_eq!(batch.kind(), EntityKind::Chat);
        assert_eq!(batch.ids(), vec!["c1".to_string(), "c2".to_string()]);
        assert_eq!(ChatRow::from_batch(batch.clone()), Some(rows));
        assert_eq!(UserRow::from_batch(batch), None);
    }

    #[test]
    fn message_part_wire_shape() {
        let parts = vec![
            MessagePart::Text {
                text: "hi".to_string(),
            },
            MessagePart::ToolInvocation {
                tool_invocation: json!({"toolName": "createDocument"}),
            },
        ];
        let value = serde_json::to_value(&parts).unwrap();
        assert_eq!(value[0], json!({"type": "text", "text": "hi"}));
        assert_eq!(value[1]["type"], "tool-invocation");
        assert_eq!(value[1]["toolInvocation"]["toolName"], "createDocument");
    }

    #[test]
    fn empty_batch_has_kind() {
        for kind in EntityKind::CLEANUP_ORDER {
            let batch = RowBatch::empty(kind);
            assert_eq!(batch.kind(), kind);
            assert!(batch.is_empty());
        }
    }
}
