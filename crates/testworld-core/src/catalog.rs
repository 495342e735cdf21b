//! Compiled-in world catalog
//!
//! Fixture paths are relative to `{fixtures_root}/{world_id}/`.

use crate::types::{
    ArtifactKind, UserRole, WorldArtifact, WorldChat, WorldDefinition, WorldUser,
};

/// Single author, two documents, no chats
pub const SOLO_WRITER: &str = "solo-writer";
/// Two authors with code, sheets and chat history
pub const CONTENT_CREATOR: &str = "content-creator";
/// Administrator plus a member account
pub const ADMIN_CONSOLE: &str = "admin-console";
/// Site authoring with legacy-shaped chat history
pub const SITE_BUILDER: &str = "site-builder";
/// Multi-user collaboration building on other worlds
pub const TEAM_COLLAB: &str = "team-collab";

pub(crate) fn builtin_worlds() -> Vec<WorldDefinition> {
    vec![
        solo_writer(),
        content_creator(),
        admin_console(),
        site_builder(),
        team_collab(),
    ]
}

fn solo_writer() -> WorldDefinition {
    WorldDefinition::new(SOLO_WRITER, "Solo Writer")
        .with_description("One author with a welcome document and an empty draft")
        .with_user(WorldUser::new("user-alex", "Alex Rivera"))
        .with_artifact(
            WorldArtifact::new("doc-welcome", "Welcome", ArtifactKind::Text, "user-alex")
                .with_content("artifacts/welcome.md")
                .with_tag("onboarding"),
        )
        .with_artifact(WorldArtifact::new(
            "doc-draft",
            "Untitled Draft",
            ArtifactKind::Text,
            "user-alex",
        ))
}

fn content_creator() -> WorldDefinition {
    WorldDefinition::new(CONTENT_CREATOR, "Content Creator")
        .with_description("Two authors sharing code, a budget sheet and an outlining chat")
        .with_user(WorldUser::new("user-casey", "Casey Morgan"))
        .with_user(WorldUser::new("user-jordan", "Jordan Lee"))
        .with_artifact(
            WorldArtifact::new("code-snippet", "Greeting Helper", ArtifactKind::Code, "user-casey")
                .with_content("artifacts/greeting.ts"),
        )
        .with_artifact(
            WorldArtifact::new("sheet-budget", "Q3 Budget", ArtifactKind::Sheet, "user-jordan")
                .with_content("artifacts/budget.csv")
                .with_tag("finance"),
        )
        .with_artifact(
            WorldArtifact::new("doc-outline", "Launch Outline", ArtifactKind::Text, "user-casey")
                .with_content("artifacts/outline.md"),
        )
        .with_chat(
            WorldChat::new("chat-outline", "Outline the launch post", "user-casey")
                .with_messages("chats/outline.json"),
        )
        .with_chat(WorldChat::new("chat-blank", "New chat", "user-jordan"))
}

fn admin_console() -> WorldDefinition {
    WorldDefinition::new(ADMIN_CONSOLE, "Admin Console")
        .with_description("Administrator reviewing a member's work")
        .with_user(WorldUser::new("user-admin", "Avery Admin").with_role(UserRole::Admin))
        .with_user(WorldUser::new("user-member", "Morgan Member"))
        .with_artifact(
            WorldArtifact::new("doc-policy", "Content Policy", ArtifactKind::Text, "user-admin")
                .with_content("artifacts/policy.md"),
        )
        .with_artifact(WorldArtifact::new(
            "doc-member-draft",
            "Member Draft",
            ArtifactKind::Text,
            "user-member",
        ))
        .with_chat(
            WorldChat::new("chat-review", "Review member draft", "user-admin")
                .with_messages("chats/review.json"),
        )
        .with_dependency(SOLO_WRITER)
        .with_feature("admin-panel", true)
}

fn site_builder() -> WorldDefinition {
    WorldDefinition::new(SITE_BUILDER, "Site Builder")
        .with_description("Author building an onboarding site with AI assistance")
        .with_user(WorldUser::new("user-alex", "Alex Rivera"))
        .with_artifact(
            WorldArtifact::new("site-onboarding", "Onboarding Site", ArtifactKind::Site, "user-alex")
                .with_content("sites/onboarding.json")
                .with_tag("site"),
        )
        .with_artifact(WorldArtifact::new(
            "site-landing",
            "Landing Page",
            ArtifactKind::Site,
            "user-alex",
        ))
        .with_chat(
            WorldChat::new("chat-site", "Create onboarding site for Alex", "user-alex")
                .with_messages("chats/site-session.json"),
        )
        .with_feature("site-editor", true)
}

fn team_collab() -> WorldDefinition {
    WorldDefinition::new(TEAM_COLLAB, "Team Collaboration")
        .with_description("Three collaborators sharing documents and a site")
        .with_user(WorldUser::new("user-lead", "Riley Lead").with_role(UserRole::Admin))
        .with_user(WorldUser::new("user-writer", "Sam Writer"))
        .with_user(WorldUser::new("user-viewer", "Quinn Viewer").with_role(UserRole::Guest))
        .with_artifact(
            WorldArtifact::new("doc-brief", "Project Brief", ArtifactKind::Text, "user-lead")
                .with_content("artifacts/brief.md"),
        )
        .with_artifact(
            WorldArtifact::new("sheet-tasks", "Task Tracker", ArtifactKind::Sheet, "user-writer")
                .with_content("artifacts/tasks.csv"),
        )
        .with_artifact(
            WorldArtifact::new("site-team", "Team Site", ArtifactKind::Site, "user-writer")
                .with_content("sites/team.json"),
        )
        .with_chat(
            WorldChat::new("chat-standup", "Standup notes", "user-writer")
                .with_messages("chats/standup.json"),
        )
        .with_dependency(CONTENT_CREATOR)
        .with_dependency(SITE_BUILDER)
        .with_feature("collaboration", true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_writer_matches_single_user_shape() {
        let def = solo_writer();
        assert_eq!(def.users.len(), 1);
        assert_eq!(def.artifacts.len(), 2);
        assert!(def.chats.is_empty());
    }

    #[test]
    fn dependencies_point_into_catalog() {
        let ids: Vec<_> = builtin_worlds().into_iter().map(|w| w.id).collect();
        for def in builtin_worlds() {
            for dep in &def.dependencies {
                assert!(ids.contains(dep), "{} depends on unknown {dep}", def.id);
            }
        }
    }
}
