//! Synthetic placeholder content
//!
//! Substituted for missing artifact content during seeding. Output depends
//! only on the artifact kind, so two seeds of the same world are identical.

use testworld_core::ArtifactKind;

const TEXT_PLACEHOLDER: &str = "# Placeholder Document\n\n\
This document was generated because its fixture file was not found.\n";

const CODE_PLACEHOLDER: &str = "// Placeholder source generated for a missing fixture\n\
export function placeholder(): string {\n  return \"placeholder\";\n}\n";

const SHEET_PLACEHOLDER: &str = "name,value\nalpha,1\nbeta,2\n";

const SITE_PLACEHOLDER: &str = r#"{
  "blocks": [
    {
      "id": "block-hero",
      "type": "hero",
      "content": { "heading": "Placeholder Site", "body": "Generated for a missing fixture." }
    }
  ],
  "metadata": { "title": "Placeholder Site", "placeholder": true }
}
"#;

/// Placeholder content for an artifact kind
#[must_use]
pub fn placeholder_for(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Text | ArtifactKind::Image => TEXT_PLACEHOLDER,
        ArtifactKind::Code => CODE_PLACEHOLDER,
        ArtifactKind::Sheet => SHEET_PLACEHOLDER,
        ArtifactKind::Site => SITE_PLACEHOLDER,
    }
}
