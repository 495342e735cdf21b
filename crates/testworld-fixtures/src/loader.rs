//! Fixture content loader
//!
//! Resolves `{root}/{world_id}/{relative_path}` and reads it. Two read
//! flavours exist:
//!
//! - [`FixtureLoader::load`] is strict and reports missing files; the
//!   validator uses it.
//! - [`FixtureLoader::load_or_placeholder`] substitutes deterministic
//!   placeholder content; the seed engine uses it.
//!
//! The loader also works standalone on paths relative to its root
//! ([`FixtureLoader::read_text`], [`FixtureLoader::write_text`]), which is
//! how AI fixtures are stored.

use crate::error::FixtureError;
use crate::placeholder::placeholder_for;
use std::path::{Component, Path, PathBuf};
use testworld_core::ArtifactKind;

/// Where loaded content came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Read from the fixture file
    File(PathBuf),
    /// Synthesized because no usable file exists
    Placeholder {
        /// Why the file was not used
        reason: String,
    },
}

/// Content resolved for seeding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedContent {
    /// UTF-8 content
    pub text: String,
    /// Origin
    pub source: ContentSource,
}

impl LoadedContent {
    /// Whether placeholder content was substituted
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, ContentSource::Placeholder { .. })
    }
}

/// Reads fixture files under a root directory
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    root: PathBuf,
}

impl FixtureLoader {
    /// Create loader rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Fixture root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a world-relative fixture path
    ///
    /// # Errors
    /// - `FixtureError::InvalidPath` if either segment is absolute or
    ///   contains `..`
    pub fn resolve(&self, world: &str, relative: &str) -> Result<PathBuf, FixtureError> {
        let world = checked_relative(world)?;
        let relative = checked_relative(relative)?;
        Ok(self.root.join(world).join(relative))
    }

    /// Resolve a path relative to the root itself
    ///
    /// # Errors
    /// - `FixtureError::InvalidPath` on absolute or escaping paths
    pub fn resolve_relative(&self, relative: &str) -> Result<PathBuf, FixtureError> {
        Ok(self.root.join(checked_relative(relative)?))
    }

    /// Read fixture bytes, failing on a missing file
    ///
    /// # Errors
    /// - `FixtureError::Missing` if the file does not exist
    /// - `FixtureError::Io` on other read failures
    pub async fn load(&self, world: &str, relative: &str) -> Result<Vec<u8>, FixtureError> {
        let path = self.resolve(world, relative)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| FixtureError::from_io(path, e))
    }

    /// Size of a fixture file in bytes
    ///
    /// # Errors
    /// - `FixtureError::Missing` / `FixtureError::Io` as for [`Self::load`]
    pub async fn size(&self, world: &str, relative: &str) -> Result<u64, FixtureError> {
        let path = self.resolve(world, relative)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FixtureError::from_io(path, e))?;
        Ok(meta.len())
    }

    /// Read artifact content, substituting a placeholder when unusable
    ///
    /// A `None` path, a missing file, an unreadable file or non-UTF-8 bytes
    /// all yield the placeholder for `kind`.
    ///
    /// # Errors
    /// - `FixtureError::InvalidPath` only; read failures never error
    pub async fn load_or_placeholder(
        &self,
        world: &str,
        relative: Option<&str>,
        kind: ArtifactKind,
    ) -> Result<LoadedContent, FixtureError> {
        let Some(relative) = relative else {
            return Ok(placeholder(kind, "no content path declared"));
        };

        match self.load(world, relative).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Ok(LoadedContent {
                    text,
                    source: ContentSource::File(self.resolve(world, relative)?),
                }),
                Err(_) => {
                    tracing::warn!(world, path = relative, "fixture is not UTF-8, using placeholder");
                    Ok(placeholder(kind, "fixture is not valid UTF-8"))
                }
            },
            Err(FixtureError::InvalidPath(p)) => Err(FixtureError::InvalidPath(p)),
            Err(e) => {
                tracing::warn!(world, path = relative, error = %e, "fixture unavailable, using placeholder");
                Ok(placeholder(kind, e.to_string()))
            }
        }
    }

    /// Read a root-relative UTF-8 file, `None` if it does not exist
    ///
    /// # Errors
    /// - `FixtureError::InvalidPath` on escaping paths
    /// - `FixtureError::Io` on read failures other than not-found
    pub async fn read_text(&self, relative: &str) -> Result<Option<String>, FixtureError> {
        let path = self.resolve_relative(relative)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FixtureError::Io { path, source: e }),
        }
    }

    /// Write a root-relative UTF-8 file, creating parent directories
    ///
    /// The file is written to a sibling temporary name and renamed into
    /// place so readers never observe a partial fixture.
    ///
    /// # Errors
    /// - `FixtureError::InvalidPath` on escaping paths
    /// - `FixtureError::Io` on write failures
    pub async fn write_text(&self, relative: &str, text: &str) -> Result<PathBuf, FixtureError> {
        let path = self.resolve_relative(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FixtureError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| FixtureError::Io {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| FixtureError::Io {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }
}

fn placeholder(kind: ArtifactKind, reason: impl Into<String>) -> LoadedContent {
    LoadedContent {
        text: placeholder_for(kind).to_string(),
        source: ContentSource::Placeholder {
            reason: reason.into(),
        },
    }
}

fn checked_relative(segment: &str) -> Result<&Path, FixtureError> {
    let path = Path::new(segment);
    let valid = !segment.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(path)
    } else {
        Err(FixtureError::InvalidPath(segment.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loader_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FixtureLoader) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let loader = FixtureLoader::new(dir.path());
        (dir, loader)
    }

    #[test]
    fn resolve_rejects_escapes() {
        let loader = FixtureLoader::new("/fixtures");
        assert!(loader.resolve("w", "../secret").is_err());
        assert!(loader.resolve("w", "/etc/passwd").is_err());
        assert!(loader.resolve("..", "a.md").is_err());
        assert!(loader.resolve("w", "").is_err());
        assert_eq!(
            loader.resolve("w", "artifacts/a.md").unwrap(),
            PathBuf::from("/fixtures/w/artifacts/a.md")
        );
    }

    #[tokio::test]
    async fn load_reads_world_file() {
        let (_dir, loader) = loader_with(&[("w/a.md", "hello")]);
        assert_eq!(loader.load("w", "a.md").await.unwrap(), b"hello");
        assert_eq!(loader.size("w", "a.md").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn load_reports_missing() {
        let (_dir, loader) = loader_with(&[]);
        let err = loader.load("w", "nope.md").await.unwrap_err();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn placeholder_substituted_for_missing_file() {
        let (_dir, loader) = loader_with(&[]);
        let content = loader
            .load_or_placeholder("w", Some("gone.csv"), ArtifactKind::Sheet)
            .await
            .unwrap();
        assert!(content.is_placeholder());
        assert_eq!(content.text, placeholder_for(ArtifactKind::Sheet));
    }

    #[tokio::test]
    async fn placeholder_substituted_without_path() {
        let (_dir, loader) = loader_with(&[]);
        let content = loader
            .load_or_placeholder("w", None, ArtifactKind::Code)
            .await
            .unwrap();
        assert!(content.is_placeholder());
    }

    #[tokio::test]
    async fn existing_file_is_not_placeholder() {
        let (_dir, loader) = loader_with(&[("w/a.md", "# A")]);
        let content = loader
            .load_or_placeholder("w", Some("a.md"), ArtifactKind::Text)
            .await
            .unwrap();
        assert!(!content.is_placeholder());
        assert_eq!(content.text, "# A");
    }

    #[tokio::test]
    async fn write_then_read_text() {
        let (_dir, loader) = loader_with(&[]);
        assert_eq!(loader.read_text("ai/general/x.json").await.unwrap(), None);
        loader.write_text("ai/general/x.json", "{}").await.unwrap();
        assert_eq!(
            loader.read_text("ai/general/x.json").await.unwrap().as_deref(),
            Some("{}")
        );
    }
}
