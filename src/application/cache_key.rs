use std::path::{Path, PathBuf};

use rand::Rng;
use uuid::Uuid;

use crate::domain::value_objects::{IsolationKey, ViewRef};

/// Resolved on-disk location of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    dir: PathBuf,
    file_name: String,
}

impl ArtifactLocation {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Fresh sibling path for an in-flight export: `.{file_name}.{uuid}.tmp`.
    /// Same directory as the artifact so the final rename stays atomic.
    pub fn temp_path(&self) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.tmp", self.file_name, Uuid::new_v4().simple()))
    }
}

/// Maps requests to artifact paths under the cache root.
///
/// Layouts:
/// - cached: `{root}/{isolation_key}/{database}/{schema}/{view}.csv`
/// - one-shot: `{root}/{database}/{schema}/{view}_{random_hex}.csv`
#[derive(Debug, Clone)]
pub struct CacheKeyResolver {
    root: PathBuf,
}

impl CacheKeyResolver {
    /// Length in bytes of the random suffix of one-shot artifacts.
    const SUFFIX_BYTES: usize = 16;

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location shared by every request with the same key and view.
    pub fn resolve(&self, key: &IsolationKey, view: &ViewRef) -> ArtifactLocation {
        ArtifactLocation {
            dir: self
                .root
                .join(key.as_hex())
                .join(view.database().as_str())
                .join(view.schema().as_str()),
            file_name: view.file_name(),
        }
    }

    /// Location unique to a single request.
    pub fn resolve_unique(&self, view: &ViewRef) -> ArtifactLocation {
        let mut suffix = [0u8; Self::SUFFIX_BYTES];
        rand::rng().fill(&mut suffix[..]);

        ArtifactLocation {
            dir: self
                .root
                .join(view.database().as_str())
                .join(view.schema().as_str()),
            file_name: format!("{}_{}.csv", view.view(), hex::encode(suffix)),
        }
    }
}
