use serde::Deserialize;
use utoipa::IntoParams;

use crate::application::lifecycle::ServeGuard;
use crate::application::ports::ArtifactReader;

/// Inbound snapshot request as parsed by the HTTP layer.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub database: String,
    pub schema: String,
    pub view: String,
    pub credential: Option<String>,
}

/// Query string of the snapshot route.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SnapshotQuery {
    /// MotherDuck access token; omitted means the service's default database.
    pub motherduck_token: Option<String>,
}

/// Whether the artifact was reused or regenerated for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// An artifact opened and ready to stream.
pub struct ServedArtifact {
    pub reader: ArtifactReader,
    pub size_bytes: u64,
    pub file_name: String,
    pub content_type: &'static str,
    pub cache_status: CacheStatus,
    /// Deletes the artifact when dropped (one-shot policy only).
    pub cleanup: Option<ServeGuard>,
}

impl std::fmt::Debug for ServedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServedArtifact")
            .field("size_bytes", &self.size_bytes)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("cache_status", &self.cache_status)
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}
