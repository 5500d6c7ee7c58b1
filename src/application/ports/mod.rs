mod artifact_store;
mod clock;
mod query_engine;

pub use artifact_store::{ArtifactReader, ArtifactStore, StorageError, StoredFile};
pub use clock::{Clock, SystemClock};
pub use query_engine::{EngineError, EngineSession, QueryEngine};

#[cfg(test)]
pub use artifact_store::MockArtifactStore;
#[cfg(test)]
pub use query_engine::{MockEngineSession, MockQueryEngine};
