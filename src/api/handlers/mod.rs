pub mod health;
pub mod snapshot;

pub use health::{health_handler, readiness_handler};
pub use snapshot::snapshot_handler;
