//! # View Snapshot - CSV Materialization Service
//!
//! Serves CSV snapshots of database views over HTTP. Exports are cached on
//! the local filesystem, partitioned by a one-way hash of the caller's
//! credential, and reused while fresh.
//!
//! ## Architecture Layers
//!
//! - **Domain**: Value objects (identifiers, view references, cache policy)
//! - **Application**: Use case, freshness policies, lifecycle and ports
//! - **Infrastructure**: DuckDB query engine and local artifact store
//! - **API**: HTTP handlers and middleware
//!
//! ## Example Usage
//!
//! ```no_run
//! use view_snapshot::{api::create_router, application::builder::ApplicationBuilder, Config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let builder = ApplicationBuilder::new(Config::from_env())
//!     .with_infrastructure()
//!     .await?;
//! let router = create_router(builder.build()?);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

// Re-export key types explicitly to avoid ambiguity
pub use api::errors as api_errors;
pub use application::{dto, ports, use_cases};
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::value_objects;
