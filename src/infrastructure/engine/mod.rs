mod duckdb_engine;
mod statements;

pub use duckdb_engine::{DuckDbEngine, DuckDbSession};
pub use statements::Statements;
