use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid {field} identifier: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("Invalid isolation key: {0}")]
    InvalidIsolationKey(String),

    #[error("Invalid cache policy: {0}")]
    InvalidCachePolicy(String),
}
