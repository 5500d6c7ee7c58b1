use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// SHA-256 digest of a connection credential (32 bytes = 64 hex chars).
///
/// Partitions the artifact cache per tenant: artifacts produced under one
/// credential are never visible under another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IsolationKey(String);

impl IsolationKey {
    pub const HEX_LEN: usize = 64;

    pub(crate) fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Create from validated hex string
    pub fn from_hex(hex: String) -> Result<Self, DomainError> {
        if hex.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidIsolationKey(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                hex.len()
            )));
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidIsolationKey(
                "hex characters only".to_string(),
            ));
        }

        Ok(Self(hex.to_lowercase()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl std::fmt::Display for IsolationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for IsolationKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.to_string())
    }
}
