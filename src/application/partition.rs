use sha2::{Digest, Sha256};

use crate::domain::value_objects::{ConnectionDescriptor, IsolationKey};

/// Where a request's data comes from and which cache partition it lands in.
#[derive(Debug, Clone)]
pub struct TenantPartition {
    pub descriptor: ConnectionDescriptor,
    pub isolation_key: IsolationKey,
}

/// Derives the engine connection and cache isolation key from a caller credential.
///
/// The isolation key is the SHA-256 of the raw credential, hex encoded. It is
/// the only boundary between tenants in the shared cache, so it is never
/// truncated. Without a credential the service's default connection string
/// is both the connection target and the hash input.
#[derive(Debug, Clone)]
pub struct CredentialPartitioner {
    default_connection: String,
}

impl CredentialPartitioner {
    pub fn new(default_connection: impl Into<String>) -> Self {
        Self {
            default_connection: default_connection.into(),
        }
    }

    pub fn partition(&self, credential: Option<&str>) -> TenantPartition {
        match credential.filter(|token| !token.is_empty()) {
            Some(token) => TenantPartition {
                descriptor: ConnectionDescriptor::motherduck(token),
                isolation_key: hash_credential(token),
            },
            None => TenantPartition {
                descriptor: ConnectionDescriptor::new(self.default_connection.clone()),
                isolation_key: hash_credential(&self.default_connection),
            },
        }
    }
}

/// SHA-256 of `secret`, hex encoded.
pub fn hash_credential(secret: &str) -> IsolationKey {
    let digest: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
    IsolationKey::from_digest(digest)
}
