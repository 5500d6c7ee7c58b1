use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-memory advisory locks keyed by artifact path.
///
/// Every caller of [`KeyedLocks::lock`] claims the key's slot before waiting.
/// The slot is dropped from the map when the last claim goes away, whether
/// that claim held the lock or was cancelled while waiting for it.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    slots: Arc<DashMap<PathBuf, Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    mutex: Arc<Mutex<()>>,
    claims: usize,
}

/// Releases one claim on a slot when dropped.
struct Claim {
    key: PathBuf,
    slots: Arc<DashMap<PathBuf, Slot>>,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.slots.remove_if_mut(&self.key, |_, slot| {
            slot.claims -= 1;
            slot.claims == 0
        });
    }
}

pub struct KeyedGuard {
    // Field order matters: the mutex is released before the claim.
    _guard: OwnedMutexGuard<()>,
    _claim: Claim,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &Path) -> KeyedGuard {
        let mutex = {
            let mut slot = self.slots.entry(key.to_path_buf()).or_default();
            slot.claims += 1;
            Arc::clone(&slot.mutex)
        };
        let claim = Claim {
            key: key.to_path_buf(),
            slots: Arc::clone(&self.slots),
        };

        let guard = mutex.lock_owned().await;

        KeyedGuard {
            _guard: guard,
            _claim: claim,
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
