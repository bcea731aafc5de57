//! Exclusive audio resource leases.
//!
//! The microphone and the speaker are each held by at most one owner. A new
//! acquisition revokes the previous holder (its cancellation token fires)
//! before the new lease is installed, so an owner that loses its lease must
//! treat that as a stop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Kind of exclusive audio resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Microphone,
    Speaker,
}

#[derive(Debug)]
struct Holder {
    lease_id: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Registry {
    holders: HashMap<ResourceKind, Holder>,
    next_lease_id: u64,
}

/// Hands out at most one [`ResourceLease`] per [`ResourceKind`].
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct AudioResourceManager {
    registry: Arc<Mutex<Registry>>,
}

impl AudioResourceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `kind`, revoking whoever held it before.
    pub fn acquire(&self, kind: ResourceKind) -> ResourceLease {
        let mut registry = self.lock();
        registry.next_lease_id += 1;
        let lease_id = registry.next_lease_id;
        let token = CancellationToken::new();

        if let Some(previous) = registry.holders.insert(
            kind,
            Holder {
                lease_id,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
            tracing::debug!(
                ?kind,
                revoked = previous.lease_id,
                lease = lease_id,
                "Audio resource taken over"
            );
        } else {
            tracing::debug!(?kind, lease = lease_id, "Audio resource acquired");
        }

        ResourceLease {
            kind,
            lease_id,
            token,
            manager: self.clone(),
            released: false,
        }
    }

    /// Whether anyone currently holds `kind`.
    #[must_use]
    pub fn is_held(&self, kind: ResourceKind) -> bool {
        self.lock().holders.contains_key(&kind)
    }

    /// Lease id of the current holder of `kind`.
    #[must_use]
    pub fn holder(&self, kind: ResourceKind) -> Option<u64> {
        self.lock().holders.get(&kind).map(|h| h.lease_id)
    }

    fn release(&self, kind: ResourceKind, lease_id: u64) {
        let mut registry = self.lock();
        // A revoked lease no longer owns the slot.
        if registry
            .holders
            .get(&kind)
            .is_some_and(|h| h.lease_id == lease_id)
        {
            registry.holders.remove(&kind);
            tracing::debug!(?kind, lease = lease_id, "Audio resource released");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive hold on one audio resource kind.
///
/// Released on [`release`](Self::release) or drop, whichever comes first.
#[derive(Debug)]
pub struct ResourceLease {
    kind: ResourceKind,
    lease_id: u64,
    token: CancellationToken,
    manager: AudioResourceManager,
    released: bool,
}

impl ResourceLease {
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.lease_id
    }

    /// Whether another owner has taken the resource over.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that fires when this lease is revoked.
    #[must_use]
    pub fn revocation(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Give the resource back. Idempotent.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.manager.release(self.kind, self.lease_id);
        }
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        self.release();
    }
}
