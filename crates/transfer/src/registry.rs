use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use filedrop_protocol::TransferDirection;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::TransferError;

/// Set of active transfers keyed by caller-chosen id.
///
/// Cloning is cheap and every clone refers to the same set. The registry
/// is how a control path (a cancel button, Ctrl-C) reaches a transfer that
/// another task is driving.
#[derive(Clone, Default)]
pub struct TransferRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    active: Mutex<HashMap<String, ActiveTransfer>>,
    next_generation: AtomicU64,
}

struct ActiveTransfer {
    direction: TransferDirection,
    cancel: CancellationToken,
    generation: u64,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveTransfer>> {
        // No invariant spans more than one map operation, so a poisoned map
        // is still consistent.
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new active transfer.
    ///
    /// Fails with [`TransferError::DuplicateTransfer`] if `id` is already
    /// active. The returned [`Registration`] removes the entry when dropped.
    pub fn register(
        &self,
        id: &str,
        direction: TransferDirection,
    ) -> Result<Registration, TransferError> {
        let mut active = self.lock();
        if active.contains_key(id) {
            return Err(TransferError::DuplicateTransfer(id.to_string()));
        }

        let cancel = CancellationToken::new();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        active.insert(
            id.to_string(),
            ActiveTransfer {
                direction,
                cancel: cancel.clone(),
                generation,
            },
        );
        drop(active);

        debug!(id, %direction, "transfer registered");
        Ok(Registration {
            registry: self.clone(),
            id: id.to_string(),
            cancel,
            generation,
            released: false,
        })
    }

    /// Requests cancellation of `id`.
    ///
    /// Returns `false` (and does nothing) if no such transfer is active.
    pub fn cancel(&self, id: &str) -> bool {
        match self.lock().get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                debug!(id, "cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Requests cancellation of every active transfer. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let active = self.lock();
        for entry in active.values() {
            entry.cancel.cancel();
        }
        active.len()
    }

    /// Removes `id`. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) {
        if self.lock().remove(id).is_some() {
            debug!(id, "transfer removed");
        }
    }

    fn remove_generation(&self, id: &str, generation: u64) {
        let mut active = self.lock();
        if active.get(id).is_some_and(|e| e.generation == generation) {
            active.remove(id);
            debug!(id, "transfer removed");
        }
    }

    /// Returns `true` if `id` is currently active.
    pub fn is_active(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Returns the direction of an active transfer.
    pub fn direction(&self, id: &str) -> Option<TransferDirection> {
        self.lock().get(id).map(|e| e.direction)
    }

    /// Returns the ids of all active transfers, sorted.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Proof that an id is registered; removes it from the registry on drop.
///
/// Removal only touches the entry this registration created, so a guard
/// outliving an explicit [`TransferRegistry::remove`] cannot evict a newer
/// transfer that reused the id.
pub struct Registration {
    registry: TransferRegistry,
    id: String,
    cancel: CancellationToken,
    generation: u64,
    released: bool,
}

impl Registration {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cancellation token shared with the registry entry.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Removes the entry now rather than on drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.remove_generation(&self.id, self.generation);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_release() {
        let registry = TransferRegistry::new();
        let reg = registry
            .register("a.txt", TransferDirection::Upload)
            .unwrap();
        assert!(registry.is_active("a.txt"));
        assert_eq!(registry.direction("a.txt"), Some(TransferDirection::Upload));
        assert_eq!(reg.id(), "a.txt");

        reg.release();
        assert!(!registry.is_active("a.txt"));
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_rejected_while_active() {
        let registry = TransferRegistry::new();
        let first = registry
            .register("a.txt", TransferDirection::Upload)
            .unwrap();

        let dup = registry.register("a.txt", TransferDirection::Download);
        assert!(matches!(dup, Err(TransferError::DuplicateTransfer(id)) if id == "a.txt"));

        drop(first);
        assert!(
            registry
                .register("a.txt", TransferDirection::Download)
                .is_ok()
        );
    }

    #[test]
    fn cancel_sets_token() {
        let registry = TransferRegistry::new();
        let reg = registry
            .register("a.txt", TransferDirection::Upload)
            .unwrap();
        let token = reg.cancel_token();

        assert!(registry.cancel("a.txt"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_unknown_is_noop() {
        let registry = TransferRegistry::new();
        assert!(!registry.cancel("missing"));
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = TransferRegistry::new();
        let reg = registry
            .register("a.txt", TransferDirection::Upload)
            .unwrap();
        registry.remove("a.txt");
        registry.remove("a.txt");
        assert!(!registry.is_active("a.txt"));
        drop(reg);
        assert!(registry.is_empty());
    }

    #[test]
    fn stale_guard_does_not_evict_new_entry() {
        let registry = TransferRegistry::new();
        let old = registry
            .register("a.txt", TransferDirection::Upload)
            .unwrap();
        registry.remove("a.txt");

        let _new = registry
            .register("a.txt", TransferDirection::Upload)
            .unwrap();
        drop(old);
        assert!(registry.is_active("a.txt"));
    }

    #[test]
    fn cancel_all_signals_everything() {
        let registry = TransferRegistry::new();
        let a = registry.register("a", TransferDirection::Upload).unwrap();
        let b = registry.register("b", TransferDirection::Download).unwrap();

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.cancel_token().is_cancelled());
        assert!(b.cancel_token().is_cancelled());
        assert_eq!(registry.active_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn clones_share_state() {
        let registry = TransferRegistry::new();
        let other = registry.clone();
        let reg = registry.register("x", TransferDirection::Upload).unwrap();
        assert!(other.is_active("x"));
        assert!(other.cancel("x"));
        assert!(reg.cancel_token().is_cancelled());
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn concurrent_registration_is_exclusive() {
        use std::thread;

        let registry = TransferRegistry::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let r = registry.clone();
                thread::spawn(move || {
                    r.register("shared", TransferDirection::Upload)
                        .map(std::mem::forget)
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert!(registry.is_active("shared"));
    }
}
