//! Observer registry for the shared session.
//!
//! Membership is keyed by observer identity and holds only weak references;
//! each pack owns its observer and must deregister it before teardown.
//!
//! Fan-out snapshots membership under the lock and delivers outside it. Each
//! entry carries a delivery gate that is held for the duration of a callback
//! and closed by `deregister`, so once `deregister` returns the observer
//! receives nothing further.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, warn};

use crate::events::SessionEvent;
use crate::observer::{ObserverId, SessionObserver};
use crate::session::RegistrationError;

/// Open while the observer is registered. Re-entrant so a callback may
/// deregister its own observer.
type Gate = Arc<ReentrantMutex<Cell<bool>>>;

struct Entry {
    observer: Weak<dyn SessionObserver>,
    gate: Gate,
}

impl Entry {
    fn new(observer: &Arc<dyn SessionObserver>) -> Self {
        Self {
            observer: Arc::downgrade(observer),
            gate: Arc::new(ReentrantMutex::new(Cell::new(true))),
        }
    }

    fn is_live(&self) -> bool {
        self.observer.strong_count() > 0
    }

    /// Blocks until any in-flight delivery to this observer has finished.
    fn close(&self) {
        self.gate.lock().set(false);
    }
}

/// Thread-safe set of observers of one session.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Mutex<HashMap<ObserverId, Entry>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    ///
    /// Registering an observer that is already a member fails with
    /// `AlreadyRegistered` and leaves membership unchanged.
    pub fn register<O>(&self, observer: &Arc<O>) -> Result<ObserverId, RegistrationError>
    where
        O: SessionObserver + 'static,
    {
        let observer: Arc<dyn SessionObserver> = observer.clone();
        self.register_dyn(&observer)
    }

    /// Register an observer already erased to `dyn SessionObserver`.
    pub fn register_dyn(
        &self,
        observer: &Arc<dyn SessionObserver>,
    ) -> Result<ObserverId, RegistrationError> {
        let id = ObserverId::of(observer);
        {
            let mut entries = self.entries.lock();
            // The stored weak keeps the allocation, so a present key is
            // always this same observer.
            if entries.contains_key(&id) {
                return Err(RegistrationError::AlreadyRegistered { observer: id });
            }
            entries.insert(id, Entry::new(observer));
        }

        debug!(observer = %id, "Observer registered");
        Ok(id)
    }

    /// Deregister an observer.
    ///
    /// Waits for an in-flight delivery to this observer to finish, unless
    /// called from inside that delivery.
    pub fn deregister<O: ?Sized>(&self, observer: &Arc<O>) -> Result<(), RegistrationError> {
        self.deregister_id(ObserverId::of(observer))
    }

    /// Deregister by id, for packs that kept only the id.
    pub fn deregister_id(&self, id: ObserverId) -> Result<(), RegistrationError> {
        let entry = self
            .entries
            .lock()
            .remove(&id)
            .ok_or(RegistrationError::NotRegistered { observer: id })?;
        entry.close();

        debug!(observer = %id, "Observer deregistered");
        Ok(())
    }

    /// Whether `observer` is a live member.
    pub fn contains<O: ?Sized>(&self, observer: &Arc<O>) -> bool {
        self.entries
            .lock()
            .get(&ObserverId::of(observer))
            .is_some_and(Entry::is_live)
    }

    /// Snapshot of live members. Later registry changes do not affect it.
    pub fn registered_observers(&self) -> Vec<Arc<dyn SessionObserver>> {
        self.entries
            .lock()
            .values()
            .filter_map(|entry| entry.observer.upgrade())
            .collect()
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.entries.lock().values().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose observer was dropped without deregistering.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|id, entry| {
            let live = entry.is_live();
            if !live {
                warn!(observer = %id, "Observer dropped without deregistering");
            }
            live
        });
        before - entries.len()
    }

    /// Deliver `event` to every member of the current snapshot.
    ///
    /// Returns the number of observers that received it.
    pub(crate) fn dispatch(&self, event: &SessionEvent) -> usize {
        let snapshot: Vec<(Weak<dyn SessionObserver>, Gate)> = self
            .entries
            .lock()
            .values()
            .map(|entry| (entry.observer.clone(), Arc::clone(&entry.gate)))
            .collect();

        let mut delivered = 0;
        let mut dead = 0;
        for (observer, gate) in snapshot {
            let open = gate.lock();
            if !open.get() {
                continue;
            }
            match observer.upgrade() {
                Some(observer) => {
                    observer.on_event(event);
                    delivered += 1;
                }
                None => dead += 1,
            }
        }

        if dead > 0 {
            self.prune();
        }
        delivered
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<ObserverId> = self.entries.lock().keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("ObserverRegistry")
            .field("observers", &ids)
            .finish()
    }
}
