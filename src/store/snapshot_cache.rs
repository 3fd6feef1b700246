//! Commit-gated snapshot cache with a one-time orphan sweep trigger.
//!
//! Grounded on the teacher's `manager::cache::SettingsCache`: a single
//! `RwLock<Option<_>>` slot, a cheap read-path check, and a double-checked
//! write on miss.

use crate::backend::Backend;
use crate::commit::Commit;
use crate::error::Result;
use crate::model::OverridesSnapshot;
use crate::sync::RwLockExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

pub struct SnapshotCache {
    state: RwLock<Option<(Commit, Arc<OverridesSnapshot>)>>,
    swept: AtomicBool,
}

impl SnapshotCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
            swept: AtomicBool::new(false),
        }
    }

    /// Return the cached snapshot if its commit still matches the backend's
    /// current commit; otherwise refetch and replace the cache.
    ///
    /// # Errors
    /// Propagates backend errors and lock-poison recovery failures.
    pub fn get(&self, backend: &dyn Backend, app_name: &str) -> Result<Arc<OverridesSnapshot>> {
        let current_commit = backend.get_current_commit(app_name)?;

        if let Some((commit, snapshot)) = self.state.read_recovered()?.as_ref() {
            if *commit == current_commit {
                return Ok(snapshot.clone());
            }
        }

        let mut guard = self.state.write_recovered()?;
        if let Some((commit, snapshot)) = guard.as_ref() {
            if *commit == current_commit {
                return Ok(snapshot.clone());
            }
        }

        let fresh = Arc::new(backend.get_snapshot(app_name)?);
        *guard = Some((fresh.commit, fresh.clone()));
        Ok(fresh)
    }

    /// Force the cache to hold `snapshot` (used right after a mutation, whose
    /// return value is already the freshest snapshot).
    ///
    /// # Errors
    /// Propagates lock-poison recovery failures.
    pub fn set(&self, snapshot: OverridesSnapshot) -> Result<Arc<OverridesSnapshot>> {
        let fresh = Arc::new(snapshot);
        *self.state.write_recovered()? = Some((fresh.commit, fresh.clone()));
        Ok(fresh)
    }

    /// True exactly once per process: the caller should run the orphan sweep
    /// immediately after observing `true`.
    pub fn claim_first_fetch(&self) -> bool {
        !self.swept.swap(true, Ordering::SeqCst)
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}
