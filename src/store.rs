use log::debug;

use crate::{
    error::{AllocError, Result},
    pool::{Policy, Pool},
    utils::above_fill_factor,
};

/// Slots the store starts with.
const POOL_STORE_INIT_CAPACITY: usize = 20;

const EXPAND_FACTOR: usize = 2;

/// Identifier of a pool held by a [`PoolStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(usize);

/// Keeps track of every open pool of a process (or of whatever scope the
/// caller chooses to give one store).
///
/// The store is a thin collaborator around [`Pool`]: it owns the pools,
/// hands out ids, and funnels the checked close through itself. Slots are
/// append-only; a closed pool leaves an empty slot behind and its id is
/// never handed out again, so a stale [`PoolId`] can at worst name an
/// empty slot, never a different pool.
#[derive(Debug, Default)]
pub struct PoolStore {
    pools: Vec<Option<Pool>>,
}

impl PoolStore {
    pub fn new() -> Self {
        Self {
            pools: Vec::with_capacity(POOL_STORE_INIT_CAPACITY),
        }
    }

    /// Opens a pool and takes ownership of it.
    pub fn open(&mut self, total_size: usize, policy: Policy) -> Result<PoolId> {
        self.maybe_grow();

        let pool = Pool::open(total_size, policy)?;
        let id = PoolId(self.pools.len());
        self.pools.push(Some(pool));
        Ok(id)
    }

    pub fn get(&self, id: PoolId) -> Option<&Pool> {
        self.pools.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: PoolId) -> Option<&mut Pool> {
        self.pools.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Closes the pool behind `id`.
    ///
    /// Unknown and already-closed ids report [`AllocError::InvalidHandle`].
    /// A pool with outstanding allocations refuses to close; it stays in
    /// the store untouched and the caller gets [`AllocError::NotFreed`].
    pub fn close(&mut self, id: PoolId) -> Result<()> {
        let slot = self.pools.get_mut(id.0).ok_or(AllocError::InvalidHandle)?;
        let pool = slot.take().ok_or(AllocError::InvalidHandle)?;

        match pool.close() {
            Ok(()) => Ok(()),
            Err((pool, err)) => {
                // Put the refused pool back where it was.
                *slot = Some(pool);
                Err(err)
            }
        }
    }

    /// Number of pools currently open.
    pub fn len(&self) -> usize {
        self.pools.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.iter().all(|slot| slot.is_none())
    }

    /// Tears the store down, refusing if any pool is still open.
    ///
    /// The refused store comes back untouched so the caller can close the
    /// remaining pools and retry.
    pub fn shutdown(self) -> std::result::Result<(), (PoolStore, AllocError)> {
        if self.is_empty() {
            Ok(())
        } else {
            Err((self, AllocError::NotFreed))
        }
    }

    fn maybe_grow(&mut self) {
        if above_fill_factor(self.pools.len(), self.pools.capacity()) {
            let target = self.pools.capacity() * EXPAND_FACTOR;
            self.pools.reserve_exact(target - self.pools.len());
            debug!("pool store grown to {} slots", self.pools.capacity());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_resolve_to_their_own_pool() {
        let mut store = PoolStore::new();

        let small = store.open(100, Policy::FirstFit).unwrap();
        let large = store.open(2000, Policy::BestFit).unwrap();
        assert_eq!(store.len(), 2);

        assert_eq!(store.get(small).unwrap().total_size(), 100);
        assert_eq!(store.get(large).unwrap().total_size(), 2000);
        assert_eq!(store.get(large).unwrap().policy(), Policy::BestFit);
    }

    #[test]
    fn closed_ids_go_stale_and_stay_stale() {
        let mut store = PoolStore::new();
        let id = store.open(100, Policy::FirstFit).unwrap();

        store.close(id).unwrap();
        assert!(store.get(id).is_none());
        assert_eq!(store.close(id), Err(AllocError::InvalidHandle));

        // New pools never resurrect an old id.
        let next = store.open(100, Policy::FirstFit).unwrap();
        assert_ne!(next, id);
        assert!(store.get(id).is_none());
    }

    #[test]
    fn close_refusal_keeps_the_pool_in_the_store() {
        let mut store = PoolStore::new();
        let id = store.open(1000, Policy::BestFit).unwrap();

        let alloc = store.get_mut(id).unwrap().allocate(64).unwrap();
        assert_eq!(store.close(id), Err(AllocError::NotFreed));

        // Still there, still usable.
        store.get_mut(id).unwrap().release(alloc).unwrap();
        store.close(id).unwrap();
    }

    #[test]
    fn shutdown_requires_every_pool_closed() {
        let mut store = PoolStore::new();
        let id = store.open(100, Policy::FirstFit).unwrap();

        let (mut store, err) = store.shutdown().unwrap_err();
        assert_eq!(err, AllocError::NotFreed);

        store.close(id).unwrap();
        assert!(store.shutdown().is_ok());
    }
}
