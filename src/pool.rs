use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;

use crate::{
    arena::NodeArena,
    error::{AllocError, Result},
    gaps::GapIndex,
    list::{NodeId, SegmentList},
    region::Region,
};


/// How a pool chooses the gap that services a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Walk the segment list in address order and take the first gap that
    /// is large enough. Keeps the high end of the region quiet, which
    /// helps workloads with mixed lifetimes.
    FirstFit,
    /// Take the smallest gap that is large enough, lowest address on
    /// ties. Minimizes the residual left behind by each split.
    BestFit,
}

/// Handle to one live allocation.
///
/// The handle is opaque: it resolves through the pool's node arena, so
/// internal reorganization (arena growth included) never invalidates it.
/// It stays valid until exactly this allocation is released; after that,
/// every use of it reports [`AllocError::InvalidHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pool: u64,
    node: NodeId,
    base: usize,
    size: usize,
}

impl Allocation {
    /// Offset of the allocation from the start of the region.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Size of the allocation in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// One row of [`Pool::inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Offset of the segment from the start of the region.
    pub base: usize,
    /// Segment length in bytes.
    pub size: usize,
    /// `true` for a live allocation, `false` for a gap.
    pub allocated: bool,
}

/// Snapshot of a pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total_size: usize,
    pub alloc_size: usize,
    pub num_allocs: usize,
    pub num_gaps: usize,
}

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// A fixed-region memory pool.
///
/// One pool owns one region and serves sub-allocations out of it. The
/// bookkeeping is three structures working together:
///
/// ```text
///  Region         +-------+-----------+----+--------------------+
///  (the bytes)    | alloc |    gap    | al |        gap         |
///                 +-------+-----------+----+--------------------+
///                     ^         ^       ^            ^
///  Segment list      [A]  <->  [G] <-> [A]   <->    [G]           base order
///  (node arena)                 |                    |
///                               |                    |
///  Gap index              (11B, node) -> (20B, node)              size order
/// ```
///
/// Allocating picks a gap (by [`Policy`]), splits it in place and leaves
/// the residual as a smaller gap. Releasing turns the segment back into a
/// gap and immediately merges it with any gap neighbour, so two gaps are
/// never adjacent and a fully released pool is always one spanning gap.
///
/// The pool is single-owner: operations take `&mut self` and run to
/// completion on the calling thread. It is `Send`, so callers that want
/// sharing can put it behind a `Mutex`.
#[derive(Debug)]
pub struct Pool {
    id: u64,
    policy: Policy,
    region: Region,
    arena: NodeArena,
    list: SegmentList,
    gaps: GapIndex,
    alloc_size: usize,
    num_allocs: usize,
}

impl Pool {
    /// Opens a pool over a freshly mapped region of `total_size` bytes.
    ///
    /// The new pool is a single gap spanning the whole region.
    pub fn open(total_size: usize, policy: Policy) -> Result<Pool> {
        if total_size == 0 {
            return Err(AllocError::InvalidSize);
        }

        let region = Region::request(total_size)?;

        let mut arena = NodeArena::new();
        let first = arena.acquire().ok_or(AllocError::Corrupted)?;
        {
            let segment = arena.get_mut(first);
            segment.base = 0;
            segment.size = total_size;
        }

        let mut gaps = GapIndex::new();
        gaps.insert(&arena, total_size, first);

        let pool = Pool {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            policy,
            region,
            arena,
            list: SegmentList::new(first),
            gaps,
            alloc_size: 0,
            num_allocs: 0,
        };

        trace!("pool {}: opened, {} bytes, {:?}", pool.id, total_size, policy);
        Ok(pool)
    }

    /// Carves `size` bytes out of a gap chosen by the pool's policy.
    ///
    /// ```text
    ///                                                   residual gap
    ///                                                        |
    ///  +------------------------+     split     +--------+---v----------+
    ///  |       gap (s_g)        |  ---------->  | alloc  |  gap (s_g-s) |
    ///  +------------------------+               +--------+--------------+
    ///  ^                                        ^
    ///  base                                     base (unchanged)
    /// ```
    ///
    /// The chosen gap is mutated in place, so the allocation inherits its
    /// base. A residual, if any, becomes a fresh record linked right
    /// after it; an exact fit leaves no residual and the gap count drops.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation> {
        if size == 0 {
            return Err(AllocError::InvalidSize);
        }
        if self.gaps.is_empty() {
            return Err(AllocError::OutOfSpace { requested: size });
        }

        // A split needs a fresh record; make sure one exists before any
        // state is touched, so the operation stays all-or-nothing.
        self.arena.maybe_grow();

        let found = match self.policy {
            Policy::FirstFit => self.first_fit(size),
            Policy::BestFit => self.gaps.best_fit(size),
        };
        let Some(node) = found else {
            return Err(AllocError::OutOfSpace { requested: size });
        };

        let removed = self.gaps.remove(node);
        debug_assert!(removed.is_some(), "chosen gap missing from the gap index");
        removed.ok_or(AllocError::Corrupted)?;

        // The gap becomes the allocation, keeping its base.
        let (base, gap_size) = {
            let segment = self.arena.get_mut(node);
            let base = segment.base;
            let gap_size = segment.size;
            segment.allocated = true;
            segment.size = size;
            (base, gap_size)
        };

        let residual = gap_size - size;
        if residual > 0 {
            let rest = self.arena.acquire().ok_or(AllocError::Corrupted)?;
            {
                let segment = self.arena.get_mut(rest);
                segment.base = base + size;
                segment.size = residual;
            }
            self.list.insert_after(&mut self.arena, node, rest);
            self.gaps.insert(&self.arena, residual, rest);
        }

        self.num_allocs += 1;
        self.alloc_size += size;

        trace!("pool {}: allocated {} bytes at {:#x}", self.id, size, base);
        Ok(Allocation {
            pool: self.id,
            node,
            base,
            size,
        })
    }

    /// Gives an allocation back to the pool.
    ///
    /// The segment turns back into a gap and is merged with its gap
    /// neighbours on either side. The forward merge absorbs the right
    /// neighbour into this record; the backward merge folds this record
    /// into the left neighbour, which then carries the combined gap.
    pub fn release(&mut self, alloc: Allocation) -> Result<()> {
        self.validate(&alloc)?;
        let mut node = alloc.node;

        // Stage the coalesce: a neighbour takes part if it is a gap.
        let next_gap = self
            .arena
            .get(node)
            .next
            .filter(|&next| !self.arena.get(next).allocated);
        let prev_gap = self
            .arena
            .get(node)
            .prev
            .filter(|&prev| !self.arena.get(prev).allocated);

        // Every gap neighbour must be indexed. Checked up front, before
        // any state is committed, so a corrupted index leaves the flag
        // and the counters exactly as they were.
        for gap in [next_gap, prev_gap].into_iter().flatten() {
            let indexed = self.gaps.contains(gap);
            debug_assert!(indexed, "gap neighbour missing from the gap index");
            if !indexed {
                return Err(AllocError::Corrupted);
            }
        }

        // Commit; nothing below can fail.
        self.arena.get_mut(node).allocated = false;
        self.num_allocs -= 1;
        self.alloc_size -= alloc.size;

        // Forward: the next segment is also a gap, absorb it.
        if let Some(next) = next_gap {
            let removed = self.gaps.remove(next);
            debug_assert!(removed.is_some());

            let next_size = self.arena.get(next).size;
            self.arena.get_mut(node).size += next_size;

            self.list.remove(&mut self.arena, next);
            self.arena.release(next);
        }

        // Backward: the previous segment is also a gap, merge into it.
        if let Some(prev) = prev_gap {
            let removed = self.gaps.remove(prev);
            debug_assert!(removed.is_some());

            let merged_size = self.arena.get(node).size;
            self.arena.get_mut(prev).size += merged_size;

            self.list.remove(&mut self.arena, node);
            self.arena.release(node);

            // The surviving segment is the previous one.
            node = prev;
        }

        let size = self.arena.get(node).size;
        self.gaps.insert(&self.arena, size, node);

        trace!(
            "pool {}: released {} bytes at {:#x}",
            self.id,
            alloc.size,
            alloc.base
        );
        Ok(())
    }

    /// The segments covering the region, in address order.
    ///
    /// This is a pure read; calling it twice in a row yields equal
    /// sequences.
    pub fn inspect(&self) -> Vec<SegmentInfo> {
        self.list
            .iter(&self.arena)
            .map(|(_, segment)| SegmentInfo {
                base: segment.base,
                size: segment.size,
                allocated: segment.allocated,
            })
            .collect()
    }

    /// Read access to an allocation's bytes.
    pub fn bytes(&self, alloc: &Allocation) -> Result<&[u8]> {
        self.validate(alloc)?;
        // SAFETY: validate() checked that `[base, base + size)` is a live
        // allocated segment, and segments never leave the region.
        Ok(unsafe { self.region.slice(alloc.base, alloc.size) })
    }

    /// Write access to an allocation's bytes.
    pub fn bytes_mut(&mut self, alloc: &Allocation) -> Result<&mut [u8]> {
        self.validate(alloc)?;
        // SAFETY: same as bytes(); `&mut self` rules out other views.
        Ok(unsafe { self.region.slice_mut(alloc.base, alloc.size) })
    }

    /// Closes the pool and unmaps its region.
    ///
    /// Refused while any allocation is outstanding, because callers may
    /// still hold handles into the region; the untouched pool is handed
    /// back together with [`AllocError::NotFreed`]. Dropping a pool skips
    /// this check and frees the region unconditionally.
    pub fn close(self) -> std::result::Result<(), (Pool, AllocError)> {
        if self.num_allocs != 0 || self.num_gaps() != 1 {
            return Err((self, AllocError::NotFreed));
        }
        trace!("pool {}: closed", self.id);
        // Dropping self unmaps the region and frees the bookkeeping.
        Ok(())
    }

    /// Size of the region in bytes.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.region.size()
    }

    /// Bytes currently handed out to callers.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.alloc_size
    }

    /// Number of live allocations.
    #[inline]
    pub fn num_allocs(&self) -> usize {
        self.num_allocs
    }

    /// Number of gaps. Derived from the gap index, which holds exactly
    /// one entry per gap segment.
    #[inline]
    pub fn num_gaps(&self) -> usize {
        self.gaps.len()
    }

    /// The placement policy the pool was opened with.
    #[inline]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// All counters in one read.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_size: self.total_size(),
            alloc_size: self.alloc_size,
            num_allocs: self.num_allocs,
            num_gaps: self.num_gaps(),
        }
    }

    /// First gap in address order that can hold `size` bytes.
    fn first_fit(&self, size: usize) -> Option<NodeId> {
        self.list
            .iter(&self.arena)
            .find(|(_, segment)| !segment.allocated && segment.size >= size)
            .map(|(id, _)| id)
    }

    /// A handle is good if it names a record of this pool that is live,
    /// allocated, and still has the geometry the handle was issued with.
    fn validate(&self, alloc: &Allocation) -> Result<()> {
        if alloc.pool != self.id {
            return Err(AllocError::InvalidHandle);
        }
        let segment = self
            .arena
            .try_get(alloc.node)
            .ok_or(AllocError::InvalidHandle)?;
        if !segment.used
            || !segment.allocated
            || segment.base != alloc.base
            || segment.size != alloc.size
        {
            return Err(AllocError::InvalidHandle);
        }
        Ok(())
    }
}

#[cfg(test)]
impl Pool {
    /// Re-derives every structural invariant from a fresh scan and
    /// asserts that the counters agree. Test-only; called after each
    /// operation in the scenario and randomized tests.
    pub(crate) fn check_invariants(&self) {
        let mut expected_base = 0;
        let mut gap_count = 0;
        let mut gap_total = 0;
        let mut alloc_count = 0;
        let mut alloc_total = 0;
        let mut prev_was_gap = false;
        let mut prev_id: Option<NodeId> = None;

        // Segments tile the region in order, links are symmetric, and no
        // two gaps touch.
        for (id, segment) in self.list.iter(&self.arena) {
            assert!(segment.used, "listed record {id} is marked unused");
            assert!(segment.size > 0, "zero-size segment at {:#x}", segment.base);
            assert_eq!(segment.base, expected_base, "hole or overlap before {id}");
            assert_eq!(segment.prev, prev_id, "broken back-link at {id}");

            if segment.allocated {
                alloc_count += 1;
                alloc_total += segment.size;
            } else {
                assert!(!prev_was_gap, "adjacent gaps at {:#x}", segment.base);
                gap_count += 1;
                gap_total += segment.size;
            }

            prev_was_gap = !segment.allocated;
            prev_id = Some(id);
            expected_base += segment.size;
        }
        assert_eq!(expected_base, self.total_size(), "segments do not cover the region");

        // The gap index holds exactly the gaps, sorted by (size, base).
        assert_eq!(self.gaps.len(), gap_count);
        let entries = self.gaps.entries();
        for pair in entries.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let a_base = self.arena.get(a.node).base;
            let b_base = self.arena.get(b.node).base;
            assert!(
                a.size < b.size || (a.size == b.size && a_base < b_base),
                "gap index out of order: ({}, {a_base:#x}) before ({}, {b_base:#x})",
                a.size,
                b.size,
            );
        }
        for entry in entries {
            let segment = self.arena.get(entry.node);
            assert!(segment.used && !segment.allocated);
            assert_eq!(entry.size, segment.size);
        }

        // Counters match the scan, and no record leaked out of the arena.
        assert_eq!(self.num_allocs, alloc_count);
        assert_eq!(self.alloc_size, alloc_total);
        assert_eq!(self.alloc_size + gap_total, self.total_size());
        assert_eq!(self.arena.used(), alloc_count + gap_count);
    }
}
